use crate::{
    core::{GroupSpec, GroupsConfig, Role},
    reconcile::{AdminService, SettingsService},
};
use anyhow::{Context, Result};
use tracing::info;

/// Reads every remote group, with its members and managed settings, as a
/// groups configuration.
pub async fn snapshot(admin: &AdminService, settings: &SettingsService) -> Result<GroupsConfig> {
    let remote = admin
        .list_groups()
        .await
        .context("unable to list groups")?;
    if remote.is_empty() {
        info!("No groups found");
    }

    let mut groups = Vec::with_capacity(remote.len());
    for group in remote {
        let current = settings
            .get(&group.email)
            .await
            .with_context(|| format!("unable to retrieve group settings for {}", group.email))?;
        let members = admin
            .list_members(&group.email)
            .await
            .with_context(|| format!("unable to retrieve members in group {}", group.email))?;

        let mut spec = GroupSpec {
            settings: current
                .managed()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            email_id: group.email,
            name: group.name,
            description: group.description,
            ..Default::default()
        };
        for member in members {
            match member.role {
                Role::Owner => spec.owners.push(member.email),
                Role::Manager => spec.managers.push(member.email),
                Role::Member => spec.members.push(member.email),
            }
        }
        groups.push(spec);
    }

    Ok(GroupsConfig { groups })
}

pub fn to_yaml(config: &GroupsConfig) -> Result<String> {
    serde_yaml::to_string(config).context("unable to generate yaml for groups")
}
