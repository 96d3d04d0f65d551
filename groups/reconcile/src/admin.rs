use crate::core::{
    email, Aggregate, DirectoryClient, GroupSpec, IsNotFound, RemoteGroup, RemoteMember, Role,
    RunOptions,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Performs group and membership operations against a [`DirectoryClient`].
#[derive(Clone)]
pub struct AdminService {
    client: Arc<dyn DirectoryClient>,
    is_not_found: IsNotFound,
    options: RunOptions,
}

// === impl AdminService ===

impl AdminService {
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        is_not_found: IsNotFound,
        options: RunOptions,
    ) -> Self {
        Self {
            client,
            is_not_found,
            options,
        }
    }

    /// Creates the group if it does not exist; otherwise updates its name and
    /// description if either differs from a non-empty desired value.
    pub async fn create_or_update_group(&self, group: &GroupSpec) -> Result<()> {
        debug!(group = %group.email_id, "create_or_update_group");

        let remote = match self.client.get_group(&group.email_id).await {
            Ok(remote) => remote,
            Err(error) if (self.is_not_found)(&error) => {
                if !self.options.confirm {
                    info!(group = %group.email_id, "dry-run: would create group");
                    return Ok(());
                }

                info!(group = %group.email_id, "Creating group");
                let created = self
                    .client
                    .insert_group(desired_group(group))
                    .await
                    .with_context(|| format!("unable to add new group {:?}", group.email_id))?;
                info!(group = %created.email, "Created group");
                return Ok(());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("unable to fetch group {:?}", group.email_id))
            }
        };

        let name_differs = !group.name.is_empty() && remote.name != group.name;
        let description_differs =
            !group.description.is_empty() && remote.description != group.description;
        if !name_differs && !description_differs {
            return Ok(());
        }

        if !self.options.confirm {
            info!(group = %group.email_id, "dry-run: would update group name/description");
            return Ok(());
        }

        info!(group = %group.email_id, "Updating group");
        let updated = self
            .client
            .update_group(&group.email_id, desired_group(group))
            .await
            .with_context(|| format!("unable to update group {:?}", group.email_id))?;
        info!(group = %updated.email, "Updated group");
        Ok(())
    }

    /// Ensures every address in `emails` is a member of the group with
    /// `role`, updating the role of existing members in place and inserting
    /// missing ones.
    pub async fn add_or_update_members(
        &self,
        group: &GroupSpec,
        role: Role,
        emails: &[String],
    ) -> Result<(), Aggregate> {
        debug!(group = %group.email_id, %role, ?emails, "add_or_update_members");

        let Some(remote) = self.list_members_or_skip(group, "adding members").await? else {
            return Ok(());
        };

        let mut errors = Aggregate::new();
        for email in emails {
            let existing = remote.iter().find(|m| email::equals(&m.email, email));

            if let Some(member) = existing {
                if member.role == role {
                    continue;
                }

                if !self.options.confirm {
                    info!(group = %group.email_id, member = %email, from = %member.role, to = %role, "dry-run: would update member");
                    continue;
                }

                info!(group = %group.email_id, member = %email, from = %member.role, to = %role, "Updating member");
                let update = RemoteMember {
                    role,
                    ..member.clone()
                };
                match self
                    .client
                    .update_member(&group.email_id, &member.id, update)
                    .await
                {
                    Ok(_) => {
                        info!(group = %group.email_id, member = %email, %role, "Updated member")
                    }
                    Err(error) => errors.push(error.context(format!(
                        "unable to update {email} in {:?} as {role}",
                        group.email_id
                    ))),
                }
                continue;
            }

            if !self.options.confirm {
                info!(group = %group.email_id, member = %email, %role, "dry-run: would add member");
                continue;
            }

            info!(group = %group.email_id, member = %email, %role, "Adding member");
            match self
                .client
                .insert_member(&group.email_id, RemoteMember::new(email, role))
                .await
            {
                Ok(_) => info!(group = %group.email_id, member = %email, %role, "Added member"),
                Err(error) => errors.push(error.context(format!(
                    "unable to add {email} to {:?} as {role}",
                    group.email_id
                ))),
            }
        }

        errors.into_result()
    }

    /// Removes every owner or manager of the group that is not equivalent to
    /// an address in `keep`. Members with the `MEMBER` role are never
    /// removed.
    pub async fn remove_owners_or_managers<'a>(
        &self,
        group: &GroupSpec,
        keep: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), Aggregate> {
        debug!(group = %group.email_id, "remove_owners_or_managers");
        self.remove_unlisted(group, keep, |m| m.role != Role::Member)
            .await
    }

    /// Removes every member of the group, regardless of role, that is not
    /// equivalent to an address in `keep`.
    pub async fn remove_members<'a>(
        &self,
        group: &GroupSpec,
        keep: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), Aggregate> {
        debug!(group = %group.email_id, "remove_members");
        self.remove_unlisted(group, keep, |_| true).await
    }

    /// Deletes every remote group that has no equivalent entry in `desired`.
    pub async fn delete_orphan_groups(&self, desired: &[GroupSpec]) -> Result<(), Aggregate> {
        let remote = self
            .client
            .list_groups()
            .await
            .context("unable to list groups")?;

        let mut errors = Aggregate::new();
        for group in remote {
            if desired.iter().any(|d| email::equals(&d.email_id, &group.email)) {
                continue;
            }

            if !self.options.confirm {
                info!(group = %group.email, "dry-run: would remove group");
                continue;
            }

            info!(group = %group.email, "Removing group");
            match self.client.delete_group(&group.email).await {
                Ok(()) => info!(group = %group.email, "Removed group"),
                Err(error) => {
                    errors.push(error.context(format!("unable to remove group {}", group.email)))
                }
            }
        }

        errors.into_result()
    }

    pub async fn list_groups(&self) -> Result<Vec<RemoteGroup>> {
        self.client.list_groups().await
    }

    pub async fn list_members(&self, group_key: &str) -> Result<Vec<RemoteMember>> {
        self.client.list_members(group_key).await
    }

    async fn remove_unlisted<'a>(
        &self,
        group: &GroupSpec,
        keep: impl IntoIterator<Item = &'a String>,
        removable: impl Fn(&RemoteMember) -> bool,
    ) -> Result<(), Aggregate> {
        let keep = keep.into_iter().collect::<Vec<_>>();
        let Some(remote) = self.list_members_or_skip(group, "removing members").await? else {
            return Ok(());
        };

        let mut errors = Aggregate::new();
        for member in remote {
            if !removable(&member) || email::contains(keep.iter().copied(), &member.email) {
                continue;
            }

            if !self.options.confirm {
                info!(group = %group.email_id, member = %member.email, role = %member.role, "dry-run: would remove member");
                continue;
            }

            info!(group = %group.email_id, member = %member.email, role = %member.role, "Removing member");
            match self.client.delete_member(&group.email_id, &member.id).await {
                Ok(()) => {
                    info!(group = %group.email_id, member = %member.email, role = %member.role, "Removed member")
                }
                Err(error) => errors.push(error.context(format!(
                    "unable to remove {} from {:?} as a {}",
                    member.email, group.email_id, member.role
                ))),
            }
        }

        errors.into_result()
    }

    /// Lists the group's members. Returns `None` if the group does not exist,
    /// which is expected when its creation was skipped in dry-run mode.
    async fn list_members_or_skip(
        &self,
        group: &GroupSpec,
        action: &str,
    ) -> Result<Option<Vec<RemoteMember>>, Aggregate> {
        match self.client.list_members(&group.email_id).await {
            Ok(members) => Ok(Some(members)),
            Err(error) if (self.is_not_found)(&error) => {
                info!(group = %group.email_id, "Skipping {action}: group has not yet been created");
                Ok(None)
            }
            Err(error) => Err(error
                .context(format!(
                    "unable to retrieve members in group {:?}",
                    group.email_id
                ))
                .into()),
        }
    }
}

/// The group to insert or update: its e-mail plus only the non-empty
/// desired name and description.
fn desired_group(group: &GroupSpec) -> RemoteGroup {
    RemoteGroup {
        id: String::new(),
        email: group.email_id.clone(),
        name: group.name.clone(),
        description: group.description.clone(),
    }
}
