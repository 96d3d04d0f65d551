use crate::core::{GroupSpec, IsNotFound, RunOptions, SettingsClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Converges a group's policy settings through a [`SettingsClient`].
#[derive(Clone)]
pub struct SettingsService {
    client: Arc<dyn SettingsClient>,
    is_not_found: IsNotFound,
    options: RunOptions,
}

// === impl SettingsService ===

impl SettingsService {
    pub fn new(
        client: Arc<dyn SettingsClient>,
        is_not_found: IsNotFound,
        options: RunOptions,
    ) -> Self {
        Self {
            client,
            is_not_found,
            options,
        }
    }

    /// Patches the group's settings if they differ from the defaults merged
    /// with the group's overrides.
    pub async fn update_group_settings(&self, group: &GroupSpec) -> Result<()> {
        debug!(group = %group.email_id, "update_group_settings");

        let current = match self.client.get(&group.email_id).await {
            Ok(current) => current,
            Err(error) if (self.is_not_found)(&error) => {
                info!(group = %group.email_id, "Skipping updating group settings: group has not yet been created");
                return Ok(());
            }
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("unable to retrieve group settings for {:?}", group.email_id)
                })
            }
        };

        let (wanted, unknown) = current.desired(&group.settings);
        for key in unknown {
            warn!(group = %group.email_id, %key, "Ignoring unrecognized setting");
        }

        if wanted == current {
            debug!(group = %group.email_id, "Group settings are up to date");
            return Ok(());
        }

        if !self.options.confirm {
            info!(
                group = %group.email_id,
                current = ?current.managed(),
                desired = ?wanted.managed(),
                "dry-run: would update group settings",
            );
            return Ok(());
        }

        self.client
            .patch(&group.email_id, wanted)
            .await
            .with_context(|| format!("unable to update group settings for {:?}", group.email_id))?;
        info!(group = %group.email_id, "Updated group settings");
        Ok(())
    }

    pub async fn get(&self, group_key: &str) -> Result<crate::core::GroupSettings> {
        self.client.get(group_key).await
    }
}
