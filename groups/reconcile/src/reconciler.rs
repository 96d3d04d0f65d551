use crate::{
    core::{email, Aggregate, Error, GroupSpec, Role},
    AdminService, SettingsService,
};
use futures::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info_span, warn, Instrument};

pub const DEFAULT_WORKERS: usize = 5;

/// Converges the directory to a list of desired groups.
#[derive(Clone)]
pub struct Reconciler {
    admin: AdminService,
    settings: SettingsService,
    workers: usize,
}

// === impl Reconciler ===

impl Reconciler {
    pub fn new(admin: AdminService, settings: SettingsService) -> Self {
        Self {
            admin,
            settings,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// Reconciles up to `workers` groups at a time and then deletes remote
    /// groups that are not in `groups`.
    ///
    /// A failure never stops the remaining work; all errors are returned
    /// together once the run completes. Groups are reconciled within the
    /// returned future, so dropping it stops all pending work.
    pub async fn reconcile_groups(&self, groups: &[GroupSpec]) -> Result<(), Aggregate> {
        let unique = dedup(groups);
        let workers = self.workers.min(unique.len()).max(1);
        debug!(groups = unique.len(), workers, "Reconciling groups");

        let mut errors = stream::iter(unique)
            .map(|group| {
                let span = info_span!("group", group = %group.email_id);
                self.reconcile_group(group).instrument(span)
            })
            .buffer_unordered(workers)
            .fold(Aggregate::new(), |mut errors, res| {
                errors.record(res);
                future::ready(errors)
            })
            .await;

        // Every group has been processed, so the desired list is final.
        errors.record(self.admin.delete_orphan_groups(groups).await);

        errors.into_result()
    }

    /// Runs every reconciliation step for a single group.
    ///
    /// Each step is attempted even if an earlier one failed.
    pub async fn reconcile_group(&self, group: &GroupSpec) -> Result<(), Aggregate> {
        let mut errors = Aggregate::new();
        if group.email_id.is_empty() {
            errors.push(Error::MissingEmailId {
                name: group.name.clone(),
            });
            return errors.into_result();
        }

        errors.record(self.admin.create_or_update_group(group).await);
        errors.record(self.settings.update_group_settings(group).await);
        for role in Role::ALL {
            errors.record(
                self.admin
                    .add_or_update_members(group, role, group.emails(role))
                    .await,
            );
        }
        if group.reconciles_members() {
            errors.record(self.admin.remove_members(group, group.all_members()).await);
        } else {
            errors.record(
                self.admin
                    .remove_owners_or_managers(group, group.owners_and_managers())
                    .await,
            );
        }

        errors.into_result()
    }
}

/// Drops every group whose address is equivalent to an earlier one, so that
/// no group is reconciled twice at the same time.
fn dedup(groups: &[GroupSpec]) -> Vec<&GroupSpec> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter(|group| {
            if group.email_id.is_empty() || seen.insert(email::canonical(&group.email_id)) {
                return true;
            }
            warn!(group = %group.email_id, "Skipping group listed more than once");
            false
        })
        .collect()
}
