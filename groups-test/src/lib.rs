#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod fake;

pub use self::fake::{Call, FakeDirectory};

use groups_reconciler_core::{GroupSpec, RunOptions};
use groups_reconciler_reconcile::{AdminService, Reconciler, SettingsService};
use maplit::{btreemap, convert_args};
use std::sync::Arc;

/// Builds a reconciler whose clients are both backed by `directory`.
pub fn reconciler(directory: &FakeDirectory, confirm: bool) -> Reconciler {
    let options = RunOptions { confirm };
    let client = Arc::new(directory.clone());
    Reconciler::new(
        AdminService::new(client.clone(), fake::not_found(), options),
        SettingsService::new(client, fake::not_found(), options),
    )
}

pub fn group(email_id: &str) -> GroupSpec {
    GroupSpec {
        email_id: email_id.to_string(),
        ..Default::default()
    }
}

/// A group that opts into removal of unlisted members.
pub fn reconciled_group(email_id: &str) -> GroupSpec {
    GroupSpec {
        settings: convert_args!(btreemap!(
            groups_reconciler_core::RECONCILE_MEMBERS_KEY => "true",
        )),
        ..group(email_id)
    }
}

pub fn emails(emails: &[&str]) -> Vec<String> {
    emails.iter().map(|e| e.to_string()).collect()
}

pub fn init_tracing() -> tracing::subscriber::DefaultGuard {
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "groups_reconciler=trace,debug".parse().unwrap()),
            )
            .finish(),
    )
}
