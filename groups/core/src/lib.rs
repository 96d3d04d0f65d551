#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod client;
pub mod email;
mod error;
pub mod group;
pub mod settings;

pub use self::{
    client::{DirectoryClient, IsNotFound, SettingsClient},
    error::{Aggregate, Error},
    group::{GroupSpec, GroupsConfig, RemoteGroup, RemoteMember, Role},
    settings::GroupSettings,
};

/// Settings key that opts a group into full membership reconciliation.
pub const RECONCILE_MEMBERS_KEY: &str = "ReconcileMembers";

/// Options for a single reconciliation run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// When false, mutating calls are only logged.
    pub confirm: bool,
}
