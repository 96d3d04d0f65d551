use crate::{GroupSettings, RemoteGroup, RemoteMember};
use anyhow::Result;
use std::sync::Arc;

/// Classifies a client error as "the group or member does not exist".
///
/// Injected into the services at construction so that tests can substitute
/// an in-memory client with its own error type.
pub type IsNotFound = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Group and membership CRUD against a directory service.
///
/// Groups are addressed by their e-mail address; members by the
/// directory-assigned member id.
#[async_trait::async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn get_group(&self, group_key: &str) -> Result<RemoteGroup>;

    async fn list_groups(&self) -> Result<Vec<RemoteGroup>>;

    async fn insert_group(&self, group: RemoteGroup) -> Result<RemoteGroup>;

    async fn update_group(&self, group_key: &str, group: RemoteGroup) -> Result<RemoteGroup>;

    async fn delete_group(&self, group_key: &str) -> Result<()>;

    async fn list_members(&self, group_key: &str) -> Result<Vec<RemoteMember>>;

    async fn insert_member(&self, group_key: &str, member: RemoteMember) -> Result<RemoteMember>;

    async fn update_member(
        &self,
        group_key: &str,
        member_id: &str,
        member: RemoteMember,
    ) -> Result<RemoteMember>;

    async fn delete_member(&self, group_key: &str, member_id: &str) -> Result<()>;
}

/// Reads and patches a group's policy settings.
#[async_trait::async_trait]
pub trait SettingsClient: Send + Sync {
    async fn get(&self, group_key: &str) -> Result<GroupSettings>;

    async fn patch(&self, group_key: &str, settings: GroupSettings) -> Result<GroupSettings>;
}
