//! An in-memory directory service.

use anyhow::{anyhow, Result};
use groups_reconciler_core::{
    DirectoryClient, GroupSettings, IsNotFound, RemoteGroup, RemoteMember, Role, SettingsClient,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use thiserror::Error;

/// Implements both [`DirectoryClient`] and [`SettingsClient`] over shared
/// state, recording every mutating call.
///
/// Clones share state, so a test can keep a handle to inspect the directory
/// after handing a clone to the services under test.
#[derive(Clone, Debug, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<State>>,
}

/// A mutating call made against a [`FakeDirectory`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    InsertGroup(RemoteGroup),
    UpdateGroup(String, RemoteGroup),
    DeleteGroup(String),
    InsertMember(String, RemoteMember),
    UpdateMember(String, String, RemoteMember),
    DeleteMember(String, String),
    PatchSettings(String, GroupSettings),
}

#[derive(Debug, Error)]
#[error("{kind} {key:?} not found")]
pub struct NotFound {
    kind: &'static str,
    key: String,
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, Group>,
    calls: Vec<Call>,
    failing: Vec<String>,
    failing_groups: Vec<String>,
    failing_list: bool,
    get_group_delay: Option<Duration>,
    next_id: u64,
}

#[derive(Debug)]
struct Group {
    group: RemoteGroup,
    members: Vec<RemoteMember>,
    settings: GroupSettings,
}

/// Recognizes the errors returned for missing groups and members.
pub fn not_found() -> IsNotFound {
    Arc::new(|error: &anyhow::Error| error.chain().any(|e| e.is::<NotFound>()))
}

fn key(group_key: &str) -> String {
    group_key.to_lowercase()
}

fn group_not_found(group_key: &str) -> anyhow::Error {
    NotFound {
        kind: "group",
        key: group_key.to_string(),
    }
    .into()
}

// === impl FakeDirectory ===

impl FakeDirectory {
    /// Adds a group with empty settings.
    pub fn with_group(self, email: &str, name: &str, description: &str) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.next_id();
            state.groups.insert(
                key(email),
                Group {
                    group: RemoteGroup {
                        id,
                        email: email.to_string(),
                        name: name.to_string(),
                        description: description.to_string(),
                    },
                    members: Vec::new(),
                    settings: GroupSettings::default(),
                },
            );
        }
        self
    }

    /// Adds a member to an existing group.
    ///
    /// # Panics
    ///
    /// If the group does not exist.
    pub fn with_member(self, group_key: &str, email: &str, role: Role) -> Self {
        {
            let mut state = self.state.lock();
            let id = state.next_id();
            let group = state
                .groups
                .get_mut(&key(group_key))
                .unwrap_or_else(|| panic!("no group {group_key}"));
            group.members.push(RemoteMember {
                id,
                email: email.to_string(),
                role,
            });
        }
        self
    }

    /// Replaces the settings of an existing group.
    ///
    /// # Panics
    ///
    /// If the group does not exist.
    pub fn with_settings(self, group_key: &str, settings: GroupSettings) -> Self {
        self.state
            .lock()
            .groups
            .get_mut(&key(group_key))
            .unwrap_or_else(|| panic!("no group {group_key}"))
            .settings = settings;
        self
    }

    /// Causes every member mutation for `email` to fail.
    pub fn with_failing_member(self, email: &str) -> Self {
        self.state.lock().failing.push(email.to_lowercase());
        self
    }

    /// Causes group and settings lookups for `group_key` to fail with an
    /// error other than [`NotFound`].
    pub fn with_failing_group(self, group_key: &str) -> Self {
        self.state.lock().failing_groups.push(key(group_key));
        self
    }

    /// Causes listing groups to fail.
    pub fn with_failing_list(self) -> Self {
        self.state.lock().failing_list = true;
        self
    }

    /// Delays every group lookup by `delay`.
    pub fn with_get_group_delay(self, delay: Duration) -> Self {
        self.state.lock().get_group_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Returns the recorded calls and forgets them.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.lock().calls)
    }

    pub fn group(&self, group_key: &str) -> Option<RemoteGroup> {
        let state = self.state.lock();
        state.groups.get(&key(group_key)).map(|g| g.group.clone())
    }

    /// The e-mail addresses of every group, in order.
    pub fn group_emails(&self) -> Vec<String> {
        let state = self.state.lock();
        state.groups.values().map(|g| g.group.email.clone()).collect()
    }

    /// The group's members as `(email, role)` pairs, sorted by address.
    pub fn members(&self, group_key: &str) -> Vec<(String, Role)> {
        let state = self.state.lock();
        let mut members = state
            .groups
            .get(&key(group_key))
            .map(|g| {
                g.members
                    .iter()
                    .map(|m| (m.email.clone(), m.role))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn settings(&self, group_key: &str) -> Option<GroupSettings> {
        let state = self.state.lock();
        state.groups.get(&key(group_key)).map(|g| g.settings.clone())
    }
}

#[async_trait::async_trait]
impl DirectoryClient for FakeDirectory {
    async fn get_group(&self, group_key: &str) -> Result<RemoteGroup> {
        let delay = self.state.lock().get_group_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state.lock().check_failing_group(group_key)?;
        self.group(group_key)
            .ok_or_else(|| group_not_found(group_key))
    }

    async fn list_groups(&self) -> Result<Vec<RemoteGroup>> {
        let state = self.state.lock();
        if state.failing_list {
            return Err(anyhow!("injected failure listing groups"));
        }
        let mut groups = state
            .groups
            .values()
            .map(|g| g.group.clone())
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(groups)
    }

    async fn insert_group(&self, group: RemoteGroup) -> Result<RemoteGroup> {
        let mut state = self.state.lock();
        if state.groups.contains_key(&key(&group.email)) {
            return Err(anyhow!("group {:?} already exists", group.email));
        }
        state.calls.push(Call::InsertGroup(group.clone()));

        let created = RemoteGroup {
            id: state.next_id(),
            ..group
        };
        state.groups.insert(
            key(&created.email),
            Group {
                group: created.clone(),
                members: Vec::new(),
                settings: GroupSettings::default(),
            },
        );
        Ok(created)
    }

    async fn update_group(&self, group_key: &str, group: RemoteGroup) -> Result<RemoteGroup> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::UpdateGroup(group_key.to_string(), group.clone()));
        let current = &mut state
            .groups
            .get_mut(&key(group_key))
            .ok_or_else(|| group_not_found(group_key))?
            .group;
        if !group.name.is_empty() {
            current.name = group.name;
        }
        if !group.description.is_empty() {
            current.description = group.description;
        }
        Ok(current.clone())
    }

    async fn delete_group(&self, group_key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeleteGroup(group_key.to_string()));
        state
            .groups
            .remove(&key(group_key))
            .map(|_| ())
            .ok_or_else(|| group_not_found(group_key))
    }

    async fn list_members(&self, group_key: &str) -> Result<Vec<RemoteMember>> {
        let state = self.state.lock();
        state
            .groups
            .get(&key(group_key))
            .map(|g| g.members.clone())
            .ok_or_else(|| group_not_found(group_key))
    }

    async fn insert_member(&self, group_key: &str, member: RemoteMember) -> Result<RemoteMember> {
        let mut state = self.state.lock();
        state.check_failing(&member.email)?;
        state
            .calls
            .push(Call::InsertMember(group_key.to_string(), member.clone()));

        let id = state.next_id();
        let group = state
            .groups
            .get_mut(&key(group_key))
            .ok_or_else(|| group_not_found(group_key))?;
        if group.members.iter().any(|m| m.email == member.email) {
            return Err(anyhow!("member {:?} already exists", member.email));
        }
        let created = RemoteMember { id, ..member };
        group.members.push(created.clone());
        Ok(created)
    }

    async fn update_member(
        &self,
        group_key: &str,
        member_id: &str,
        member: RemoteMember,
    ) -> Result<RemoteMember> {
        let mut state = self.state.lock();
        state.check_failing(&member.email)?;
        state.calls.push(Call::UpdateMember(
            group_key.to_string(),
            member_id.to_string(),
            member.clone(),
        ));

        let current = state.member_mut(group_key, member_id)?;
        current.role = member.role;
        Ok(current.clone())
    }

    async fn delete_member(&self, group_key: &str, member_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let email = state.member_mut(group_key, member_id)?.email.clone();
        state.check_failing(&email)?;
        state.calls.push(Call::DeleteMember(
            group_key.to_string(),
            member_id.to_string(),
        ));

        let group = state
            .groups
            .get_mut(&key(group_key))
            .ok_or_else(|| group_not_found(group_key))?;
        group.members.retain(|m| m.id != member_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SettingsClient for FakeDirectory {
    async fn get(&self, group_key: &str) -> Result<GroupSettings> {
        self.state.lock().check_failing_group(group_key)?;
        self.settings(group_key)
            .ok_or_else(|| group_not_found(group_key))
    }

    async fn patch(&self, group_key: &str, settings: GroupSettings) -> Result<GroupSettings> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::PatchSettings(group_key.to_string(), settings.clone()));
        let group = state
            .groups
            .get_mut(&key(group_key))
            .ok_or_else(|| group_not_found(group_key))?;
        group.settings = settings;
        Ok(group.settings.clone())
    }
}

// === impl State ===

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn check_failing(&self, email: &str) -> Result<()> {
        if self.failing.contains(&email.to_lowercase()) {
            return Err(anyhow!("injected failure for {email}"));
        }
        Ok(())
    }

    fn check_failing_group(&self, group_key: &str) -> Result<()> {
        if self.failing_groups.contains(&key(group_key)) {
            return Err(anyhow!("injected failure for {group_key}"));
        }
        Ok(())
    }

    fn member_mut(&mut self, group_key: &str, member_id: &str) -> Result<&mut RemoteMember> {
        self.groups
            .get_mut(&key(group_key))
            .ok_or_else(|| group_not_found(group_key))?
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| {
                NotFound {
                    kind: "member",
                    key: member_id.to_string(),
                }
                .into()
            })
    }
}
