use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// The desired state of the directory, as read from one or more groups files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

/// The desired state of a single group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupSpec {
    #[serde(default)]
    pub email_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Sparse overrides of the group's policy settings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// A group as reported by the directory service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A group membership as reported by the directory service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMember {
    /// Directory-assigned handle used for updates and deletes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub email: String,

    pub role: Role,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Member,
}

// === impl GroupSpec ===

impl GroupSpec {
    /// Returns true if every remote member absent from the desired lists
    /// should be removed, not only owners and managers.
    pub fn reconciles_members(&self) -> bool {
        self.settings
            .get(crate::RECONCILE_MEMBERS_KEY)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// The desired addresses for `role`.
    pub fn emails(&self, role: Role) -> &[String] {
        match role {
            Role::Owner => &self.owners,
            Role::Manager => &self.managers,
            Role::Member => &self.members,
        }
    }

    /// Owners followed by managers.
    pub fn owners_and_managers(&self) -> impl Iterator<Item = &String> {
        self.owners.iter().chain(&self.managers)
    }

    /// Owners, managers and members.
    pub fn all_members(&self) -> impl Iterator<Item = &String> {
        self.owners_and_managers().chain(&self.members)
    }
}

// === impl RemoteMember ===

impl RemoteMember {
    pub fn new(email: impl ToString, role: Role) -> Self {
        Self {
            id: String::new(),
            email: email.to_string(),
            role,
        }
    }
}

// === impl Role ===

impl Role {
    /// Roles in the order in which memberships are added.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Manager, Role::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Manager => "MANAGER",
            Self::Member => "MEMBER",
        }
    }

    /// The lowercase noun used in configuration and messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "MANAGER" => Ok(Self::Manager),
            "MEMBER" => Ok(Self::Member),
            _ => anyhow::bail!("invalid member role: {s:?}"),
        }
    }
}
