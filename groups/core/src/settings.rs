use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A snapshot of a group's policy settings.
///
/// Only the fields managed by the reconciler are typed; every other field
/// reported by the settings service is kept in `other` and written back
/// unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_external_members: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_web_posting: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_join: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_view_membership: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_view_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_discover_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_moderate_members: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_moderate_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_can_post_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_moderation_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_post_as_the_group: Option<String>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// The values applied to every group unless overridden.
pub const DEFAULTS: [(&str, &str); 10] = [
    ("AllowExternalMembers", "true"),
    ("WhoCanJoin", "INVITED_CAN_JOIN"),
    ("WhoCanViewMembership", "ALL_MANAGERS_CAN_VIEW"),
    ("WhoCanViewGroup", "ALL_MEMBERS_CAN_VIEW"),
    ("WhoCanDiscoverGroup", "ALL_IN_DOMAIN_CAN_DISCOVER"),
    ("WhoCanModerateMembers", "OWNERS_AND_MANAGERS"),
    ("WhoCanModerateContent", "OWNERS_AND_MANAGERS"),
    ("WhoCanPostMessage", "ALL_MEMBERS_CAN_POST"),
    ("MessageModerationLevel", "MODERATE_NONE"),
    ("MembersCanPostAsTheGroup", "false"),
];

/// Settings keys that are accepted in a group's `settings` but are not
/// policy fields.
pub const CONTROL_KEYS: [&str; 1] = [crate::RECONCILE_MEMBERS_KEY];

// === impl GroupSettings ===

impl GroupSettings {
    /// The default settings table.
    pub fn defaults() -> Self {
        let mut settings = Self::default();
        settings.apply_defaults();
        settings
    }

    /// Computes the settings a group should have, starting from its current
    /// settings, resetting the managed fields to their defaults and then
    /// applying the group's overrides.
    ///
    /// Returns the wanted settings along with the override keys that were
    /// not recognized.
    pub fn desired<'a>(
        &self,
        overrides: &'a BTreeMap<String, String>,
    ) -> (Self, Vec<&'a str>) {
        let mut wanted = self.clone();
        wanted.apply_defaults();

        let mut unknown = Vec::new();
        for (key, value) in overrides {
            if !wanted.set(key, value.clone()) && !CONTROL_KEYS.contains(&key.as_str()) {
                unknown.push(key.as_str());
            }
        }
        (wanted, unknown)
    }

    /// Returns true if `key` names a managed settings field.
    pub fn is_known_key(key: &str) -> bool {
        Self::default().field_mut(key).is_some()
    }

    /// Sets the managed field named `key`. Returns false if there is no such
    /// field.
    pub fn set(&mut self, key: &str, value: String) -> bool {
        match self.field_mut(key) {
            Some(field) => {
                *field = Some(value);
                true
            }
            None => false,
        }
    }

    /// The managed fields as `(key, value)` pairs, skipping unset fields.
    pub fn managed(&self) -> BTreeMap<&'static str, &str> {
        let fields: [(&'static str, &Option<String>); 11] = [
            ("AllowExternalMembers", &self.allow_external_members),
            ("AllowWebPosting", &self.allow_web_posting),
            ("WhoCanJoin", &self.who_can_join),
            ("WhoCanViewMembership", &self.who_can_view_membership),
            ("WhoCanViewGroup", &self.who_can_view_group),
            ("WhoCanDiscoverGroup", &self.who_can_discover_group),
            ("WhoCanModerateMembers", &self.who_can_moderate_members),
            ("WhoCanModerateContent", &self.who_can_moderate_content),
            ("WhoCanPostMessage", &self.who_can_post_message),
            ("MessageModerationLevel", &self.message_moderation_level),
            ("MembersCanPostAsTheGroup", &self.members_can_post_as_the_group),
        ];
        fields
            .into_iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
            .collect()
    }

    fn apply_defaults(&mut self) {
        for (key, value) in DEFAULTS {
            let known = self.set(key, value.to_string());
            debug_assert!(known, "default for unknown setting {key}");
        }
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        let field = match key {
            "AllowExternalMembers" => &mut self.allow_external_members,
            "AllowWebPosting" => &mut self.allow_web_posting,
            "WhoCanJoin" => &mut self.who_can_join,
            "WhoCanViewMembership" => &mut self.who_can_view_membership,
            "WhoCanViewGroup" => &mut self.who_can_view_group,
            "WhoCanDiscoverGroup" => &mut self.who_can_discover_group,
            "WhoCanModerateMembers" => &mut self.who_can_moderate_members,
            "WhoCanModerateContent" => &mut self.who_can_moderate_content,
            "WhoCanPostMessage" => &mut self.who_can_post_message,
            "MessageModerationLevel" => &mut self.message_moderation_level,
            "MembersCanPostAsTheGroup" => &mut self.members_can_post_as_the_group,
            _ => return None,
        };
        Some(field)
    }
}
