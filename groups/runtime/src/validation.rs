use crate::core::{
    email, settings::CONTROL_KEYS, Aggregate, Error, GroupSettings, GroupSpec, GroupsConfig, Role,
    RECONCILE_MEMBERS_KEY,
};
use std::collections::{hash_map::Entry, HashMap, HashSet};
use tracing::warn;

pub const MAX_DESCRIPTION_LEN: usize = 300;

/// Checks the desired groups for configuration errors, reporting all of them.
///
/// Unrecognized settings keys are not errors; they are logged and ignored
/// when settings are reconciled.
pub fn validate(config: &GroupsConfig) -> Result<(), Aggregate> {
    let mut errors = Aggregate::new();
    let mut seen = HashSet::new();
    for group in &config.groups {
        if group.email_id.is_empty() {
            errors.push(Error::MissingEmailId {
                name: group.name.clone(),
            });
            continue;
        }

        if !seen.insert(email::canonical(&group.email_id)) {
            errors.push(Error::DuplicateGroup {
                group: group.email_id.clone(),
            });
        }

        validate_group(group, &mut errors);
    }
    errors.into_result()
}

fn validate_group(group: &GroupSpec, errors: &mut Aggregate) {
    let mut roles = HashMap::<String, Role>::new();
    for role in Role::ALL {
        for email in group.emails(role) {
            match roles.entry(email::canonical(email)) {
                Entry::Vacant(entry) => {
                    entry.insert(role);
                }
                Entry::Occupied(entry) if *entry.get() == role => {
                    errors.push(Error::DuplicateMember {
                        group: group.email_id.clone(),
                        role: role.noun(),
                        email: email.clone(),
                    });
                }
                Entry::Occupied(entry) => errors.push(Error::ConflictingRoles {
                    group: group.email_id.clone(),
                    email: email.clone(),
                    role: role.noun(),
                    other: entry.get().noun(),
                }),
            }
        }
    }

    let len = group.description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        errors.push(Error::DescriptionTooLong {
            group: group.email_id.clone(),
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }

    if let Some(value) = group.settings.get(RECONCILE_MEMBERS_KEY) {
        if value != "true" && value != "false" {
            errors.push(Error::InvalidBoolSetting {
                group: group.email_id.clone(),
                key: RECONCILE_MEMBERS_KEY,
                value: value.clone(),
            });
        }
    }

    for key in group.settings.keys() {
        if !GroupSettings::is_known_key(key) && !CONTROL_KEYS.contains(&key.as_str()) {
            warn!(group = %group.email_id, %key, "Unrecognized setting will be ignored");
        }
    }
}
