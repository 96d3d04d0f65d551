use crate::core::GroupsConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The file name searched for when `groups-path` is a directory.
pub const GROUPS_FILE_NAME: &str = "groups.yaml";

/// Runtime configuration, read from `config.yaml`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// A groups file, or a directory containing `groups.yaml` files.
    #[serde(default = "default_groups_path")]
    pub groups_path: PathBuf,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// The directory customer whose groups are listed.
    #[serde(default = "default_customer")]
    pub customer: String,

    /// A file containing the bearer token used for API requests.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_groups_path() -> PathBuf {
    PathBuf::from(GROUPS_FILE_NAME)
}

fn default_worker_count() -> usize {
    crate::reconcile::DEFAULT_WORKERS
}

fn default_customer() -> String {
    crate::google::DEFAULT_CUSTOMER.to_string()
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            groups_path: default_groups_path(),
            worker_count: default_worker_count(),
            customer: default_customer(),
            token_file: None,
        }
    }
}

impl Config {
    /// Reads the configuration at `path`. Relative paths in the file are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("error reading config from {}", path.display()))?;
        let config = serde_yaml::from_str::<Self>(&content)
            .with_context(|| format!("error parsing config {}", path.display()))?;
        Ok(config.resolve(path.parent().unwrap_or_else(|| Path::new(""))))
    }

    fn resolve(mut self, base: &Path) -> Self {
        self.groups_path = base.join(&self.groups_path);
        self.token_file = self.token_file.map(|p| base.join(p));
        self
    }

    /// Reads the bearer token from `token-file`.
    pub fn read_token(&self) -> Result<Option<String>> {
        let Some(path) = self.token_file.as_deref() else {
            return Ok(None);
        };
        let token = std::fs::read_to_string(path)
            .with_context(|| format!("error reading token from {}", path.display()))?;
        Ok(Some(token.trim().to_string()))
    }
}

/// Loads the desired groups from `path`.
///
/// If `path` is a directory, every `groups.yaml` beneath it is read and the
/// groups are concatenated in path order.
pub fn load_groups(path: &Path) -> Result<GroupsConfig> {
    if !path.is_dir() {
        return read_groups(path);
    }

    let mut files = Vec::new();
    find_groups_files(path, &mut files)?;
    files.sort();

    let mut config = GroupsConfig::default();
    for file in files {
        let GroupsConfig { groups } = read_groups(&file)?;
        debug!(file = %file.display(), groups = groups.len(), "Loaded groups");
        config.groups.extend(groups);
    }
    Ok(config)
}

fn read_groups(path: &Path) -> Result<GroupsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("error reading groups config from {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("error parsing groups config {}", path.display()))
}

fn find_groups_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("error listing {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("error listing {}", dir.display()))?
            .path();
        if path.is_dir() {
            find_groups_files(&path, files)?;
        } else if path.file_name().is_some_and(|n| n == GROUPS_FILE_NAME) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn resolves_paths_against_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(
            &path,
            "groups-path: groups\ntoken-file: /secrets/token\nworker-count: 2\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config,
            Config {
                groups_path: dir.path().join("groups"),
                worker_count: 2,
                customer: "my_customer".to_string(),
                token_file: Some(PathBuf::from("/secrets/token")),
            }
        );
    }

    #[test]
    fn missing_keys_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write(&path, "customer: C0123\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.groups_path, dir.path().join("groups.yaml"));
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.customer, "C0123");
        assert_eq!(config.read_token().unwrap(), None);
    }

    #[test]
    fn reads_trimmed_token() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("token"), "ya29.token\n");
        write(&dir.path().join("config.yaml"), "token-file: token\n");

        let config = Config::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.read_token().unwrap().as_deref(), Some("ya29.token"));
    }

    #[test]
    fn merges_groups_files_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("b/groups.yaml"),
            "groups:\n  - email-id: b@x.com\n",
        );
        write(
            &dir.path().join("a/nested/groups.yaml"),
            "groups:\n  - email-id: a1@x.com\n  - email-id: a2@x.com\n",
        );
        write(&dir.path().join("a/other.yaml"), "not: groups\n");

        let config = load_groups(dir.path()).unwrap();
        assert_eq!(
            config
                .groups
                .iter()
                .map(|g| g.email_id.as_str())
                .collect::<Vec<_>>(),
            vec!["a1@x.com", "a2@x.com", "b@x.com"]
        );
    }

    #[test]
    fn loads_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mygroups.yaml");
        write(
            &path,
            r#"
groups:
  - email-id: g@x.com
    name: g
    settings:
      ReconcileMembers: "true"
    owners:
      - o@x.com
"#,
        );

        let config = load_groups(&path).unwrap();
        assert_eq!(config.groups.len(), 1);
        assert!(config.groups[0].reconciles_members());
        assert_eq!(config.groups[0].owners, vec!["o@x.com".to_string()]);
    }

    #[test]
    fn missing_groups_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_groups(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(error.to_string().starts_with("error reading groups config"));
    }
}
