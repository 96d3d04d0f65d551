use crate::{join, Http, SETTINGS_API};
use anyhow::Result;
use groups_reconciler_core::{GroupSettings, SettingsClient};
use reqwest::{Method, Url};

/// The groups settings API.
#[derive(Clone)]
pub struct Settings {
    http: Http,
    base: Url,
}

// === impl Settings ===

impl Settings {
    pub fn new(http: Http) -> Self {
        Self {
            http,
            base: Url::parse(SETTINGS_API).expect("settings API URL must parse"),
        }
    }

    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    fn group_url(&self, group_key: &str) -> Result<Url> {
        let mut url = join(&self.base, &["groups", group_key])?;
        url.query_pairs_mut().append_pair("alt", "json");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl SettingsClient for Settings {
    async fn get(&self, group_key: &str) -> Result<GroupSettings> {
        self.http.get(self.group_url(group_key)?).await
    }

    async fn patch(&self, group_key: &str, settings: GroupSettings) -> Result<GroupSettings> {
        self.http
            .send(Method::PATCH, self.group_url(group_key)?, Some(&settings))
            .await
    }
}
