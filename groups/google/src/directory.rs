use crate::{join, Http, DEFAULT_CUSTOMER, DIRECTORY_API};
use anyhow::{Context, Result};
use groups_reconciler_core::{DirectoryClient, RemoteGroup, RemoteMember};
use reqwest::{Method, Url};
use serde::Deserialize;

/// The Admin SDK directory API.
#[derive(Clone)]
pub struct Directory {
    http: Http,
    base: Url,
    customer: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    groups: Vec<RemoteGroup>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<RemoteMember>,
    next_page_token: Option<String>,
}

// === impl Directory ===

impl Directory {
    pub fn new(http: Http) -> Self {
        Self {
            http,
            base: Url::parse(DIRECTORY_API).expect("directory API URL must parse"),
            customer: DEFAULT_CUSTOMER.to_string(),
        }
    }

    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    pub fn with_customer(mut self, customer: impl ToString) -> Self {
        self.customer = customer.to_string();
        self
    }

    fn groups_url(&self) -> Result<Url> {
        join(&self.base, &["groups"])
    }

    fn group_url(&self, group_key: &str) -> Result<Url> {
        join(&self.base, &["groups", group_key])
    }

    fn members_url(&self, group_key: &str) -> Result<Url> {
        join(&self.base, &["groups", group_key, "members"])
    }

    fn member_url(&self, group_key: &str, member_key: &str) -> Result<Url> {
        join(&self.base, &["groups", group_key, "members", member_key])
    }
}

#[async_trait::async_trait]
impl DirectoryClient for Directory {
    async fn get_group(&self, group_key: &str) -> Result<RemoteGroup> {
        self.http.get(self.group_url(group_key)?).await
    }

    async fn list_groups(&self) -> Result<Vec<RemoteGroup>> {
        let mut groups = Vec::new();
        let mut page_token = None::<String>;
        loop {
            let mut url = self.groups_url()?;
            url.query_pairs_mut()
                .append_pair("customer", &self.customer)
                .append_pair("orderBy", "email");
            if let Some(token) = page_token.as_deref() {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page = self
                .http
                .get::<GroupsPage>(url)
                .await
                .context("unable to list groups")?;
            groups.extend(page.groups);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(groups),
            }
        }
    }

    async fn insert_group(&self, group: RemoteGroup) -> Result<RemoteGroup> {
        self.http
            .send(Method::POST, self.groups_url()?, Some(&group))
            .await
    }

    async fn update_group(&self, group_key: &str, group: RemoteGroup) -> Result<RemoteGroup> {
        self.http
            .send(Method::PUT, self.group_url(group_key)?, Some(&group))
            .await
    }

    async fn delete_group(&self, group_key: &str) -> Result<()> {
        self.http.delete(self.group_url(group_key)?).await
    }

    async fn list_members(&self, group_key: &str) -> Result<Vec<RemoteMember>> {
        let mut members = Vec::new();
        let mut page_token = None::<String>;
        loop {
            let mut url = self.members_url(group_key)?;
            if let Some(token) = page_token.as_deref() {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page = self.http.get::<MembersPage>(url).await?;
            members.extend(page.members);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(members),
            }
        }
    }

    async fn insert_member(&self, group_key: &str, member: RemoteMember) -> Result<RemoteMember> {
        self.http
            .send(Method::POST, self.members_url(group_key)?, Some(&member))
            .await
    }

    async fn update_member(
        &self,
        group_key: &str,
        member_id: &str,
        member: RemoteMember,
    ) -> Result<RemoteMember> {
        self.http
            .send(
                Method::PUT,
                self.member_url(group_key, member_id)?,
                Some(&member),
            )
            .await
    }

    async fn delete_member(&self, group_key: &str, member_id: &str) -> Result<()> {
        self.http
            .delete(self.member_url(group_key, member_id)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groups_reconciler_core::Role;

    #[test]
    fn member_urls_use_the_member_id() {
        let directory = Directory::new(Http::new("token").unwrap());
        assert_eq!(
            directory.member_url("g@x.com", "1234").unwrap().as_str(),
            "https://admin.googleapis.com/admin/directory/v1/groups/g@x.com/members/1234"
        );
    }

    #[test]
    fn decodes_member_pages() {
        let page = serde_json::from_str::<MembersPage>(
            r#"{
                "kind": "admin#directory#members",
                "members": [
                    {"kind": "admin#directory#member", "id": "1", "email": "a@x.com", "role": "OWNER", "type": "USER"},
                    {"id": "2", "email": "b@x.com", "role": "MEMBER", "status": "ACTIVE"}
                ],
                "nextPageToken": "next"
            }"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        assert_eq!(
            page.members,
            vec![
                RemoteMember {
                    id: "1".to_string(),
                    email: "a@x.com".to_string(),
                    role: Role::Owner,
                },
                RemoteMember {
                    id: "2".to_string(),
                    email: "b@x.com".to_string(),
                    role: Role::Member,
                },
            ]
        );
    }

    #[test]
    fn empty_group_pages_decode() {
        let page = serde_json::from_str::<GroupsPage>(r#"{"kind": "admin#directory#groups"}"#)
            .unwrap();
        assert!(page.groups.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
