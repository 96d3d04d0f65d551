#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Google Workspace implementations of the directory and group settings
//! clients.
//!
//! Requests are authorized with a bearer token supplied by the caller.

mod directory;
mod settings;

pub use self::{directory::Directory, settings::Settings};

use anyhow::{Context, Result};
use groups_reconciler_core::IsNotFound;
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::trace;

pub const DIRECTORY_API: &str = "https://admin.googleapis.com/admin/directory/v1/";
pub const SETTINGS_API: &str = "https://www.googleapis.com/groups/v1/";
pub const DEFAULT_CUSTOMER: &str = "my_customer";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An error response from a Google API.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{method} {url}: {status}: {message}")]
pub struct ApiError {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// An authorized HTTP client shared by the API clients.
#[derive(Clone)]
pub struct Http {
    client: reqwest::Client,
    token: Arc<str>,
}

/// Returns true if the error was caused by an HTTP 404 response.
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|e| e.downcast_ref::<ApiError>())
        .any(|e| e.status == StatusCode::NOT_FOUND.as_u16())
}

/// The not-found classifier for the clients in this crate.
pub fn not_found() -> IsNotFound {
    Arc::new(is_not_found)
}

// === impl Http ===

impl Http {
    pub fn new(token: impl Into<Arc<str>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(Method::GET, url, None::<&()>).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let rsp = self.request(method.clone(), url.clone(), body).await?;
        rsp.json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {method} {url}"))
    }

    async fn delete(&self, url: Url) -> Result<()> {
        self.request(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    async fn request<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        trace!(%method, %url, "Sending request");
        let mut req = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let rsp = req
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;
        let status = rsp.status();
        if status.is_success() {
            return Ok(rsp);
        }

        let text = rsp.text().await.unwrap_or_default();
        Err(api_error(&method, &url, status, &text).into())
    }
}

fn api_error(method: &Method, url: &Url, status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|rsp| rsp.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    ApiError {
        method: method.to_string(),
        url: url.to_string(),
        status: status.as_u16(),
        message,
    }
}

/// Appends path segments to `base`, percent-encoding each one.
fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("{base} cannot be a base URL"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
