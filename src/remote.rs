//! Hosted template store over a PostgREST-style REST API
//!
//! Templates live in a `chain_templates` table exposed at
//! `{endpoint}/rest/v1/chain_templates`. Error bodies from the server are
//! passed back to the caller verbatim; there is no retry.

use crate::error::TemplateError;
use crate::templates::{ChainTemplate, TemplatePatch, TemplateRow, TemplateStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const TABLE_PATH: &str = "/rest/v1/chain_templates";

#[derive(Debug, Clone)]
pub struct RemoteTemplateStore {
    base_url: String,
    client: reqwest::Client,
    api_key: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl RemoteTemplateStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            api_key: None,
            access_token: None,
        })
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Bearer token of the signed-in user, if any
    pub fn with_access_token(mut self, token: String) -> Self {
        self.access_token = Some(token);
        self
    }

    fn table_url(&self) -> String {
        format!("{}{}", self.base_url, TABLE_PATH)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.table_url());

        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let bearer = self.access_token.as_ref().or(self.api_key.as_ref());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        request
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TemplateError> {
        let response = request
            .send()
            .await
            .map_err(|e| TemplateError::Remote(e.to_string()))?;

        let status = response.status();
        debug!(status = %status, "Template store responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TemplateError::Remote(error_message(status, &body)))
    }

    async fn fetch_rows(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<ChainTemplate>, TemplateError> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| TemplateError::Remote(e.to_string()))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull the human-readable message out of an error response
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Template request failed with status {}", status)
            } else {
                body.trim().to_string()
            }
        })
}

#[async_trait]
impl TemplateStore for RemoteTemplateStore {
    async fn list(&self) -> Result<Vec<ChainTemplate>, TemplateError> {
        let request = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("order", "use_count.desc")]);
        self.fetch_rows(request).await
    }

    async fn get(&self, id: &str) -> Result<ChainTemplate, TemplateError> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("id", filter.as_str())]);
        self.fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    async fn insert(&self, row: &TemplateRow) -> Result<ChainTemplate, TemplateError> {
        let request = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(row);
        self.fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TemplateError::Remote("Insert returned no rows".to_string()))
    }

    async fn update(&self, id: &str, patch: &TemplatePatch) -> Result<(), TemplateError> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", filter.as_str())])
            .json(patch);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TemplateError> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", filter.as_str())]);
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let store = RemoteTemplateStore::new("https://db.example.com/").unwrap();
        assert_eq!(
            store.table_url(),
            "https://db.example.com/rest/v1/chain_templates"
        );
    }

    #[test]
    fn test_error_message_prefers_server_message() {
        let status = reqwest::StatusCode::FORBIDDEN;
        assert_eq!(
            error_message(status, r#"{"message": "new row violates row-level security policy"}"#),
            "new row violates row-level security policy"
        );
        assert_eq!(error_message(status, r#"{"error": "invalid token"}"#), "invalid token");
        assert_eq!(error_message(status, "plain failure "), "plain failure");
        assert_eq!(
            error_message(status, ""),
            "Template request failed with status 403 Forbidden"
        );
    }

    #[test]
    fn test_rows_decode() {
        let body = r#"[{
            "id": "8d4c", "name": "Reasoning stack", "description": null,
            "prompt_ids": [1, 4], "category": "reasoning", "is_public": true,
            "created_by": "u1", "created_at": "2026-05-01T09:00:00Z",
            "updated_at": "2026-05-02T09:00:00Z", "use_count": 12
        }]"#;
        let rows: Vec<ChainTemplate> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].prompt_ids, vec![1, 4]);
        assert_eq!(rows[0].use_count, 12);
    }
}
