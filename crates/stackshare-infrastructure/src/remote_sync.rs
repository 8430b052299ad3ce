//! HttpStackSyncService - mirrors saved stacks to a remote stacks API.
//!
//! Endpoints, relative to the configured base URL:
//! - `PUT  /stacks/{id}` with the stack body (upsert)
//! - `PATCH /stacks/{id}` with `{ "isPublic": bool }`
//!
//! A session exists iff a bearer token is available. Without one every call
//! is skipped.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use stackshare_core::config::SyncConfig;
use stackshare_core::error::{Result, StackError};
use stackshare_core::stack::{SavedStack, StackItem};
use stackshare_core::sync::StackSyncService;

/// Sync service that talks to the remote stacks API over HTTP.
#[derive(Clone)]
pub struct HttpStackSyncService {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MirrorStackRequest<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    items: &'a [StackItem],
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetVisibilityRequest {
    is_public: bool,
}

impl HttpStackSyncService {
    /// Creates a service with explicit configuration.
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout,
        }
    }

    /// Builds the service from `[sync]` settings, reading the token from the
    /// configured environment variable.
    ///
    /// Returns `None` if sync is disabled or no endpoint is configured.
    pub fn from_config(config: &SyncConfig) -> Option<Self> {
        if !config.enabled {
            tracing::debug!(target: "stack_sync", "Sync disabled in config");
            return None;
        }
        let Some(endpoint) = config.endpoint.as_deref() else {
            tracing::warn!(target: "stack_sync", "Sync enabled but no endpoint configured");
            return None;
        };

        let token = env::var(&config.api_key_env).ok();
        tracing::info!(
            target: "stack_sync",
            "Initialized with endpoint: {}, token: {}",
            endpoint,
            if token.is_some() { "present" } else { "none" }
        );

        Some(Self::new(
            endpoint,
            token,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn stack_url(&self, stack_id: &str) -> String {
        format!("{}/stacks/{}", self.endpoint, stack_id)
    }

    /// Adds the bearer token, if any.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token)
        } else {
            request
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let response = self
            .auth_request(request.timeout(self.timeout))
            .send()
            .await
            .map_err(|e| StackError::sync(format!("Failed to {}: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StackError::sync(format!(
            "Failed to {} ({}): {}",
            what, status, error_text
        )))
    }
}

#[async_trait]
impl StackSyncService for HttpStackSyncService {
    async fn has_session(&self) -> bool {
        self.token.is_some()
    }

    async fn mirror_stack(&self, stack: &SavedStack) -> Result<()> {
        let body = MirrorStackRequest {
            id: &stack.id,
            name: &stack.name,
            description: stack.description.as_deref(),
            items: &stack.items,
            updated_at: stack.updated_at,
        };
        let request = self.client.put(self.stack_url(&stack.id)).json(&body);
        self.send(request, "mirror stack").await?;
        tracing::debug!(target: "stack_sync", "Mirrored stack {}", stack.id);
        Ok(())
    }

    async fn set_public(&self, stack_id: &str, public: bool) -> Result<()> {
        let request = self
            .client
            .patch(self.stack_url(stack_id))
            .json(&SetVisibilityRequest { is_public: public });
        self.send(request, "set stack visibility").await?;
        tracing::debug!(target: "stack_sync", "Set stack {} public={}", stack_id, public);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_enabled_and_endpoint() {
        assert!(HttpStackSyncService::from_config(&SyncConfig::default()).is_none());

        let enabled_without_endpoint = SyncConfig {
            enabled: true,
            ..SyncConfig::default()
        };
        assert!(HttpStackSyncService::from_config(&enabled_without_endpoint).is_none());

        let configured = SyncConfig {
            enabled: true,
            endpoint: Some("https://api.example.test/".to_string()),
            api_key_env: "STACKSHARE_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..SyncConfig::default()
        };
        let service = HttpStackSyncService::from_config(&configured).unwrap();
        assert_eq!(service.stack_url("s1"), "https://api.example.test/stacks/s1");
    }

    #[tokio::test]
    async fn test_session_follows_token() {
        let timeout = Duration::from_secs(1);
        let without = HttpStackSyncService::new("https://api.example.test", None, timeout);
        assert!(!without.has_session().await);

        let blank = HttpStackSyncService::new("https://api.example.test", Some("  ".into()), timeout);
        assert!(!blank.has_session().await);

        let with = HttpStackSyncService::new("https://api.example.test", Some("t0k".into()), timeout);
        assert!(with.has_session().await);
    }

    #[test]
    fn test_mirror_body_shape() {
        let now = Utc::now();
        let stack = SavedStack {
            id: "s1".to_string(),
            name: "Docs".to_string(),
            description: None,
            items: vec![StackItem::new(
                stackshare_core::stack::ItemType::Skill,
                "pdf",
                "PDF",
            )],
            created_at: now,
            updated_at: now,
        };
        let body = MirrorStackRequest {
            id: &stack.id,
            name: &stack.name,
            description: stack.description.as_deref(),
            items: &stack.items,
            updated_at: stack.updated_at,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["id"], "s1");
        assert_eq!(value["items"][0]["slug"], "pdf");
        assert!(value.get("description").is_none());
        assert!(value.get("updatedAt").is_some());
    }
}
