use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use serde_json::{json, Value};

use super::{decode_object, decode_servers, BackupRef, HttpClient, PowerSignal, ServerRef};
use crate::auth::TokenResolver;
use crate::config::{ApiKind, Config};

/// Body of a backup creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Newline separated ignore patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_locked: bool,
}

/// Application API, addressed by integer server id.
#[derive(Debug, Clone)]
pub struct ApplicationApi {
    http: HttpClient,
}

impl ApplicationApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &Config, tokens: &TokenResolver) -> Result<Self> {
        let token = tokens.token(ApiKind::Admin)?;
        let http = HttpClient::new(
            config.base_url()?,
            "/api/application",
            token,
            config.timeout(),
        )?;
        Ok(Self::new(http))
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerRef>> {
        let body = self.http.get("/servers", &[]).await?;
        Ok(decode_servers(body))
    }

    /// Map an identifier to an integer id; UUIDs are looked up in the server list.
    pub async fn resolve_id(&self, identifier: &str) -> Result<u64> {
        if let Ok(id) = identifier.parse::<u64>() {
            return Ok(id);
        }

        let servers = self
            .list_servers()
            .await
            .context("Failed to list servers to look up UUID")?;

        let server = servers
            .into_iter()
            .find(|server| server.matches_uuid(identifier))
            .ok_or_else(|| anyhow!("Server with UUID {} not found", identifier))?;

        server
            .id
            .ok_or_else(|| anyhow!("Server ID not found in response for {}", identifier))
    }

    async fn server_action(&self, identifier: &str, action: &str) -> Result<()> {
        let id = self.resolve_id(identifier).await?;
        self.http
            .post(&format!("/servers/{}/{}", id, action), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn suspend(&self, identifier: &str) -> Result<()> {
        self.server_action(identifier, "suspend").await
    }

    pub async fn unsuspend(&self, identifier: &str) -> Result<()> {
        self.server_action(identifier, "unsuspend").await
    }

    pub async fn reinstall(&self, identifier: &str) -> Result<()> {
        self.server_action(identifier, "reinstall").await
    }

    pub async fn send_power(&self, identifier: &str, signal: PowerSignal) -> Result<()> {
        let id = self.resolve_id(identifier).await?;
        self.http
            .post(&format!("/servers/{}/power", id), &json!({ "signal": signal }))
            .await?;
        Ok(())
    }

    pub async fn server_health(
        &self,
        identifier: &str,
        since: Option<DateTime<FixedOffset>>,
        window: Option<u32>,
    ) -> Result<Value> {
        let id = self.resolve_id(identifier).await?;

        let mut query = Vec::new();
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(window) = window {
            query.push(("window", window.to_string()));
        }

        let body = self
            .http
            .get(&format!("/servers/{}/health", id), &query)
            .await?;
        match decode_object(body) {
            Value::Null => Err(anyhow!("Health response for {} was empty", identifier)),
            health => Ok(health),
        }
    }

    pub async fn create_backup(&self, identifier: &str, request: &BackupRequest) -> Result<BackupRef> {
        let id = self.resolve_id(identifier).await?;
        let body = self
            .http
            .post(&format!("/servers/{}/backups", id), request)
            .await?;
        Ok(BackupRef::from_value(&decode_object(body)))
    }

    pub async fn get_backup(&self, identifier: &str, backup_uuid: &str) -> Result<Value> {
        let id = self.resolve_id(identifier).await?;
        let body = self
            .http
            .get(&format!("/servers/{}/backups/{}", id, backup_uuid), &[])
            .await?;
        match decode_object(body) {
            Value::Null => Err(anyhow!("Backup {} on {} was empty", backup_uuid, identifier)),
            backup => Ok(backup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_request_omits_unset_fields() {
        let empty = serde_json::to_value(BackupRequest::default()).unwrap();
        assert_eq!(empty, json!({}));

        let full = serde_json::to_value(BackupRequest {
            name: Some("pre-update".into()),
            ignored: Some("*.log\ncache/".into()),
            is_locked: true,
        })
        .unwrap();
        assert_eq!(
            full,
            json!({"name": "pre-update", "ignored": "*.log\ncache/", "is_locked": true})
        );
    }
}
