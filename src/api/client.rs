use anyhow::{anyhow, Context, Result};
use serde_json::json;

use super::{decode_object, decode_servers, BackupRef, HttpClient, PowerSignal, ServerRef};
use crate::auth::TokenResolver;
use crate::config::{ApiKind, Config};

/// Client API, addressed by server UUID.
#[derive(Debug, Clone)]
pub struct ClientApi {
    http: HttpClient,
}

impl ClientApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &Config, tokens: &TokenResolver) -> Result<Self> {
        let token = tokens.token(ApiKind::Client)?;
        let http = HttpClient::new(config.base_url()?, "/api/client", token, config.timeout())?;
        Ok(Self::new(http))
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerRef>> {
        let body = self.http.get("", &[]).await?;
        Ok(decode_servers(body))
    }

    /// Map an identifier to a UUID; numeric identifiers are looked up by id.
    pub async fn resolve_uuid(&self, identifier: &str) -> Result<String> {
        if identifier.contains('-') || identifier.parse::<u64>().is_err() {
            return Ok(identifier.to_string());
        }
        let wanted: u64 = identifier.parse()?;

        let servers = self
            .list_servers()
            .await
            .context("Failed to list servers to look up UUID")?;

        servers
            .into_iter()
            .find(|server| server.id == Some(wanted))
            .and_then(|server| server.uuid)
            .ok_or_else(|| anyhow!("Server with ID {} not found", identifier))
    }

    pub async fn send_power(&self, identifier: &str, signal: PowerSignal) -> Result<()> {
        let uuid = self.resolve_uuid(identifier).await?;
        self.http
            .post(&format!("/servers/{}/power", uuid), &json!({ "signal": signal }))
            .await?;
        Ok(())
    }

    pub async fn send_command(&self, identifier: &str, command: &str) -> Result<()> {
        let uuid = self.resolve_uuid(identifier).await?;
        self.http
            .post(
                &format!("/servers/{}/command", uuid),
                &json!({ "command": command }),
            )
            .await?;
        Ok(())
    }

    pub async fn create_backup(&self, identifier: &str) -> Result<BackupRef> {
        let uuid = self.resolve_uuid(identifier).await?;
        let body = self
            .http
            .post(&format!("/servers/{}/backups", uuid), &json!({}))
            .await?;
        Ok(BackupRef::from_value(&decode_object(body)))
    }
}
