/// Pelican panel API clients.

/// Application (administrative) API.
pub mod application;

/// Client (end-user) API.
pub mod client;

/// API error type and user-facing descriptions.
pub mod error;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::Value;

pub use application::{ApplicationApi, BackupRequest};
pub use client::ClientApi;
pub use error::{describe_error, ApiError};

/// Power signals understood by both APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PowerSignal {
    Start,
    Stop,
    Restart,
    Kill,
}

impl PowerSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerSignal::Start => "start",
            PowerSignal::Stop => "stop",
            PowerSignal::Restart => "restart",
            PowerSignal::Kill => "kill",
        }
    }
}

impl std::fmt::Display for PowerSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thin JSON-over-HTTP wrapper shared by both API clients.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl HttpClient {
    pub fn new(base_url: &str, prefix: &str, token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pelicanctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base: format!("{}{}", base_url.trim().trim_end_matches('/'), prefix),
            token,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let request = self.http.get(self.url(path)).query(query);
        self.send(request).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .context("Request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response")?;

        if !status.is_success() {
            return Err(ApiError::from_response(status, &body).into());
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("Failed to decode response")
    }
}

/// Strip a `{"data": ...}` style wrapper.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut obj) => {
            for key in ["data", "servers", "backups"] {
                if let Some(inner) = obj.remove(key) {
                    return inner;
                }
            }
            Value::Object(obj)
        }
        other => other,
    }
}

/// Merge `{"object": .., "attributes": {..}}` into one flat object.
pub fn flatten_attributes(value: Value) -> Value {
    let mut obj = match value {
        Value::Object(obj) => obj,
        other => return other,
    };

    match obj.remove("attributes") {
        Some(Value::Object(attributes)) => {
            obj.extend(attributes);
            Value::Object(obj)
        }
        Some(other) => {
            obj.insert("attributes".to_string(), other);
            Value::Object(obj)
        }
        None => Value::Object(obj),
    }
}

/// Decode a list response into flat objects.
pub fn decode_list(value: Value) -> Vec<Value> {
    match unwrap_data(value) {
        Value::Array(items) => items.into_iter().map(flatten_attributes).collect(),
        Value::Null => Vec::new(),
        single => vec![flatten_attributes(single)],
    }
}

/// Decode a single-object response, taking the first item of a list.
pub fn decode_object(value: Value) -> Value {
    match unwrap_data(value) {
        Value::Array(items) => items
            .into_iter()
            .next()
            .map(flatten_attributes)
            .unwrap_or(Value::Null),
        single => flatten_attributes(single),
    }
}

fn read_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The parts of a server object used to select and address it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRef {
    pub id: Option<u64>,
    pub uuid: Option<String>,
    pub identifier: Option<String>,
    pub name: Option<String>,
}

impl ServerRef {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: read_u64(value.get("id")).or_else(|| read_u64(value.get("internal_id"))),
            uuid: read_string(value.get("uuid")),
            identifier: read_string(value.get("identifier")),
            name: read_string(value.get("name")),
        }
    }

    /// Identifier used for bulk selection: the UUID, else the integer id.
    pub fn selector(&self) -> Option<String> {
        self.uuid
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
    }

    pub fn matches_uuid(&self, needle: &str) -> bool {
        self.uuid.as_deref() == Some(needle) || self.identifier.as_deref() == Some(needle)
    }
}

pub(crate) fn decode_servers(value: Value) -> Vec<ServerRef> {
    decode_list(value)
        .iter()
        .map(ServerRef::from_value)
        .collect()
}

/// A backup as returned by a create call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupRef {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl BackupRef {
    pub fn from_value(value: &Value) -> Self {
        Self {
            uuid: read_string(value.get("uuid")),
            name: read_string(value.get("name")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn list_responses_are_unwrapped_and_flattened() {
        let body = json!({
            "object": "list",
            "data": [
                {"object": "server", "attributes": {"id": 7, "uuid": "aaaa-bbbb", "name": "lobby"}},
                {"object": "server", "attributes": {"id": "8", "identifier": "cccc", "name": "skyblock"}}
            ]
        });

        let servers = decode_servers(body);
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].id, Some(7));
        assert_eq!(servers[0].selector().as_deref(), Some("aaaa-bbbb"));
        assert_eq!(servers[1].id, Some(8));
        assert_eq!(servers[1].selector().as_deref(), Some("8"));
        assert!(servers[1].matches_uuid("cccc"));
    }

    #[test]
    fn bare_arrays_and_single_objects_decode() {
        assert_eq!(decode_list(json!([{"uuid": "x"}])).len(), 1);
        assert_eq!(decode_list(json!({"uuid": "x"})).len(), 1);
        assert!(decode_list(Value::Null).is_empty());

        let backup = decode_object(json!({"data": [{"attributes": {"uuid": "b-1", "name": "nightly"}}]}));
        assert_eq!(
            BackupRef::from_value(&backup),
            BackupRef {
                uuid: Some("b-1".into()),
                name: Some("nightly".into())
            }
        );
    }

    #[test]
    fn client_internal_id_is_read_as_id() {
        let server = ServerRef::from_value(&json!({"internal_id": 12, "uuid": "u-12"}));
        assert_eq!(server.id, Some(12));
    }

    #[test]
    fn base_url_is_joined_without_double_slash() {
        let client = HttpClient::new(
            "https://panel.test/",
            "/api/client",
            "t".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base(), "https://panel.test/api/client");
    }
}
