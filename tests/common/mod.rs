//! Mock Pelican panel for API tests.

#![allow(dead_code)]

use std::time::Duration;

use pelicanctl::api::{ApplicationApi, ClientApi, HttpClient};
use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "ptla_test_token";

pub struct MockPanel {
    pub server: MockServer,
}

impl MockPanel {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn client_api(&self) -> ClientApi {
        ClientApi::new(self.http("/api/client"))
    }

    pub fn application_api(&self) -> ApplicationApi {
        ApplicationApi::new(self.http("/api/application"))
    }

    fn http(&self, prefix: &str) -> HttpClient {
        HttpClient::new(
            &format!("{}/", self.server.uri()),
            prefix,
            TOKEN.to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    /// Serve a server list in the panel's `{"data": [{"attributes": ..}]}` shape.
    pub async fn mock_server_list(&self, list_path: &str, servers: Vec<Value>) {
        let data: Vec<Value> = servers
            .into_iter()
            .map(|attributes| json!({"object": "server", "attributes": attributes}))
            .collect();

        Mock::given(method("GET"))
            .and(path(list_path))
            .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": data
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_post(&self, post_path: &str, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(post_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_post_no_content(&self, post_path: &str) {
        Mock::given(method("POST"))
            .and(path(post_path))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}
