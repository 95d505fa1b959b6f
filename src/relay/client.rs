use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::settings::RelaySettings;

use super::{RelayStatus, WhatsAppGroup};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct QrResponse {
    qr: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendUpdateRequest<'a> {
    group_id: &'a str,
    message: &'a str,
    image_urls: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SendUpdateResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(settings: &RelaySettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Any failure to reach the relay reads as `offline`.
    pub async fn status(&self) -> RelayStatus {
        let response = match self.client.get(self.url("/status")).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Relay status check returned {}", response.status());
                return RelayStatus::offline();
            }
            Err(_) => return RelayStatus::offline(),
        };

        response
            .json::<RelayStatus>()
            .await
            .unwrap_or_else(|err| {
                warn!("Relay status response unreadable: {err}");
                RelayStatus::offline()
            })
    }

    /// Current pairing code, if the relay is waiting to be paired.
    pub async fn pairing_code(&self) -> Option<String> {
        let response = self.client.get(self.url("/qr")).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .json::<QrResponse>()
            .await
            .ok()
            .and_then(|body| body.qr)
            .filter(|qr| !qr.is_empty())
    }

    pub async fn groups(&self) -> Result<Vec<WhatsAppGroup>> {
        let response = self
            .client
            .get(self.url("/groups"))
            .send()
            .await
            .map_err(|err| {
                anyhow!("Relay at {} is offline ({err}). Start the relay process first.", self.base_url)
            })?;

        match response.status() {
            status if status.is_success() => response
                .json::<Vec<WhatsAppGroup>>()
                .await
                .context("relay returned an unreadable group list"),
            StatusCode::SERVICE_UNAVAILABLE => {
                bail!("WhatsApp is not connected. Pair the relay before scanning groups.")
            }
            status => bail!("Relay group listing failed with {status}"),
        }
    }

    /// Send a text update to a group. Images travel as references only; the relay
    /// does not guarantee they arrive as attachments.
    pub async fn send_update(&self, group_id: &str, message: &str, image_urls: &[String]) -> Result<()> {
        let request = SendUpdateRequest {
            group_id,
            message,
            image_urls,
        };

        let response = self
            .client
            .post(self.url("/send-update"))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("relay at {} is unreachable", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("relay rejected update with {status}");
        }

        let body: SendUpdateResponse = response
            .json()
            .await
            .context("relay returned an unreadable send response")?;
        if !body.success {
            bail!("relay reported the update as not sent");
        }

        info!(
            "Relay accepted update for group {group_id} ({} image references)",
            image_urls.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_server::{spawn_relay, Route};
    use super::super::ConnectionState;
    use super::*;

    fn client_for(base_url: &str) -> RelayClient {
        RelayClient::new(&RelaySettings {
            base_url: base_url.into(),
            ..RelaySettings::default()
        })
    }

    #[tokio::test]
    async fn unreachable_relay_is_offline() {
        let client = client_for("http://127.0.0.1:9");
        assert_eq!(client.status().await, RelayStatus::offline());
        assert_eq!(client.pairing_code().await, None);
        assert!(client.groups().await.is_err());
        assert!(client.send_update("g", "hi", &[]).await.is_err());
    }

    #[tokio::test]
    async fn reads_status_and_pairing_code() {
        let relay = spawn_relay(vec![
            Route::get("/status", 200, r#"{"status":"disconnected","hasQR":true}"#),
            Route::get("/qr", 200, r#"{"qr":"2@abc"}"#),
        ])
        .await;
        let client = client_for(&format!("{}/", relay.base_url));

        let status = client.status().await;
        assert_eq!(status.status, ConnectionState::Disconnected);
        assert!(status.has_qr);
        assert_eq!(client.pairing_code().await.as_deref(), Some("2@abc"));
    }

    #[tokio::test]
    async fn groups_report_unpaired_relay() {
        let relay = spawn_relay(vec![Route::get(
            "/groups",
            503,
            r#"{"error":"WhatsApp not connected"}"#,
        )])
        .await;
        let err = client_for(&relay.base_url).groups().await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }

    #[tokio::test]
    async fn lists_groups() {
        let relay = spawn_relay(vec![Route::get(
            "/groups",
            200,
            r#"[{"id":"120363045@g.us","name":"Alice Johnson Family"}]"#,
        )])
        .await;
        let groups = client_for(&relay.base_url).groups().await.unwrap();
        assert_eq!(
            groups,
            vec![WhatsAppGroup {
                id: "120363045@g.us".into(),
                name: "Alice Johnson Family".into()
            }]
        );
    }

    #[tokio::test]
    async fn send_update_posts_relay_payload() {
        let relay = spawn_relay(vec![Route::post("/send-update", 200, r#"{"success":true}"#)]).await;
        let client = client_for(&relay.base_url);

        client
            .send_update("120363045@g.us", "Hello family", &["data:image/jpeg;base64,AA".to_string()])
            .await
            .unwrap();

        let requests = relay.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["groupId"], "120363045@g.us");
        assert_eq!(body["message"], "Hello family");
        assert_eq!(body["imageUrls"][0], "data:image/jpeg;base64,AA");
    }

    #[tokio::test]
    async fn send_update_fails_on_relay_error() {
        let relay = spawn_relay(vec![Route::post(
            "/send-update",
            500,
            r#"{"error":"Failed to send message"}"#,
        )])
        .await;
        assert!(client_for(&relay.base_url)
            .send_update("g", "hi", &[])
            .await
            .is_err());
    }
}
