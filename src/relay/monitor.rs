use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ConnectionState, RelayClient};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySnapshot {
    pub status: ConnectionState,
    pub pairing_code: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for RelaySnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionState::Offline,
            pairing_code: None,
            checked_at: None,
        }
    }
}

/// One status check. A connected relay drops any stale pairing code; a waiting relay
/// refreshes it. An offline relay also drops it since the code is no longer scannable.
pub async fn poll_once(client: &RelayClient, previous: &RelaySnapshot) -> RelaySnapshot {
    let status = client.status().await;

    let pairing_code = match status.status {
        ConnectionState::Connected | ConnectionState::Offline => None,
        ConnectionState::Disconnected if status.has_qr => client
            .pairing_code()
            .await
            .or_else(|| previous.pairing_code.clone()),
        ConnectionState::Disconnected => previous.pairing_code.clone(),
    };

    RelaySnapshot {
        status: status.status,
        pairing_code,
        checked_at: Some(Utc::now()),
    }
}

async fn monitor_loop(
    client: RelayClient,
    interval: Duration,
    tx: watch::Sender<RelaySnapshot>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let previous = tx.borrow().clone();
                let next = poll_once(&client, &previous).await;

                if next.status != previous.status {
                    match next.status {
                        ConnectionState::Offline => log_warn!("relay at {} went offline", client.base_url()),
                        status => log_info!("relay at {} is now {}", client.base_url(), status.as_str()),
                    }
                }

                if tx.send(next).is_err() {
                    log_info!("relay monitor has no subscribers left");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("relay monitor shutting down");
                break;
            }
        }
    }
}

pub struct RelayMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    rx: watch::Receiver<RelaySnapshot>,
}

impl RelayMonitor {
    pub fn new() -> Self {
        let (_, rx) = watch::channel(RelaySnapshot::default());
        Self {
            handle: None,
            cancel_token: None,
            rx,
        }
    }

    pub fn start(&mut self, client: RelayClient, interval: Duration) -> Result<()> {
        if self.handle.is_some() {
            bail!("relay monitor already running");
        }
        if interval.is_zero() {
            bail!("relay poll interval must be positive");
        }

        let cancel_token = CancellationToken::new();
        let (tx, rx) = watch::channel(RelaySnapshot::default());

        let handle = tokio::spawn(monitor_loop(client, interval, tx, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.rx = rx;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn latest(&self) -> RelaySnapshot {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RelaySnapshot> {
        self.rx.clone()
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("relay monitor task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for RelayMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_server::{spawn_relay, Route};
    use super::*;
    use crate::settings::RelaySettings;

    fn client_for(base_url: &str) -> RelayClient {
        RelayClient::new(&RelaySettings {
            base_url: base_url.into(),
            ..RelaySettings::default()
        })
    }

    #[tokio::test]
    async fn connected_relay_clears_pairing_code() {
        let relay = spawn_relay(vec![Route::get(
            "/status",
            200,
            r#"{"status":"connected","hasQR":false}"#,
        )])
        .await;
        let previous = RelaySnapshot {
            status: ConnectionState::Disconnected,
            pairing_code: Some("stale".into()),
            checked_at: None,
        };

        let next = poll_once(&client_for(&relay.base_url), &previous).await;
        assert_eq!(next.status, ConnectionState::Connected);
        assert_eq!(next.pairing_code, None);
        assert!(next.checked_at.is_some());
    }

    #[tokio::test]
    async fn waiting_relay_fetches_pairing_code() {
        let relay = spawn_relay(vec![
            Route::get("/status", 200, r#"{"status":"disconnected","hasQR":true}"#),
            Route::get("/qr", 200, r#"{"qr":"2@pair-me"}"#),
        ])
        .await;

        let next = poll_once(&client_for(&relay.base_url), &RelaySnapshot::default()).await;
        assert_eq!(next.status, ConnectionState::Disconnected);
        assert_eq!(next.pairing_code.as_deref(), Some("2@pair-me"));
        assert!(relay.requests().iter().any(|r| r.path == "/qr"));
    }

    #[tokio::test]
    async fn disconnected_without_code_skips_qr_request() {
        let relay = spawn_relay(vec![Route::get(
            "/status",
            200,
            r#"{"status":"disconnected","hasQR":false}"#,
        )])
        .await;

        poll_once(&client_for(&relay.base_url), &RelaySnapshot::default()).await;
        assert!(relay.requests().iter().all(|r| r.path != "/qr"));
    }

    #[tokio::test]
    async fn monitor_publishes_and_stops() {
        let mut monitor = RelayMonitor::new();
        monitor
            .start(client_for("http://127.0.0.1:9"), Duration::from_millis(50))
            .unwrap();
        assert!(monitor.start(client_for("http://127.0.0.1:9"), Duration::from_millis(50)).is_err());

        let mut rx = monitor.subscribe();
        tokio::time::timeout(Duration::from_secs(15), rx.changed())
            .await
            .expect("monitor should publish a snapshot")
            .unwrap();

        let snapshot = monitor.latest();
        assert_eq!(snapshot.status, ConnectionState::Offline);
        assert!(snapshot.checked_at.is_some());

        monitor.stop().await.unwrap();
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn rejects_zero_interval() {
        let mut monitor = RelayMonitor::new();
        assert!(monitor
            .start(client_for("http://127.0.0.1:9"), Duration::ZERO)
            .is_err());
    }
}
