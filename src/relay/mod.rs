//! Client side of the messaging relay: the local process that holds the WhatsApp session.

mod client;
mod monitor;
#[cfg(test)]
pub(crate) mod test_server;

use serde::{Deserialize, Serialize};

pub use client::RelayClient;
pub use monitor::{poll_once, RelayMonitor, RelaySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Offline,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    pub status: ConnectionState,
    #[serde(default, rename = "hasQR")]
    pub has_qr: bool,
}

impl RelayStatus {
    pub fn offline() -> Self {
        Self {
            status: ConnectionState::Offline,
            has_qr: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppGroup {
    pub id: String,
    pub name: String,
}
