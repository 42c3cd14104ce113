//! Client configuration.

use serde::{Deserialize, Serialize};

/// Relay coordinates for one host agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Relay server URL (`wss://relay.example.com/agent`).
    pub url: String,
    /// Identifier the relay uses to route frames to the agent.
    pub daemon_id: String,
    /// Pairing token presented in the `connect` frame.
    pub token: String,
    /// Run the end-to-end key exchange after the relay accepts. On by
    /// default; turn off only against hosts that predate the exchange.
    pub e2e: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            url: String::new(),
            daemon_id: String::new(),
            token: String::new(),
            e2e: true,
        }
    }
}

/// Configuration for a [`crate::api::TetherClient`].
///
/// `direct_url` and `relay` are independent: with both set the client tries
/// the direct address first and falls back to the relay, with only one it
/// uses that path alone, with neither `connect` fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// LAN address of the agent (`ws://192.168.1.20:8137/agent`), if known.
    pub direct_url: Option<String>,
    /// Relay fallback, if paired.
    pub relay: Option<RelayConfig>,
    /// Token for the post-connect `auth` call. `None` skips authentication.
    pub auth_token: Option<String>,
    /// Timeout for the direct TCP attempt. Kept short so relay fallback is
    /// not held up by an unreachable LAN address.
    pub direct_connect_timeout_ms: u64,
    /// Timeout for the whole relay handshake, socket open included.
    pub handshake_timeout_ms: u64,
    /// Timeout applied to calls made through [`crate::api::TetherClient::call`].
    pub default_call_timeout_ms: u64,
    /// Socket read/write timeout once connected. Bounds how long a single
    /// `process_incoming` pump can block.
    pub io_timeout_ms: u64,
    /// Cap on queued offline calls. `None` means unbounded.
    pub max_queued_calls: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            direct_url: None,
            relay: None,
            auth_token: None,
            direct_connect_timeout_ms: 2_000,
            handshake_timeout_ms: 10_000,
            default_call_timeout_ms: 30_000,
            io_timeout_ms: 500,
            max_queued_calls: None,
        }
    }
}
