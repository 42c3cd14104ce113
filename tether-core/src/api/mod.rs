// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tether API Layer
//!
//! High-level API for talking to a Tether host agent.
//!
//! # Overview
//!
//! The API layer provides the client-facing surface that coordinates:
//! - Connection management (direct LAN, relay fallback)
//! - Remote calls with correlation and timeouts
//! - Offline call queueing
//! - Event handling
//!
//! # Example
//!
//! ```ignore
//! use tether_core::api::{ClientConfig, RelayConfig, TetherClient};
//! use tether_core::network::WebSocketTransport;
//!
//! let config = ClientConfig {
//!     direct_url: Some("ws://192.168.1.20:8137/agent".to_string()),
//!     relay: Some(RelayConfig {
//!         url: "wss://relay.example.com/agent".to_string(),
//!         daemon_id: "d-1".to_string(),
//!         token: "pairing-token".to_string(),
//!         e2e: true,
//!     }),
//!     ..ClientConfig::default()
//! };
//!
//! let mut client = TetherClient::new(WebSocketTransport::new(), config);
//! client.connect()?;
//!
//! let handle = client.call("list_devices", None)?;
//! loop {
//!     client.process_incoming()?;
//!     client.check_timeouts();
//!     if let Some(outcome) = handle.try_result() {
//!         println!("devices: {:?}", outcome?);
//!         break;
//!     }
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event system for callbacks
//! - [`tether`] - Main connection manager

#[cfg(feature = "testing")]
pub mod config;
#[cfg(not(feature = "testing"))]
mod config;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod events;
#[cfg(not(feature = "testing"))]
mod events;

#[cfg(feature = "testing")]
pub mod tether;
#[cfg(not(feature = "testing"))]
mod tether;

// Error types
pub use error::{TetherError, TetherResult};

// Configuration
pub use config::{ClientConfig, RelayConfig};

// Events
pub use events::{CallbackHandler, EventDispatcher, EventHandler, TetherEvent};

// Client
pub use tether::{ConnectionMode, TetherClient};
