// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Transport Layer
//!
//! Wire protocol and connection plumbing for talking to a host agent.
//!
//! # Architecture
//!
//! - **Frame codec**: JSON text frames tagged by shape (`frame`)
//! - **Transport**: pluggable byte pipe behind the [`Transport`] trait
//!   (`transport`, `websocket`, `mock`)
//! - **Handshake**: relay routing + optional end-to-end key exchange
//!   (`handshake`)
//! - **Call tracking**: request id allotment and response correlation
//!   (`pending`), plus the offline queue (`queue`)
//!
//! The modules here are deliberately synchronous; the connection manager
//! ([`crate::api::TetherClient`]) owns the transport and pumps it from one
//! thread.
//!
//! ```ignore
//! use tether_core::network::{encode_frame, Frame};
//!
//! let text = encode_frame(&Frame::Connect {
//!     daemon_id: "d-1".into(),
//!     token: "secret".into(),
//! })?;
//! ```

// Enable this feature to expose internal modules for integration tests
#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod frame;
#[cfg(not(feature = "testing"))]
mod frame;

#[cfg(feature = "testing")]
pub mod handshake;
#[cfg(not(feature = "testing"))]
mod handshake;

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(not(feature = "testing"))]
mod mock;

#[cfg(feature = "testing")]
pub mod pending;
#[cfg(not(feature = "testing"))]
mod pending;

#[cfg(feature = "testing")]
pub mod queue;
#[cfg(not(feature = "testing"))]
mod queue;

#[cfg(feature = "testing")]
pub mod transport;
#[cfg(not(feature = "testing"))]
mod transport;

#[cfg(all(
    feature = "testing",
    any(feature = "network-native-tls", feature = "network-rustls")
))]
pub mod websocket;
#[cfg(all(
    not(feature = "testing"),
    any(feature = "network-native-tls", feature = "network-rustls")
))]
mod websocket;

pub use error::NetworkError;
pub use frame::{decode_frame, encode_frame, Frame, RpcError, AUTH_METHOD};
pub use handshake::{HandshakeError, HandshakeStep, RelayHandshake};
pub use mock::MockTransport;
pub use pending::{CallHandle, CallOutcome, CallSlot, PendingTable, MAX_SAFE_REQUEST_ID};
pub use queue::{OfflineQueue, QueuedCall};
pub use transport::{ConnectionState, Transport, TransportConfig, TransportResult};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use websocket::WebSocketTransport;
