//! Tether Core Library
//!
//! Client-side transport for talking to a Tether host agent: direct LAN
//! connection with relay fallback, end-to-end encryption over the relay,
//! call correlation, and offline queueing.
//! All cryptographic operations use audited crates (`ring`,
//! `x25519-dalek`, `chacha20poly1305`).

pub mod api;
pub mod crypto;
pub mod network;

pub use api::{
    ClientConfig, ConnectionMode, RelayConfig, TetherClient, TetherError, TetherEvent,
    TetherResult,
};
pub use crypto::{E2eSession, EphemeralKeyProvider, KeyProvider, SeededKeyProvider};
pub use network::{
    CallHandle, ConnectionState, Frame, MockTransport, NetworkError, Transport, TransportConfig,
};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use network::WebSocketTransport;
