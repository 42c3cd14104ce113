//! Transport Trait
//!
//! Platform-agnostic abstraction for the socket underneath the client.

use super::error::NetworkError;
use super::frame::Frame;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to any peer.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
}

/// Configuration for transport connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server URL/address.
    pub server_url: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Read/write timeout in milliseconds. Receive returns `Ok(None)` when
    /// it elapses without a frame, which is what paces the caller's pump
    /// loop.
    pub io_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            server_url: String::new(),
            connect_timeout_ms: 10_000,
            io_timeout_ms: 30_000,
        }
    }
}

/// Transport trait for frame-oriented network I/O.
///
/// Abstracts the underlying socket (WebSocket, in-memory mock) so the client
/// logic is testable without a network.
///
/// # Synchronous Interface
///
/// Methods are synchronous; platform integrations may run an async runtime
/// internally but expose a blocking interface here.
pub trait Transport: Send {
    /// Connects to the given address.
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()>;

    /// Disconnects. Safe to call when not connected.
    fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Sends one frame.
    ///
    /// Blocking; returns an error if not connected.
    fn send(&mut self, frame: &Frame) -> TransportResult<()>;

    /// Receives the next frame.
    ///
    /// Blocks until a frame arrives or the io timeout passes. Returns
    /// `Ok(None)` when no frame is available.
    fn receive(&mut self) -> TransportResult<Option<Frame>>;

    /// Checks if there are frames waiting to be received (non-blocking).
    fn has_pending(&self) -> bool;
}
