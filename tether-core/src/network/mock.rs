// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory transport for tests. Inbound frames (or errors) are scripted
//! ahead of time, outbound frames are recorded for inspection, and connects
//! can be refused per URL prefix to exercise the direct-to-relay fallback.

use std::collections::VecDeque;

use super::error::NetworkError;
use super::frame::Frame;
use super::transport::{ConnectionState, Transport, TransportConfig, TransportResult};

/// Scripted in-memory transport.
pub struct MockTransport {
    state: ConnectionState,
    inbound: VecDeque<TransportResult<Frame>>,
    sent: Vec<Frame>,
    refused_prefixes: Vec<String>,
    connect_attempts: Vec<String>,
    next_send_error: Option<NetworkError>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a disconnected mock with an empty script.
    pub fn new() -> Self {
        MockTransport {
            state: ConnectionState::Disconnected,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            refused_prefixes: Vec::new(),
            connect_attempts: Vec::new(),
            next_send_error: None,
        }
    }

    /// Queues a frame to be handed out by a later `receive()`.
    pub fn queue_receive(&mut self, frame: Frame) {
        self.inbound.push_back(Ok(frame));
    }

    /// Queues an error to be returned by a later `receive()`.
    ///
    /// Queue `NetworkError::ConnectionClosed` to simulate the peer dropping
    /// the connection mid-stream.
    pub fn queue_receive_error(&mut self, error: NetworkError) {
        self.inbound.push_back(Err(error));
    }

    /// Refuses future `connect()` calls whose URL starts with `prefix`.
    pub fn refuse_connect_to(&mut self, prefix: &str) {
        self.refused_prefixes.push(prefix.to_string());
    }

    /// Makes the next `send()` fail with `error` and drop the connection.
    pub fn fail_next_send(&mut self, error: NetworkError) {
        self.next_send_error = Some(error);
    }

    /// Frames sent so far, in order.
    pub fn sent_frames(&self) -> &[Frame] {
        &self.sent
    }

    /// Forgets recorded outbound frames.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// URLs passed to `connect()`, in order, including refused attempts.
    pub fn connect_attempts(&self) -> &[String] {
        &self.connect_attempts
    }

    /// Overrides the connection state directly.
    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        self.connect_attempts.push(config.server_url.clone());

        if self
            .refused_prefixes
            .iter()
            .any(|prefix| config.server_url.starts_with(prefix.as_str()))
        {
            self.state = ConnectionState::Disconnected;
            return Err(NetworkError::ConnectionFailed("connection refused".into()));
        }

        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn send(&mut self, frame: &Frame) -> TransportResult<()> {
        if self.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }
        if let Some(error) = self.next_send_error.take() {
            self.state = ConnectionState::Disconnected;
            return Err(error);
        }
        self.sent.push(frame.clone());
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<Frame>> {
        if self.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }
        match self.inbound.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => {
                if matches!(error, NetworkError::ConnectionClosed) {
                    self.state = ConnectionState::Disconnected;
                }
                Err(error)
            }
            None => Ok(None),
        }
    }

    fn has_pending(&self) -> bool {
        !self.inbound.is_empty()
    }
}
