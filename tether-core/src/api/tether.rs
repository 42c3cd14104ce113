// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection manager: the main client facade.
//!
//! [`TetherClient`] owns the transport and drives everything through it:
//! connecting (direct first, relay as fallback), the post-connect auth call,
//! request/response correlation, the offline queue, and routing of inbound
//! frames. All methods run on the caller's thread; a UI embeds the client by
//! calling [`TetherClient::process_incoming`] and
//! [`TetherClient::check_timeouts`] from its pump loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::crypto::{E2eSession, EphemeralKeyProvider, KeyProvider};
use crate::network::{
    decode_frame, encode_frame, CallHandle, CallSlot, ConnectionState, Frame, HandshakeError,
    HandshakeStep, NetworkError, OfflineQueue, PendingTable, QueuedCall, RelayHandshake, RpcError,
    Transport, TransportConfig, AUTH_METHOD,
};

use super::config::{ClientConfig, RelayConfig};
use super::error::{TetherError, TetherResult};
use super::events::{EventDispatcher, EventHandler, TetherEvent};

/// How the client is currently reaching the host agent, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// No connection. Calls queue once the client has connected at least once.
    Offline,
    /// A connect attempt is in progress.
    Connecting,
    /// Connected to the agent's LAN address.
    DirectLocal,
    /// Connected through the relay.
    Relay,
}

/// Client facade for one host agent.
///
/// Generic over [`Transport`] so tests drive it with
/// [`crate::network::MockTransport`] while production uses the WebSocket
/// transport.
pub struct TetherClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    mode: ConnectionMode,
    pending: PendingTable,
    queue: OfflineQueue,
    session: Option<E2eSession>,
    events: Arc<EventDispatcher>,
    keys: Box<dyn KeyProvider>,
    has_connected_once: bool,
}

impl<T: Transport> TetherClient<T> {
    /// Creates a client over the given transport. The client starts
    /// [`ConnectionMode::Offline`]; nothing touches the network until
    /// [`TetherClient::connect`].
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let queue = match config.max_queued_calls {
            Some(max) => OfflineQueue::with_max_depth(max),
            None => OfflineQueue::new(),
        };
        TetherClient {
            transport,
            config,
            mode: ConnectionMode::Offline,
            pending: PendingTable::new(),
            queue,
            session: None,
            events: Arc::new(EventDispatcher::new()),
            keys: Box::new(EphemeralKeyProvider),
            has_connected_once: false,
        }
    }

    /// Replaces the exchange key source used for relay sessions.
    ///
    /// Call before [`TetherClient::connect`]; sessions already established
    /// keep the keys they were built with.
    pub fn set_key_provider(&mut self, provider: Box<dyn KeyProvider>) {
        self.keys = provider;
    }

    /// Registers an event handler.
    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        if let Some(events) = Arc::get_mut(&mut self.events) {
            events.add_handler(handler);
        }
    }

    /// Clears all event handlers.
    pub fn clear_event_handlers(&mut self) {
        if let Some(events) = Arc::get_mut(&mut self.events) {
            events.clear_handlers();
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.mode,
            ConnectionMode::DirectLocal | ConnectionMode::Relay
        )
    }

    /// Calls awaiting a response from the host.
    pub fn in_flight_count(&self) -> usize {
        self.pending.len()
    }

    /// Borrows the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrows the underlying transport. Tests use this to script
    /// and inspect a [`crate::network::MockTransport`].
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Calls parked in the offline queue.
    pub fn queued_call_count(&self) -> usize {
        self.queue.len()
    }

    /// Connects to the host agent: the direct LAN address first when
    /// configured, the relay as fallback.
    ///
    /// On success the mode is [`ConnectionMode::DirectLocal`] or
    /// [`ConnectionMode::Relay`] and any queued calls are flushed. On failure
    /// the client is back in [`ConnectionMode::Offline`] with the queue
    /// intact. Already connected is a no-op.
    pub fn connect(&mut self) -> TetherResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        if self.config.direct_url.is_none() && self.config.relay.is_none() {
            return Err(TetherError::Configuration(
                "no direct address and no relay configured".to_string(),
            ));
        }

        self.set_mode(ConnectionMode::Connecting);
        match self.connect_inner() {
            Ok(mode) => {
                self.has_connected_once = true;
                self.set_mode(mode);
                self.drain_queue();
                Ok(())
            }
            Err(err) => {
                let _ = self.transport.disconnect();
                self.session = None;
                self.pending.fail_all();
                self.set_mode(ConnectionMode::Offline);
                Err(err)
            }
        }
    }

    fn connect_inner(&mut self) -> TetherResult<ConnectionMode> {
        let mode = self.establish()?;
        self.authenticate()?;
        Ok(mode)
    }

    fn establish(&mut self) -> TetherResult<ConnectionMode> {
        let mut direct_err = None;
        if let Some(url) = self.config.direct_url.clone() {
            match self.connect_direct(&url) {
                Ok(()) => return Ok(ConnectionMode::DirectLocal),
                Err(err) => {
                    info!(error = %err, "direct connection failed, trying relay");
                    direct_err = Some(err);
                }
            }
        }

        if let Some(relay) = self.config.relay.clone() {
            self.connect_relay(&relay)?;
            return Ok(ConnectionMode::Relay);
        }

        Err(direct_err.unwrap_or_else(|| {
            TetherError::Configuration("no connection path configured".to_string())
        }))
    }

    fn connect_direct(&mut self, url: &str) -> TetherResult<()> {
        let transport_config = TransportConfig {
            server_url: url.to_string(),
            connect_timeout_ms: self.config.direct_connect_timeout_ms,
            io_timeout_ms: self.config.io_timeout_ms,
        };
        self.transport.connect(&transport_config)?;
        Ok(())
    }

    /// Opens the relay socket and runs the handshake to completion.
    ///
    /// The handshake window opens before the socket does, so
    /// `handshake_timeout_ms` bounds the TCP connect and the frame exchange
    /// together. Cleanup on failure (socket teardown, mode reset) is handled
    /// by the error arm in [`TetherClient::connect`].
    fn connect_relay(&mut self, relay: &RelayConfig) -> TetherResult<()> {
        let keypair = relay.e2e.then(|| self.keys.exchange_keypair());
        let mut handshake = RelayHandshake::new(
            &relay.daemon_id,
            &relay.token,
            keypair,
            Duration::from_millis(self.config.handshake_timeout_ms),
        );

        let transport_config = TransportConfig {
            server_url: relay.url.clone(),
            connect_timeout_ms: self.config.handshake_timeout_ms,
            io_timeout_ms: self.config.io_timeout_ms,
        };
        self.transport.connect(&transport_config)?;

        let hello = handshake.start()?;
        self.send_raw(&hello)?;

        loop {
            if handshake.is_timed_out() {
                return Err(TetherError::Handshake(HandshakeError::Timeout));
            }
            match self.transport.receive() {
                Ok(Some(frame)) => match handshake.on_frame(&frame)? {
                    HandshakeStep::Ignored => {}
                    HandshakeStep::Send(reply) => self.send_raw(&reply)?,
                    HandshakeStep::Complete(session) => {
                        debug!(encrypted = session.is_some(), "relay handshake complete");
                        self.session = session;
                        return Ok(());
                    }
                },
                Ok(None) => {}
                Err(NetworkError::MalformedFrame(reason)) => {
                    warn!(%reason, "dropping malformed frame during handshake");
                }
                Err(NetworkError::ConnectionClosed) => {
                    return Err(TetherError::Handshake(HandshakeError::RelayClosed));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Runs the post-connect auth call when a token is configured.
    ///
    /// Failure here fails the whole connect attempt: a connection that
    /// cannot authenticate is useless to the caller.
    fn authenticate(&mut self) -> TetherResult<()> {
        let token = match self.config.auth_token.clone() {
            Some(token) => token,
            None => return Ok(()),
        };

        let deadline =
            Instant::now() + Duration::from_millis(self.config.default_call_timeout_ms);
        let (slot, handle) = CallSlot::channel();
        let id = self.pending.register(AUTH_METHOD, deadline, slot);
        self.send_frame(&Frame::Request {
            id,
            method: AUTH_METHOD.to_string(),
            params: Some(json!({ "token": token })),
        })?;

        loop {
            if let Some(outcome) = handle.try_result() {
                outcome?;
                info!("authenticated with host");
                return Ok(());
            }
            self.check_timeouts();
            self.process_incoming()?;
        }
    }

    /// Sends a call with the configured default timeout.
    ///
    /// Returns a [`CallHandle`] the caller polls or waits on. When offline
    /// after a first successful connect, the call is queued for the next
    /// connection instead of failing.
    pub fn call(&mut self, method: &str, params: Option<Value>) -> TetherResult<CallHandle> {
        self.call_with_timeout(
            method,
            params,
            Duration::from_millis(self.config.default_call_timeout_ms),
        )
    }

    /// Sends a call with an explicit timeout. The deadline starts now and
    /// keeps ticking while the call sits in the offline queue.
    pub fn call_with_timeout(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> TetherResult<CallHandle> {
        let deadline = Instant::now() + timeout;

        if self.is_connected() {
            return self.submit_now(method, params, deadline);
        }

        if !self.has_connected_once {
            return Err(TetherError::Disconnected);
        }
        if self.queue.is_full() {
            return Err(TetherError::QueueFull);
        }

        let (slot, handle) = CallSlot::channel();
        self.queue.push(QueuedCall {
            method: method.to_string(),
            params,
            deadline,
            slot,
        });
        debug!(method, queued = self.queue.len(), "queued call while offline");
        Ok(handle)
    }

    fn submit_now(
        &mut self,
        method: &str,
        params: Option<Value>,
        deadline: Instant,
    ) -> TetherResult<CallHandle> {
        let (slot, handle) = CallSlot::channel();
        let id = self.pending.register(method, deadline, slot);
        let frame = Frame::Request {
            id,
            method: method.to_string(),
            params,
        };
        if let Err(err) = self.send_frame(&frame) {
            warn!(method, error = %err, "send failed, dropping connection");
            self.handle_transport_loss();
        }
        Ok(handle)
    }

    /// Tears the connection down. In-flight and queued calls fail with
    /// [`TetherError::Disconnected`] before this returns.
    pub fn disconnect(&mut self) -> TetherResult<()> {
        let _ = self.transport.disconnect();
        self.session = None;
        self.pending.fail_all();
        self.queue.fail_all();
        self.set_mode(ConnectionMode::Offline);
        Ok(())
    }

    /// Pumps the transport: reads available frames and routes them.
    ///
    /// Returns the number of frames processed. Transport loss is absorbed
    /// here rather than returned: in-flight calls fail, the mode flips to
    /// [`ConnectionMode::Offline`], and queued calls survive.
    pub fn process_incoming(&mut self) -> TetherResult<usize> {
        if self.transport.state() != ConnectionState::Connected {
            return Ok(0);
        }

        let mut processed = 0;
        loop {
            match self.transport.receive() {
                Ok(Some(frame)) => {
                    self.route_frame(frame);
                    processed += 1;
                }
                Ok(None) => break,
                Err(NetworkError::MalformedFrame(reason)) => {
                    warn!(%reason, "dropping malformed frame");
                }
                Err(err) => {
                    warn!(error = %err, "transport lost");
                    self.handle_transport_loss();
                    break;
                }
            }
        }
        Ok(processed)
    }

    /// Expires in-flight and queued calls whose deadline has passed.
    /// Returns how many were failed with [`TetherError::Timeout`].
    pub fn check_timeouts(&mut self) -> usize {
        let now = Instant::now();
        self.pending.expire(now) + self.queue.expire(now)
    }

    /// Routes one inbound frame, unwrapping the encrypted envelope first
    /// when a session is up. Undecodable or undecryptable frames are
    /// dropped; they never tear down the connection.
    fn route_frame(&mut self, frame: Frame) {
        match frame {
            Frame::E2e { payload } => {
                let session = match &mut self.session {
                    Some(session) => session,
                    None => {
                        warn!("dropping encrypted frame: no session established");
                        return;
                    }
                };
                let plaintext = match session.open(&payload) {
                    Ok(plaintext) => plaintext,
                    Err(err) => {
                        warn!(error = %err, "dropping undecryptable frame");
                        return;
                    }
                };
                let text = match String::from_utf8(plaintext) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("dropping frame: decrypted payload is not valid UTF-8");
                        return;
                    }
                };
                match decode_frame(&text) {
                    Ok(inner) => self.dispatch_frame(inner),
                    Err(err) => warn!(error = %err, "dropping malformed decrypted frame"),
                }
            }
            frame if self.session.is_some() => {
                // Plaintext on an encrypted connection is either a relay bug
                // or an injection attempt. Drop it.
                debug!(?frame, "dropping plaintext frame on encrypted connection");
            }
            frame => self.dispatch_frame(frame),
        }
    }

    fn dispatch_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Response { id, result, error } => self.resolve_response(id, result, error),
            Frame::Event { method, params } => {
                self.events
                    .dispatch(TetherEvent::Notification { method, params });
            }
            Frame::E2e { .. } => {
                warn!("dropping nested encrypted frame");
            }
            frame => {
                debug!(?frame, "dropping unexpected frame");
            }
        }
    }

    fn resolve_response(&mut self, id: u64, result: Option<Value>, error: Option<RpcError>) {
        let outcome = match error {
            Some(RpcError { code, message }) => Err(TetherError::Remote { code, message }),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        if !self.pending.resolve(id, outcome) {
            debug!(id, "response for unknown or already expired call");
        }
    }

    /// Transport died under us. In-flight calls fail; the offline queue
    /// survives for the next connect.
    fn handle_transport_loss(&mut self) {
        let _ = self.transport.disconnect();
        self.session = None;
        self.pending.fail_all();
        self.set_mode(ConnectionMode::Offline);
    }

    fn set_mode(&mut self, mode: ConnectionMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        info!(?mode, "connection mode changed");
        self.events.dispatch(TetherEvent::ModeChanged { mode });
    }

    /// Flushes the offline queue over the fresh connection, oldest first.
    fn drain_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        info!(count = self.queue.len(), "draining offline queue");
        let now = Instant::now();
        while self.is_connected() {
            let call = match self.queue.pop_front() {
                Some(call) => call,
                None => break,
            };
            if call.deadline <= now {
                call.slot.fill(Err(TetherError::Timeout));
                continue;
            }
            let id = self.pending.register(&call.method, call.deadline, call.slot);
            let frame = Frame::Request {
                id,
                method: call.method.clone(),
                params: call.params,
            };
            if let Err(err) = self.send_frame(&frame) {
                warn!(method = %call.method, error = %err, "send failed while draining queue");
                self.handle_transport_loss();
                break;
            }
        }
    }

    /// Sends a frame, sealing it inside the encrypted envelope when a
    /// session is up.
    fn send_frame(&mut self, frame: &Frame) -> TetherResult<()> {
        match &mut self.session {
            Some(session) => {
                let text = encode_frame(frame)?;
                let payload = session.seal(text.as_bytes())?;
                self.transport
                    .send(&Frame::E2e { payload })
                    .map_err(TetherError::from)
            }
            None => self.transport.send(frame).map_err(TetherError::from),
        }
    }

    /// Sends a frame without the encrypted envelope. Handshake frames only.
    fn send_raw(&mut self, frame: &Frame) -> TetherResult<()> {
        self.transport.send(frame).map_err(TetherError::from)
    }
}
