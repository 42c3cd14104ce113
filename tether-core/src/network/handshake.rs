// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Relay Handshake State Machine
//!
//! One-shot protocol run against the relay after the socket opens:
//!
//! `Idle -> AwaitingConnectAck -> (AwaitingE2eHello if E2E requested) -> Complete`
//!
//! The relay only ever sees the routing half (`connect`/`connected`) and the
//! public keys in the `e2e_hello` frames; the shared secret is computed at
//! both ends, so the relay cannot decrypt the session it forwards even if it
//! wanted to. Relay rejection has no frame of its own: the relay closes the
//! connection instead, which surfaces here as [`HandshakeError::RelayClosed`].

use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::{E2eSession, ExchangeKeyPair};

use super::frame::Frame;

/// Handshake error types. All of them are fatal to the connect attempt that
/// ran the handshake, and to nothing else.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Relay did not answer within the handshake window.
    #[error("handshake timed out")]
    Timeout,

    /// Relay closed the connection before the handshake finished. This is
    /// how the relay rejects a connect request.
    #[error("relay closed the connection during handshake")]
    RelayClosed,

    /// Peer key in the e2e hello does not decode to 32 bytes.
    #[error("invalid peer key in e2e hello")]
    InvalidPeerKey,

    /// Step applied in a state that does not accept it.
    #[error("handshake not in progress")]
    NotInProgress,
}

enum HandshakeState {
    Idle { keypair: Option<ExchangeKeyPair> },
    AwaitingConnectAck { keypair: Option<ExchangeKeyPair> },
    AwaitingE2eHello { keypair: ExchangeKeyPair },
    Complete,
    Failed,
}

/// What the caller should do after feeding a frame to the handshake.
pub enum HandshakeStep {
    /// Frame was not part of the handshake; drop it and keep pumping.
    Ignored,
    /// Send this frame, then keep pumping.
    Send(Frame),
    /// Handshake finished. Carries the session when E2E was requested.
    Complete(Option<E2eSession>),
}

/// Driver for one relay handshake.
pub struct RelayHandshake {
    state: HandshakeState,
    daemon_id: String,
    token: String,
    started_at: Instant,
    timeout: Duration,
}

impl RelayHandshake {
    /// Creates a handshake for the given relay coordinates.
    ///
    /// Passing a key pair requests the end-to-end exchange; `None` stops
    /// after the routing acknowledgment.
    pub fn new(
        daemon_id: &str,
        token: &str,
        keypair: Option<ExchangeKeyPair>,
        timeout: Duration,
    ) -> Self {
        RelayHandshake {
            state: HandshakeState::Idle { keypair },
            daemon_id: daemon_id.to_string(),
            token: token.to_string(),
            started_at: Instant::now(),
            timeout,
        }
    }

    /// Begins the handshake, returning the `connect` frame to send.
    pub fn start(&mut self) -> Result<Frame, HandshakeError> {
        let state = std::mem::replace(&mut self.state, HandshakeState::Failed);
        match state {
            HandshakeState::Idle { keypair } => {
                self.state = HandshakeState::AwaitingConnectAck { keypair };
                Ok(Frame::Connect {
                    daemon_id: self.daemon_id.clone(),
                    token: self.token.clone(),
                })
            }
            other => {
                self.state = other;
                Err(HandshakeError::NotInProgress)
            }
        }
    }

    /// Feeds one inbound frame to the state machine.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<HandshakeStep, HandshakeError> {
        let state = std::mem::replace(&mut self.state, HandshakeState::Failed);
        match (state, frame) {
            (HandshakeState::AwaitingConnectAck { keypair }, Frame::Connected) => match keypair {
                Some(keypair) => {
                    let pubkey = URL_SAFE_NO_PAD.encode(keypair.public_key());
                    self.state = HandshakeState::AwaitingE2eHello { keypair };
                    Ok(HandshakeStep::Send(Frame::E2eHello { pubkey }))
                }
                None => {
                    self.state = HandshakeState::Complete;
                    Ok(HandshakeStep::Complete(None))
                }
            },
            (HandshakeState::AwaitingE2eHello { keypair }, Frame::E2eHello { pubkey }) => {
                let decoded = URL_SAFE_NO_PAD
                    .decode(pubkey)
                    .map_err(|_| HandshakeError::InvalidPeerKey)?;
                let peer: [u8; 32] = decoded
                    .as_slice()
                    .try_into()
                    .map_err(|_| HandshakeError::InvalidPeerKey)?;

                let mut shared = keypair.diffie_hellman(&peer);
                let session = E2eSession::initiator(&shared);
                shared.zeroize();

                self.state = HandshakeState::Complete;
                Ok(HandshakeStep::Complete(Some(session)))
            }
            (state @ HandshakeState::Complete, _) | (state @ HandshakeState::Failed, _) => {
                self.state = state;
                Err(HandshakeError::NotInProgress)
            }
            (state, frame) => {
                debug!(?frame, "ignoring frame outside handshake sequence");
                self.state = state;
                Ok(HandshakeStep::Ignored)
            }
        }
    }

    /// True once the bounded handshake window has passed.
    pub fn is_timed_out(&self) -> bool {
        self.started_at.elapsed() > self.timeout
    }

    /// True once the handshake reached `Complete`.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, HandshakeState::Complete)
    }
}
