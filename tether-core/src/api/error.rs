// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error types for the client API.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::network::{HandshakeError, NetworkError};

/// Errors surfaced to callers of [`crate::api::TetherClient`].
#[derive(Error, Debug)]
pub enum TetherError {
    /// No usable connection and the call could not be queued.
    #[error("not connected")]
    Disconnected,

    /// The call's deadline passed before a response arrived.
    #[error("call timed out")]
    Timeout,

    /// The host answered with an error response.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The offline queue is at its configured cap.
    #[error("offline queue is full")]
    QueueFull,

    /// Relay handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// The configuration cannot produce a connection.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the API layer.
pub type TetherResult<T> = Result<T, TetherError>;
