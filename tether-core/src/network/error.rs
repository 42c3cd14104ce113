// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use thiserror::Error;

/// Transport and wire protocol errors.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Could not establish a connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation requires an open connection.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Frame did not parse. Callers drop the frame and continue; this is
    /// never grounds for tearing down the connection.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}
