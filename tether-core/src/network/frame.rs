// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Frame Codec
//!
//! Every message on the socket is one JSON text frame. Control frames carry
//! a `"type"` tag (`connect`, `connected`, `e2e_hello`, `e2e`); RPC frames
//! have no tag and are classified by their fields: a frame with an `id` is a
//! request (if it also has a `method`) or a response, a frame with a `method`
//! but no `id` is a host-initiated event.
//!
//! Frames are a closed enum so that adding a frame type is a compile-time
//! checked change at every match site.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::NetworkError;

/// Reserved method name for the post-connect authentication call.
pub const AUTH_METHOD: &str = "auth";

/// Application-level error carried in an RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code, surfaced to the caller verbatim.
    pub code: i64,
    /// Human-readable description from the host.
    pub message: String,
}

/// A single wire frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Relay routing request (client to relay, unencrypted).
    Connect {
        /// Identifier of the host process the relay should route to.
        daemon_id: String,
        /// Credential checked by the relay itself.
        token: String,
    },
    /// Relay routing acknowledgment (relay to client, unencrypted).
    Connected,
    /// Ephemeral public key announcement, both directions, unencrypted.
    E2eHello {
        /// base64url (no padding) encoded X25519 public key.
        pubkey: String,
    },
    /// Sealed application frame, both directions.
    E2e {
        /// base64url (no padding) of `nonce || ciphertext || tag`.
        payload: String,
    },
    /// Remote call to the host.
    Request {
        id: u64,
        method: String,
        params: Option<Value>,
    },
    /// Reply to a call. Carries exactly one of `result`/`error`.
    Response {
        id: u64,
        result: Option<Value>,
        error: Option<RpcError>,
    },
    /// Host-initiated notification. No id, never correlated.
    Event {
        method: String,
        params: Option<Value>,
    },
}

/// Serializes a frame to its JSON text form.
pub fn encode_frame(frame: &Frame) -> Result<String, NetworkError> {
    let value = match frame {
        Frame::Connect { daemon_id, token } => json!({
            "type": "connect",
            "daemonId": daemon_id,
            "token": token,
        }),
        Frame::Connected => json!({ "type": "connected" }),
        Frame::E2eHello { pubkey } => json!({ "type": "e2e_hello", "pubkey": pubkey }),
        Frame::E2e { payload } => json!({ "type": "e2e", "payload": payload }),
        Frame::Request { id, method, params } => {
            let mut obj = json!({ "method": method, "id": id });
            if let Some(params) = params {
                obj["params"] = params.clone();
            }
            obj
        }
        Frame::Response { id, result, error } => match error {
            Some(err) => json!({
                "id": id,
                "error": { "code": err.code, "message": err.message },
            }),
            None => json!({ "id": id, "result": result.clone().unwrap_or(Value::Null) }),
        },
        Frame::Event { method, params } => {
            let mut obj = json!({ "method": method });
            if let Some(params) = params {
                obj["params"] = params.clone();
            }
            obj
        }
    };

    serde_json::to_string(&value).map_err(|e| NetworkError::MalformedFrame(e.to_string()))
}

/// Parses a JSON text frame.
///
/// Returns [`NetworkError::MalformedFrame`] for anything that does not fit
/// the frame grammar. Callers treat that as drop-and-continue.
pub fn decode_frame(text: &str) -> Result<Frame, NetworkError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| NetworkError::MalformedFrame(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| NetworkError::MalformedFrame("frame is not a JSON object".into()))?;

    if let Some(kind) = obj.get("type").and_then(Value::as_str) {
        return decode_control(kind, obj);
    }

    // Presence of the `id` key decides request/response vs event, even when
    // the value itself is garbage.
    match (obj.get("id"), obj.get("method").and_then(Value::as_str)) {
        (Some(id), maybe_method) => {
            let id = id.as_u64().ok_or_else(|| {
                NetworkError::MalformedFrame("id is not an unsigned integer".into())
            })?;
            match maybe_method {
                Some(method) => Ok(Frame::Request {
                    id,
                    method: method.to_string(),
                    params: obj.get("params").cloned(),
                }),
                None => decode_response(id, obj),
            }
        }
        (None, Some(method)) => Ok(Frame::Event {
            method: method.to_string(),
            params: obj.get("params").cloned(),
        }),
        (None, None) => Err(NetworkError::MalformedFrame(
            "frame has no type, id or method".into(),
        )),
    }
}

fn decode_control(kind: &str, obj: &Map<String, Value>) -> Result<Frame, NetworkError> {
    match kind {
        "connect" => Ok(Frame::Connect {
            daemon_id: require_str(obj, "daemonId")?,
            token: require_str(obj, "token")?,
        }),
        "connected" => Ok(Frame::Connected),
        "e2e_hello" => Ok(Frame::E2eHello {
            pubkey: require_str(obj, "pubkey")?,
        }),
        "e2e" => Ok(Frame::E2e {
            payload: require_str(obj, "payload")?,
        }),
        other => Err(NetworkError::MalformedFrame(format!(
            "unknown frame type: {}",
            other
        ))),
    }
}

fn decode_response(id: u64, obj: &Map<String, Value>) -> Result<Frame, NetworkError> {
    let error = match obj.get("error") {
        Some(err) => Some(
            serde_json::from_value::<RpcError>(err.clone())
                .map_err(|e| NetworkError::MalformedFrame(format!("bad error object: {}", e)))?,
        ),
        None => None,
    };
    let result = obj.get("result").cloned();

    if error.is_some() == result.is_some() {
        return Err(NetworkError::MalformedFrame(
            "response must carry exactly one of result/error".into(),
        ));
    }

    Ok(Frame::Response { id, result, error })
}

fn require_str(obj: &Map<String, Value>, key: &str) -> Result<String, NetworkError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| NetworkError::MalformedFrame(format!("missing field: {}", key)))
}
