// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection manager scenario tests.
//!
//! Drives [`TetherClient`] end to end over a scripted [`MockTransport`]:
//! direct-first connection with relay fallback, the relay handshake and
//! auth call, encrypted calls over an established session, offline
//! queueing with reconnect drain, and every way a call can fail.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::json;
use tether_core::api::{
    CallbackHandler, ClientConfig, ConnectionMode, RelayConfig, TetherClient, TetherError,
    TetherEvent,
};
use tether_core::crypto::{E2eSession, ExchangeKeyPair, SeededKeyProvider};
use tether_core::network::{
    decode_frame, encode_frame, ConnectionState, Frame, HandshakeError, MockTransport,
    NetworkError, RpcError, Transport, TransportConfig, TransportResult,
};

const DIRECT_URL: &str = "ws://192.168.1.20:8137/agent";
const RELAY_URL: &str = "wss://relay.example.com/agent";

fn direct_only_config() -> ClientConfig {
    ClientConfig {
        direct_url: Some(DIRECT_URL.to_string()),
        ..ClientConfig::default()
    }
}

fn relay_only_config(e2e: bool) -> ClientConfig {
    ClientConfig {
        relay: Some(RelayConfig {
            url: RELAY_URL.to_string(),
            daemon_id: "d-1".to_string(),
            token: "pairing-token".to_string(),
            e2e,
        }),
        ..ClientConfig::default()
    }
}

fn dual_path_config() -> ClientConfig {
    ClientConfig {
        direct_url: Some(DIRECT_URL.to_string()),
        ..relay_only_config(false)
    }
}

type EventLog = Arc<Mutex<Vec<TetherEvent>>>;

fn watch_events(client: &mut TetherClient<MockTransport>) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    client.add_event_handler(Arc::new(CallbackHandler::new(move |event| {
        sink.lock().unwrap().push(event);
    })));
    log
}

fn mode_changes(log: &EventLog) -> Vec<ConnectionMode> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            TetherEvent::ModeChanged { mode } => Some(*mode),
            _ => None,
        })
        .collect()
}

fn notified_methods(log: &EventLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            TetherEvent::Notification { method, .. } => Some(method.clone()),
            _ => None,
        })
        .collect()
}

/// Connects over the direct path, then simulates losing the transport.
fn connect_then_lose(client: &mut TetherClient<MockTransport>) {
    client.connect().unwrap();
    client
        .transport_mut()
        .queue_receive_error(NetworkError::ConnectionClosed);
    client.process_incoming().unwrap();
    assert_eq!(client.mode(), ConnectionMode::Offline);
}

// ============================================================
// Connecting: Direct First, Relay Fallback
// ============================================================

#[test]
fn test_direct_connect_succeeds() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    let log = watch_events(&mut client);

    client.connect().unwrap();

    assert_eq!(client.mode(), ConnectionMode::DirectLocal);
    assert!(client.is_connected());
    assert_eq!(
        mode_changes(&log),
        [ConnectionMode::Connecting, ConnectionMode::DirectLocal]
    );
    // No relay, no handshake: nothing was sent.
    assert!(client.transport().sent_frames().is_empty());
}

#[test]
fn test_direct_preferred_over_relay() {
    let mut client = TetherClient::new(MockTransport::new(), dual_path_config());

    client.connect().unwrap();

    assert_eq!(client.mode(), ConnectionMode::DirectLocal);
    assert_eq!(client.transport().connect_attempts(), [DIRECT_URL]);
}

#[test]
fn test_falls_back_to_relay_when_direct_refused() {
    let mut client = TetherClient::new(MockTransport::new(), dual_path_config());
    let log = watch_events(&mut client);
    client.transport_mut().refuse_connect_to("ws://192.168.");
    client.transport_mut().queue_receive(Frame::Connected);

    client.connect().unwrap();

    assert_eq!(client.mode(), ConnectionMode::Relay);
    assert_eq!(
        client.transport().connect_attempts(),
        [DIRECT_URL, RELAY_URL]
    );
    assert_eq!(
        client.transport().sent_frames(),
        [Frame::Connect {
            daemon_id: "d-1".to_string(),
            token: "pairing-token".to_string(),
        }]
    );
    assert_eq!(
        mode_changes(&log),
        [ConnectionMode::Connecting, ConnectionMode::Relay]
    );
}

#[test]
fn test_connect_without_endpoints_rejected() {
    let mut client = TetherClient::new(MockTransport::new(), ClientConfig::default());
    let log = watch_events(&mut client);

    let result = client.connect();

    assert!(matches!(result, Err(TetherError::Configuration(_))));
    assert_eq!(client.mode(), ConnectionMode::Offline);
    // The attempt never started, so no mode transitions fired.
    assert!(mode_changes(&log).is_empty());
}

#[test]
fn test_connect_when_connected_is_noop() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();
    client.connect().unwrap();

    assert_eq!(client.transport().connect_attempts().len(), 1);
}

#[test]
fn test_relay_close_during_handshake_fails_connect() {
    let mut client = TetherClient::new(MockTransport::new(), relay_only_config(false));
    client
        .transport_mut()
        .queue_receive_error(NetworkError::ConnectionClosed);

    let result = client.connect();

    assert!(matches!(
        result,
        Err(TetherError::Handshake(HandshakeError::RelayClosed))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
    assert_eq!(client.transport().state(), ConnectionState::Disconnected);
}

#[test]
fn test_malformed_frame_during_handshake_skipped() {
    let mut client = TetherClient::new(MockTransport::new(), relay_only_config(false));
    client
        .transport_mut()
        .queue_receive_error(NetworkError::MalformedFrame("not json".to_string()));
    client.transport_mut().queue_receive(Frame::Connected);

    // Garbage from the relay is dropped; the ack right behind it still lands.
    client.connect().unwrap();

    assert_eq!(client.mode(), ConnectionMode::Relay);
    assert_eq!(
        client.transport().sent_frames(),
        [Frame::Connect {
            daemon_id: "d-1".to_string(),
            token: "pairing-token".to_string(),
        }]
    );
}

#[test]
fn test_handshake_timeout_fails_connect() {
    let mut client = TetherClient::new(
        MockTransport::new(),
        ClientConfig {
            handshake_timeout_ms: 0,
            ..relay_only_config(false)
        },
    );

    let result = client.connect();

    assert!(matches!(
        result,
        Err(TetherError::Handshake(HandshakeError::Timeout))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
}

/// Mock wrapper whose `connect()` stalls before delegating.
struct SlowConnectTransport {
    inner: MockTransport,
    connect_delay: Duration,
}

impl Transport for SlowConnectTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        std::thread::sleep(self.connect_delay);
        self.inner.connect(config)
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        self.inner.disconnect()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn send(&mut self, frame: &Frame) -> TransportResult<()> {
        self.inner.send(frame)
    }

    fn receive(&mut self) -> TransportResult<Option<Frame>> {
        self.inner.receive()
    }

    fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }
}

#[test]
fn test_handshake_window_covers_socket_open() {
    let mut inner = MockTransport::new();
    inner.queue_receive(Frame::Connected);
    let mut client = TetherClient::new(
        SlowConnectTransport {
            inner,
            connect_delay: Duration::from_millis(20),
        },
        ClientConfig {
            handshake_timeout_ms: 5,
            ..relay_only_config(false)
        },
    );

    // The relay's ack is already queued, but opening the socket alone
    // exhausts the window; the attempt must time out rather than complete.
    let result = client.connect();

    assert!(matches!(
        result,
        Err(TetherError::Handshake(HandshakeError::Timeout))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
}

// ============================================================
// Authentication
// ============================================================

#[test]
fn test_auth_call_sent_and_answered() {
    let mut client = TetherClient::new(
        MockTransport::new(),
        ClientConfig {
            auth_token: Some("secret-token".to_string()),
            ..relay_only_config(false)
        },
    );
    client.transport_mut().queue_receive(Frame::Connected);
    client.transport_mut().queue_receive(Frame::Response {
        id: 1,
        result: Some(json!({"authenticated": true})),
        error: None,
    });

    client.connect().unwrap();

    assert_eq!(client.mode(), ConnectionMode::Relay);
    assert_eq!(
        client.transport().sent_frames(),
        [
            Frame::Connect {
                daemon_id: "d-1".to_string(),
                token: "pairing-token".to_string(),
            },
            Frame::Request {
                id: 1,
                method: "auth".to_string(),
                params: Some(json!({"token": "secret-token"})),
            },
        ]
    );
}

#[test]
fn test_auth_rejection_aborts_connect() {
    let mut client = TetherClient::new(
        MockTransport::new(),
        ClientConfig {
            auth_token: Some("wrong-token".to_string()),
            ..relay_only_config(false)
        },
    );
    let log = watch_events(&mut client);
    client.transport_mut().queue_receive(Frame::Connected);
    client.transport_mut().queue_receive(Frame::Response {
        id: 1,
        result: None,
        error: Some(RpcError {
            code: 401,
            message: "invalid token".to_string(),
        }),
    });

    let result = client.connect();

    assert!(matches!(
        result,
        Err(TetherError::Remote { code: 401, .. })
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
    assert_eq!(client.transport().state(), ConnectionState::Disconnected);
    assert_eq!(
        mode_changes(&log),
        [ConnectionMode::Connecting, ConnectionMode::Offline]
    );
}

#[test]
fn test_auth_timeout_aborts_connect() {
    let mut client = TetherClient::new(
        MockTransport::new(),
        ClientConfig {
            auth_token: Some("secret-token".to_string()),
            default_call_timeout_ms: 0,
            ..relay_only_config(false)
        },
    );
    // Relay accepts, but the host never answers the auth call.
    client.transport_mut().queue_receive(Frame::Connected);

    let result = client.connect();

    assert!(matches!(result, Err(TetherError::Timeout)));
    assert_eq!(client.mode(), ConnectionMode::Offline);
}

// ============================================================
// Encrypted Calls over the Relay
// ============================================================

/// Builds the host's side of the session from the key seeds used in the
/// encrypted-relay tests.
fn host_session() -> E2eSession {
    let host_keys = ExchangeKeyPair::from_seed([2u8; 32]);
    let client_public = *ExchangeKeyPair::from_seed([1u8; 32]).public_key();
    E2eSession::responder(&host_keys.diffie_hellman(&client_public))
}

fn connect_encrypted(client: &mut TetherClient<MockTransport>) {
    let host_public = *ExchangeKeyPair::from_seed([2u8; 32]).public_key();
    client.set_key_provider(Box::new(SeededKeyProvider::new([1u8; 32])));
    client.transport_mut().queue_receive(Frame::Connected);
    client.transport_mut().queue_receive(Frame::E2eHello {
        pubkey: URL_SAFE_NO_PAD.encode(host_public),
    });
    client.connect().unwrap();
}

#[test]
fn test_encrypted_relay_call_round_trips() {
    let mut client = TetherClient::new(MockTransport::new(), relay_only_config(true));
    let log = watch_events(&mut client);
    let mut host = host_session();
    connect_encrypted(&mut client);
    assert_eq!(client.mode(), ConnectionMode::Relay);

    let handle = client.call("ping", Some(json!({"seq": 1}))).unwrap();

    // On the wire the request is a sealed envelope, not plaintext.
    let sent = client.transport().sent_frames().to_vec();
    assert_eq!(sent.len(), 3); // connect, e2e_hello, sealed request
    let payload = match &sent[2] {
        Frame::E2e { payload } => payload.clone(),
        other => panic!("expected sealed frame, got {:?}", other),
    };
    let inner = decode_frame(&String::from_utf8(host.open(&payload).unwrap()).unwrap()).unwrap();
    assert_eq!(
        inner,
        Frame::Request {
            id: 1,
            method: "ping".to_string(),
            params: Some(json!({"seq": 1})),
        }
    );

    // Host answers through the same session.
    let response = encode_frame(&Frame::Response {
        id: 1,
        result: Some(json!("pong")),
        error: None,
    })
    .unwrap();
    let sealed = host.seal(response.as_bytes()).unwrap();
    client
        .transport_mut()
        .queue_receive(Frame::E2e { payload: sealed });

    assert_eq!(client.process_incoming().unwrap(), 1);
    match handle.try_result() {
        Some(Ok(value)) => assert_eq!(value, json!("pong")),
        other => panic!("expected resolved call, got {:?}", other),
    }

    // Plaintext frames on an encrypted connection are dropped, sealed
    // events are dispatched.
    client.transport_mut().queue_receive(Frame::Event {
        method: "injected".to_string(),
        params: None,
    });
    client.process_incoming().unwrap();
    assert!(notified_methods(&log).is_empty());

    let event = encode_frame(&Frame::Event {
        method: "status_changed".to_string(),
        params: Some(json!({"up": true})),
    })
    .unwrap();
    let sealed_event = host.seal(event.as_bytes()).unwrap();
    client.transport_mut().queue_receive(Frame::E2e {
        payload: sealed_event,
    });
    client.process_incoming().unwrap();
    assert_eq!(notified_methods(&log), ["status_changed"]);
}

#[test]
fn test_undecryptable_frame_dropped_connection_survives() {
    let mut client = TetherClient::new(MockTransport::new(), relay_only_config(true));
    connect_encrypted(&mut client);

    client.transport_mut().queue_receive(Frame::E2e {
        payload: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
    });
    client.process_incoming().unwrap();

    assert_eq!(client.mode(), ConnectionMode::Relay);
    assert!(client.is_connected());
}

// ============================================================
// Calls, Timeouts, and Notifications
// ============================================================

#[test]
fn test_call_resolves_with_result() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();

    let handle = client.call("list_devices", None).unwrap();
    assert_eq!(client.in_flight_count(), 1);

    client.transport_mut().queue_receive(Frame::Response {
        id: 1,
        result: Some(json!(["laptop", "phone"])),
        error: None,
    });
    client.process_incoming().unwrap();

    assert_eq!(client.in_flight_count(), 0);
    assert_eq!(handle.try_result().unwrap().unwrap(), json!(["laptop", "phone"]));
}

#[test]
fn test_call_timeout_and_late_response() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();

    let handle = client
        .call_with_timeout("slow_op", None, Duration::ZERO)
        .unwrap();
    std::thread::sleep(Duration::from_millis(2));

    assert_eq!(client.check_timeouts(), 1);
    assert!(matches!(
        handle.try_result(),
        Some(Err(TetherError::Timeout))
    ));
    assert_eq!(client.in_flight_count(), 0);

    // The response arriving after expiry is dropped without fuss, and the
    // next call does not collide with the dead id.
    client.transport_mut().queue_receive(Frame::Response {
        id: 1,
        result: Some(json!("too late")),
        error: None,
    });
    client.process_incoming().unwrap();
    assert_eq!(client.mode(), ConnectionMode::DirectLocal);

    client.call("next_op", None).unwrap();
    assert!(matches!(
        client.transport().sent_frames().last(),
        Some(Frame::Request { id: 2, .. })
    ));
}

#[test]
fn test_send_failure_fails_call_and_goes_offline() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();
    client
        .transport_mut()
        .fail_next_send(NetworkError::SendFailed("broken pipe".to_string()));

    let handle = client.call("doomed", None).unwrap();

    assert!(matches!(
        handle.try_result(),
        Some(Err(TetherError::Disconnected))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
}

#[test]
fn test_host_notification_dispatched() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    let log = watch_events(&mut client);
    client.connect().unwrap();

    client.transport_mut().queue_receive(Frame::Event {
        method: "status_changed".to_string(),
        params: Some(json!({"battery": 93})),
    });
    client.process_incoming().unwrap();

    assert_eq!(notified_methods(&log), ["status_changed"]);
}

#[test]
fn test_malformed_frame_skipped_connection_survives() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();

    client
        .transport_mut()
        .queue_receive_error(NetworkError::MalformedFrame("garbage".to_string()));
    client.transport_mut().queue_receive(Frame::Event {
        method: "after_garbage".to_string(),
        params: None,
    });

    assert_eq!(client.process_incoming().unwrap(), 1);
    assert_eq!(client.mode(), ConnectionMode::DirectLocal);
}

// ============================================================
// Offline Queue and Reconnect
// ============================================================

#[test]
fn test_call_before_first_connect_rejected() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());

    let result = client.call("too_early", None);
    assert!(matches!(result, Err(TetherError::Disconnected)));
    assert_eq!(client.queued_call_count(), 0);
}

#[test]
fn test_transport_loss_fails_pending_keeps_queueing() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    let log = watch_events(&mut client);
    client.connect().unwrap();

    let in_flight = client.call("interrupted", None).unwrap();
    client
        .transport_mut()
        .queue_receive_error(NetworkError::ConnectionClosed);
    client.process_incoming().unwrap();

    assert!(matches!(
        in_flight.try_result(),
        Some(Err(TetherError::Disconnected))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
    assert_eq!(
        mode_changes(&log),
        [
            ConnectionMode::Connecting,
            ConnectionMode::DirectLocal,
            ConnectionMode::Offline,
        ]
    );

    // Offline after a successful connect: new calls queue instead of failing.
    let parked = client.call("while_offline", None).unwrap();
    assert_eq!(client.queued_call_count(), 1);
    assert!(parked.try_result().is_none());
}

#[test]
fn test_queued_calls_drain_in_order_on_reconnect() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    connect_then_lose(&mut client);

    let handle_a = client.call("a", None).unwrap();
    let handle_b = client.call("b", None).unwrap();
    let handle_c = client.call("c", None).unwrap();
    assert_eq!(client.queued_call_count(), 3);
    client.transport_mut().clear_sent();

    client.connect().unwrap();

    assert_eq!(client.queued_call_count(), 0);
    assert_eq!(client.in_flight_count(), 3);
    let sent = client.transport().sent_frames();
    let methods: Vec<&str> = sent
        .iter()
        .map(|frame| match frame {
            Frame::Request { method, .. } => method.as_str(),
            other => panic!("expected request, got {:?}", other),
        })
        .collect();
    assert_eq!(methods, ["a", "b", "c"]);

    for (id, handle) in [(1, &handle_a), (2, &handle_b), (3, &handle_c)] {
        client.transport_mut().queue_receive(Frame::Response {
            id,
            result: Some(json!(id)),
            error: None,
        });
        client.process_incoming().unwrap();
        assert_eq!(handle.try_result().unwrap().unwrap(), json!(id));
    }
}

#[test]
fn test_queued_call_expired_before_drain_not_sent() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    connect_then_lose(&mut client);

    let stale = client
        .call_with_timeout("stale", None, Duration::ZERO)
        .unwrap();
    std::thread::sleep(Duration::from_millis(2));
    client.transport_mut().clear_sent();

    client.connect().unwrap();

    assert!(matches!(stale.try_result(), Some(Err(TetherError::Timeout))));
    assert!(client.transport().sent_frames().is_empty());
}

#[test]
fn test_queue_cap_rejects_overflow() {
    let mut client = TetherClient::new(
        MockTransport::new(),
        ClientConfig {
            max_queued_calls: Some(2),
            ..direct_only_config()
        },
    );
    connect_then_lose(&mut client);

    client.call("a", None).unwrap();
    client.call("b", None).unwrap();
    let overflow = client.call("c", None);

    assert!(matches!(overflow, Err(TetherError::QueueFull)));
    assert_eq!(client.queued_call_count(), 2);
}

#[test]
fn test_disconnect_fails_pending_and_queued() {
    let mut client = TetherClient::new(MockTransport::new(), direct_only_config());
    client.connect().unwrap();
    let in_flight = client.call("pending_op", None).unwrap();

    client.disconnect().unwrap();

    assert!(matches!(
        in_flight.try_result(),
        Some(Err(TetherError::Disconnected))
    ));
    assert_eq!(client.mode(), ConnectionMode::Offline);
    assert_eq!(client.transport().state(), ConnectionState::Disconnected);

    // Still queue-eligible afterwards; disconnect also clears the queue.
    let parked = client.call("parked", None).unwrap();
    assert_eq!(client.queued_call_count(), 1);
    client.disconnect().unwrap();
    assert_eq!(client.queued_call_count(), 0);
    assert!(matches!(
        parked.try_result(),
        Some(Err(TetherError::Disconnected))
    ));
}
