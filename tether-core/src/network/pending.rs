// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! RPC Correlation Table
//!
//! Tracks in-flight calls by request id. The table owns each pending call
//! from the moment its request frame is sent until a matching response
//! arrives, its deadline passes, or the transport is lost. Completion flows
//! through a one-shot channel: the table holds the sending half, the caller
//! holds a [`CallHandle`].
//!
//! Ids come from a monotonic counter. When the counter reaches the largest
//! integer JSON peers can represent losslessly and nothing is in flight, it
//! folds back to zero; it never resets while calls are outstanding, so ids
//! are always unique among pending calls.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::api::TetherError;

/// Largest request id issued before the counter folds back to zero.
///
/// 2^53 - 1 is the largest integer a JSON consumer backed by doubles can
/// represent exactly.
pub const MAX_SAFE_REQUEST_ID: u64 = (1 << 53) - 1;

/// What a finished call resolves to.
pub type CallOutcome = Result<Value, TetherError>;

/// Completion sender, owned by the correlation table or the offline queue.
pub struct CallSlot {
    tx: mpsc::Sender<CallOutcome>,
}

/// Caller-side handle to a call's eventual outcome.
///
/// The client never blocks on this internally; waiting (or polling, or
/// abandoning the handle entirely) is the caller's choice.
pub struct CallHandle {
    rx: mpsc::Receiver<CallOutcome>,
}

impl CallSlot {
    /// Creates a connected slot/handle pair.
    pub fn channel() -> (CallSlot, CallHandle) {
        let (tx, rx) = mpsc::channel();
        (CallSlot { tx }, CallHandle { rx })
    }

    /// Resolves the call.
    ///
    /// A caller that stopped waiting has dropped its handle; delivering into
    /// the void is cancellation-by-abandonment, not an error.
    pub fn fill(self, outcome: CallOutcome) {
        let _ = self.tx.send(outcome);
    }
}

impl CallHandle {
    /// Non-blocking poll for the outcome.
    pub fn try_result(&self) -> Option<CallOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(TetherError::Disconnected)),
        }
    }

    /// Blocks until the call completes or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> CallOutcome {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(TetherError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TetherError::Disconnected),
        }
    }
}

struct PendingCall {
    method: String,
    deadline: Instant,
    slot: CallSlot,
}

/// In-flight request table.
pub struct PendingTable {
    next_id: u64,
    pending: HashMap<u64, PendingCall>,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    /// Creates an empty table. The first issued id is 1.
    pub fn new() -> Self {
        PendingTable {
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    /// Registers a call and returns its request id.
    pub fn register(&mut self, method: &str, deadline: Instant, slot: CallSlot) -> u64 {
        if self.next_id >= MAX_SAFE_REQUEST_ID && self.pending.is_empty() {
            self.next_id = 0;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert(
            id,
            PendingCall {
                method: method.to_string(),
                deadline,
                slot,
            },
        );
        id
    }

    /// Completes the call registered under `id`.
    ///
    /// Returns false when the id is unknown, which means the call already
    /// timed out or the table was cleared; the response is simply late and
    /// the caller should drop it.
    pub fn resolve(&mut self, id: u64, outcome: CallOutcome) -> bool {
        match self.pending.remove(&id) {
            Some(call) => {
                call.slot.fill(outcome);
                true
            }
            None => false,
        }
    }

    /// Sweeps calls whose deadline has passed, resolving each with
    /// [`TetherError::Timeout`]. Returns how many expired.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, call)| call.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(call) = self.pending.remove(id) {
                debug!(id, method = %call.method, "call timed out");
                call.slot.fill(Err(TetherError::Timeout));
            }
        }
        expired.len()
    }

    /// Fails every in-flight call with [`TetherError::Disconnected`] and
    /// clears the table. Used on transport loss and explicit disconnect.
    pub fn fail_all(&mut self) {
        for (id, call) in self.pending.drain() {
            debug!(id, method = %call.method, "failing in-flight call: disconnected");
            call.slot.fill(Err(TetherError::Disconnected));
        }
    }

    /// Number of calls currently in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
