//! Offline Call Queue
//!
//! Buffers calls made while the client is offline, in submission order, so
//! they can be resubmitted after the next successful connect. Only a client
//! that has connected at least once gets to queue; that eligibility check
//! lives in the client, not here.
//!
//! Replay on reconnect is at-least-once: a call that reached the host right
//! before a drop was detected can be delivered again. Deduplication would
//! need idempotency keys on the host side and is out of this layer's hands.

use std::collections::VecDeque;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::api::TetherError;

use super::pending::CallSlot;

/// A call waiting for the next connection.
pub struct QueuedCall {
    /// Remote method name.
    pub method: String,
    /// Call parameters, passed through untouched.
    pub params: Option<Value>,
    /// Deadline carried over from submission; keeps ticking while queued.
    pub deadline: Instant,
    /// Completion sender, transferred to the pending table on drain.
    pub slot: CallSlot,
}

/// FIFO buffer of calls submitted while offline.
pub struct OfflineQueue {
    calls: VecDeque<QueuedCall>,
    max_depth: Option<usize>,
}

impl Default for OfflineQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        OfflineQueue {
            calls: VecDeque::new(),
            max_depth: None,
        }
    }

    /// Creates a queue that holds at most `max_depth` calls.
    pub fn with_max_depth(max_depth: usize) -> Self {
        OfflineQueue {
            calls: VecDeque::new(),
            max_depth: Some(max_depth),
        }
    }

    /// Configured depth cap, if any.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Number of queued calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// True when the queue is at its cap. Always false when unbounded.
    pub fn is_full(&self) -> bool {
        match self.max_depth {
            Some(max) => self.calls.len() >= max,
            None => false,
        }
    }

    /// Slots left before the cap. `None` when unbounded.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_depth
            .map(|max| max.saturating_sub(self.calls.len()))
    }

    /// Appends a call.
    ///
    /// Callers check [`OfflineQueue::is_full`] first; a push past the cap is
    /// accepted here rather than losing the completion slot.
    pub fn push(&mut self, call: QueuedCall) {
        self.calls.push_back(call);
    }

    /// Takes the oldest queued call for resubmission.
    pub fn pop_front(&mut self) -> Option<QueuedCall> {
        self.calls.pop_front()
    }

    /// Sweeps calls whose deadline has passed, resolving each with
    /// [`TetherError::Timeout`]. Returns how many expired.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        let drained = std::mem::take(&mut self.calls);
        for call in drained {
            if call.deadline <= now {
                debug!(method = %call.method, "queued call timed out before reconnect");
                call.slot.fill(Err(TetherError::Timeout));
                expired += 1;
            } else {
                self.calls.push_back(call);
            }
        }
        expired
    }

    /// Fails every queued call with [`TetherError::Disconnected`] and clears
    /// the queue. Used on explicit disconnect.
    pub fn fail_all(&mut self) {
        for call in self.calls.drain(..) {
            debug!(method = %call.method, "failing queued call: disconnected");
            call.slot.fill(Err(TetherError::Disconnected));
        }
    }
}
