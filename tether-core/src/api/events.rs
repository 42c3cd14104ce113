//! Event types and dispatch for UI notification.
//!
//! Handlers are registered on the client and invoked synchronously from
//! whichever call mutated state, on the same thread. Handlers should hand
//! work off rather than block.

use std::sync::Arc;

use serde_json::Value;

use super::tether::ConnectionMode;

/// Events emitted by [`crate::api::TetherClient`].
#[derive(Debug, Clone)]
pub enum TetherEvent {
    /// The connection mode changed. Emitted only on actual transitions.
    ModeChanged { mode: ConnectionMode },
    /// The host pushed a notification (a method call with no id).
    Notification {
        method: String,
        params: Option<Value>,
    },
}

/// Trait for receiving client events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: TetherEvent);
}

/// Adapter that wraps a closure as an [`EventHandler`].
pub struct CallbackHandler<F>
where
    F: Fn(TetherEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(TetherEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(TetherEvent) + Send + Sync,
{
    fn on_event(&self, event: TetherEvent) {
        (self.callback)(event);
    }
}

/// Fans one event out to every registered handler.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers, in registration order.
    pub fn dispatch(&self, event: TetherEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}
