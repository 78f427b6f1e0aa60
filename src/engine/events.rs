// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Engine lifecycle notifications.
//!
//! The bus is handed to the engine at construction; nothing here is process-global. Events are
//! fire-and-forget: with no subscribers they are dropped, and a subscriber that falls behind
//! skips what it missed.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::engine::rule_set::Severity;
use crate::traits::ExecutorKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ConfigReplaced {
        previous_revision: u64,
        revision: u64,
        rule_count: usize,
        rule_set_count: usize,
    },
    RuleExecuted {
        execution_id: String,
        rule_id: String,
        triggered: bool,
        execution_time_ms: f64,
    },
    RuleSetExecuted {
        execution_id: String,
        rule_set_id: String,
        severity: Severity,
        triggered_rule: Option<String>,
        execution_time_ms: f64,
    },
    ExecutionFailed {
        execution_id: String,
        kind: ExecutorKind,
        id: String,
        error: String,
    },
}

/// Broadcast-based event bus.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
    emitted: AtomicU64,
}

impl EventBus {
    /// Create a bus whose channel holds `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        // no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn total_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Subscription handle for receiving events from the [`EventBus`].
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl EventSubscriber {
    /// Next event, skipping any lost to lag. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replaced(revision: u64) -> EngineEvent {
        EngineEvent::ConfigReplaced {
            previous_revision: revision - 1,
            revision,
            rule_count: 0,
            rule_set_count: 0,
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.emit(replaced(1));
        assert_eq!(bus.total_emitted(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn lagging_subscriber_skips_to_retained_events() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for revision in 1..=4 {
            bus.emit(replaced(revision));
        }

        assert_eq!(sub.try_recv(), Some(replaced(3)));
        assert_eq!(sub.try_recv(), Some(replaced(4)));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let value = serde_json::to_value(replaced(2)).unwrap();
        assert_eq!(value["event"], "config_replaced");
        assert_eq!(value["revision"], 2);
    }
}
