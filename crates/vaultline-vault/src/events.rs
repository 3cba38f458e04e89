//! Event emission.
//!
//! Committed vault operations are pushed to subscribers over a broadcast
//! channel. Each subscriber has an independent buffer; a receiver that falls
//! more than the configured capacity behind skips the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vaultline_types::events::VaultEvent;
use vaultline_types::{Address, StrategyId};

/// A sequenced vault event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Position of the event in emission order, starting at 1.
    pub sequence: u64,
    /// The event itself.
    #[serde(flatten)]
    pub event: VaultEvent,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only events for these strategies.
    pub strategies: Option<Vec<StrategyId>>,
    /// Only user events for these users.
    pub users: Option<Vec<Address>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: VaultEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(Envelope { sequence, event });
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sequence", &self.sequence())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &VaultEvent) -> bool {
        if let Some(ref strategies) = self.strategies {
            if !strategies.contains(&event.strategy()) {
                return false;
            }
        }

        // Strategy-wide events carry no user and pass the user filter.
        if let Some(ref users) = self.users {
            if let Some(user) = event.user() {
                if !users.contains(&user) {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(user: Address, strategy: StrategyId) -> VaultEvent {
        VaultEvent::Claimed {
            user,
            strategy,
            amount: 1,
        }
    }

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(claimed(Address::derive("alice"), StrategyId::Staking));

        let envelope = rx.try_recv().expect("receive event");
        assert_eq!(envelope.sequence, 1);
        assert!(matches!(envelope.event, VaultEvent::Claimed { .. }));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(0);
        bus.emit(claimed(Address::derive("alice"), StrategyId::Amm));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_strategies() {
        let filter = EventFilter {
            strategies: Some(vec![StrategyId::Amm]),
            users: None,
        };
        let alice = Address::derive("alice");
        assert!(filter.matches(&claimed(alice, StrategyId::Amm)));
        assert!(!filter.matches(&claimed(alice, StrategyId::Staking)));
    }

    #[test]
    fn test_event_filter_users() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let filter = EventFilter {
            strategies: None,
            users: Some(vec![alice]),
        };
        assert!(filter.matches(&claimed(alice, StrategyId::Amm)));
        assert!(!filter.matches(&claimed(bob, StrategyId::Amm)));

        let refresh = VaultEvent::Refreshed {
            strategy: StrategyId::Amm,
            distributed: 1,
            reward_acc_per_share: 1,
        };
        assert!(filter.matches(&refresh));
    }

    #[test]
    fn test_envelope_json_is_flat() {
        let envelope = Envelope {
            sequence: 3,
            event: claimed(Address::derive("alice"), StrategyId::Staking),
        };
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["event_type"], "claimed");
    }
}
