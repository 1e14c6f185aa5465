use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

/// Broadcast hubs backing the two SSE streams: a public one carrying vote
/// prompts, tallies, and announcements for every community, and an admin one
/// used to hand out the admin token.
pub struct SseState {
    public: SseHub,
    admin: SseHub,
    admin_token: Mutex<Option<String>>,
}

impl SseState {
    /// Build both hubs with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            public: SseHub::new(capacity),
            admin: SseHub::new(capacity),
            admin_token: Mutex::new(None),
        }
    }

    /// Hub fanning out community-facing events.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub carrying admin-only events.
    pub fn admin(&self) -> &SseHub {
        &self.admin
    }

    /// Slot coordinating the single active admin connection.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        &self.admin_token
    }
}

/// Thin wrapper over a Tokio broadcast channel.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a hub with the given buffered capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a subscriber for subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Deliver an event to all current subscribers; slow or absent
    /// subscribers are not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
