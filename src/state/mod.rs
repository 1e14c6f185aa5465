/// Session registry keyed by community.
pub mod registry;
/// Runtime types for settings, suggestions, and vote sessions.
pub mod session;
mod sse;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use self::sse::SseHub;
use self::sse::SseState;
use crate::{
    services::publisher::{PromptPublisher, SsePublisher},
    state::registry::SessionRegistry,
};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 16;

/// Central application state: the community registry plus the broadcast hubs
/// and the publisher the engine hands its outbound messages to.
pub struct AppState {
    registry: SessionRegistry,
    sse: SseState,
    publisher: Arc<dyn PromptPublisher>,
}

impl AppState {
    /// Wire the state with the SSE-backed publisher used in production.
    pub fn new(registry: SessionRegistry) -> SharedState {
        let sse = SseState::new(SSE_CAPACITY);
        let publisher = Arc::new(SsePublisher::new(sse.public().clone()));
        Arc::new(Self {
            registry,
            sse,
            publisher,
        })
    }

    /// Wire the state with a caller-provided publisher (used by tests).
    pub fn with_publisher(
        registry: SessionRegistry,
        publisher: Arc<dyn PromptPublisher>,
    ) -> SharedState {
        Arc::new(Self {
            registry,
            sse: SseState::new(SSE_CAPACITY),
            publisher,
        })
    }

    /// The community registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Publisher the round controller sends prompts and announcements to.
    pub fn publisher(&self) -> &Arc<dyn PromptPublisher> {
        &self.publisher
    }

    /// Hub behind the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Hub behind the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin()
    }

    /// Token guard ensuring a single admin SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.sse.admin_token()
    }
}
