//! # Forma Collaboration Server Library
//!
//! Shared state and handlers for the collaboration server.
//! This library is used by both the binary and integration tests.

use collab_core::{CollabConfig, CollabStore};

pub mod health;
pub mod metrics;
pub mod registry;
pub mod routes;
pub mod session;
pub mod sweeper;
pub mod validation;

pub use registry::ConnectionRegistry;
pub use session::{collaboration_handler, disconnect, ClientSession, JoinParams};
pub use sweeper::spawn_sweeper;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Per-project collaboration state store.
    pub store: CollabStore,
    /// Live connections and their outbound channels.
    pub registry: ConnectionRegistry,
}

impl AppState {
    /// Build the application state from configuration.
    #[must_use]
    pub fn new(config: CollabConfig) -> Self {
        Self {
            store: CollabStore::with_config(config),
            registry: ConnectionRegistry::new(),
        }
    }

    /// The configuration the store was built with.
    #[must_use]
    pub fn config(&self) -> &CollabConfig {
        self.store.config()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CollabConfig::default())
    }
}
