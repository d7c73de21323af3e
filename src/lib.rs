//! Session Registry - headless service for tracking client sessions
//!
//! Clients register a session (name, email, client MAC); the server records it
//! alongside the caller's address and its own network identity. Sessions can
//! then be inspected, refreshed, terminated, listed, or purged in bulk.
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use session_registry::{Config, Core};
//!
//! let core = Core::new(Config::default()).unwrap();
//! core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! session-registry --config ~/.session-registry/config.toml
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod ephemeral;
pub mod error;
pub mod handlers;
pub mod network;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use error::{CoreError, Result};
pub use handlers::SessionRegistry;
pub use store::SessionStore;

use clock::Clock;
use network::IdentityProvider;

/// Core service wiring configuration, storage and the registry together
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Session lifecycle operations over the configured store
    registry: SessionRegistry,
}

impl Core {
    /// Create a new Core instance with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let store = SessionStore::open(&config)?;
        Self::with_store(config, store, IdentityProvider::Host)
    }

    /// Create a Core instance over an existing store and identity source
    pub fn with_store(
        config: Config,
        store: SessionStore,
        identity: IdentityProvider,
    ) -> Result<Self> {
        let clock = Clock::new(&config.registry.timezone)?;
        let registry = SessionRegistry::new(store, identity, clock)
            .with_strict_updates(config.registry.strict_updates);

        Ok(Core { config, registry })
    }

    /// Get the session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr()?;
        tracing::info!(
            "Starting API server on {} (storage: {})",
            addr,
            self.config.storage.as_str()
        );
        api::serve(addr, self.registry.clone(), &self.config).await
    }
}
