/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Gateway builder for fluent configuration.

use crate::gateway::Gateway;
use fixgate_core::error::FixError;
use fixgate_session::{GatewayConfig, SessionConfig};
use fixgate_store::{MemorySequenceStore, SequenceStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for a [`Gateway`].
#[derive(Debug)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    in_memory_sequences: bool,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    /// Creates a builder with no sessions and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::new(Vec::new()),
            in_memory_sequences: false,
        }
    }

    /// Starts from a loaded configuration.
    #[must_use]
    pub const fn from_config(config: GatewayConfig) -> Self {
        Self {
            config,
            in_memory_sequences: false,
        }
    }

    /// Adds a session configuration.
    #[must_use]
    pub fn add_session(mut self, config: SessionConfig) -> Self {
        self.config.sessions.push(config);
        self
    }

    /// Sets the directory for sequence files.
    #[must_use]
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    /// Sets the capacity of each event queue.
    #[must_use]
    pub const fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.event_queue_capacity = capacity;
        self
    }

    /// Keeps sequence numbers in memory instead of on disk.
    #[must_use]
    pub const fn with_in_memory_sequences(mut self, enabled: bool) -> Self {
        self.in_memory_sequences = enabled;
        self
    }

    /// Returns the configured sessions.
    #[must_use]
    pub fn sessions(&self) -> &[SessionConfig] {
        &self.config.sessions
    }

    /// Returns the accumulated configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validates the configuration and opens every session.
    ///
    /// # Errors
    /// `FixError::Config` for an invalid configuration, `FixError::Store` if
    /// persisted sequence numbers cannot be read.
    pub async fn build(self) -> Result<Gateway, FixError> {
        if self.in_memory_sequences {
            Gateway::with_sequence_stores(self.config, |_| {
                Arc::new(MemorySequenceStore::default()) as Arc<dyn SequenceStore>
            })
            .await
        } else {
            Gateway::new(self.config).await
        }
    }
}
