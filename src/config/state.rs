// Application state module
// Shared, read-only after startup: configuration plus injected collaborators

use std::sync::Arc;

use super::types::Config;
use crate::logger::Observer;
use crate::store::KvStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KvStore>,
    pub observer: Arc<dyn Observer>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn KvStore>, observer: Arc<dyn Observer>) -> Self {
        Self {
            config,
            store,
            observer,
        }
    }

    /// Conditional-write budget for collection appends
    pub const fn max_retries(&self) -> u32 {
        self.config.store.max_retries
    }
}
