//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use envlog_core::{Clock, SystemClock, ZoneResolver};
use envlog_store::ReadingStore;
use envlog_types::Reading;

use crate::config::Config;

/// Shared application state.
///
/// The store is the only mutable piece. Handlers lock it just long enough to
/// append or copy readings out, then build their view without holding it.
pub struct AppState {
    /// The reading store.
    pub store: Mutex<Box<dyn ReadingStore>>,
    /// Configuration, fixed for the lifetime of the process.
    pub config: Config,
    /// Time zone that dates and slots are computed in.
    pub resolver: ZoneResolver,
    /// Source of "now" for ingest stamps and the grid window.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create application state backed by the system clock.
    pub fn new(store: Box<dyn ReadingStore>, config: Config) -> Arc<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create application state with an explicit clock.
    pub fn with_clock(
        store: Box<dyn ReadingStore>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let resolver = ZoneResolver::new(&config.time.timezone);
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            resolver,
            clock,
        })
    }

    /// Copy out the most recent `limit` readings, oldest first.
    pub async fn recent(&self, limit: Option<usize>) -> envlog_store::Result<Vec<Reading>> {
        let store = self.store.lock().await;
        store.scan(limit)
    }
}
