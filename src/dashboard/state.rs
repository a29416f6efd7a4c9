//! Visible dashboard state
//!
//! Holds the last published refresh snapshot. Each refresh is stamped with a
//! generation when it starts; a snapshot is published only if no newer
//! generation is already visible, so a slow superseded refresh can never
//! overwrite the results of a later one.

use crate::dashboard::refresh::RefreshSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct DashboardState {
    generation: AtomicU64,
    visible: RwLock<Option<Arc<RefreshSnapshot>>>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the generation for a refresh that is about to start
    pub fn begin_refresh(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation handed out, published or not
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the visible snapshot wholesale. Returns false when the
    /// snapshot is older than the one already visible.
    pub async fn publish(&self, snapshot: Arc<RefreshSnapshot>) -> bool {
        let mut visible = self.visible.write().await;
        if let Some(current) = visible.as_ref() {
            if current.generation > snapshot.generation {
                debug!(
                    "Discarding refresh generation {} (visible: {})",
                    snapshot.generation, current.generation
                );
                return false;
            }
        }
        *visible = Some(snapshot);
        true
    }

    pub async fn current(&self) -> Option<Arc<RefreshSnapshot>> {
        self.visible.read().await.clone()
    }
}
