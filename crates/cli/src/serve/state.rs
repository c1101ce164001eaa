//! Application state: the live contact list and its current snapshot.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use upline_core::{ContactRecord, ResolverConfig, Snapshot};

/// One published build. Swapped whole, never mutated in place.
pub(crate) struct Current {
    pub(crate) contacts: Vec<ContactRecord>,
    pub(crate) snapshot: Arc<Snapshot>,
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Validated at startup; fixed for the life of the server.
    pub(crate) config: ResolverConfig,
    pub(crate) current: RwLock<Current>,
    /// Serializes rebuilds so two mutations cannot interleave.
    pub(crate) rebuild: Mutex<()>,
}

impl AppState {
    pub(crate) fn new(
        config: ResolverConfig,
        contacts: Vec<ContactRecord>,
        snapshot: Snapshot,
    ) -> Self {
        AppState {
            config,
            current: RwLock::new(Current {
                contacts,
                snapshot: Arc::new(snapshot),
            }),
            rebuild: Mutex::new(()),
        }
    }

    pub(crate) async fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().await.snapshot.clone()
    }

    pub(crate) async fn contacts(&self) -> Vec<ContactRecord> {
        self.current.read().await.contacts.clone()
    }

    /// Publish a finished build.
    pub(crate) async fn publish(
        &self,
        contacts: Vec<ContactRecord>,
        snapshot: Snapshot,
    ) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().await;
        *current = Current {
            contacts,
            snapshot: snapshot.clone(),
        };
        snapshot
    }
}
