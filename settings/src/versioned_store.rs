//! Commit-keyed snapshot cache over the backing override store.
//!
//! A cache hit costs one cheap commit-token call instead of a full fetch.
//! The sole correctness assumption is the store's contract that equal
//! commit tokens imply an unchanged override set. Locks are never held
//! across store calls; a failed fetch leaves the previous cache entry
//! intact.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use strata_core::traits::BackingStore;
use strata_core::types::{Commit, Override, ScopeAxis, Snapshot};
use strata_errors::StoreError;

pub struct VersionedStore<T: ScopeAxis, D: ScopeAxis> {
    store: Arc<dyn BackingStore<T, D>>,
    known_settings: HashSet<String>,
    cache: Mutex<HashMap<String, Arc<Snapshot<T, D>>>>,
}

impl<T: ScopeAxis, D: ScopeAxis> VersionedStore<T, D> {
    /// `known_settings` is the set of schema setting names, used once per
    /// application to reconcile orphaned overrides on cold start.
    pub fn new(store: Arc<dyn BackingStore<T, D>>, known_settings: HashSet<String>) -> Self {
        Self {
            store,
            known_settings,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The current snapshot for `app_name`, served from cache when the
    /// store's commit token is unchanged.
    pub async fn get_snapshot(&self, app_name: &str) -> Result<Arc<Snapshot<T, D>>, StoreError> {
        let cached = self.cache.lock().get(app_name).cloned();

        if let Some(snapshot) = cached {
            let current = self.store.get_current_commit(app_name).await?;
            if current == snapshot.commit {
                debug!(app = app_name, "snapshot cache hit");
                return Ok(snapshot);
            }
            let fresh = Arc::new(self.store.fetch_snapshot(app_name).await?);
            info!(
                app = app_name,
                commit = ?fresh.commit,
                "override snapshot refreshed"
            );
            self.cache
                .lock()
                .insert(app_name.to_string(), Arc::clone(&fresh));
            return Ok(fresh);
        }

        let fresh = Arc::new(self.store.fetch_snapshot(app_name).await?);
        // Another task may have fetched concurrently; only the task whose
        // insert created the entry runs the one-time reconciliation.
        let cold = self
            .cache
            .lock()
            .insert(app_name.to_string(), Arc::clone(&fresh))
            .is_none();
        if cold {
            self.cleanup_orphans(app_name, &fresh).await;
        }
        Ok(fresh)
    }

    /// Thin pass-through to the backing store's commit-token call.
    pub async fn get_current_commit(&self, app_name: &str) -> Result<Option<Commit>, StoreError> {
        self.store.get_current_commit(app_name).await
    }

    /// Commit of the cached snapshot, if one exists. `Some(None)` means a
    /// snapshot is cached for an application with no overrides yet.
    pub fn cached_commit(&self, app_name: &str) -> Option<Option<Commit>> {
        self.cache.lock().get(app_name).map(|s| s.commit.clone())
    }

    async fn cleanup_orphans(&self, app_name: &str, snapshot: &Snapshot<T, D>) {
        let orphans: Vec<Override<T, D>> = snapshot
            .overrides
            .iter()
            .filter(|o| !self.known_settings.contains(&o.setting_name))
            .cloned()
            .collect();
        if orphans.is_empty() {
            return;
        }
        warn!(
            app = app_name,
            count = orphans.len(),
            "removing overrides for settings no longer in the schema"
        );
        if let Err(e) = self
            .store
            .delete_orphaned_overrides(app_name, &orphans)
            .await
        {
            // Best effort: the orphans are harmless until the next cold start.
            warn!(app = app_name, error = %e, "orphaned override cleanup failed");
        }
    }
}
