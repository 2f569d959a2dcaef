//! In-memory backing store.
//!
//! Keyed by the flat scope-key grammar, so the persisted-key encoding is
//! exercised the same way an external keyed store would. Serves tests and
//! single-process deployments; every successful mutation rotates the
//! application's commit token to a fresh UUID.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;
use uuid::Uuid;

use strata_core::scope_key;
use strata_core::traits::BackingStore;
use strata_core::types::{Commit, Override, ScopeAxis, Snapshot};
use strata_errors::StoreError;

struct AppRecord {
    commit: Commit,
    overrides: BTreeMap<String, String>,
}

pub struct MemoryStore<T, D> {
    apps: Mutex<HashMap<String, AppRecord>>,
    _scope: PhantomData<fn() -> (T, D)>,
}

impl<T: ScopeAxis, D: ScopeAxis> MemoryStore<T, D> {
    pub fn new() -> Self {
        Self {
            apps: Mutex::new(HashMap::new()),
            _scope: PhantomData,
        }
    }

    fn rotate(record: &mut AppRecord) {
        record.commit = Commit::new(Uuid::new_v4().to_string());
    }
}

impl<T: ScopeAxis, D: ScopeAxis> Default for MemoryStore<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: ScopeAxis, D: ScopeAxis> BackingStore<T, D> for MemoryStore<T, D> {
    async fn get_current_commit(&self, app_name: &str) -> Result<Option<Commit>, StoreError> {
        Ok(self.apps.lock().get(app_name).map(|r| r.commit.clone()))
    }

    async fn fetch_snapshot(&self, app_name: &str) -> Result<Snapshot<T, D>, StoreError> {
        let apps = self.apps.lock();
        let Some(record) = apps.get(app_name) else {
            return Ok(Snapshot::empty(app_name));
        };

        let mut overrides = Vec::with_capacity(record.overrides.len());
        for (key, value) in &record.overrides {
            match scope_key::decode::<T, D>(key) {
                Some((setting_name, tier, data_center)) => {
                    overrides.push(Override::new(setting_name, tier, data_center, value.clone()));
                }
                None => {
                    // Keys are produced by encode(), so this indicates outside
                    // tampering with the map; skip rather than fail the fetch.
                    warn!(app = app_name, key, "skipping undecodable override key");
                }
            }
        }
        Ok(Snapshot {
            application_name: app_name.to_string(),
            commit: Some(record.commit.clone()),
            overrides,
        })
    }

    async fn set_override(
        &self,
        app_name: &str,
        setting_name: &str,
        value: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), StoreError> {
        let mut apps = self.apps.lock();
        let record = apps.entry(app_name.to_string()).or_insert_with(|| AppRecord {
            commit: Commit::new(Uuid::new_v4().to_string()),
            overrides: BTreeMap::new(),
        });
        record.overrides.insert(
            scope_key::encode(setting_name, tier, data_center),
            value.to_string(),
        );
        Self::rotate(record);
        Ok(())
    }

    async fn clear_override(
        &self,
        app_name: &str,
        setting_name: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), StoreError> {
        let mut apps = self.apps.lock();
        if let Some(record) = apps.get_mut(app_name) {
            let key = scope_key::encode(setting_name, tier, data_center);
            if record.overrides.remove(&key).is_some() {
                Self::rotate(record);
            }
        }
        Ok(())
    }

    async fn delete_orphaned_overrides(
        &self,
        app_name: &str,
        orphans: &[Override<T, D>],
    ) -> Result<(), StoreError> {
        let mut apps = self.apps.lock();
        if let Some(record) = apps.get_mut(app_name) {
            let mut removed = false;
            for orphan in orphans {
                let key =
                    scope_key::encode(&orphan.setting_name, orphan.tier, orphan.data_center);
                removed |= record.overrides.remove(&key).is_some();
            }
            if removed {
                Self::rotate(record);
            }
        }
        Ok(())
    }
}
