//! The high-level settings client.
//!
//! Ties the schema, the versioned snapshot cache, the sub-app defaults
//! cache, and the optional encryptor together behind one facade. The async
//! entry points do I/O orchestration only; all resolution logic lives in
//! the synchronous core ([`get_from_snapshot`](SettingsClient::get_from_snapshot)),
//! which both paths share. Neither API is implemented by blocking on the
//! other.
//!
//! Caller hazard: wrapping the async entry points in `block_on` from
//! within a constrained executor risks deadlock; prefer the synchronous
//! core with an already-fetched snapshot in such contexts.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::materialize::{materialize, Materialized};
use crate::subapp_cache::SubAppCache;
use crate::versioned_store::VersionedStore;
use strata_core::schema::Schema;
use strata_core::traits::{BackingStore, Encryptor};
use strata_core::types::{Commit, ScopeAxis, Snapshot, SubApp};
use strata_errors::{ResolveError, SchemaError, StoreError};

pub struct SettingsClient<S, T: ScopeAxis, D: ScopeAxis> {
    schema: Arc<Schema<S, T, D>>,
    store: Arc<dyn BackingStore<T, D>>,
    versioned: VersionedStore<T, D>,
    sub_apps: SubAppCache<T, D>,
    encryptor: Option<Arc<dyn Encryptor>>,
}

impl<S, T: ScopeAxis, D: ScopeAxis> std::fmt::Debug for SettingsClient<S, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsClient").finish_non_exhaustive()
    }
}

impl<S: Default, T: ScopeAxis, D: ScopeAxis> SettingsClient<S, T, D> {
    /// Validates the schema/encryptor pairing and, when an encryptor is
    /// present, round-trips a random probe string through it. Construction
    /// fails fatally if the round trip does not reproduce the probe.
    pub fn new(
        schema: Arc<Schema<S, T, D>>,
        store: Arc<dyn BackingStore<T, D>>,
        encryptor: Option<Arc<dyn Encryptor>>,
    ) -> Result<Self, SchemaError> {
        if let Some(encryptor) = encryptor.as_deref() {
            probe_round_trip(encryptor)?;
        }
        if schema.has_encrypted_settings() {
            match encryptor.as_deref() {
                Some(e) if e.can_decrypt() => {}
                _ => return Err(SchemaError::MissingEncryptor),
            }
        }

        let known_settings = schema
            .settings()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        Ok(Self {
            schema,
            versioned: VersionedStore::new(Arc::clone(&store), known_settings),
            store,
            sub_apps: SubAppCache::new(),
            encryptor,
        })
    }

    pub fn schema(&self) -> &Arc<Schema<S, T, D>> {
        &self.schema
    }

    /// Fetch (or reuse) the current snapshot and materialize the typed
    /// configuration object for `(tier, data_center, sub_app)`.
    pub async fn get_app_settings(
        &self,
        app_name: &str,
        tier: T,
        data_center: D,
        sub_app: Option<&SubApp>,
    ) -> Result<Materialized<S, T, D>, ResolveError> {
        let snapshot = self.versioned.get_snapshot(app_name).await?;
        self.get_from_snapshot(&snapshot, tier, data_center, sub_app)
    }

    /// Synchronous core shared by every resolution path: resolve (or reuse
    /// memoized) defaults, then materialize against the given snapshot.
    pub fn get_from_snapshot(
        &self,
        snapshot: &Snapshot<T, D>,
        tier: T,
        data_center: D,
        sub_app: Option<&SubApp>,
    ) -> Result<Materialized<S, T, D>, ResolveError> {
        let entry =
            self.sub_apps
                .entry_for(&self.schema, &snapshot.application_name, tier, sub_app)?;
        materialize(
            &self.schema,
            &entry.defaults,
            snapshot,
            tier,
            data_center,
            sub_app,
            self.encryptor.as_deref(),
        )
        .map_err(Into::into)
    }

    /// Current snapshot, served from the commit-keyed cache when unchanged.
    pub async fn snapshot(&self, app_name: &str) -> Result<Arc<Snapshot<T, D>>, StoreError> {
        self.versioned.get_snapshot(app_name).await
    }

    pub async fn get_current_commit(&self, app_name: &str) -> Result<Option<Commit>, StoreError> {
        self.versioned.get_current_commit(app_name).await
    }

    /// Commit of the cached snapshot, if any; used by pollers to detect
    /// change without forcing a fetch.
    pub fn cached_commit(&self, app_name: &str) -> Option<Option<Commit>> {
        self.versioned.cached_commit(app_name)
    }

    /// Persist an override after validating that the setting exists, the
    /// scope is exact, and the value converts to the setting's type
    /// (decrypting first for encrypted settings).
    pub async fn set_override(
        &self,
        app_name: &str,
        setting_name: &str,
        value: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), ResolveError> {
        let setting = self.schema.get(setting_name).ok_or_else(|| {
            SchemaError::UnknownSetting {
                name: setting_name.to_string(),
            }
        })?;
        require_exact_scope(setting_name, tier, data_center)?;

        let plaintext = if setting.is_encrypted() {
            let encryptor = self
                .encryptor
                .as_deref()
                .ok_or(SchemaError::MissingEncryptor)?;
            encryptor
                .decrypt(value)
                .map_err(|source| strata_errors::MaterializeError::Decrypt {
                    setting: setting_name.to_string(),
                    source,
                })?
        } else {
            value.to_string()
        };
        // reject unconvertible values before they reach the store
        let mut scratch = S::default();
        setting.apply(&mut scratch, &plaintext)?;

        self.store
            .set_override(app_name, setting_name, value, tier, data_center)
            .await?;
        info!(app = app_name, setting = setting_name, "override set");
        Ok(())
    }

    pub async fn clear_override(
        &self,
        app_name: &str,
        setting_name: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), ResolveError> {
        if !self.schema.contains(setting_name) {
            return Err(SchemaError::UnknownSetting {
                name: setting_name.to_string(),
            }
            .into());
        }
        require_exact_scope(setting_name, tier, data_center)?;
        self.store
            .clear_override(app_name, setting_name, tier, data_center)
            .await?;
        info!(app = app_name, setting = setting_name, "override cleared");
        Ok(())
    }
}

fn require_exact_scope<T: ScopeAxis, D: ScopeAxis>(
    setting_name: &str,
    tier: T,
    data_center: D,
) -> Result<(), ResolveError> {
    if tier.is_any() {
        return Err(ResolveError::WildcardOverrideScope {
            setting: setting_name.to_string(),
            axis: "tier",
        });
    }
    if data_center.is_any() {
        return Err(ResolveError::WildcardOverrideScope {
            setting: setting_name.to_string(),
            axis: "data center",
        });
    }
    Ok(())
}

fn probe_round_trip(encryptor: &dyn Encryptor) -> Result<(), SchemaError> {
    if !encryptor.can_decrypt() {
        return Ok(());
    }
    let probe = Uuid::new_v4().to_string();
    let ciphertext = encryptor
        .encrypt(&probe)
        .map_err(|e| SchemaError::EncryptorProbeFailed {
            reason: e.to_string(),
        })?;
    let round_trip = encryptor
        .decrypt(&ciphertext)
        .map_err(|e| SchemaError::EncryptorProbeFailed {
            reason: e.to_string(),
        })?;
    if round_trip != probe {
        return Err(SchemaError::EncryptorProbeFailed {
            reason: "round trip did not reproduce the probe string".to_string(),
        });
    }
    Ok(())
}
