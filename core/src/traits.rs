//! Contracts for external collaborators.

use async_trait::async_trait;
use strata_errors::{EncryptionError, StoreError};

use crate::types::{Commit, DefaultValue, Override, ScopeAxis, Snapshot, SubApp};

/// The external system that durably persists and retrieves override records.
///
/// Fetching a snapshot or a commit token is the only I/O-bound suspension
/// point in the system; callers never hold internal locks across these
/// calls. Any mutation that changes the override set must cause a
/// subsequent `get_current_commit` to return a different token.
#[async_trait]
pub trait BackingStore<T: ScopeAxis, D: ScopeAxis>: Send + Sync {
    /// Current commit token for the application; `None` when no override
    /// has ever been written. Must be cheap relative to a full fetch.
    async fn get_current_commit(&self, app_name: &str) -> Result<Option<Commit>, StoreError>;

    /// Full override list plus the commit it was read at.
    async fn fetch_snapshot(&self, app_name: &str) -> Result<Snapshot<T, D>, StoreError>;

    async fn set_override(
        &self,
        app_name: &str,
        setting_name: &str,
        value: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), StoreError>;

    async fn clear_override(
        &self,
        app_name: &str,
        setting_name: &str,
        tier: T,
        data_center: D,
    ) -> Result<(), StoreError>;

    /// Best-effort removal of persisted overrides that reference settings no
    /// longer present in the schema. Invoked once per application on cold
    /// cache start; the caller computes the orphan list.
    async fn delete_orphaned_overrides(
        &self,
        app_name: &str,
        orphans: &[Override<T, D>],
    ) -> Result<(), StoreError>;
}

/// Pluggable encryption capability for settings marked encrypted.
///
/// Implementations are validated once at client construction by
/// round-tripping a random probe string.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError>;

    /// False for encrypt-only deployments (e.g. a public key without the
    /// private half).
    fn can_decrypt(&self) -> bool;
}

/// The request handed to a default-value provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderContext<'a, T> {
    pub app_name: &'a str,
    pub setting_name: &'a str,
    /// Type name of the setting's bound Rust type, for diagnostics.
    pub setting_type: &'a str,
    pub tier: T,
    pub sub_app: Option<&'a SubApp>,
}

/// A schema-attached generator of scope-specific default values beyond the
/// root default.
///
/// A provider may only emit values for the setting it is attached to;
/// emitting a value for a foreign setting is a fatal schema error.
pub trait DefaultsProvider<T: ScopeAxis, D: ScopeAxis>: Send + Sync {
    fn defaults(&self, ctx: &ProviderContext<'_, T>) -> Vec<DefaultValue<T, D>>;
}
