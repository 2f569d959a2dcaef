//! # Strata Errors
//!
//! Shared error taxonomy for the strata configuration system.
//!
//! - Uses `thiserror` for structured error definitions with named fields
//! - Schema errors are fatal at startup and never recovered
//! - Materialization errors are fatal for the single call that raised them
//! - Store errors propagate to the caller and leave cached state untouched

use thiserror::Error;

/// Errors raised while building or resolving a settings schema.
///
/// These indicate a misconfigured application and must abort startup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("setting name is empty or has empty path segments: {name:?}")]
    InvalidName { name: String },

    #[error("duplicate setting name: {name}")]
    DuplicateSetting { name: String },

    #[error("setting {name} has no value binding")]
    MissingBinding { name: String },

    #[error("setting {name} is encrypted and cannot allow inline plaintext defaults")]
    InvalidAttributeCombination { name: String },

    #[error("unknown setting: {name}")]
    UnknownSetting { name: String },

    #[error(
        "provider attached to setting {setting} emitted a default for foreign setting {foreign}"
    )]
    ForeignDefault { setting: String, foreign: String },

    #[error(
        "ambiguous default for setting {setting}: two values share scope \
         (sub_app={sub_app:?}, tier={tier}, data_center={data_center})"
    )]
    AmbiguousDefault {
        setting: String,
        sub_app: Option<u32>,
        tier: String,
        data_center: String,
    },

    #[error(
        "overlapping scoped defaults for setting {setting} (sub_app={sub_app:?}): \
         one value is tier-specific with wildcard data center, the other \
         data-center-specific with wildcard tier"
    )]
    OverlappingScopes {
        setting: String,
        sub_app: Option<u32>,
    },

    #[error("schema declares encrypted settings but no encryptor was supplied")]
    MissingEncryptor,

    #[error("encryptor failed its round-trip probe: {reason}")]
    EncryptorProbeFailed { reason: String },
}

/// Errors raised while encrypting or decrypting a setting value.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed: {reason}")]
    EncryptFailed { reason: String },

    #[error("decryption failed: {reason}")]
    DecryptFailed { reason: String },
}

/// Errors raised while materializing a typed configuration object.
///
/// Any one of these fails the whole materialization call: a partially
/// populated object is never handed to application code.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("cannot convert value for setting {setting}: {reason}")]
    Convert { setting: String, reason: String },

    #[error("setting {setting} is encrypted but no decrypting encryptor is available")]
    MissingEncryptor { setting: String },

    #[error("cannot decrypt value for setting {setting}")]
    Decrypt {
        setting: String,
        #[source]
        source: EncryptionError,
    },

    // Prevented by collection-time uniqueness checks; raised only if a merged
    // defaults list was built outside those checks.
    #[error("internal invariant violated: equally specific defaults for setting {setting}")]
    AmbiguousCandidates { setting: String },

    // The root default is wildcard-scoped and always present, so this is
    // unreachable for lists built by the resolver.
    #[error("internal invariant violated: no default matches the request for setting {setting}")]
    MissingDefault { setting: String },
}

/// Errors surfaced by the external override store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("override store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("override store operation {operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    #[error("override store request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Umbrella error for resolution entry points and subscriber callbacks.
///
/// Synchronous and asynchronous paths report the same conditions through
/// this one type.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// Overrides are scope-exact; neither axis may be the wildcard.
    #[error("override scope must be exact: wildcard {axis} given for setting {setting}")]
    WildcardOverrideScope {
        setting: String,
        axis: &'static str,
    },
}
