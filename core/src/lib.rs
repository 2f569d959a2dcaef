//! # Strata Core
//!
//! Core types and collaborator contracts for the strata configuration system.
//!
//! This crate provides:
//! - Scope axes (tier / data center) and the value-object data model
//! - The flat scope-key codec used when an external store addresses
//!   overrides by string keys
//! - The declarative schema builder (settings, bindings, default providers)
//! - Contracts for the backing override store and the encryptor

pub mod schema;
pub mod scope_key;
pub mod traits;
pub mod types;

pub use schema::{Schema, SchemaBuilder, SettingSpec};
pub use scope_key::{decode, encode};
pub use traits::{BackingStore, DefaultsProvider, Encryptor, ProviderContext};
pub use types::{Commit, DefaultValue, Override, ScopeAxis, Snapshot, SubApp};
