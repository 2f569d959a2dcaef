//! # Strata Settings
//!
//! Resolution engine for the strata configuration system.
//!
//! This crate provides:
//! - Default-value resolution across tiers, data centers, and sub-apps
//! - Materialization of typed configuration objects
//! - Per-sub-app memoization with structural sharing
//! - A commit-keyed snapshot cache over the backing override store
//! - An in-memory backing store and the high-level [`SettingsClient`]

pub mod client;
pub mod materialize;
pub mod memory_store;
pub mod resolver;
pub mod subapp_cache;
pub mod versioned_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::SettingsClient;
pub use materialize::{materialize, Materialized};
pub use memory_store::MemoryStore;
pub use resolver::{collect_root_defaults, collect_sub_app_defaults, MergedDefaults};
pub use subapp_cache::{SubAppCache, SubAppEntry};
pub use versioned_store::VersionedStore;
