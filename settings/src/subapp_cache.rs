//! Per-process memoization of resolved defaults, keyed by sub-application.
//!
//! Entries are built completely before being published into the concurrent
//! map with a single atomic insert, so no partially constructed entry is
//! ever observable. Under a race the first insert wins and the losing
//! thread adopts the published entry.

use std::sync::Arc;

use dashmap::DashMap;

use crate::resolver::{collect_root_defaults, collect_sub_app_defaults, MergedDefaults};
use strata_core::schema::Schema;
use strata_core::types::{ScopeAxis, SubApp};
use strata_errors::SchemaError;

/// One initialized cache entry, immutable after publication.
pub struct SubAppEntry<T, D> {
    pub sub_app: Option<SubApp>,
    pub defaults: Arc<MergedDefaults<T, D>>,
}

/// Lazy, thread-safe cache of [`SubAppEntry`] values keyed by
/// `(tier, sub_app)`. The root entry (no sub-app) is resolved first and
/// shared structurally by sub-apps that contribute no defaults of their
/// own.
pub struct SubAppCache<T: ScopeAxis, D: ScopeAxis> {
    entries: DashMap<(u32, Option<u32>), Arc<SubAppEntry<T, D>>>,
}

impl<T: ScopeAxis, D: ScopeAxis> SubAppCache<T, D> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The entry for `(tier, sub_app)`, resolving and publishing it on
    /// first use.
    pub fn entry_for<S>(
        &self,
        schema: &Schema<S, T, D>,
        app_name: &str,
        tier: T,
        sub_app: Option<&SubApp>,
    ) -> Result<Arc<SubAppEntry<T, D>>, SchemaError> {
        let key = (tier.ordinal(), sub_app.map(|s| s.id));
        if let Some(entry) = self.entries.get(&key) {
            return Ok(Arc::clone(&entry));
        }

        let entry = match sub_app {
            None => Arc::new(SubAppEntry {
                sub_app: None,
                defaults: collect_root_defaults(schema, app_name, tier)?,
            }),
            Some(sub_app) => {
                let root = self.entry_for(schema, app_name, tier, None)?;
                let defaults =
                    collect_sub_app_defaults(schema, app_name, tier, sub_app, &root.defaults)?;
                Arc::new(SubAppEntry {
                    sub_app: Some(sub_app.clone()),
                    defaults,
                })
            }
        };

        tracing::debug!(sub_app = ?key.1, "resolved defaults for sub-app");
        let published = self.entries.entry(key).or_insert(entry);
        Ok(Arc::clone(&published))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ScopeAxis, D: ScopeAxis> Default for SubAppCache<T, D> {
    fn default() -> Self {
        Self::new()
    }
}
