//! Default-value resolution.
//!
//! Merges schema-declared root defaults with provider-emitted scoped
//! defaults into one list per setting, filtered for the requested tier.
//! Data-center filtering is deferred to materialization because the data
//! center is a per-call parameter, not a per-resolution one.

use std::sync::Arc;

use strata_core::schema::{Schema, Setting};
use strata_core::traits::ProviderContext;
use strata_core::types::{DefaultValue, ScopeAxis, SubApp};
use strata_errors::SchemaError;

/// Resolved default candidates, one ordered list per schema setting.
///
/// Lists are aligned with the schema's setting order. For a sub-application
/// the lists layer sub-app-scoped values on top of the root values; the
/// sub-app layer outranks the root layer at materialization time.
#[derive(Debug)]
pub struct MergedDefaults<T, D> {
    per_setting: Vec<Vec<DefaultValue<T, D>>>,
}

impl<T: ScopeAxis, D: ScopeAxis> MergedDefaults<T, D> {
    pub fn candidates(&self, setting_index: usize) -> &[DefaultValue<T, D>] {
        &self.per_setting[setting_index]
    }

    pub fn len(&self) -> usize {
        self.per_setting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_setting.is_empty()
    }
}

/// Collect the root (no sub-app) merged defaults for the given tier.
///
/// Every setting contributes its root default; providers may add values
/// scoped to the wildcard tier or to `tier` exactly.
pub fn collect_root_defaults<S, T: ScopeAxis, D: ScopeAxis>(
    schema: &Schema<S, T, D>,
    app_name: &str,
    tier: T,
) -> Result<Arc<MergedDefaults<T, D>>, SchemaError> {
    let mut per_setting = Vec::with_capacity(schema.len());
    for setting in schema.settings() {
        let mut values = vec![setting.root_default().clone()];
        collect_provider_values(setting, app_name, tier, None, &mut values)?;
        validate_scopes(setting.name(), &values)?;
        per_setting.push(values);
    }
    Ok(Arc::new(MergedDefaults { per_setting }))
}

/// Collect the merged defaults for one sub-application.
///
/// When no provider emits a value scoped to this sub-app for any setting,
/// the root list is returned unchanged (the same `Arc`): an empty scoped
/// layer inherits everything from root, and the shared list lets downstream
/// per-sub-app work be skipped entirely.
pub fn collect_sub_app_defaults<S, T: ScopeAxis, D: ScopeAxis>(
    schema: &Schema<S, T, D>,
    app_name: &str,
    tier: T,
    sub_app: &SubApp,
    root: &Arc<MergedDefaults<T, D>>,
) -> Result<Arc<MergedDefaults<T, D>>, SchemaError> {
    let mut scoped: Vec<Vec<DefaultValue<T, D>>> = Vec::with_capacity(schema.len());
    let mut any_scoped = false;

    for setting in schema.settings() {
        let mut values = Vec::new();
        collect_provider_values(setting, app_name, tier, Some(sub_app), &mut values)?;
        validate_scopes(setting.name(), &values)?;
        any_scoped |= !values.is_empty();
        scoped.push(values);
    }

    if !any_scoped {
        tracing::debug!(
            sub_app = sub_app.id,
            "sub-app contributes no scoped defaults, sharing root list"
        );
        return Ok(Arc::clone(root));
    }

    let per_setting = root
        .per_setting
        .iter()
        .zip(scoped)
        .map(|(root_values, scoped_values)| {
            let mut merged = root_values.clone();
            merged.extend(scoped_values);
            merged
        })
        .collect();
    Ok(Arc::new(MergedDefaults { per_setting }))
}

fn collect_provider_values<S, T: ScopeAxis, D: ScopeAxis>(
    setting: &Setting<S, T, D>,
    app_name: &str,
    tier: T,
    sub_app: Option<&SubApp>,
    out: &mut Vec<DefaultValue<T, D>>,
) -> Result<(), SchemaError> {
    let requested_id = sub_app.map(|s| s.id);
    let ctx = ProviderContext {
        app_name,
        setting_name: setting.name(),
        setting_type: setting.type_name(),
        tier,
        sub_app,
    };
    for provider in setting.providers() {
        for value in provider.defaults(&ctx) {
            if value.setting_name != setting.name() {
                return Err(SchemaError::ForeignDefault {
                    setting: setting.name().to_string(),
                    foreign: value.setting_name,
                });
            }
            if value.sub_app_id != requested_id {
                continue;
            }
            if !value.tier.is_any() && value.tier != tier {
                continue;
            }
            out.push(value);
        }
    }
    Ok(())
}

// Collection-time scope checks: duplicate (sub_app, tier, dc) tuples are
// ambiguous, and a tier-specific/dc-wildcard value may not coexist with a
// tier-wildcard/dc-specific value for the same setting and sub-app. The
// second rule makes the mixed-axis materialization tie impossible by
// construction.
fn validate_scopes<T: ScopeAxis, D: ScopeAxis>(
    setting: &str,
    values: &[DefaultValue<T, D>],
) -> Result<(), SchemaError> {
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            if a.sub_app_id != b.sub_app_id {
                continue;
            }
            if a.tier == b.tier && a.data_center == b.data_center {
                return Err(SchemaError::AmbiguousDefault {
                    setting: setting.to_string(),
                    sub_app: a.sub_app_id,
                    tier: format!("{:?}", a.tier),
                    data_center: format!("{:?}", a.data_center),
                });
            }
            let a_tier_only = !a.tier.is_any() && a.data_center.is_any();
            let a_dc_only = a.tier.is_any() && !a.data_center.is_any();
            let b_tier_only = !b.tier.is_any() && b.data_center.is_any();
            let b_dc_only = b.tier.is_any() && !b.data_center.is_any();
            if (a_tier_only && b_dc_only) || (a_dc_only && b_tier_only) {
                return Err(SchemaError::OverlappingScopes {
                    setting: setting.to_string(),
                    sub_app: a.sub_app_id,
                });
            }
        }
    }
    Ok(())
}
