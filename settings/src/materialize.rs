//! Materialization of typed configuration objects.
//!
//! Combines resolved default candidates with the current override snapshot
//! for one `(tier, data_center, sub_app)` request and binds the winning
//! string values into the application's settings struct. Any conversion or
//! decryption failure fails the whole call: a partially populated object is
//! never handed to application code.

use std::borrow::Cow;

use strata_core::schema::Schema;
use strata_core::traits::Encryptor;
use strata_core::types::{Commit, DefaultValue, ScopeAxis, Snapshot, SubApp};
use strata_errors::MaterializeError;

/// A fully populated, typed configuration object with its bookkeeping
/// fields stamped.
#[derive(Debug, Clone)]
pub struct Materialized<S, T, D> {
    pub settings: S,
    pub application_name: String,
    pub commit: Option<Commit>,
    pub sub_app: Option<SubApp>,
    pub tier: T,
    pub data_center: D,
}

/// Produce the typed configuration object for one request.
///
/// Per setting: an override exactly matching `(setting, tier, data_center)`
/// beats any default; otherwise the most specific matching default wins
/// (sub-app layer over root, then a non-wildcard axis over a wildcard one).
/// Encrypted settings have the winning string decrypted before conversion.
pub fn materialize<S: Default, T: ScopeAxis, D: ScopeAxis>(
    schema: &Schema<S, T, D>,
    defaults: &crate::resolver::MergedDefaults<T, D>,
    snapshot: &Snapshot<T, D>,
    tier: T,
    data_center: D,
    sub_app: Option<&SubApp>,
    encryptor: Option<&dyn Encryptor>,
) -> Result<Materialized<S, T, D>, MaterializeError> {
    let mut settings = S::default();

    for (idx, setting) in schema.settings().iter().enumerate() {
        let raw = match snapshot.find_override(setting.name(), tier, data_center) {
            Some(over) => over.value.as_str(),
            None => select_default(setting.name(), defaults.candidates(idx), tier, data_center)?,
        };

        let value = if setting.is_encrypted() {
            let encryptor = encryptor.filter(|e| e.can_decrypt()).ok_or_else(|| {
                MaterializeError::MissingEncryptor {
                    setting: setting.name().to_string(),
                }
            })?;
            Cow::Owned(encryptor.decrypt(raw).map_err(|source| {
                MaterializeError::Decrypt {
                    setting: setting.name().to_string(),
                    source,
                }
            })?)
        } else {
            Cow::Borrowed(raw)
        };

        setting.apply(&mut settings, &value)?;
    }

    Ok(Materialized {
        settings,
        application_name: snapshot.application_name.clone(),
        commit: snapshot.commit.clone(),
        sub_app: sub_app.cloned(),
        tier,
        data_center,
    })
}

fn select_default<'a, T: ScopeAxis, D: ScopeAxis>(
    setting: &str,
    candidates: &'a [DefaultValue<T, D>],
    tier: T,
    data_center: D,
) -> Result<&'a str, MaterializeError> {
    let mut best: Option<&DefaultValue<T, D>> = None;
    let mut tied = false;

    for candidate in candidates.iter().filter(|c| c.matches(tier, data_center)) {
        match best {
            None => best = Some(candidate),
            Some(current) => {
                if candidate.specificity() > current.specificity() {
                    best = Some(candidate);
                    tied = false;
                } else if candidate.specificity() == current.specificity() {
                    tied = true;
                }
            }
        }
    }

    if tied {
        return Err(MaterializeError::AmbiguousCandidates {
            setting: setting.to_string(),
        });
    }
    best.map(|v| v.value.as_str())
        .ok_or_else(|| MaterializeError::MissingDefault {
            setting: setting.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{collect_root_defaults, collect_sub_app_defaults};
    use crate::test_support::{
        encrypted_schema, schema_with_provider, simple_schema, Dc, ReversingEncryptor,
        StaticProvider, Tier,
    };
    use strata_core::types::Override;

    fn snapshot_with(overrides: Vec<Override<Tier, Dc>>) -> Snapshot<Tier, Dc> {
        Snapshot {
            application_name: "app".to_string(),
            commit: Some(Commit::new("c1")),
            overrides,
        }
    }

    #[test]
    fn root_defaults_populate_the_object() {
        let schema = simple_schema();
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let result = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            None,
            None,
        )
        .unwrap();
        assert_eq!(result.settings.timeout, 30);
        assert_eq!(result.settings.retries, 2);
    }

    #[test]
    fn exact_override_beats_any_default() {
        let schema = simple_schema();
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let snapshot = snapshot_with(vec![Override::new("Timeout", Tier::Prod, Dc::East, "45")]);
        let result =
            materialize(&schema, &merged, &snapshot, Tier::Prod, Dc::East, None, None).unwrap();
        assert_eq!(result.settings.timeout, 45);
    }

    #[test]
    fn override_for_other_scope_does_not_apply() {
        let schema = simple_schema();
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let snapshot = snapshot_with(vec![Override::new("Timeout", Tier::Prod, Dc::West, "45")]);
        let result =
            materialize(&schema, &merged, &snapshot, Tier::Prod, Dc::East, None, None).unwrap();
        assert_eq!(result.settings.timeout, 30);
    }

    #[test]
    fn data_center_specific_default_outranks_wildcard() {
        let schema = schema_with_provider(
            "Retries",
            StaticProvider::new(vec![
                DefaultValue::new("Retries", None, Tier::Prod, Dc::Any, "5"),
                DefaultValue::new("Retries", None, Tier::Prod, Dc::East, "7"),
            ]),
        );
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let east = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            None,
            None,
        )
        .unwrap();
        assert_eq!(east.settings.retries, 7);

        let west = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::West,
            None,
            None,
        )
        .unwrap();
        assert_eq!(west.settings.retries, 5);
    }

    #[test]
    fn sub_app_scoped_default_applies_only_to_that_sub_app() {
        let schema = schema_with_provider(
            "Retries",
            StaticProvider::new(vec![DefaultValue::new(
                "Retries",
                Some(5),
                Tier::Any,
                Dc::Any,
                "3",
            )]),
        );
        let root = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();

        let billing = SubApp::new(5, "billing");
        let merged =
            collect_sub_app_defaults(&schema, "app", Tier::Prod, &billing, &root).unwrap();
        let result = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            Some(&billing),
            None,
        )
        .unwrap();
        assert_eq!(result.settings.retries, 3);

        let reports = SubApp::new(6, "reports");
        let merged =
            collect_sub_app_defaults(&schema, "app", Tier::Prod, &reports, &root).unwrap();
        let result = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            Some(&reports),
            None,
        )
        .unwrap();
        assert_eq!(result.settings.retries, 2);
    }

    #[test]
    fn conversion_failure_fails_the_whole_call() {
        let schema = simple_schema();
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let snapshot = snapshot_with(vec![Override::new(
            "Timeout",
            Tier::Prod,
            Dc::East,
            "not-a-number",
        )]);
        let err = materialize(&schema, &merged, &snapshot, Tier::Prod, Dc::East, None, None)
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Convert { .. }));
    }

    #[test]
    fn encrypted_setting_is_decrypted_before_conversion() {
        let encryptor = ReversingEncryptor::default();
        let schema = encrypted_schema(&encryptor, "s3cret");
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let result = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            None,
            Some(&encryptor),
        )
        .unwrap();
        assert_eq!(result.settings.api_key, "s3cret");
    }

    #[test]
    fn encrypted_setting_without_encryptor_is_fatal() {
        let encryptor = ReversingEncryptor::default();
        let schema = encrypted_schema(&encryptor, "s3cret");
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let err = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MaterializeError::MissingEncryptor { .. }));
    }

    #[test]
    fn bookkeeping_fields_are_stamped() {
        let schema = simple_schema();
        let merged = collect_root_defaults(&schema, "app", Tier::Prod).unwrap();
        let sub_app = SubApp::new(5, "billing");
        let result = materialize(
            &schema,
            &merged,
            &snapshot_with(vec![]),
            Tier::Prod,
            Dc::East,
            Some(&sub_app),
            None,
        )
        .unwrap();
        assert_eq!(result.application_name, "app");
        assert_eq!(result.commit, Some(Commit::new("c1")));
        assert_eq!(result.sub_app, Some(sub_app));
        assert_eq!(result.tier, Tier::Prod);
        assert_eq!(result.data_center, Dc::East);
    }
}
