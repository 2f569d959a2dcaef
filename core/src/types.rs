//! Value-object data model shared by all resolution paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A deployment scope axis: the tier or data-center dimension of a scope.
///
/// Implementations are small application-defined enums. Each variant maps to
/// a stable, small, non-negative ordinal used by the persisted key grammar;
/// `ANY` is the wildcard sentinel meaning "applies to any value of this
/// axis".
pub trait ScopeAxis: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The wildcard sentinel.
    const ANY: Self;

    /// Stable ordinal for the persisted key grammar.
    fn ordinal(&self) -> u32;

    /// Reverse of [`ordinal`](Self::ordinal); `None` for unknown ordinals.
    fn from_ordinal(ordinal: u32) -> Option<Self>;

    fn is_any(&self) -> bool {
        *self == Self::ANY
    }
}

/// An optional named partition within one application. Sub-applications
/// share the application's schema but may override defaults independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubApp {
    pub id: u32,
    pub name: String,
}

impl SubApp {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Opaque version token for an override set.
///
/// Equality implies (by contract of the external store) that the override
/// set is unchanged; the token is never parsed semantically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commit(String);

impl Commit {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate default value for one setting, scoped by sub-app, tier, and
/// data center. Either axis may be the wildcard sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue<T, D> {
    pub setting_name: String,
    pub sub_app_id: Option<u32>,
    pub tier: T,
    pub data_center: D,
    pub value: String,
}

impl<T: ScopeAxis, D: ScopeAxis> DefaultValue<T, D> {
    pub fn new(
        setting_name: impl Into<String>,
        sub_app_id: Option<u32>,
        tier: T,
        data_center: D,
        value: impl Into<String>,
    ) -> Self {
        Self {
            setting_name: setting_name.into(),
            sub_app_id,
            tier,
            data_center,
            value: value.into(),
        }
    }

    pub fn is_wildcard_tier(&self) -> bool {
        self.tier.is_any()
    }

    /// True when this value applies to a request for the given scope.
    pub fn matches(&self, tier: T, data_center: D) -> bool {
        (self.tier.is_any() || self.tier == tier)
            && (self.data_center.is_any() || self.data_center == data_center)
    }

    /// Number of non-wildcard axes; higher is more specific. The sub-app
    /// layer outranks any axis specificity.
    pub fn specificity(&self) -> u32 {
        let layer = if self.sub_app_id.is_some() { 4 } else { 0 };
        layer + u32::from(!self.tier.is_any()) + u32::from(!self.data_center.is_any())
    }
}

/// An operator-set override for one setting. Always scope-exact: wildcards
/// are not permitted on either axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override<T, D> {
    pub setting_name: String,
    pub tier: T,
    pub data_center: D,
    pub value: String,
}

impl<T: ScopeAxis, D: ScopeAxis> Override<T, D> {
    pub fn new(
        setting_name: impl Into<String>,
        tier: T,
        data_center: D,
        value: impl Into<String>,
    ) -> Self {
        Self {
            setting_name: setting_name.into(),
            tier,
            data_center,
            value: value.into(),
        }
    }
}

/// The immutable pairing of a commit token with the full override list
/// fetched at that commit. A fresh snapshot fully replaces a cached one.
///
/// `commit` is `None` when no override has ever been written for the
/// application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T, D> {
    pub application_name: String,
    pub commit: Option<Commit>,
    pub overrides: Vec<Override<T, D>>,
}

impl<T: ScopeAxis, D: ScopeAxis> Snapshot<T, D> {
    pub fn empty(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            commit: None,
            overrides: Vec::new(),
        }
    }

    /// The override exactly matching `(setting_name, tier, data_center)`,
    /// if any. Overrides are scope-exact, so no wildcard logic applies.
    pub fn find_override(&self, setting_name: &str, tier: T, data_center: D) -> Option<&Override<T, D>> {
        self.overrides.iter().find(|o| {
            o.setting_name == setting_name && o.tier == tier && o.data_center == data_center
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Tier {
        Any,
        Staging,
        Prod,
    }

    impl ScopeAxis for Tier {
        const ANY: Self = Tier::Any;

        fn ordinal(&self) -> u32 {
            match self {
                Tier::Any => 0,
                Tier::Staging => 1,
                Tier::Prod => 2,
            }
        }

        fn from_ordinal(ordinal: u32) -> Option<Self> {
            match ordinal {
                0 => Some(Tier::Any),
                1 => Some(Tier::Staging),
                2 => Some(Tier::Prod),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Dc {
        Any,
        East,
        West,
    }

    impl ScopeAxis for Dc {
        const ANY: Self = Dc::Any;

        fn ordinal(&self) -> u32 {
            match self {
                Dc::Any => 0,
                Dc::East => 1,
                Dc::West => 2,
            }
        }

        fn from_ordinal(ordinal: u32) -> Option<Self> {
            match ordinal {
                0 => Some(Dc::Any),
                1 => Some(Dc::East),
                2 => Some(Dc::West),
                _ => None,
            }
        }
    }

    #[test]
    fn default_value_matches_wildcards() {
        let v: DefaultValue<Tier, Dc> =
            DefaultValue::new("Timeout", None, Tier::Any, Dc::Any, "30");
        assert!(v.matches(Tier::Prod, Dc::East));
        assert!(v.matches(Tier::Staging, Dc::West));
        assert!(v.is_wildcard_tier());
    }

    #[test]
    fn default_value_matches_exact_axes_only() {
        let v: DefaultValue<Tier, Dc> =
            DefaultValue::new("Timeout", None, Tier::Prod, Dc::Any, "45");
        assert!(v.matches(Tier::Prod, Dc::East));
        assert!(!v.matches(Tier::Staging, Dc::East));
    }

    #[test]
    fn specificity_orders_sub_app_above_axes() {
        let root: DefaultValue<Tier, Dc> =
            DefaultValue::new("Timeout", None, Tier::Prod, Dc::East, "1");
        let scoped: DefaultValue<Tier, Dc> =
            DefaultValue::new("Timeout", Some(5), Tier::Any, Dc::Any, "2");
        assert!(scoped.specificity() > root.specificity());
    }

    #[test]
    fn snapshot_find_override_is_scope_exact() {
        let snapshot = Snapshot {
            application_name: "app".to_string(),
            commit: Some(Commit::new("c1")),
            overrides: vec![Override::new("Timeout", Tier::Prod, Dc::East, "45")],
        };
        assert!(snapshot.find_override("Timeout", Tier::Prod, Dc::East).is_some());
        assert!(snapshot.find_override("Timeout", Tier::Prod, Dc::West).is_none());
        assert!(snapshot.find_override("Timeout", Tier::Staging, Dc::East).is_none());
    }

    #[test]
    fn commit_is_opaque_and_comparable() {
        let a = Commit::new("c1");
        let b = Commit::new("c1");
        let c = Commit::new("c2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "c1");
        assert_eq!(a.to_string(), "c1");
    }
}
