//! Declarative settings schema.
//!
//! A schema is built once per process, at startup, from explicit
//! registrations: each setting declares its dotted name, root default,
//! typed binding into the application's settings struct, flags, and any
//! attached default-value providers. The schema is immutable and shared by
//! all resolution paths thereafter.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use strata_errors::{MaterializeError, SchemaError};

use crate::traits::DefaultsProvider;
use crate::types::{DefaultValue, ScopeAxis};

type BindFn<S> = Arc<dyn Fn(&mut S, &str) -> Result<(), MaterializeError> + Send + Sync>;

/// One schema-declared setting, immutable once the schema is built.
pub struct Setting<S, T, D> {
    name: String,
    type_name: &'static str,
    is_encrypted: bool,
    allow_inline: bool,
    change_requires_restart: bool,
    root_default: DefaultValue<T, D>,
    providers: Vec<Arc<dyn DefaultsProvider<T, D>>>,
    bind: BindFn<S>,
}

impl<S, T: ScopeAxis, D: ScopeAxis> Setting<S, T, D> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    pub fn allow_inline(&self) -> bool {
        self.allow_inline
    }

    pub fn change_requires_restart(&self) -> bool {
        self.change_requires_restart
    }

    /// The always-present wildcard-scope default.
    pub fn root_default(&self) -> &DefaultValue<T, D> {
        &self.root_default
    }

    pub fn providers(&self) -> &[Arc<dyn DefaultsProvider<T, D>>] {
        &self.providers
    }

    /// Convert `value` to the setting's declared type and assign it into
    /// the settings struct.
    pub fn apply(&self, settings: &mut S, value: &str) -> Result<(), MaterializeError> {
        (self.bind)(settings, value)
    }
}

/// Builder for one setting registration.
pub struct SettingSpec<S, T, D> {
    name: String,
    root_default_value: String,
    type_name: &'static str,
    is_encrypted: bool,
    allow_inline: bool,
    change_requires_restart: bool,
    providers: Vec<Arc<dyn DefaultsProvider<T, D>>>,
    bind: Option<BindFn<S>>,
}

impl<S, T: ScopeAxis, D: ScopeAxis> SettingSpec<S, T, D> {
    pub fn new(name: impl Into<String>, root_default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root_default_value: root_default.into(),
            type_name: "",
            is_encrypted: false,
            allow_inline: true,
            change_requires_restart: false,
            providers: Vec::new(),
            bind: None,
        }
    }

    /// Bind the setting to a typed field of the settings struct. The string
    /// value is parsed via `FromStr` and handed to `assign`.
    pub fn bind<V>(mut self, assign: impl Fn(&mut S, V) + Send + Sync + 'static) -> Self
    where
        V: FromStr,
        V::Err: Display,
    {
        let name = self.name.clone();
        self.type_name = std::any::type_name::<V>();
        self.bind = Some(Arc::new(move |settings, raw| {
            let value = raw.parse::<V>().map_err(|e| MaterializeError::Convert {
                setting: name.clone(),
                reason: e.to_string(),
            })?;
            assign(settings, value);
            Ok(())
        }));
        self
    }

    /// Mark the setting encrypted. Encrypted settings carry ciphertext
    /// defaults and therefore also disable inline plaintext defaults.
    pub fn encrypted(mut self) -> Self {
        self.is_encrypted = true;
        self.allow_inline = false;
        self
    }

    pub fn allow_inline(mut self, allow: bool) -> Self {
        self.allow_inline = allow;
        self
    }

    pub fn requires_restart(mut self) -> Self {
        self.change_requires_restart = true;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn DefaultsProvider<T, D>>) -> Self {
        self.providers.push(provider);
        self
    }
}

/// The ordered, immutable list of setting descriptors for one application
/// type.
pub struct Schema<S, T, D> {
    settings: Vec<Setting<S, T, D>>,
    index: HashMap<String, usize>,
}

impl<S, T, D> std::fmt::Debug for Schema<S, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").finish_non_exhaustive()
    }
}

impl<S, T: ScopeAxis, D: ScopeAxis> Schema<S, T, D> {
    pub fn builder() -> SchemaBuilder<S, T, D> {
        SchemaBuilder {
            specs: Vec::new(),
        }
    }

    pub fn settings(&self) -> &[Setting<S, T, D>] {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Setting<S, T, D>> {
        self.index.get(name).map(|&i| &self.settings[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn has_encrypted_settings(&self) -> bool {
        self.settings.iter().any(Setting::is_encrypted)
    }

    /// Names of settings whose change requires a process restart, for
    /// subscribers that diff materialized objects.
    pub fn restart_settings(&self) -> impl Iterator<Item = &str> {
        self.settings
            .iter()
            .filter(|s| s.change_requires_restart)
            .map(|s| s.name.as_str())
    }
}

/// Collects setting registrations and validates them into a [`Schema`].
pub struct SchemaBuilder<S, T, D> {
    specs: Vec<SettingSpec<S, T, D>>,
}

impl<S, T: ScopeAxis, D: ScopeAxis> SchemaBuilder<S, T, D> {
    pub fn setting(mut self, spec: SettingSpec<S, T, D>) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate all registrations and freeze the schema.
    ///
    /// Fatal on: empty or malformed dotted names, duplicate names, a
    /// missing binding, or an encrypted setting that allows inline
    /// plaintext defaults.
    pub fn build(self) -> Result<Schema<S, T, D>, SchemaError> {
        let mut settings = Vec::with_capacity(self.specs.len());
        let mut index = HashMap::with_capacity(self.specs.len());

        for spec in self.specs {
            if spec.name.is_empty() || spec.name.split('.').any(str::is_empty) {
                return Err(SchemaError::InvalidName { name: spec.name });
            }
            if index.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateSetting { name: spec.name });
            }
            if spec.is_encrypted && spec.allow_inline {
                return Err(SchemaError::InvalidAttributeCombination { name: spec.name });
            }
            let bind = spec.bind.ok_or_else(|| SchemaError::MissingBinding {
                name: spec.name.clone(),
            })?;

            let root_default = DefaultValue::new(
                spec.name.clone(),
                None,
                T::ANY,
                D::ANY,
                spec.root_default_value,
            );

            index.insert(spec.name.clone(), settings.len());
            settings.push(Setting {
                name: spec.name,
                type_name: spec.type_name,
                is_encrypted: spec.is_encrypted,
                allow_inline: spec.allow_inline,
                change_requires_restart: spec.change_requires_restart,
                root_default,
                providers: spec.providers,
                bind,
            });
        }

        Ok(Schema { settings, index })
    }
}
