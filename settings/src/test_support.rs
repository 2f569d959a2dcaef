//! Shared fixtures for this crate's unit tests.

use strata_core::schema::{Schema, SettingSpec};
use strata_core::traits::{DefaultsProvider, Encryptor, ProviderContext};
use strata_core::types::{DefaultValue, ScopeAxis};
use strata_errors::EncryptionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
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
pub enum Dc {
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

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    pub timeout: i64,
    pub retries: u32,
    pub api_key: String,
}

/// Schema with two plain settings: `Timeout` (i64, "30") and `Retries`
/// (u32, "2").
pub fn simple_schema() -> Schema<AppConfig, Tier, Dc> {
    Schema::builder()
        .setting(SettingSpec::new("Timeout", "30").bind(|s: &mut AppConfig, v: i64| {
            s.timeout = v;
        }))
        .setting(SettingSpec::new("Retries", "2").bind(|s: &mut AppConfig, v: u32| {
            s.retries = v;
        }))
        .build()
        .expect("valid schema")
}

/// [`simple_schema`] with `provider` attached to the named setting.
pub fn schema_with_provider(
    setting: &str,
    provider: StaticProvider,
) -> Schema<AppConfig, Tier, Dc> {
    let provider = std::sync::Arc::new(provider);
    let mut builder = Schema::builder();
    for (name, default) in [("Timeout", "30"), ("Retries", "2")] {
        let mut spec = match name {
            "Timeout" => SettingSpec::new(name, default).bind(|s: &mut AppConfig, v: i64| {
                s.timeout = v;
            }),
            _ => SettingSpec::new(name, default).bind(|s: &mut AppConfig, v: u32| {
                s.retries = v;
            }),
        };
        if name == setting {
            spec = spec.provider(provider.clone());
        }
        builder = builder.setting(spec);
    }
    builder.build().expect("valid schema")
}

/// Schema whose only setting is the encrypted `ApiKey`, defaulted to the
/// ciphertext of `plaintext` under `encryptor`.
pub fn encrypted_schema(
    encryptor: &ReversingEncryptor,
    plaintext: &str,
) -> Schema<AppConfig, Tier, Dc> {
    let ciphertext = encryptor.encrypt(plaintext).expect("test encryptor");
    Schema::builder()
        .setting(
            SettingSpec::new("ApiKey", ciphertext)
                .encrypted()
                .bind(|s: &mut AppConfig, v: String| {
                    s.api_key = v;
                }),
        )
        .build()
        .expect("valid schema")
}

/// A provider returning a fixed list of values; the resolver does all
/// filtering.
pub struct StaticProvider {
    values: Vec<DefaultValue<Tier, Dc>>,
}

impl StaticProvider {
    pub fn new(values: Vec<DefaultValue<Tier, Dc>>) -> Self {
        Self { values }
    }
}

impl DefaultsProvider<Tier, Dc> for StaticProvider {
    fn defaults(&self, _ctx: &ProviderContext<'_, Tier>) -> Vec<DefaultValue<Tier, Dc>> {
        self.values.clone()
    }
}

/// Toy reversible "encryption": prefix plus reversed characters. Good
/// enough to observe that decryption actually ran.
#[derive(Debug, Default)]
pub struct ReversingEncryptor;

impl Encryptor for ReversingEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        Ok(format!("enc:{}", plaintext.chars().rev().collect::<String>()))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError> {
        let reversed =
            ciphertext
                .strip_prefix("enc:")
                .ok_or_else(|| EncryptionError::DecryptFailed {
                    reason: "missing ciphertext prefix".to_string(),
                })?;
        Ok(reversed.chars().rev().collect())
    }

    fn can_decrypt(&self) -> bool {
        true
    }
}

/// An encryptor that never reproduces its input; used to exercise the
/// construction-time round-trip probe.
#[derive(Debug, Default)]
pub struct CorruptingEncryptor;

impl Encryptor for CorruptingEncryptor {
    fn encrypt(&self, _plaintext: &str) -> Result<String, EncryptionError> {
        Ok("garbage".to_string())
    }

    fn decrypt(&self, _ciphertext: &str) -> Result<String, EncryptionError> {
        Ok("different garbage".to_string())
    }

    fn can_decrypt(&self) -> bool {
        true
    }
}
