//! Flat string keys for overrides.
//!
//! External stores that address overrides by a single string key use the
//! grammar `":" <tier_ordinal> ":" <dc_ordinal> ";" <setting_name>`. The
//! encoding is bidirectional and lossless; it must stay bit-exact for
//! interoperability with any store keyed this way.

use crate::types::ScopeAxis;

/// Encode an override scope as a flat key.
pub fn encode<T: ScopeAxis, D: ScopeAxis>(setting_name: &str, tier: T, data_center: D) -> String {
    format!(
        ":{}:{};{}",
        tier.ordinal(),
        data_center.ordinal(),
        setting_name
    )
}

/// Decode a flat key back into `(setting_name, tier, data_center)`.
///
/// Returns `None` for anything that does not match the grammar exactly:
/// the two ordinal segments must be plain ASCII digits (no sign, no
/// whitespace) and the setting name must be non-empty.
pub fn decode<T: ScopeAxis, D: ScopeAxis>(key: &str) -> Option<(String, T, D)> {
    let rest = key.strip_prefix(':')?;
    let (tier_digits, rest) = rest.split_once(':')?;
    let (dc_digits, setting_name) = rest.split_once(';')?;

    if setting_name.is_empty() {
        return None;
    }

    let tier = T::from_ordinal(parse_ordinal(tier_digits)?)?;
    let data_center = D::from_ordinal(parse_ordinal(dc_digits)?)?;
    Some((setting_name.to_string(), tier, data_center))
}

// str::parse would accept a leading '+', which the grammar does not.
fn parse_ordinal(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Tier {
        Any,
        Prod,
    }

    impl ScopeAxis for Tier {
        const ANY: Self = Tier::Any;

        fn ordinal(&self) -> u32 {
            match self {
                Tier::Any => 0,
                Tier::Prod => 1,
            }
        }

        fn from_ordinal(ordinal: u32) -> Option<Self> {
            match ordinal {
                0 => Some(Tier::Any),
                1 => Some(Tier::Prod),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Dc {
        Any,
        East,
    }

    impl ScopeAxis for Dc {
        const ANY: Self = Dc::Any;

        fn ordinal(&self) -> u32 {
            match self {
                Dc::Any => 0,
                Dc::East => 1,
            }
        }

        fn from_ordinal(ordinal: u32) -> Option<Self> {
            match ordinal {
                0 => Some(Dc::Any),
                1 => Some(Dc::East),
                _ => None,
            }
        }
    }

    #[test]
    fn encode_produces_exact_grammar() {
        assert_eq!(encode("Db.Timeout", Tier::Prod, Dc::East), ":1:1;Db.Timeout");
        assert_eq!(encode("Flag", Tier::Any, Dc::Any), ":0:0;Flag");
    }

    #[test]
    fn round_trip_reproduces_the_triple() {
        for (name, tier, dc) in [
            ("Timeout", Tier::Any, Dc::Any),
            ("Db.Pool.Size", Tier::Prod, Dc::East),
            ("a.b.c.d", Tier::Prod, Dc::Any),
        ] {
            let key = encode(name, tier, dc);
            let (decoded_name, decoded_tier, decoded_dc) =
                decode::<Tier, Dc>(&key).expect("key should decode");
            assert_eq!(decoded_name, name);
            assert_eq!(decoded_tier, tier);
            assert_eq!(decoded_dc, dc);
        }
    }

    #[test]
    fn decode_rejects_non_matching_shapes() {
        for key in [
            "",
            "Timeout",
            "1:1;Timeout",     // missing leading colon
            ":1;Timeout",      // missing second ordinal
            ":1:1Timeout",     // missing semicolon
            ":1:1;",           // empty setting name
            ":x:1;Timeout",    // non-numeric tier
            ":1:+1;Timeout",   // signed ordinal
            ": 1:1;Timeout",   // whitespace
            "::1;Timeout",     // empty tier segment
            ":9:1;Timeout",    // unknown tier ordinal
            ":1:9;Timeout",    // unknown data-center ordinal
        ] {
            assert!(decode::<Tier, Dc>(key).is_none(), "should reject {key:?}");
        }
    }

    #[test]
    fn decode_keeps_dotted_setting_names_intact() {
        let (name, _, _) = decode::<Tier, Dc>(":0:0;My.Nested.Setting").unwrap();
        assert_eq!(name, "My.Nested.Setting");
    }
}
