//! Decimal string serialization for big integers.
//!
//! Ciphertexts and key material are far larger than any JSON number, so they
//! travel as base-10 strings. Use with `#[serde(with = "serde_dec")]`.

use num_bigint_dig::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.to_str_radix(10).serialize(serializer)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrUint {
    String(String),
    Uint(u64),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrUint::deserialize(deserializer)? {
        StringOrUint::String(s) => parse(&s).ok_or_else(|| {
            de::Error::custom(format!("expected a decimal integer string, got {:?}", s))
        }),
        StringOrUint::Uint(u) => Ok(BigUint::from(u)),
    }
}

/// Parse a non-empty string of ASCII digits. Signs, whitespace and radix
/// prefixes are rejected.
pub fn parse(s: &str) -> Option<BigUint> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
}
