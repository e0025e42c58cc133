//! # Typed Value Codec
//!
//! Reversible mapping between [`DomainValue`] and plain JSON.
//!
//! JSON kinds pass through untouched. Every other kind is replaced by a tagged
//! wrapper:
//!
//! ```text
//! { "@type": "BigInt", "value": "340282366920938463463374607431768211457" }
//! ```
//!
//! Decoding is driven by the tag, like a JSON reviver: any object whose
//! `@type` names a reserved tag is turned back into the original kind.
//!
//! ## Format limitation
//!
//! A plain object that happens to carry a reserved `@type` key together with a
//! string `value` is indistinguishable from a typed value and is revived as
//! one. Payload authors must not use `@type` as a field name.

use crate::errors::CodecError;
use crate::value::{DomainValue, ValueMap};
use chrono::{DateTime, SecondsFormat, Utc};
use num::BigInt;
use serde_json::{Map, Value};
use std::fmt;

/// Key holding the tag of a typed value.
pub const TYPE_KEY: &str = "@type";

/// Key holding the string form of a typed value.
pub const VALUE_KEY: &str = "value";

/// Reserved tags understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    BigInt,
    Date,
    Buffer,
    AccountAddress,
    ContractAddress,
    ModuleReference,
    CcdAmount,
}

impl TypeTag {
    /// All reserved tags.
    pub const ALL: [TypeTag; 7] = [
        Self::BigInt,
        Self::Date,
        Self::Buffer,
        Self::AccountAddress,
        Self::ContractAddress,
        Self::ModuleReference,
        Self::CcdAmount,
    ];

    /// Wire name of the tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigInt => "BigInt",
            Self::Date => "Date",
            Self::Buffer => "Buffer",
            Self::AccountAddress => "AccountAddress",
            Self::ContractAddress => "ContractAddress",
            Self::ModuleReference => "ModuleReference",
            Self::CcdAmount => "CcdAmount",
        }
    }

    /// Look up a tag by wire name. Unknown names are not reserved.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a value into JSON, tagging every non-JSON kind.
#[must_use]
pub fn encode(value: &DomainValue) -> Value {
    match value {
        DomainValue::Null => Value::Null,
        DomainValue::Bool(b) => Value::Bool(*b),
        DomainValue::Number(n) => Value::Number(n.clone()),
        DomainValue::String(s) => Value::String(s.clone()),
        DomainValue::Array(items) => Value::Array(items.iter().map(encode).collect()),
        DomainValue::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), encode(item)))
                .collect(),
        ),
        DomainValue::BigInt(n) => tagged(TypeTag::BigInt, n.to_string()),
        DomainValue::Date(date) => tagged(
            TypeTag::Date,
            date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        DomainValue::Buffer(bytes) => tagged(TypeTag::Buffer, hex::encode(bytes)),
        DomainValue::AccountAddress(address) => {
            tagged(TypeTag::AccountAddress, address.to_string())
        }
        DomainValue::ContractAddress(address) => {
            tagged(TypeTag::ContractAddress, address.to_string())
        }
        DomainValue::ModuleReference(reference) => {
            tagged(TypeTag::ModuleReference, reference.to_string())
        }
        DomainValue::CcdAmount(amount) => tagged(TypeTag::CcdAmount, amount.to_string()),
    }
}

/// Decode JSON produced by [`encode`] back into a value.
///
/// # Errors
///
/// Returns `CodecError` when a reserved tag carries a missing or malformed
/// value. Unknown tags are left as plain objects.
pub fn decode(value: Value) -> Result<DomainValue, CodecError> {
    Ok(match value {
        Value::Null => DomainValue::Null,
        Value::Bool(b) => DomainValue::Bool(b),
        Value::Number(n) => DomainValue::Number(n),
        Value::String(s) => DomainValue::String(s),
        Value::Array(items) => DomainValue::Array(
            items
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(map) => decode_object(map)?,
    })
}

/// Encode to JSON text.
#[must_use]
pub fn stringify(value: &DomainValue) -> String {
    encode(value).to_string()
}

/// Parse JSON text and revive typed values.
///
/// # Errors
///
/// `CodecError::InvalidJson` for text that is not JSON, otherwise as [`decode`].
pub fn parse(text: &str) -> Result<DomainValue, CodecError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    decode(value)
}

fn tagged(tag: TypeTag, value: String) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::String(tag.as_str().to_string()));
    map.insert(VALUE_KEY.to_string(), Value::String(value));
    Value::Object(map)
}

fn decode_object(map: Map<String, Value>) -> Result<DomainValue, CodecError> {
    let tag = map
        .get(TYPE_KEY)
        .and_then(Value::as_str)
        .and_then(TypeTag::from_name);

    if let Some(tag) = tag {
        let raw = map
            .get(VALUE_KEY)
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingValue { tag: tag.as_str() })?;
        return revive(tag, raw);
    }

    let mut out = ValueMap::new();
    for (key, item) in map {
        out.insert(key, decode(item)?);
    }
    Ok(DomainValue::Object(out))
}

fn revive(tag: TypeTag, raw: &str) -> Result<DomainValue, CodecError> {
    let malformed = |reason: String| CodecError::MalformedValue {
        tag: tag.as_str(),
        value: raw.to_string(),
        reason,
    };

    Ok(match tag {
        TypeTag::BigInt => DomainValue::BigInt(
            raw.parse::<BigInt>()
                .map_err(|e| malformed(e.to_string()))?,
        ),
        TypeTag::Date => DomainValue::Date(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| malformed(e.to_string()))?
                .with_timezone(&Utc),
        ),
        TypeTag::Buffer => {
            DomainValue::Buffer(hex::decode(raw).map_err(|e| malformed(e.to_string()))?)
        }
        TypeTag::AccountAddress => {
            DomainValue::AccountAddress(raw.parse().map_err(|e| malformed(format!("{e}")))?)
        }
        TypeTag::ContractAddress => {
            DomainValue::ContractAddress(raw.parse().map_err(|e| malformed(format!("{e}")))?)
        }
        TypeTag::ModuleReference => {
            DomainValue::ModuleReference(raw.parse().map_err(|e| malformed(format!("{e}")))?)
        }
        TypeTag::CcdAmount => {
            DomainValue::CcdAmount(raw.parse().map_err(|e| malformed(format!("{e}")))?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AccountAddress, CcdAmount, ContractAddress, ModuleReference};
    use chrono::TimeZone;
    use num::One;
    use serde_json::json;

    fn round_trip(value: DomainValue) {
        let decoded = parse(&stringify(&value)).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_big_integers_survive_any_magnitude() {
        let huge = BigInt::one() << 300u32;
        round_trip(DomainValue::BigInt(huge.clone()));
        round_trip(DomainValue::BigInt(-huge));
        round_trip(DomainValue::BigInt(BigInt::from(u64::MAX) + 1));
        round_trip(DomainValue::BigInt(BigInt::from(0)));
    }

    #[test]
    fn test_buffers_including_empty() {
        round_trip(DomainValue::Buffer(Vec::new()));
        round_trip(DomainValue::Buffer(vec![0, 1, 2, 254, 255]));
        round_trip(DomainValue::Buffer(vec![0xaa; 4096]));
        assert_eq!(
            encode(&DomainValue::Buffer(Vec::new())),
            json!({"@type": "Buffer", "value": ""})
        );
    }

    #[test]
    fn test_dates_keep_sub_second_precision() {
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        round_trip(DomainValue::Date(date));
    }

    #[test]
    fn test_chain_entities() {
        round_trip(DomainValue::AccountAddress(AccountAddress::from_bytes([9; 32])));
        round_trip(DomainValue::ContractAddress(ContractAddress::new(u64::MAX, 3)));
        round_trip(DomainValue::ModuleReference(ModuleReference([1; 32])));
        round_trip(DomainValue::CcdAmount(CcdAmount::from_micro_ccd(u64::MAX)));
    }

    #[test]
    fn test_nested_graph() {
        let value = DomainValue::object([
            ("amount", DomainValue::CcdAmount(CcdAmount::from_micro_ccd(42))),
            (
                "params",
                DomainValue::Array(vec![
                    DomainValue::BigInt(BigInt::from(-7)),
                    DomainValue::Null,
                    DomainValue::object([("raw", DomainValue::Buffer(vec![1, 2, 3]))]),
                ]),
            ),
            ("memo", "hello".into()),
            ("flag", true.into()),
            ("count", 12u32.into()),
        ]);
        round_trip(value);
    }

    #[test]
    fn test_plain_json_passes_through() {
        let plain = json!({"a": [1, "two", null, {"b": false}]});
        assert_eq!(encode(&decode(plain.clone()).unwrap()), plain);
    }

    #[test]
    fn test_unknown_tag_is_plain_object() {
        let value = decode(json!({"@type": "Widget", "value": "x"})).unwrap();
        assert_eq!(value.get(TYPE_KEY).and_then(DomainValue::as_str), Some("Widget"));
    }

    #[test]
    fn test_reserved_tag_on_plain_object_is_revived() {
        // Documented limitation: the tag wins.
        let value = decode(json!({"@type": "BigInt", "value": "5"})).unwrap();
        assert_eq!(value, DomainValue::BigInt(BigInt::from(5)));
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(matches!(
            decode(json!({"@type": "BigInt", "value": "12abc"})),
            Err(CodecError::MalformedValue { tag: "BigInt", .. })
        ));
        assert!(matches!(
            decode(json!({"@type": "Buffer", "value": "zz"})),
            Err(CodecError::MalformedValue { tag: "Buffer", .. })
        ));
        assert!(matches!(
            decode(json!({"@type": "Date", "value": 5})),
            Err(CodecError::MissingValue { tag: "Date" })
        ));
        assert!(matches!(
            decode(json!([{"@type": "AccountAddress", "value": "nope"}])),
            Err(CodecError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(parse("{not json"), Err(CodecError::InvalidJson(_))));
    }
}
