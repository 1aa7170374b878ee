//! Serde support for the native value types
//!
//! Native values serialize as a newtype struct with a reserved name. Serializers and
//! deserializers of this crate recognize that name and route the value through the
//! [converters](crate::converters), so the native layer sees the value itself. Every other
//! Serde format sees the extended-object form in the canonical dialect, for example
//! `{"$oid": "..."}`, and the `Deserialize` implementations accept that form back.

use duplicate::duplicate_item;
use serde::{
    de::{Error as _, MapAccess, SeqAccess, Unexpected, Visitor},
    ser::{Error as _, SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};

use super::buffer::{Token, TokenBuffer};
use crate::{
    bson::{
        Binary, Bson, DateTime, Document, ElementType, JavaScriptCodeWithScope, MaxKey, MinKey,
        ObjectId, Regex, Timestamp, Undefined,
    },
    converters::{
        bson_value,
        extended::{self, ExtendedKey},
    },
    reader::ReaderError,
    token::{TokenType, TokenValue},
    writer::ExtendedJsonDialect,
};

/// Name of the newtype struct wrapping a native value
pub(crate) const NATIVE_VALUE_NEWTYPE: &str = "$__bson_token_adapter_native_value";

/// Value serialized in its extended-object form
enum ExtendedShape<'a> {
    Value(&'a Bson),
    Document(&'a Document),
}

impl Serialize for ExtendedShape<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buffer = TokenBuffer::new();
        match self {
            ExtendedShape::Value(value) => bson_value::write_value(&mut buffer, value),
            ExtendedShape::Document(document) => bson_value::write_document(&mut buffer, document),
        }
        .map_err(S::Error::custom)?;
        TokenSlice(buffer.tokens()).serialize(serializer)
    }
}

/// Tokens of exactly one value
struct TokenSlice<'a>(&'a [Token]);

/// Number of tokens of the value starting at the first token
fn value_len(tokens: &[Token]) -> usize {
    let mut depth = 0_usize;
    for (index, (token_type, _)) in tokens.iter().enumerate() {
        if token_type.is_start_token() {
            depth += 1;
        } else if token_type.is_end_token() {
            depth = depth.saturating_sub(1);
        }
        if depth == 0 && *token_type != TokenType::PropertyName {
            return index + 1;
        }
    }
    tokens.len()
}

impl Serialize for TokenSlice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(((token_type, value), mut rest)) = self.0.split_first() else {
            return Err(S::Error::custom("missing value"));
        };

        match (token_type, value) {
            (TokenType::StartObject, _) => {
                let mut map = serializer.serialize_map(None)?;
                while let Some(((TokenType::PropertyName, Some(TokenValue::String(name))), after)) =
                    rest.split_first()
                {
                    let len = value_len(after);
                    map.serialize_entry(name, &TokenSlice(&after[..len]))?;
                    rest = &after[len..];
                }
                map.end()
            }
            (TokenType::StartArray, _) => {
                let mut seq = serializer.serialize_seq(None)?;
                while !matches!(rest.first(), Some((TokenType::EndArray, _)) | None) {
                    let len = value_len(rest);
                    seq.serialize_element(&TokenSlice(&rest[..len]))?;
                    rest = &rest[len..];
                }
                seq.end()
            }
            (TokenType::String, Some(TokenValue::String(s))) => serializer.serialize_str(s),
            (TokenType::Integer, Some(TokenValue::Integer(i)))
            | (TokenType::Date, Some(TokenValue::Integer(i))) => serializer.serialize_i64(*i),
            (TokenType::Float, Some(TokenValue::Float(f))) => serializer.serialize_f64(*f),
            (TokenType::Boolean, Some(TokenValue::Boolean(b))) => serializer.serialize_bool(*b),
            (TokenType::Null, _) => serializer.serialize_unit(),
            (TokenType::Undefined, _) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    &ExtendedKey::Undefined.name(ExtendedJsonDialect::Canonical),
                    &true,
                )?;
                map.end()
            }
            (TokenType::Date, Some(TokenValue::DateTime(date))) => {
                serializer.serialize_str(&date.to_rfc3339())
            }
            (TokenType::Bytes, Some(value)) => match value.to_bytes() {
                Some(bytes) => serializer.serialize_bytes(&bytes),
                None => Err(S::Error::custom("Bytes token has no bytes value")),
            },
            (token_type, _) => Err(S::Error::custom(format!(
                "unexpected token {token_type}"
            ))),
        }
    }
}

/// Converts a document to the native value it encodes, if it is an extended object
fn from_document(document: Document) -> Result<Bson, ReaderError> {
    let is_extended = document
        .keys()
        .next()
        .and_then(ExtendedKey::parse_name)
        .is_some_and(|key| key.is_leading());
    if !is_extended {
        return Ok(Bson::Document(document));
    }

    let mut buffer = TokenBuffer::new();
    bson_value::write_document(&mut buffer, &document)
        .map_err(|e| ReaderError::invalid_value(e.to_string()))?;
    let mut reader = buffer.into_reader();
    extended::read_token(&mut reader)?;
    bson_value::read_current_value(&mut reader)
}

struct BsonVisitor;

impl<'de> Visitor<'de> for BsonVisitor {
    type Value = Bson;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a native value")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Bson, E> {
        Ok(Bson::Boolean(v))
    }

    fn visit_i32<E: serde::de::Error>(self, v: i32) -> Result<Bson, E> {
        Ok(Bson::Int32(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Bson, E> {
        Ok(i32::try_from(v).map_or(Bson::Int64(v), Bson::Int32))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Bson, E> {
        match i64::try_from(v) {
            Ok(v) => self.visit_i64(v),
            Err(_) => Err(E::invalid_value(Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Bson, E> {
        Ok(Bson::Double(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Bson, E> {
        Ok(Bson::String(v.to_owned()))
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Bson, E> {
        Ok(Bson::String(v))
    }

    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Bson, E> {
        Ok(Bson::Binary(Binary::generic(v.to_vec())))
    }

    fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Bson, E> {
        Ok(Bson::Binary(Binary::generic(v)))
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Bson, E> {
        Ok(Bson::Null)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Bson, E> {
        Ok(Bson::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Bson, D::Error> {
        Bson::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Bson, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bson, A::Error> {
        let mut values = Vec::new();
        while let Some(value) = seq.next_element::<Bson>()? {
            values.push(value);
        }
        Ok(Bson::Array(values))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Bson, A::Error> {
        let mut document = Document::new();
        while let Some((name, value)) = map.next_entry::<String, Bson>()? {
            document.insert(name, value);
        }
        from_document(document).map_err(A::Error::custom)
    }
}

impl Serialize for Bson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(NATIVE_VALUE_NEWTYPE, &ExtendedShape::Value(self))
    }
}

impl<'de> Deserialize<'de> for Bson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(NATIVE_VALUE_NEWTYPE, BsonVisitor)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(NATIVE_VALUE_NEWTYPE, &ExtendedShape::Document(self))
    }
}

#[duplicate_item(
    native_type                 to_bson;
    [ObjectId]                  [Bson::from(*self)];
    [DateTime]                  [Bson::from(*self)];
    [Timestamp]                 [Bson::from(*self)];
    [MinKey]                    [Bson::from(*self)];
    [MaxKey]                    [Bson::from(*self)];
    [Undefined]                 [Bson::from(*self)];
    [Binary]                    [Bson::from(self.clone())];
    [Regex]                     [Bson::from(self.clone())];
    [JavaScriptCodeWithScope]   [Bson::from(self.clone())];
)]
impl Serialize for native_type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = to_bson;
        serializer.serialize_newtype_struct(NATIVE_VALUE_NEWTYPE, &ExtendedShape::Value(&value))
    }
}

fn unexpected_native<E: serde::de::Error>(actual: &Bson, expected: ElementType) -> E {
    E::invalid_type(
        Unexpected::Other(&actual.element_type().to_string()),
        &expected.to_string().as_str(),
    )
}

#[duplicate_item(
    native_type                 variant;
    [ObjectId]                  [ObjectId];
    [Binary]                    [Binary];
    [DateTime]                  [DateTime];
    [Regex]                     [RegularExpression];
    [Timestamp]                 [Timestamp];
    [JavaScriptCodeWithScope]   [JavaScriptCodeWithScope];
    [Document]                  [Document];
)]
impl<'de> Deserialize<'de> for native_type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Bson::deserialize(deserializer)? {
            Bson::variant(value) => Ok(value),
            other => Err(unexpected_native(&other, ElementType::variant)),
        }
    }
}

#[duplicate_item(
    sentinel;
    [MinKey];
    [MaxKey];
    [Undefined];
)]
impl<'de> Deserialize<'de> for sentinel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Bson::deserialize(deserializer)? {
            Bson::sentinel => Ok(sentinel),
            other => Err(unexpected_native(&other, ElementType::sentinel)),
        }
    }
}
