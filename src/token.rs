//! Module for the tokens of the JSON-like token grammar
//!
//! A [`TokenReader`](crate::reader::TokenReader) reports the current token as a [`TokenType`]
//! together with an optional [`TokenValue`].

use crate::bson::Guid;

/// Type of a token
///
/// This is the JSON token set extended by [`Undefined`](TokenType::Undefined),
/// [`Date`](TokenType::Date) and [`Bytes`](TokenType::Bytes), which the native format can
/// express directly.
#[derive(PartialEq, Eq, Hash, Clone, Copy, strum::Display, Debug)]
pub enum TokenType {
    /// No token has been read yet
    None,
    /// Start of an object: `{`
    StartObject,
    /// End of an object: `}`
    EndObject,
    /// Start of an array: `[`
    StartArray,
    /// End of an array: `]`
    EndArray,
    /// Name of an object property
    PropertyName,
    /// String value
    String,
    /// Integral number value
    Integer,
    /// Floating point number value
    Float,
    /// Boolean value
    Boolean,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Date value
    Date,
    /// Binary value
    Bytes,
    /// The end of the input has been reached
    EndOfStream,
}

impl TokenType {
    /// Whether this is the start of an object or an array
    pub fn is_start_token(&self) -> bool {
        matches!(self, TokenType::StartObject | TokenType::StartArray)
    }

    /// Whether this is the end of an object or an array
    pub fn is_end_token(&self) -> bool {
        matches!(self, TokenType::EndObject | TokenType::EndArray)
    }

    /// Whether this is a scalar value token
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TokenType::String
                | TokenType::Integer
                | TokenType::Float
                | TokenType::Boolean
                | TokenType::Null
                | TokenType::Undefined
                | TokenType::Date
                | TokenType::Bytes
        )
    }
}

/// Value of a token
///
/// Which variants occur for which [`TokenType`]:
/// - [`PropertyName`](TokenType::PropertyName), [`String`](TokenType::String): `String`
/// - [`Integer`](TokenType::Integer): `Integer`
/// - [`Float`](TokenType::Float): `Float`
/// - [`Boolean`](TokenType::Boolean): `Boolean`
/// - [`Date`](TokenType::Date): `DateTime`, or `Integer` with the milliseconds since the
///   Unix epoch when the date is outside of the range of [`chrono::DateTime`]
/// - [`Bytes`](TokenType::Bytes): `Bytes` or `Guid`
///
/// All other token types have no value.
#[derive(PartialEq, Clone, Debug)]
pub enum TokenValue {
    /// String, or the name of a property
    String(String),
    /// Integral number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Boolean(bool),
    /// UTC date time
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Binary data
    Bytes(Vec<u8>),
    /// 128-bit unique identifier
    Guid(Guid),
}

impl TokenValue {
    /// Gets the string if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the number if this is an integral value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TokenValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Gets the bytes of a binary value; for a GUID the bytes in standard order
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            TokenValue::Bytes(bytes) => Some(bytes.clone()),
            TokenValue::Guid(guid) => Some(guid.bytes().to_vec()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type_categories() {
        assert!(TokenType::StartArray.is_start_token());
        assert!(!TokenType::EndArray.is_start_token());
        assert!(TokenType::EndObject.is_end_token());
        assert!(TokenType::Undefined.is_scalar());
        assert!(!TokenType::PropertyName.is_scalar());
        assert!(!TokenType::None.is_scalar());
        assert_eq!("StartObject", TokenType::StartObject.to_string());
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Some("a"), TokenValue::String("a".to_owned()).as_str());
        assert_eq!(None, TokenValue::Integer(1).as_str());
        assert_eq!(Some(1), TokenValue::Integer(1).as_i64());
        let guid = Guid::from_bytes([1; 16]);
        assert_eq!(Some(vec![1; 16]), TokenValue::Guid(guid).to_bytes());
        assert_eq!(Some(vec![2]), TokenValue::Bytes(vec![2]).to_bytes());
    }
}
