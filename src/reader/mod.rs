//! Module for reading tokens
//!
//! [`TokenReader`] is the general trait for pull-based token readers, [`ReaderAdapter`] is an
//! implementation of it which presents a [`NativeReader`](crate::bson::NativeReader) as token
//! stream.

use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::{FixedOffset, SecondsFormat, Utc};
use thiserror::Error;

use crate::{
    bson::{Bson, BsonError},
    converters::extended::{self, ExtendedKey},
    token::{TokenType, TokenValue},
    writer::ExtendedJsonDialect,
};

mod adapter;
// Re-export adapter implementation under `reader` module
pub use adapter::*;

/// Error which occurred while reading from a token reader
///
/// All variants except for [`Native`](ReaderError::Native) are format errors: the tokens
/// did not have the shape the caller expected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The current token has an unexpected type
    #[error("expected {expected} but got token {actual}")]
    UnexpectedToken {
        /// Description of what was expected
        expected: String,
        /// The actual token type
        actual: TokenType,
    },
    /// A property of an extended object has an unexpected name
    #[error("expected property named '{expected}' but got '{actual}'")]
    UnexpectedPropertyName {
        /// The expected name
        expected: String,
        /// The actual name
        actual: String,
    },
    /// A token was expected but the end of the input was reached
    #[error("expected token but none available")]
    UnexpectedEndOfInput,
    /// The value of the current token cannot be converted to the requested type
    #[error("invalid value: {message}")]
    InvalidValue {
        /// Message describing why the value is invalid
        message: String,
    },
    /// The wrapped native reader reported an error
    #[error("native reader error: {0}")]
    Native(#[from] BsonError),
}

impl ReaderError {
    pub(crate) fn unexpected_token(expected: impl Into<String>, actual: TokenType) -> Self {
        ReaderError::UnexpectedToken {
            expected: expected.into(),
            actual,
        }
    }

    pub(crate) fn invalid_value(message: impl Into<String>) -> Self {
        ReaderError::InvalidValue {
            message: message.into(),
        }
    }
}

/// Settings to customize the token reader behavior
///
/// These settings are used by [`ReaderAdapter::new_custom`]. To avoid repeating the
/// default values for unchanged settings `..Default::default()` can be used:
/// ```
/// # use bson_token_adapter::reader::ReaderSettings;
/// ReaderSettings {
///     close_input: true,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct ReaderSettings {
    /// Whether closing the reader also closes the wrapped reader
    pub close_input: bool,
}

impl Default for ReaderSettings {
    /// Creates the default reader settings
    ///
    /// - close input: disabled
    fn default() -> Self {
        ReaderSettings { close_input: false }
    }
}

/// A trait for pull-based token readers
///
/// Every call to [`read`](Self::read) advances to the next token. Afterwards
/// [`token_type`](Self::token_type), [`value`](Self::value) and [`depth`](Self::depth)
/// describe that token. Before the first call the token type is [`TokenType::None`], there is
/// no value and the depth is 0.
///
/// The depth is the number of arrays and objects which are open after the current token,
/// so a [`StartObject`](TokenType::StartObject) token at the top level has depth 1 and its
/// matching [`EndObject`](TokenType::EndObject) has depth 0.
///
/// Readers which are backed by native data can additionally expose the native value of the
/// current token with [`native_value`](Self::native_value). Consumers which know about native
/// values should prefer it over the token value, because the token value is lossy for some
/// native types.
///
/// The `read_as_` methods advance by one token and convert the token to the requested
/// type. They return `None` for [`Null`](TokenType::Null), for the end of an array and at the
/// end of the input, and a format error for tokens which cannot be converted, for example
/// [`Undefined`](TokenType::Undefined).
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, reader::*, token::*};
/// let mut reader = ReaderAdapter::new(DocumentReader::new(doc! { "x" => 1 }));
///
/// let mut tokens = Vec::new();
/// while reader.read()? {
///     tokens.push(reader.token_type());
/// }
/// assert_eq!(
///     vec![
///         TokenType::StartObject,
///         TokenType::PropertyName,
///         TokenType::Integer,
///         TokenType::EndObject
///     ],
///     tokens
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait TokenReader {
    /// Advances to the next token
    ///
    /// Returns `false` when there are no more tokens, in which case the token state stays
    /// unchanged.
    fn read(&mut self) -> Result<bool, ReaderError>;

    /// Gets the type of the current token
    fn token_type(&self) -> TokenType;

    /// Gets the value of the current token, if it has one
    fn value(&self) -> Option<&TokenValue>;

    /// Gets the number of arrays and objects which are open after the current token
    fn depth(&self) -> usize;

    /// Gets the native value of the current token, if the reader has one
    ///
    /// The default implementation returns `None`.
    fn native_value(&self) -> Option<&Bson> {
        None
    }

    /// Closes the reader; closing again has no effect
    fn close(&mut self);

    /// Skips the current value
    ///
    /// When positioned at a property name its value is skipped, when positioned at the start
    /// of an array or object the reader advances to its matching end. For all other tokens
    /// this method has no effect.
    fn skip(&mut self) -> Result<(), ReaderError> {
        if self.token_type() == TokenType::PropertyName {
            extended::read_token(self)?;
        }
        if self.token_type().is_start_token() {
            let target_depth = self.depth().saturating_sub(1);
            loop {
                extended::read_token(self)?;
                if self.depth() == target_depth {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Reads the next token as binary data
    ///
    /// Accepts [`Bytes`](TokenType::Bytes), Base64 encoded strings, arrays of byte values,
    /// `$binary` extended objects and typed byte objects of the form
    /// `{"$type": "System.Byte[]", "$value": ...}` whose value is bytes in any of the
    /// other forms.
    fn read_as_bytes(&mut self) -> Result<Option<Vec<u8>>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        match self.token_type() {
            TokenType::Null | TokenType::EndArray => Ok(None),
            TokenType::Bytes => Ok(Some(
                self.value()
                    .and_then(TokenValue::to_bytes)
                    .unwrap_or_default(),
            )),
            TokenType::String => {
                let encoded = extended::current_str(self)?;
                BASE64_STANDARD
                    .decode(encoded)
                    .map(Some)
                    .map_err(|e| ReaderError::invalid_value(format!("invalid Base64 string: {e}")))
            }
            TokenType::StartArray => {
                let mut bytes = Vec::new();
                loop {
                    extended::read_token(self)?;
                    match self.token_type() {
                        TokenType::EndArray => return Ok(Some(bytes)),
                        TokenType::Integer => {
                            let value = extended::current_integer(self)?;
                            let byte = u8::try_from(value).map_err(|_| {
                                ReaderError::invalid_value(format!("{value} is not a byte value"))
                            })?;
                            bytes.push(byte);
                        }
                        actual => return Err(ReaderError::unexpected_token("byte value", actual)),
                    }
                }
            }
            TokenType::StartObject => {
                let name = extended::read_property_name(self)?;
                if name == TYPE_NAME_PROPERTY {
                    return read_typed_bytes_body(self).map(Some);
                }
                if ExtendedKey::parse_name(&name) != Some(ExtendedKey::Binary) {
                    return Err(ReaderError::UnexpectedPropertyName {
                        expected: ExtendedKey::Binary.name(ExtendedJsonDialect::Canonical),
                        actual: name,
                    });
                }
                Ok(Some(extended::read_binary_body(self)?.bytes))
            }
            actual => Err(ReaderError::unexpected_token("bytes", actual)),
        }
    }

    /// Reads the next token as 32-bit integer
    ///
    /// Accepts integers in range, integral floating point numbers and numeric strings; the
    /// empty string is `None`.
    fn read_as_int32(&mut self) -> Result<Option<i32>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        match self.token_type() {
            TokenType::Null | TokenType::EndArray => Ok(None),
            TokenType::Integer => {
                let value = extended::current_integer(self)?;
                i32::try_from(value).map(Some).map_err(|_| {
                    ReaderError::invalid_value(format!("{value} is out of range for int32"))
                })
            }
            TokenType::Float => {
                let value = extended::current_float(self)?;
                if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
                    Ok(Some(value as i32))
                } else {
                    Err(ReaderError::invalid_value(format!(
                        "{value} cannot be converted to int32 without loss"
                    )))
                }
            }
            TokenType::String => {
                let s = extended::current_str(self)?;
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse().map(Some).map_err(|_| {
                    ReaderError::invalid_value(format!("'{s}' is not a valid int32"))
                })
            }
            actual => Err(ReaderError::unexpected_token("int32", actual)),
        }
    }

    /// Reads the next token as string
    ///
    /// Scalar tokens are converted to their string form: numbers in their shortest form
    /// (`1.0` becomes `"1"`), dates as RFC 3339 and binary data as Base64.
    fn read_as_string(&mut self) -> Result<Option<String>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        match self.token_type() {
            TokenType::Null | TokenType::EndArray => Ok(None),
            TokenType::String
            | TokenType::Integer
            | TokenType::Float
            | TokenType::Boolean
            | TokenType::Date
            | TokenType::Bytes => match self.value() {
                Some(value) => Ok(Some(token_value_to_string(value))),
                None => Err(ReaderError::invalid_value(format!(
                    "{} token has no value",
                    self.token_type()
                ))),
            },
            actual => Err(ReaderError::unexpected_token("string", actual)),
        }
    }

    /// Reads the next token as UTC date time
    ///
    /// Accepts [`Date`](TokenType::Date) tokens, RFC 3339 strings (the empty string is `None`)
    /// and `$date` extended objects. Dates outside of the range of [`chrono::DateTime`] are
    /// an error.
    fn read_as_date_time(&mut self) -> Result<Option<chrono::DateTime<Utc>>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        current_as_date_time(self)
    }

    /// Reads the next token as date time with offset
    ///
    /// Like [`read_as_date_time`](Self::read_as_date_time), except that the offset of an
    /// RFC 3339 string is preserved. All other values have a zero offset.
    fn read_as_date_time_offset(
        &mut self,
    ) -> Result<Option<chrono::DateTime<FixedOffset>>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        if self.token_type() == TokenType::String {
            let s = extended::current_str(self)?;
            if s.is_empty() {
                return Ok(None);
            }
            return chrono::DateTime::parse_from_rfc3339(s)
                .map(Some)
                .map_err(|e| ReaderError::invalid_value(format!("invalid date '{s}': {e}")));
        }
        Ok(current_as_date_time(self)?.map(|date| date.fixed_offset()))
    }

    /// Reads the next token as decimal number
    ///
    /// Accepts integers, floating point numbers and numeric strings; the empty string is `None`.
    fn read_as_decimal(&mut self) -> Result<Option<f64>, ReaderError> {
        if !self.read()? {
            return Ok(None);
        }
        match self.token_type() {
            TokenType::Null | TokenType::EndArray => Ok(None),
            TokenType::Integer => Ok(Some(extended::current_integer(self)? as f64)),
            TokenType::Float => Ok(Some(extended::current_float(self)?)),
            TokenType::String => {
                let s = extended::current_str(self)?;
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse().map(Some).map_err(|_| {
                    ReaderError::invalid_value(format!("'{s}' is not a valid decimal"))
                })
            }
            actual => Err(ReaderError::unexpected_token("decimal", actual)),
        }
    }
}

/// Property holding the type name of a typed object
const TYPE_NAME_PROPERTY: &str = "$type";
/// Property holding the value of a typed object
const TYPE_VALUE_PROPERTY: &str = "$value";
/// Type name of byte arrays; it may be followed by the assembly name
const BYTE_ARRAY_TYPE_NAME: &str = "System.Byte[]";

/// Reads the rest of `{"$type": "System.Byte[]", "$value": ...}` after its first property name
fn read_typed_bytes_body<R: TokenReader + ?Sized>(reader: &mut R) -> Result<Vec<u8>, ReaderError> {
    let type_name = extended::read_string_value(reader)?;
    if !type_name.starts_with(BYTE_ARRAY_TYPE_NAME) {
        return Err(ReaderError::invalid_value(format!(
            "type '{type_name}' is not a byte array"
        )));
    }
    let name = extended::read_property_name(reader)?;
    if name != TYPE_VALUE_PROPERTY {
        return Err(ReaderError::UnexpectedPropertyName {
            expected: TYPE_VALUE_PROPERTY.to_owned(),
            actual: name,
        });
    }
    let bytes = reader
        .read_as_bytes()?
        .ok_or_else(|| ReaderError::invalid_value("typed byte array has no value"))?;
    extended::read_end_object(reader)?;
    Ok(bytes)
}

/// Converts the current token, which has already been read, to a date time
fn current_as_date_time<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Option<chrono::DateTime<Utc>>, ReaderError> {
    match reader.token_type() {
        TokenType::Null | TokenType::EndArray => Ok(None),
        TokenType::Date => match reader.value() {
            Some(TokenValue::DateTime(date)) => Ok(Some(*date)),
            Some(TokenValue::Integer(millis)) => Err(ReaderError::invalid_value(format!(
                "date {millis} is outside of the supported range"
            ))),
            _ => Err(ReaderError::invalid_value("Date token has no date value")),
        },
        TokenType::String => {
            let s = extended::current_str(reader)?;
            if s.is_empty() {
                return Ok(None);
            }
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|date| Some(date.with_timezone(&Utc)))
                .map_err(|e| ReaderError::invalid_value(format!("invalid date '{s}': {e}")))
        }
        TokenType::StartObject => {
            extended::read_expected_property_name(reader, ExtendedKey::Date)?;
            let date = extended::read_date_body(reader)?;
            date.to_chrono().map(Some).ok_or_else(|| {
                ReaderError::invalid_value(format!(
                    "date {} is outside of the supported range",
                    date.timestamp_millis()
                ))
            })
        }
        actual => Err(ReaderError::unexpected_token("date", actual)),
    }
}

fn token_value_to_string(value: &TokenValue) -> String {
    match value {
        TokenValue::String(s) => s.clone(),
        TokenValue::Integer(i) => i.to_string(),
        TokenValue::Float(f) => f.to_string(),
        TokenValue::Boolean(b) => b.to_string(),
        TokenValue::DateTime(date) => date.to_rfc3339_opts(SecondsFormat::Millis, true),
        TokenValue::Bytes(bytes) => BASE64_STANDARD.encode(bytes),
        TokenValue::Guid(guid) => guid.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Guid;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn value_to_string() -> TestResult {
        assert_eq!("1", token_value_to_string(&TokenValue::Float(1.0)));
        assert_eq!("1.5", token_value_to_string(&TokenValue::Float(1.5)));
        assert_eq!("-3", token_value_to_string(&TokenValue::Integer(-3)));
        assert_eq!("true", token_value_to_string(&TokenValue::Boolean(true)));
        assert_eq!("AAE=", token_value_to_string(&TokenValue::Bytes(vec![0, 1])));
        assert_eq!(
            "1970-01-01T00:00:00.000Z",
            token_value_to_string(&TokenValue::DateTime(
                chrono::DateTime::from_timestamp(0, 0).ok_or("out of range")?
            ))
        );
        assert_eq!(
            "00000000-0000-0000-0000-000000000000",
            token_value_to_string(&TokenValue::Guid(Guid::from_bytes([0; 16])))
        );
        Ok(())
    }

    #[test]
    fn error_display() {
        assert_eq!(
            "expected int32 but got token Undefined",
            ReaderError::unexpected_token("int32", TokenType::Undefined).to_string()
        );
        assert_eq!(
            "expected property named '$oid' but got 'x'",
            ReaderError::UnexpectedPropertyName {
                expected: "$oid".to_owned(),
                actual: "x".to_owned(),
            }
            .to_string()
        );
    }
}
