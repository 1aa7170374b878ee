//! Reading and writing the extended-object encoding of native values

use base64::{prelude::BASE64_STANDARD, Engine};

use super::bson_value;
use crate::{
    bson::{Binary, Bson, DateTime, Document, JavaScriptCodeWithScope, ObjectId, Regex, Timestamp},
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{ExtendedJsonDialect, TokenWriter, WriterError},
};

/// Reserved property name of the extended-object encoding, without its dollar prefix
#[derive(PartialEq, Eq, Hash, Clone, Copy, strum::Display, strum::EnumString, Debug)]
#[strum(serialize_all = "camelCase")]
pub enum ExtendedKey {
    /// `$oid`
    Oid,
    /// `$binary`
    Binary,
    /// `$type`, the subtype following `$binary`
    Type,
    /// `$date`
    Date,
    /// `$regex`
    Regex,
    /// `$options`, the options following `$regex`
    Options,
    /// `$code`
    Code,
    /// `$scope`, the scope following `$code`
    Scope,
    /// `$symbol`
    Symbol,
    /// `$timestamp`
    Timestamp,
    /// `$minKey`
    MinKey,
    /// `$maxKey`
    MaxKey,
    /// `$undefined`
    Undefined,
}

impl ExtendedKey {
    /// Parses a property name in either dialect
    ///
    /// # Examples
    /// ```
    /// # use bson_token_adapter::converters::ExtendedKey;
    /// assert_eq!(Some(ExtendedKey::Oid), ExtendedKey::parse_name("$oid"));
    /// assert_eq!(Some(ExtendedKey::MinKey), ExtendedKey::parse_name("$$minKey"));
    /// assert_eq!(None, ExtendedKey::parse_name("oid"));
    /// ```
    pub fn parse_name(name: &str) -> Option<ExtendedKey> {
        let key = name
            .strip_prefix("$$")
            .or_else(|| name.strip_prefix('$'))?;
        key.parse().ok()
    }

    /// Gets the property name in the given dialect
    pub fn name(&self, dialect: ExtendedJsonDialect) -> String {
        format!("{}{self}", dialect.prefix())
    }

    /// Whether this key starts the encoding of a native value
    pub fn is_leading(&self) -> bool {
        !matches!(self, ExtendedKey::Type | ExtendedKey::Options | ExtendedKey::Scope)
    }
}

pub(crate) fn read_token<R: TokenReader + ?Sized>(reader: &mut R) -> Result<(), ReaderError> {
    if reader.read()? {
        Ok(())
    } else {
        Err(ReaderError::UnexpectedEndOfInput)
    }
}

pub(crate) fn read_expected_token<R: TokenReader + ?Sized>(
    reader: &mut R,
    expected: TokenType,
) -> Result<(), ReaderError> {
    read_token(reader)?;
    let actual = reader.token_type();
    if actual == expected {
        Ok(())
    } else {
        Err(ReaderError::unexpected_token(format!("token {expected}"), actual))
    }
}

pub(crate) fn read_end_object<R: TokenReader + ?Sized>(reader: &mut R) -> Result<(), ReaderError> {
    read_expected_token(reader, TokenType::EndObject)
}

pub(crate) fn read_property_name<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<String, ReaderError> {
    read_expected_token(reader, TokenType::PropertyName)?;
    Ok(current_str(reader)?.to_owned())
}

/// Reads a property name which has to be the key in either dialect
pub(crate) fn read_expected_property_name<R: TokenReader + ?Sized>(
    reader: &mut R,
    key: ExtendedKey,
) -> Result<(), ReaderError> {
    let name = read_property_name(reader)?;
    if ExtendedKey::parse_name(&name) == Some(key) {
        Ok(())
    } else {
        Err(ReaderError::UnexpectedPropertyName {
            expected: key.name(ExtendedJsonDialect::Canonical),
            actual: name,
        })
    }
}

pub(crate) fn read_string_value<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<String, ReaderError> {
    read_expected_token(reader, TokenType::String)?;
    Ok(current_str(reader)?.to_owned())
}

fn read_integer_value<R: TokenReader + ?Sized>(reader: &mut R) -> Result<i64, ReaderError> {
    read_expected_token(reader, TokenType::Integer)?;
    current_integer(reader)
}

/// Gets the string value of the current token
pub(crate) fn current_str<R: TokenReader + ?Sized>(reader: &R) -> Result<&str, ReaderError> {
    reader.value().and_then(TokenValue::as_str).ok_or_else(|| {
        ReaderError::invalid_value(format!("{} token has no string value", reader.token_type()))
    })
}

/// Gets the integral value of the current token
pub(crate) fn current_integer<R: TokenReader + ?Sized>(reader: &R) -> Result<i64, ReaderError> {
    reader.value().and_then(TokenValue::as_i64).ok_or_else(|| {
        ReaderError::invalid_value(format!("{} token has no integer value", reader.token_type()))
    })
}

/// Gets the floating point value of the current token
pub(crate) fn current_float<R: TokenReader + ?Sized>(reader: &R) -> Result<f64, ReaderError> {
    match reader.value() {
        Some(TokenValue::Float(f)) => Ok(*f),
        Some(TokenValue::Integer(i)) => Ok(*i as f64),
        _ => Err(ReaderError::invalid_value(format!(
            "{} token has no number value",
            reader.token_type()
        ))),
    }
}

/*
 * The `read_*_body` functions are called after the leading property name of an extended
 * object has been read, and consume everything up to and including the end of the object.
 */

pub(crate) fn read_object_id_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<ObjectId, ReaderError> {
    let hex = read_string_value(reader)?;
    let object_id = ObjectId::parse_str(&hex)?;
    read_end_object(reader)?;
    Ok(object_id)
}

pub(crate) fn read_binary_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Binary, ReaderError> {
    let encoded = read_string_value(reader)?;
    let bytes = BASE64_STANDARD
        .decode(&encoded)
        .map_err(|e| ReaderError::invalid_value(format!("invalid Base64 string: {e}")))?;
    read_expected_property_name(reader, ExtendedKey::Type)?;
    let subtype_hex = read_string_value(reader)?;
    let subtype = u8::from_str_radix(&subtype_hex, 16).map_err(|_| {
        ReaderError::invalid_value(format!("invalid binary subtype '{subtype_hex}'"))
    })?;
    read_end_object(reader)?;
    Ok(Binary {
        subtype: subtype.into(),
        bytes,
    })
}

pub(crate) fn read_date_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<DateTime, ReaderError> {
    read_token(reader)?;
    let date = if reader.token_type() == TokenType::StartObject {
        // `{ $numberLong: "<millis>" }`
        let name = read_property_name(reader)?;
        if name != "$numberLong" && name != "$$numberLong" {
            return Err(ReaderError::UnexpectedPropertyName {
                expected: "$numberLong".to_owned(),
                actual: name,
            });
        }
        let millis = read_string_value(reader)?;
        let millis = millis.parse().map_err(|_| {
            ReaderError::invalid_value(format!("'{millis}' is not a valid int64"))
        })?;
        read_end_object(reader)?;
        DateTime::from_millis(millis)
    } else {
        match (reader.token_type(), reader.value()) {
            (TokenType::Integer | TokenType::Date, Some(TokenValue::Integer(millis))) => {
                DateTime::from_millis(*millis)
            }
            (TokenType::Date, Some(TokenValue::DateTime(date))) => DateTime::from(*date),
            (TokenType::String, Some(TokenValue::String(s))) => {
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|date| DateTime::from_millis(date.timestamp_millis()))
                    .map_err(|e| ReaderError::invalid_value(format!("invalid date '{s}': {e}")))?
            }
            (actual, _) => return Err(ReaderError::unexpected_token("$date value", actual)),
        }
    };
    read_end_object(reader)?;
    Ok(date)
}

pub(crate) fn read_symbol_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<String, ReaderError> {
    let symbol = read_string_value(reader)?;
    read_end_object(reader)?;
    Ok(symbol)
}

pub(crate) fn read_regex_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Regex, ReaderError> {
    let pattern = read_string_value(reader)?;
    read_expected_property_name(reader, ExtendedKey::Options)?;
    let options = read_string_value(reader)?;
    read_end_object(reader)?;
    Ok(Regex { pattern, options })
}

/// Reads `$code` with an optional `$scope`
pub(crate) fn read_code_body<R: TokenReader + ?Sized>(reader: &mut R) -> Result<Bson, ReaderError> {
    let code = read_string_value(reader)?;
    read_token(reader)?;
    match reader.token_type() {
        TokenType::EndObject => Ok(Bson::JavaScriptCode(code)),
        TokenType::PropertyName => {
            let name = current_str(reader)?;
            if ExtendedKey::parse_name(name) != Some(ExtendedKey::Scope) {
                return Err(ReaderError::UnexpectedPropertyName {
                    expected: ExtendedKey::Scope.name(ExtendedJsonDialect::Canonical),
                    actual: name.to_owned(),
                });
            }
            read_expected_token(reader, TokenType::StartObject)?;
            let scope = bson_value::read_document_content(reader)?;
            read_end_object(reader)?;
            Ok(Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code,
                scope,
            }))
        }
        actual => Err(ReaderError::unexpected_token("$scope or end of object", actual)),
    }
}

pub(crate) fn read_timestamp_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Timestamp, ReaderError> {
    read_expected_token(reader, TokenType::StartObject)?;
    // `t` and `i` are accepted in either order; some formats sort map keys by name
    let mut time = None;
    let mut increment = None;
    for _ in 0..2 {
        let name = read_property_name(reader)?;
        let component = match name.as_str() {
            "t" if time.is_none() => &mut time,
            "i" if increment.is_none() => &mut increment,
            _ => {
                return Err(ReaderError::UnexpectedPropertyName {
                    expected: if time.is_none() { "t" } else { "i" }.to_owned(),
                    actual: name,
                })
            }
        };
        let value = read_integer_value(reader)?;
        *component = Some(u32::try_from(value).map_err(|_| {
            ReaderError::invalid_value(format!("timestamp component {value} is out of range"))
        })?);
    }
    read_end_object(reader)?;
    read_end_object(reader)?;
    Ok(Timestamp {
        time: time.unwrap_or_default(),
        increment: increment.unwrap_or_default(),
    })
}

/// Reads a sentinel whose value carries no information
pub(crate) fn read_sentinel_body<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<(), ReaderError> {
    read_token(reader)?;
    reader.skip()?;
    read_end_object(reader)
}

/// Reads the remainder of an extended object whose leading key has been read
///
/// Returns `None` if the key does not start the encoding of a native value.
pub(crate) fn read_extended_body<R: TokenReader + ?Sized>(
    reader: &mut R,
    key: ExtendedKey,
) -> Result<Option<Bson>, ReaderError> {
    Ok(Some(match key {
        ExtendedKey::Oid => Bson::ObjectId(read_object_id_body(reader)?),
        ExtendedKey::Binary => Bson::Binary(read_binary_body(reader)?),
        ExtendedKey::Date => Bson::DateTime(read_date_body(reader)?),
        ExtendedKey::Regex => Bson::RegularExpression(read_regex_body(reader)?),
        ExtendedKey::Code => read_code_body(reader)?,
        ExtendedKey::Symbol => Bson::Symbol(read_symbol_body(reader)?),
        ExtendedKey::Timestamp => Bson::Timestamp(read_timestamp_body(reader)?),
        ExtendedKey::MinKey => {
            read_sentinel_body(reader)?;
            Bson::MinKey
        }
        ExtendedKey::MaxKey => {
            read_sentinel_body(reader)?;
            Bson::MaxKey
        }
        ExtendedKey::Undefined => {
            read_sentinel_body(reader)?;
            Bson::Undefined
        }
        ExtendedKey::Type | ExtendedKey::Options | ExtendedKey::Scope => return Ok(None),
    }))
}

/// Writes a single-property extended object
fn write_object<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    key: ExtendedKey,
    write_value: impl FnOnce(&mut W) -> Result<(), WriterError>,
) -> Result<(), WriterError> {
    writer.write_start_object()?;
    writer.write_property_name(&key.name(dialect))?;
    write_value(writer)?;
    writer.write_end_object()
}

pub(crate) fn write_object_id<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: ObjectId,
) -> Result<(), WriterError> {
    write_object(writer, dialect, ExtendedKey::Oid, |w| {
        w.write_string(&value.to_hex())
    })
}

pub(crate) fn write_binary<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: &Binary,
) -> Result<(), WriterError> {
    writer.write_start_object()?;
    writer.write_property_name(&ExtendedKey::Binary.name(dialect))?;
    writer.write_string(&BASE64_STANDARD.encode(&value.bytes))?;
    writer.write_property_name(&ExtendedKey::Type.name(dialect))?;
    writer.write_string(&format!("{:02x}", u8::from(value.subtype)))?;
    writer.write_end_object()
}

pub(crate) fn write_date<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: DateTime,
) -> Result<(), WriterError> {
    write_object(writer, dialect, ExtendedKey::Date, |w| {
        w.write_int64(value.timestamp_millis())
    })
}

pub(crate) fn write_regex<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: &Regex,
) -> Result<(), WriterError> {
    writer.write_start_object()?;
    writer.write_property_name(&ExtendedKey::Regex.name(dialect))?;
    writer.write_string(&value.pattern)?;
    writer.write_property_name(&ExtendedKey::Options.name(dialect))?;
    writer.write_string(&value.options)?;
    writer.write_end_object()
}

pub(crate) fn write_code<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    code: &str,
    scope: Option<&Document>,
) -> Result<(), WriterError> {
    writer.write_start_object()?;
    writer.write_property_name(&ExtendedKey::Code.name(dialect))?;
    writer.write_string(code)?;
    if let Some(scope) = scope {
        writer.write_property_name(&ExtendedKey::Scope.name(dialect))?;
        bson_value::write_document(writer, scope)?;
    }
    writer.write_end_object()
}

pub(crate) fn write_symbol<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: &str,
) -> Result<(), WriterError> {
    write_object(writer, dialect, ExtendedKey::Symbol, |w| w.write_string(value))
}

pub(crate) fn write_timestamp<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: Timestamp,
) -> Result<(), WriterError> {
    write_object(writer, dialect, ExtendedKey::Timestamp, |w| {
        w.write_start_object()?;
        w.write_property_name("t")?;
        w.write_int64(value.time.into())?;
        w.write_property_name("i")?;
        w.write_int64(value.increment.into())?;
        w.write_end_object()
    })
}

/// Writes `$minKey: 1`, `$maxKey: 1` or `$undefined: true`
pub(crate) fn write_sentinel<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    key: ExtendedKey,
) -> Result<(), WriterError> {
    write_object(writer, dialect, key, |w| {
        if key == ExtendedKey::Undefined {
            w.write_boolean(true)
        } else {
            w.write_int32(1)
        }
    })
}
