//! Converters for the native types without an exact token equivalent

use super::{
    current_bytes, extended, read_extended_object, write_native_or_extended, ExtendedKey,
    TokenConverter,
};
use crate::{
    bson::{
        Binary, BinarySubtype, Bson, DateTime, JavaScriptCodeWithScope, ObjectId, Regex,
        Timestamp,
    },
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{TokenWriter, WriterError},
};

/// Converter for [`ObjectId`]
///
/// Reads the native value, a [`Bytes`](TokenType::Bytes) token with 12 bytes or `{ "$oid": "<hex>" }`.
#[derive(Debug)]
pub struct ObjectIdConverter;

impl TokenConverter for ObjectIdConverter {
    type Value = ObjectId;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<ObjectId>, ReaderError> {
        if let Some(Bson::ObjectId(id)) = reader.native_value() {
            return Ok(Some(*id));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Bytes => {
                let bytes = current_bytes(reader)?;
                Ok(Some(ObjectId::try_from(bytes.as_slice())?))
            }
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::Oid, extended::read_object_id_body)
                    .map(Some)
            }
            actual => Err(ReaderError::unexpected_token("object id", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&ObjectId>,
    ) -> Result<(), WriterError> {
        let Some(&value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_object_id(value),
            |w, dialect| extended::write_object_id(w, dialect, value),
        )
    }
}

/// Converter for [`Binary`] data
///
/// Reads the native value, a [`Bytes`](TokenType::Bytes) token (generic subtype, or the UUID
/// subtype for a GUID value) or `{ "$binary": "<base64>", "$type": "<hex subtype>" }`.
#[derive(Debug)]
pub struct BinaryDataConverter;

impl TokenConverter for BinaryDataConverter {
    type Value = Binary;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Binary>, ReaderError> {
        if let Some(Bson::Binary(binary)) = reader.native_value() {
            return Ok(Some(binary.clone()));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Bytes => Ok(Some(match reader.value() {
                Some(TokenValue::Guid(guid)) => Binary::from_guid(*guid, BinarySubtype::Uuid),
                _ => Binary::generic(current_bytes(reader)?),
            })),
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::Binary, extended::read_binary_body)
                    .map(Some)
            }
            actual => Err(ReaderError::unexpected_token("binary data", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Binary>,
    ) -> Result<(), WriterError> {
        let Some(value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_binary_data(value),
            |w, dialect| extended::write_binary(w, dialect, value),
        )
    }
}

/// Converter for native [`DateTime`] values
///
/// Reads the native value, a [`Date`](TokenType::Date) token, an RFC 3339 string or
/// `{ "$date": ... }` whose value is milliseconds since the Unix epoch, an RFC 3339 string
/// or `{ "$numberLong": "<millis>" }`. The full `i64` range of milliseconds is supported.
#[derive(Debug)]
pub struct DateTimeConverter;

impl TokenConverter for DateTimeConverter {
    type Value = DateTime;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<DateTime>, ReaderError> {
        if let Some(Bson::DateTime(date)) = reader.native_value() {
            return Ok(Some(*date));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Date => match reader.value() {
                Some(TokenValue::DateTime(date)) => Ok(Some(DateTime::from(*date))),
                Some(TokenValue::Integer(millis)) => Ok(Some(DateTime::from_millis(*millis))),
                _ => Err(ReaderError::invalid_value("Date token has no date value")),
            },
            TokenType::String => {
                let s = extended::current_str(reader)?;
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|date| Some(DateTime::from_millis(date.timestamp_millis())))
                    .map_err(|e| ReaderError::invalid_value(format!("invalid date '{s}': {e}")))
            }
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::Date, extended::read_date_body).map(Some)
            }
            actual => Err(ReaderError::unexpected_token("date time", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&DateTime>,
    ) -> Result<(), WriterError> {
        let Some(&value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_native_date_time(value),
            |w, dialect| extended::write_date(w, dialect, value),
        )
    }
}

/// Converter for [`Regex`]
///
/// Reads the native value, a string which is taken as pattern without options, or
/// `{ "$regex": "<pattern>", "$options": "<options>" }`.
#[derive(Debug)]
pub struct RegularExpressionConverter;

impl TokenConverter for RegularExpressionConverter {
    type Value = Regex;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Regex>, ReaderError> {
        if let Some(Bson::RegularExpression(regex)) = reader.native_value() {
            return Ok(Some(regex.clone()));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::String => Ok(Some(Regex::new(extended::current_str(reader)?, ""))),
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::Regex, extended::read_regex_body)
                    .map(Some)
            }
            actual => Err(ReaderError::unexpected_token("regular expression", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Regex>,
    ) -> Result<(), WriterError> {
        let Some(value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_regular_expression(value),
            |w, dialect| extended::write_regex(w, dialect, value),
        )
    }
}

/// Converter for JavaScript code without scope
///
/// Reads the native value, a string or `{ "$code": "<code>" }`.
#[derive(Debug)]
pub struct JavaScriptConverter;

impl TokenConverter for JavaScriptConverter {
    type Value = String;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<String>, ReaderError> {
        if let Some(Bson::JavaScriptCode(code)) = reader.native_value() {
            return Ok(Some(code.clone()));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::String => Ok(Some(extended::current_str(reader)?.to_owned())),
            TokenType::StartObject => {
                match read_extended_object(reader, ExtendedKey::Code, extended::read_code_body)? {
                    Bson::JavaScriptCode(code) => Ok(Some(code)),
                    _ => Err(ReaderError::invalid_value(
                        "JavaScript code must not have a $scope",
                    )),
                }
            }
            actual => Err(ReaderError::unexpected_token("JavaScript code", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&String>,
    ) -> Result<(), WriterError> {
        let Some(value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_java_script(value),
            |w, dialect| extended::write_code(w, dialect, value, None),
        )
    }
}

/// Converter for [`JavaScriptCodeWithScope`]
///
/// Reads the native value or `{ "$code": "<code>", "$scope": { ... } }`. The string token
/// which [`ReaderAdapter`](crate::reader::ReaderAdapter) reports for code with scope lacks
/// the scope and is therefore rejected when no native value is available.
#[derive(Debug)]
pub struct JavaScriptWithScopeConverter;

impl TokenConverter for JavaScriptWithScopeConverter {
    type Value = JavaScriptCodeWithScope;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<JavaScriptCodeWithScope>, ReaderError> {
        if let Some(Bson::JavaScriptCodeWithScope(code)) = reader.native_value() {
            return Ok(Some(code.clone()));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::StartObject => {
                match read_extended_object(reader, ExtendedKey::Code, extended::read_code_body)? {
                    Bson::JavaScriptCodeWithScope(code) => Ok(Some(code)),
                    _ => Err(ReaderError::invalid_value(
                        "JavaScript code with scope is missing $scope",
                    )),
                }
            }
            actual => Err(ReaderError::unexpected_token("JavaScript code with scope", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&JavaScriptCodeWithScope>,
    ) -> Result<(), WriterError> {
        let Some(value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_java_script_with_scope(&value.code, &value.scope),
            |w, dialect| extended::write_code(w, dialect, &value.code, Some(&value.scope)),
        )
    }
}

/// Converter for symbols
///
/// Reads the native value, a string or `{ "$symbol": "<symbol>" }`.
#[derive(Debug)]
pub struct SymbolConverter;

impl TokenConverter for SymbolConverter {
    type Value = String;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<String>, ReaderError> {
        if let Some(Bson::Symbol(symbol)) = reader.native_value() {
            return Ok(Some(symbol.clone()));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::String => Ok(Some(extended::current_str(reader)?.to_owned())),
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::Symbol, extended::read_symbol_body)
                    .map(Some)
            }
            actual => Err(ReaderError::unexpected_token("symbol", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&String>,
    ) -> Result<(), WriterError> {
        let Some(value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_symbol(value),
            |w, dialect| extended::write_symbol(w, dialect, value),
        )
    }
}

/// Converter for [`Timestamp`]
///
/// Reads the native value, an integer holding time and increment packed into 64 bits or
/// `{ "$timestamp": { "t": <time>, "i": <increment> } }`.
#[derive(Debug)]
pub struct TimestampConverter;

impl TokenConverter for TimestampConverter {
    type Value = Timestamp;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Timestamp>, ReaderError> {
        if let Some(Bson::Timestamp(timestamp)) = reader.native_value() {
            return Ok(Some(*timestamp));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            // Inverse of the bit reinterpretation done when reading a native timestamp
            TokenType::Integer => Ok(Some(Timestamp::from_packed(
                extended::current_integer(reader)? as u64,
            ))),
            TokenType::StartObject => read_extended_object(
                reader,
                ExtendedKey::Timestamp,
                extended::read_timestamp_body,
            )
            .map(Some),
            actual => Err(ReaderError::unexpected_token("timestamp", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Timestamp>,
    ) -> Result<(), WriterError> {
        let Some(&value) = value else {
            return writer.write_null();
        };
        write_native_or_extended(
            writer,
            |sink| sink.write_timestamp(value),
            |w, dialect| extended::write_timestamp(w, dialect, value),
        )
    }
}
