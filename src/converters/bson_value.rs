//! Conversion of arbitrary native values, documents and arrays

use super::{
    extended::{self, ExtendedKey},
    TokenConverter,
};
use crate::{
    bson::{Binary, BinarySubtype, Bson, DateTime, Document},
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{ExtendedJsonDialect, TokenWriter, WriterError},
};

/// Reads the value starting at the current token
///
/// Objects whose first property name is the leading key of an extended-object encoding, in
/// either dialect, are read as the native value they encode.
pub(crate) fn read_current_value<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Bson, ReaderError> {
    let token_type = reader.token_type();
    if token_type.is_scalar() {
        if let Some(native_value) = reader.native_value() {
            return Ok(native_value.clone());
        }
    }

    Ok(match token_type {
        TokenType::StartObject => return read_object(reader),
        TokenType::StartArray => Bson::Array(read_array_content(reader)?),
        TokenType::String => Bson::String(extended::current_str(reader)?.to_owned()),
        TokenType::Integer => {
            let value = extended::current_integer(reader)?;
            i32::try_from(value).map_or(Bson::Int64(value), Bson::Int32)
        }
        TokenType::Float => Bson::Double(extended::current_float(reader)?),
        TokenType::Boolean => match reader.value() {
            Some(TokenValue::Boolean(b)) => Bson::Boolean(*b),
            _ => return Err(ReaderError::invalid_value("Boolean token has no boolean value")),
        },
        TokenType::Null => Bson::Null,
        TokenType::Undefined => Bson::Undefined,
        TokenType::Date => match reader.value() {
            Some(TokenValue::DateTime(date)) => Bson::DateTime(DateTime::from(*date)),
            Some(TokenValue::Integer(millis)) => Bson::DateTime(DateTime::from_millis(*millis)),
            _ => return Err(ReaderError::invalid_value("Date token has no date value")),
        },
        TokenType::Bytes => match reader.value() {
            Some(TokenValue::Guid(guid)) => {
                Bson::Binary(Binary::from_guid(*guid, BinarySubtype::Uuid))
            }
            Some(TokenValue::Bytes(bytes)) => Bson::Binary(Binary::generic(bytes.clone())),
            _ => return Err(ReaderError::invalid_value("Bytes token has no bytes value")),
        },
        actual => return Err(ReaderError::unexpected_token("value", actual)),
    })
}

/// Reads the next property name, or `None` at the end of the object
fn read_member_name<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Option<String>, ReaderError> {
    extended::read_token(reader)?;
    match reader.token_type() {
        TokenType::EndObject => Ok(None),
        TokenType::PropertyName => Ok(Some(extended::current_str(reader)?.to_owned())),
        actual => Err(ReaderError::unexpected_token(
            "property name or end of object",
            actual,
        )),
    }
}

fn read_object<R: TokenReader + ?Sized>(reader: &mut R) -> Result<Bson, ReaderError> {
    let Some(name) = read_member_name(reader)? else {
        return Ok(Bson::Document(Document::new()));
    };
    if let Some(key) = ExtendedKey::parse_name(&name) {
        if let Some(value) = extended::read_extended_body(reader, key)? {
            return Ok(value);
        }
    }

    let mut document = Document::new();
    extended::read_token(reader)?;
    document.insert(name, read_current_value(reader)?);
    for (name, value) in read_document_content(reader)? {
        document.insert(name, value);
    }
    Ok(Bson::Document(document))
}

/// Reads the members of an object whose start has already been read, including its end
///
/// Property names are taken as they are, even if they look like extended-object keys.
pub(crate) fn read_document_content<R: TokenReader + ?Sized>(
    reader: &mut R,
) -> Result<Document, ReaderError> {
    let mut document = Document::new();
    while let Some(name) = read_member_name(reader)? {
        extended::read_token(reader)?;
        document.insert(name, read_current_value(reader)?);
    }
    Ok(document)
}

/// Reads the items of an array whose start has already been read, including its end
fn read_array_content<R: TokenReader + ?Sized>(reader: &mut R) -> Result<Vec<Bson>, ReaderError> {
    let mut values = Vec::new();
    loop {
        extended::read_token(reader)?;
        if reader.token_type() == TokenType::EndArray {
            return Ok(values);
        }
        values.push(read_current_value(reader)?);
    }
}

pub(crate) fn write_document<W: TokenWriter + ?Sized>(
    writer: &mut W,
    document: &Document,
) -> Result<(), WriterError> {
    writer.write_start_object()?;
    for (name, value) in document.iter() {
        writer.write_property_name(name)?;
        write_value(writer, value)?;
    }
    writer.write_end_object()
}

fn write_array<W: TokenWriter + ?Sized>(writer: &mut W, values: &[Bson]) -> Result<(), WriterError> {
    writer.write_start_array()?;
    for value in values {
        write_value(writer, value)?;
    }
    writer.write_end_array()
}

/// Writes a value with the native sink of the writer if it has one, and as tokens otherwise
pub(crate) fn write_value<W: TokenWriter + ?Sized>(
    writer: &mut W,
    value: &Bson,
) -> Result<(), WriterError> {
    let dialect = writer.extended_dialect();
    if let Some(sink) = writer.native_sink() {
        return sink.write_native_value(value);
    }
    write_value_tokens(writer, dialect, value)
}

/// Writes a value as tokens, using the extended-object encoding for native types
///
/// Nested values are written with [`write_value`], so they can still use the native sink
/// of the writer.
pub(crate) fn write_value_tokens<W: TokenWriter + ?Sized>(
    writer: &mut W,
    dialect: ExtendedJsonDialect,
    value: &Bson,
) -> Result<(), WriterError> {
    match value {
        Bson::Double(f) => writer.write_double(*f),
        Bson::String(s) => writer.write_string(s),
        Bson::Document(document) => write_document(writer, document),
        Bson::Array(values) => write_array(writer, values),
        Bson::Binary(binary) => extended::write_binary(writer, dialect, binary),
        Bson::Undefined => writer.write_undefined(),
        Bson::ObjectId(id) => extended::write_object_id(writer, dialect, *id),
        Bson::Boolean(b) => writer.write_boolean(*b),
        Bson::DateTime(date) => extended::write_date(writer, dialect, *date),
        Bson::Null => writer.write_null(),
        Bson::RegularExpression(regex) => extended::write_regex(writer, dialect, regex),
        Bson::JavaScriptCode(code) => extended::write_code(writer, dialect, code, None),
        Bson::Symbol(symbol) => extended::write_symbol(writer, dialect, symbol),
        Bson::JavaScriptCodeWithScope(code) => {
            extended::write_code(writer, dialect, &code.code, Some(&code.scope))
        }
        Bson::Int32(i) => writer.write_int32(*i),
        Bson::Timestamp(timestamp) => extended::write_timestamp(writer, dialect, *timestamp),
        Bson::Int64(i) => writer.write_int64(*i),
        Bson::MinKey => extended::write_sentinel(writer, dialect, ExtendedKey::MinKey),
        Bson::MaxKey => extended::write_sentinel(writer, dialect, ExtendedKey::MaxKey),
    }
}

/// Converter for arbitrary native values
///
/// Reads any token sequence, recognizing the extended-object encodings of all native types in
/// both dialects. Unlike the other converters a [`Null`](TokenType::Null) token is read as
/// `Some(Bson::Null)`, since `null` is a native value of its own.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, converters::*, reader::*};
/// let document = doc! {
///     "wrapped" => doc! { "$$oid" => "0102030405060708090a0b0c" },
/// };
/// let mut reader = ReaderAdapter::new(DocumentReader::new(document));
/// reader.read()?;
///
/// let value = BsonValueConverter::instance().read_token_value(&mut reader)?;
/// assert_eq!(
///     Some(Bson::Document(doc! {
///         "wrapped" => "0102030405060708090a0b0c".parse::<ObjectId>()?,
///     })),
///     value
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct BsonValueConverter;

impl TokenConverter for BsonValueConverter {
    type Value = Bson;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Bson>, ReaderError> {
        read_current_value(reader).map(Some)
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Bson>,
    ) -> Result<(), WriterError> {
        match value {
            Some(value) => write_value(writer, value),
            None => writer.write_null(),
        }
    }
}

/// Converter for [`Document`]s
///
/// Reads an object; an object which is the extended-object encoding of a native value is a
/// format error.
#[derive(Debug)]
pub struct DocumentConverter;

impl TokenConverter for DocumentConverter {
    type Value = Document;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Document>, ReaderError> {
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::StartObject => match read_object(reader)? {
                Bson::Document(document) => Ok(Some(document)),
                other => Err(ReaderError::invalid_value(format!(
                    "expected document but got {}",
                    other.element_type()
                ))),
            },
            actual => Err(ReaderError::unexpected_token("document", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Document>,
    ) -> Result<(), WriterError> {
        match value {
            Some(document) => write_document(writer, document),
            None => writer.write_null(),
        }
    }
}

/// Converter for arrays of native values
#[derive(Debug)]
pub struct ArrayConverter;

impl TokenConverter for ArrayConverter {
    type Value = Vec<Bson>;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Vec<Bson>>, ReaderError> {
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::StartArray => read_array_content(reader).map(Some),
            actual => Err(ReaderError::unexpected_token("array", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Vec<Bson>>,
    ) -> Result<(), WriterError> {
        match value {
            Some(values) => write_array(writer, values),
            None => writer.write_null(),
        }
    }
}
