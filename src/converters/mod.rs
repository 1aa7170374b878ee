//! Module for converters between tokens and native values
//!
//! Every native type has a stateless [`TokenConverter`] which is shared process-wide, see
//! for example [`ObjectIdConverter::instance`]. A converter reads a value from whichever of
//! the following shapes the current token has, in this order:
//!
//! 1. the [native value](crate::reader::TokenReader::native_value) of the current token, if the
//!    reader exposes one of the matching type
//! 2. a plain token, where the token grammar has a direct equivalent, for example a
//!    [`Bytes`](crate::token::TokenType::Bytes) token for an object id
//! 3. the extended-object encoding, for example `{ "$oid": "..." }`, with either a single or
//!    a double dollar prefix
//!
//! For writing, a converter uses the [`NativeTypeSink`] of the writer if it has one, and
//! otherwise writes the extended-object encoding in the
//! [dialect of the writer](crate::writer::TokenWriter::extended_dialect).
//!
//! # Examples
//! ```
//! # use bson_token_adapter::{doc, bson::*, converters::*, reader::*, writer::*};
//! let id = ObjectId::from_bytes([7; 12]);
//!
//! let mut writer = WriterAdapter::new(DocumentWriter::new());
//! writer.write_start_object()?;
//! writer.write_property_name("_id")?;
//! ObjectIdConverter::instance().write_token_value(&mut writer, Some(&id))?;
//! writer.write_end_object()?;
//! let document = writer.into_inner().into_document().ok_or("no document")?;
//! assert_eq!(doc! { "_id" => id }, document);
//!
//! let mut reader = ReaderAdapter::new(DocumentReader::new(document));
//! reader.read()?; // StartObject
//! reader.read()?; // _id
//! reader.read()?;
//! assert_eq!(Some(id), ObjectIdConverter::instance().read_token_value(&mut reader)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use duplicate::duplicate_item;

use crate::{
    reader::{ReaderError, TokenReader},
    token::TokenValue,
    writer::{ExtendedJsonDialect, NativeTypeSink, TokenWriter, WriterError},
};

pub(crate) mod bson_value;
pub(crate) mod extended;
mod native;
mod primitive;
mod sentinel;

pub use bson_value::*;
pub use extended::ExtendedKey;
pub use native::*;
pub use primitive::*;
pub use sentinel::*;

/// A converter between tokens and values of one native type
pub trait TokenConverter {
    /// The converted type
    type Value;

    /// Reads the value starting at the current token
    ///
    /// The reader must already be positioned at the first token of the value; afterwards it
    /// is positioned at the last token of the value. Returns `None` for a
    /// [`Null`](crate::token::TokenType::Null) token.
    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Self::Value>, ReaderError>;

    /// Writes the value, or `null` for `None`
    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Self::Value>,
    ) -> Result<(), WriterError>;
}

/*
 * One immutable instance per converter; the converters hold no state so sharing them
 * requires no synchronization
 */
/// Shared instance of [`ObjectIdConverter`]
pub static OBJECT_ID_CONVERTER: ObjectIdConverter = ObjectIdConverter;
/// Shared instance of [`BinaryDataConverter`]
pub static BINARY_DATA_CONVERTER: BinaryDataConverter = BinaryDataConverter;
/// Shared instance of [`DateTimeConverter`]
pub static DATE_TIME_CONVERTER: DateTimeConverter = DateTimeConverter;
/// Shared instance of [`RegularExpressionConverter`]
pub static REGULAR_EXPRESSION_CONVERTER: RegularExpressionConverter = RegularExpressionConverter;
/// Shared instance of [`JavaScriptConverter`]
pub static JAVA_SCRIPT_CONVERTER: JavaScriptConverter = JavaScriptConverter;
/// Shared instance of [`JavaScriptWithScopeConverter`]
pub static JAVA_SCRIPT_WITH_SCOPE_CONVERTER: JavaScriptWithScopeConverter =
    JavaScriptWithScopeConverter;
/// Shared instance of [`SymbolConverter`]
pub static SYMBOL_CONVERTER: SymbolConverter = SymbolConverter;
/// Shared instance of [`TimestampConverter`]
pub static TIMESTAMP_CONVERTER: TimestampConverter = TimestampConverter;
/// Shared instance of [`MinKeyConverter`]
pub static MIN_KEY_CONVERTER: MinKeyConverter = MinKeyConverter;
/// Shared instance of [`MaxKeyConverter`]
pub static MAX_KEY_CONVERTER: MaxKeyConverter = MaxKeyConverter;
/// Shared instance of [`UndefinedConverter`]
pub static UNDEFINED_CONVERTER: UndefinedConverter = UndefinedConverter;
/// Shared instance of [`NullConverter`]
pub static NULL_CONVERTER: NullConverter = NullConverter;
/// Shared instance of [`BooleanConverter`]
pub static BOOLEAN_CONVERTER: BooleanConverter = BooleanConverter;
/// Shared instance of [`Int32Converter`]
pub static INT32_CONVERTER: Int32Converter = Int32Converter;
/// Shared instance of [`Int64Converter`]
pub static INT64_CONVERTER: Int64Converter = Int64Converter;
/// Shared instance of [`DoubleConverter`]
pub static DOUBLE_CONVERTER: DoubleConverter = DoubleConverter;
/// Shared instance of [`DocumentConverter`]
pub static DOCUMENT_CONVERTER: DocumentConverter = DocumentConverter;
/// Shared instance of [`ArrayConverter`]
pub static ARRAY_CONVERTER: ArrayConverter = ArrayConverter;
/// Shared instance of [`BsonValueConverter`]
pub static BSON_VALUE_CONVERTER: BsonValueConverter = BsonValueConverter;

#[duplicate_item(
    converter                       instance_static;
    [ObjectIdConverter]             [OBJECT_ID_CONVERTER];
    [BinaryDataConverter]           [BINARY_DATA_CONVERTER];
    [DateTimeConverter]             [DATE_TIME_CONVERTER];
    [RegularExpressionConverter]    [REGULAR_EXPRESSION_CONVERTER];
    [JavaScriptConverter]           [JAVA_SCRIPT_CONVERTER];
    [JavaScriptWithScopeConverter]  [JAVA_SCRIPT_WITH_SCOPE_CONVERTER];
    [SymbolConverter]               [SYMBOL_CONVERTER];
    [TimestampConverter]            [TIMESTAMP_CONVERTER];
    [MinKeyConverter]               [MIN_KEY_CONVERTER];
    [MaxKeyConverter]               [MAX_KEY_CONVERTER];
    [UndefinedConverter]            [UNDEFINED_CONVERTER];
    [NullConverter]                 [NULL_CONVERTER];
    [BooleanConverter]              [BOOLEAN_CONVERTER];
    [Int32Converter]                [INT32_CONVERTER];
    [Int64Converter]                [INT64_CONVERTER];
    [DoubleConverter]               [DOUBLE_CONVERTER];
    [DocumentConverter]             [DOCUMENT_CONVERTER];
    [ArrayConverter]                [ARRAY_CONVERTER];
    [BsonValueConverter]            [BSON_VALUE_CONVERTER];
)]
impl converter {
    /// Gets the shared instance of this converter
    pub fn instance() -> &'static converter {
        &instance_static
    }
}

/// Writes a value with the native sink of the writer, or in its extended-object encoding
/// if the writer has no native sink
fn write_native_or_extended<W: TokenWriter + ?Sized>(
    writer: &mut W,
    native: impl FnOnce(&mut dyn NativeTypeSink) -> Result<(), WriterError>,
    extended: impl FnOnce(&mut W, ExtendedJsonDialect) -> Result<(), WriterError>,
) -> Result<(), WriterError> {
    // Determine dialect first, `native_sink` borrows the writer
    let dialect = writer.extended_dialect();
    match writer.native_sink() {
        Some(sink) => native(sink),
        None => extended(writer, dialect),
    }
}

/// Reads the remainder of an extended object with the given leading key
///
/// The current token must be the start of the object.
fn read_extended_object<R: TokenReader + ?Sized, T>(
    reader: &mut R,
    key: ExtendedKey,
    read_body: impl FnOnce(&mut R) -> Result<T, ReaderError>,
) -> Result<T, ReaderError> {
    extended::read_expected_property_name(reader, key)?;
    read_body(reader)
}

/// Gets the bytes of the current token
fn current_bytes<R: TokenReader + ?Sized>(reader: &R) -> Result<Vec<u8>, ReaderError> {
    reader.value().and_then(TokenValue::to_bytes).ok_or_else(|| {
        ReaderError::invalid_value(format!("{} token has no bytes value", reader.token_type()))
    })
}
