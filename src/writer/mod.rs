//! Module for writing tokens
//!
//! [`TokenWriter`] is the general trait for token writers, [`WriterAdapter`] is an
//! implementation of it which writes to a [`NativeWriter`](crate::bson::NativeWriter).
//!
//! Writers which can store native values directly implement the capability trait
//! [`NativeTypeSink`] and expose it with [`TokenWriter::native_sink`]. Writers without that
//! capability receive native values in their extended-object encoding instead.

use thiserror::Error;

use crate::bson::{
    Binary, Bson, BsonError, DateTime, Document, Guid, ObjectId, Regex, Timestamp,
};

mod adapter;
// Re-export adapter implementation under `writer` module
pub use adapter::*;

/// Spelling of the reserved property names of the extended-object encoding
#[derive(PartialEq, Eq, Hash, Clone, Copy, strum::Display, Debug)]
pub enum ExtendedJsonDialect {
    /// Single dollar sign, for example `$oid`
    ///
    /// Understood by most consumers of extended JSON.
    Canonical,
    /// Double dollar sign, for example `$$oid`
    ///
    /// Used between readers and writers of this crate; it distinguishes the encoding of
    /// native values from documents which happen to contain property names starting with `$`.
    DoubleDollar,
}

impl ExtendedJsonDialect {
    /// Gets the prefix of the reserved property names
    pub fn prefix(&self) -> &'static str {
        match self {
            ExtendedJsonDialect::Canonical => "$",
            ExtendedJsonDialect::DoubleDollar => "$$",
        }
    }
}

/// Error which occurred while writing to a token writer
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WriterError {
    /// The operation has no representation in the target format
    #[error("{operation} is not supported")]
    Unsupported {
        /// Name of the operation
        operation: &'static str,
    },
    /// A value cannot be represented by the writer
    #[error("invalid value: {message}")]
    InvalidValue {
        /// Message describing why the value is invalid
        message: String,
    },
    /// The wrapped native writer reported an error
    #[error("native writer error: {0}")]
    Native(#[from] BsonError),
}

/// Settings to customize the token writer behavior
///
/// These settings are used by [`WriterAdapter::new_custom`]. To avoid repeating the
/// default values for unchanged settings `..Default::default()` can be used:
/// ```
/// # use bson_token_adapter::writer::*;
/// WriterSettings {
///     extended_dialect: ExtendedJsonDialect::Canonical,
///     // For all other settings use the default
///     ..Default::default()
/// }
/// # ;
/// ```
#[derive(Clone, Debug)]
pub struct WriterSettings {
    /// Whether closing the writer also closes the wrapped writer
    pub close_output: bool,

    /// Dialect used when a native value has to be written in its extended-object encoding
    ///
    /// This happens when the wrapped writer does not accept a value at its current position.
    pub extended_dialect: ExtendedJsonDialect,
}

impl Default for WriterSettings {
    /// Creates the default writer settings
    ///
    /// - close output: disabled
    /// - extended dialect: [`DoubleDollar`](ExtendedJsonDialect::DoubleDollar)
    fn default() -> Self {
        WriterSettings {
            close_output: false,
            extended_dialect: ExtendedJsonDialect::DoubleDollar,
        }
    }
}

/// A trait for token writers
///
/// Objects and arrays are written with the corresponding `start` and `end` methods; inside
/// objects every value has to be preceded by [`write_property_name`](Self::write_property_name).
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, writer::*};
/// let mut writer = WriterAdapter::new(DocumentWriter::new());
///
/// writer.write_start_object()?;
/// writer.write_property_name("a")?;
/// writer.write_start_array()?;
/// writer.write_int32(1)?;
/// writer.write_boolean(true)?;
/// writer.write_end_array()?;
/// writer.write_end_object()?;
///
/// assert_eq!(
///     Some(doc! { "a" => vec![Bson::Int32(1), Bson::Boolean(true)] }),
///     writer.into_inner().into_document()
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Panics
/// Implementations may panic when the methods are called in an order which does not produce
/// a well-formed token sequence, for example writing a property name inside an array. This
/// indicates incorrect usage by the caller and is unrelated to the written data.
pub trait TokenWriter {
    /// Writes the start of an object
    fn write_start_object(&mut self) -> Result<(), WriterError>;
    /// Writes the end of the current object
    fn write_end_object(&mut self) -> Result<(), WriterError>;
    /// Writes the start of an array
    fn write_start_array(&mut self) -> Result<(), WriterError>;
    /// Writes the end of the current array
    fn write_end_array(&mut self) -> Result<(), WriterError>;
    /// Writes the name of the next object property
    fn write_property_name(&mut self, name: &str) -> Result<(), WriterError>;

    /// Writes `null`
    fn write_null(&mut self) -> Result<(), WriterError>;
    /// Writes `undefined`
    fn write_undefined(&mut self) -> Result<(), WriterError>;
    /// Writes a string value
    fn write_string(&mut self, value: &str) -> Result<(), WriterError>;
    /// Writes a 32-bit integer value
    fn write_int32(&mut self, value: i32) -> Result<(), WriterError>;
    /// Writes a 64-bit integer value
    fn write_int64(&mut self, value: i64) -> Result<(), WriterError>;
    /// Writes a floating point value
    fn write_double(&mut self, value: f64) -> Result<(), WriterError>;
    /// Writes a boolean value
    fn write_boolean(&mut self, value: bool) -> Result<(), WriterError>;
    /// Writes a date value
    fn write_date_time(&mut self, value: chrono::DateTime<chrono::Utc>) -> Result<(), WriterError>;
    /// Writes binary data
    fn write_bytes(&mut self, value: &[u8]) -> Result<(), WriterError>;
    /// Writes a 128-bit unique identifier
    fn write_guid(&mut self, value: Guid) -> Result<(), WriterError>;

    /// Writes pre-formatted JSON text in place of a token
    fn write_raw(&mut self, json: &str) -> Result<(), WriterError>;
    /// Writes pre-formatted JSON text as the next value
    fn write_raw_value(&mut self, json: &str) -> Result<(), WriterError>;
    /// Writes the start of a constructor call, for example `new Date(`
    fn write_start_constructor(&mut self, name: &str) -> Result<(), WriterError>;
    /// Writes the end of the current constructor call
    fn write_end_constructor(&mut self) -> Result<(), WriterError>;
    /// Writes formatting whitespace
    fn write_whitespace(&mut self, whitespace: &str) -> Result<(), WriterError>;

    /// Flushes buffered data, if any
    fn flush(&mut self) -> Result<(), WriterError>;
    /// Closes the writer; closing again has no effect
    fn close(&mut self) -> Result<(), WriterError>;

    /// Gets the dialect in which native values are written to this writer when it has no
    /// [`native_sink`](Self::native_sink)
    ///
    /// The default implementation returns [`ExtendedJsonDialect::Canonical`].
    fn extended_dialect(&self) -> ExtendedJsonDialect {
        ExtendedJsonDialect::Canonical
    }

    /// Gets the native value capability of this writer, if it has one
    ///
    /// The default implementation returns `None`.
    fn native_sink(&mut self) -> Option<&mut dyn NativeTypeSink> {
        None
    }
}

/// Capability of a [`TokenWriter`] to write native values without loss
///
/// Implementations decide per call whether the value can be stored natively at the current
/// position; if not they write the extended-object encoding instead.
pub trait NativeTypeSink {
    /// Writes an object id
    fn write_object_id(&mut self, value: ObjectId) -> Result<(), WriterError>;
    /// Writes binary data with its subtype
    fn write_binary_data(&mut self, value: &Binary) -> Result<(), WriterError>;
    /// Writes a date time, including dates outside of the range of [`chrono::DateTime`]
    fn write_native_date_time(&mut self, value: DateTime) -> Result<(), WriterError>;
    /// Writes a regular expression
    fn write_regular_expression(&mut self, value: &Regex) -> Result<(), WriterError>;
    /// Writes JavaScript code
    fn write_java_script(&mut self, code: &str) -> Result<(), WriterError>;
    /// Writes JavaScript code with its scope
    fn write_java_script_with_scope(
        &mut self,
        code: &str,
        scope: &Document,
    ) -> Result<(), WriterError>;
    /// Writes a symbol
    fn write_symbol(&mut self, value: &str) -> Result<(), WriterError>;
    /// Writes a timestamp
    fn write_timestamp(&mut self, value: Timestamp) -> Result<(), WriterError>;
    /// Writes the min key sentinel
    fn write_min_key(&mut self) -> Result<(), WriterError>;
    /// Writes the max key sentinel
    fn write_max_key(&mut self) -> Result<(), WriterError>;
    /// Writes an arbitrary native value, including all nested values
    fn write_native_value(&mut self, value: &Bson) -> Result<(), WriterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_prefix() {
        assert_eq!("$", ExtendedJsonDialect::Canonical.prefix());
        assert_eq!("$$", ExtendedJsonDialect::DoubleDollar.prefix());
        assert_eq!(
            ExtendedJsonDialect::DoubleDollar,
            WriterSettings::default().extended_dialect
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(
            "write_raw is not supported",
            WriterError::Unsupported {
                operation: "write_raw"
            }
            .to_string()
        );
    }
}
