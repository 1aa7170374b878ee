use tracing::debug;

use super::{ExtendedJsonDialect, NativeTypeSink, TokenWriter, WriterError, WriterSettings};
use crate::{
    bson::{
        Binary, BinarySubtype, Bson, DateTime, Document, Guid, NativeWriter, ObjectId, Regex,
        Timestamp,
    },
    converters::{
        bson_value,
        extended::{self, ExtendedKey},
    },
};

/// A [`TokenWriter`] writing to a [`NativeWriter`]
///
/// Structural tokens and the scalar values of the token grammar are forwarded to the wrapped
/// writer. Native values are written through the [`NativeTypeSink`] implementation of the
/// adapter: whenever the wrapped writer accepts a value at the current position they are
/// stored natively, without any loss. Otherwise, for example for a value at the top level of
/// a writer which only accepts documents there, the value is written in its extended-object
/// encoding, using the [dialect](WriterSettings::extended_dialect) from the settings.
///
/// Operations which only make sense for JSON text, such as [`write_raw`](TokenWriter::write_raw),
/// return [`WriterError::Unsupported`]. Whitespace is ignored.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, writer::*};
/// let id = ObjectId::from_bytes([1; 12]);
///
/// let mut writer = WriterAdapter::new(DocumentWriter::new());
/// writer.write_start_object()?;
/// writer.write_property_name("_id")?;
/// writer.write_object_id(id)?;
/// writer.write_end_object()?;
/// assert_eq!(Some(doc! { "_id" => id }), writer.into_inner().into_document());
///
/// // At the top level the wrapped writer only accepts documents
/// let mut writer = WriterAdapter::new(DocumentWriter::new());
/// writer.write_object_id(id)?;
/// assert_eq!(
///     Some(doc! { "$$oid" => "010101010101010101010101" }),
///     writer.into_inner().into_document()
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WriterAdapter<W: NativeWriter> {
    wrapped: W,
    settings: WriterSettings,
    is_closed: bool,
}

impl<W: NativeWriter> WriterAdapter<W> {
    /// Creates an adapter with default settings
    pub fn new(wrapped: W) -> Self {
        WriterAdapter::new_custom(wrapped, WriterSettings::default())
    }

    /// Creates an adapter with custom settings
    pub fn new_custom(wrapped: W, settings: WriterSettings) -> Self {
        WriterAdapter {
            wrapped,
            settings,
            is_closed: false,
        }
    }

    /// Sets whether closing the adapter also closes the wrapped writer
    pub fn set_close_output(&mut self, close_output: bool) {
        self.settings.close_output = close_output;
    }

    /// Gets the wrapped writer
    pub fn wrapped(&self) -> &W {
        &self.wrapped
    }

    /// Consumes the adapter and returns the wrapped writer
    pub fn into_inner(self) -> W {
        self.wrapped
    }

    /// Gets the dialect for the extended-object encoding if the wrapped writer does not
    /// accept a value at the current position, or `None` if the value can be written natively
    fn fallback_dialect(&self, value_type: &'static str) -> Option<ExtendedJsonDialect> {
        if self.wrapped.accepts_value() {
            return None;
        }
        let dialect = self.settings.extended_dialect;
        debug!(
            value_type,
            %dialect,
            state = %self.wrapped.state(),
            "writing extended-object encoding because the wrapped writer does not accept a value here"
        );
        Some(dialect)
    }
}

impl<W: NativeWriter> TokenWriter for WriterAdapter<W> {
    fn write_start_object(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.write_start_document()?)
    }

    fn write_end_object(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.write_end_document()?)
    }

    fn write_start_array(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.write_start_array()?)
    }

    fn write_end_array(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.write_end_array()?)
    }

    fn write_property_name(&mut self, name: &str) -> Result<(), WriterError> {
        Ok(self.wrapped.write_name(name)?)
    }

    fn write_null(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.write_null()?)
    }

    fn write_undefined(&mut self) -> Result<(), WriterError> {
        match self.fallback_dialect("undefined") {
            None => Ok(self.wrapped.write_undefined()?),
            Some(dialect) => extended::write_sentinel(self, dialect, ExtendedKey::Undefined),
        }
    }

    fn write_string(&mut self, value: &str) -> Result<(), WriterError> {
        Ok(self.wrapped.write_string(value)?)
    }

    fn write_int32(&mut self, value: i32) -> Result<(), WriterError> {
        Ok(self.wrapped.write_int32(value)?)
    }

    fn write_int64(&mut self, value: i64) -> Result<(), WriterError> {
        Ok(self.wrapped.write_int64(value)?)
    }

    fn write_double(&mut self, value: f64) -> Result<(), WriterError> {
        Ok(self.wrapped.write_double(value)?)
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), WriterError> {
        Ok(self.wrapped.write_boolean(value)?)
    }

    fn write_date_time(&mut self, value: chrono::DateTime<chrono::Utc>) -> Result<(), WriterError> {
        self.write_native_date_time(DateTime::from(value))
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), WriterError> {
        self.write_binary_data(&Binary::generic(value.to_vec()))
    }

    fn write_guid(&mut self, value: Guid) -> Result<(), WriterError> {
        self.write_binary_data(&Binary::from_guid(value, BinarySubtype::UuidOld))
    }

    fn write_raw(&mut self, _json: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "write_raw",
        })
    }

    fn write_raw_value(&mut self, _json: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "write_raw_value",
        })
    }

    fn write_start_constructor(&mut self, _name: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "write_start_constructor",
        })
    }

    fn write_end_constructor(&mut self) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "write_end_constructor",
        })
    }

    fn write_whitespace(&mut self, _whitespace: &str) -> Result<(), WriterError> {
        // No equivalent in the native format
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        Ok(self.wrapped.flush()?)
    }

    fn close(&mut self) -> Result<(), WriterError> {
        if self.is_closed {
            return Ok(());
        }
        self.is_closed = true;
        if self.settings.close_output {
            self.wrapped.close();
        }
        debug!(close_output = self.settings.close_output, "closed writer adapter");
        Ok(())
    }

    fn extended_dialect(&self) -> ExtendedJsonDialect {
        self.settings.extended_dialect
    }

    fn native_sink(&mut self) -> Option<&mut dyn NativeTypeSink> {
        Some(self)
    }
}

impl<W: NativeWriter> NativeTypeSink for WriterAdapter<W> {
    fn write_object_id(&mut self, value: ObjectId) -> Result<(), WriterError> {
        match self.fallback_dialect("object id") {
            None => Ok(self.wrapped.write_object_id(value)?),
            Some(dialect) => extended::write_object_id(self, dialect, value),
        }
    }

    fn write_binary_data(&mut self, value: &Binary) -> Result<(), WriterError> {
        match self.fallback_dialect("binary") {
            None => Ok(self.wrapped.write_binary(value)?),
            Some(dialect) => extended::write_binary(self, dialect, value),
        }
    }

    fn write_native_date_time(&mut self, value: DateTime) -> Result<(), WriterError> {
        match self.fallback_dialect("date time") {
            None => Ok(self.wrapped.write_date_time(value)?),
            Some(dialect) => extended::write_date(self, dialect, value),
        }
    }

    fn write_regular_expression(&mut self, value: &Regex) -> Result<(), WriterError> {
        match self.fallback_dialect("regular expression") {
            None => Ok(self.wrapped.write_regular_expression(value)?),
            Some(dialect) => extended::write_regex(self, dialect, value),
        }
    }

    fn write_java_script(&mut self, code: &str) -> Result<(), WriterError> {
        match self.fallback_dialect("JavaScript code") {
            None => Ok(self.wrapped.write_java_script(code)?),
            Some(dialect) => extended::write_code(self, dialect, code, None),
        }
    }

    fn write_java_script_with_scope(
        &mut self,
        code: &str,
        scope: &Document,
    ) -> Result<(), WriterError> {
        match self.fallback_dialect("JavaScript code with scope") {
            None => {
                self.wrapped.write_java_script_with_scope(code)?;
                self.wrapped.write_start_document()?;
                for (name, value) in scope.iter() {
                    self.wrapped.write_name(name)?;
                    self.wrapped.write_value(value)?;
                }
                Ok(self.wrapped.write_end_document()?)
            }
            Some(dialect) => extended::write_code(self, dialect, code, Some(scope)),
        }
    }

    fn write_symbol(&mut self, value: &str) -> Result<(), WriterError> {
        match self.fallback_dialect("symbol") {
            None => Ok(self.wrapped.write_symbol(value)?),
            Some(dialect) => extended::write_symbol(self, dialect, value),
        }
    }

    fn write_timestamp(&mut self, value: Timestamp) -> Result<(), WriterError> {
        match self.fallback_dialect("timestamp") {
            None => Ok(self.wrapped.write_timestamp(value)?),
            Some(dialect) => extended::write_timestamp(self, dialect, value),
        }
    }

    fn write_min_key(&mut self) -> Result<(), WriterError> {
        match self.fallback_dialect("min key") {
            None => Ok(self.wrapped.write_min_key()?),
            Some(dialect) => extended::write_sentinel(self, dialect, ExtendedKey::MinKey),
        }
    }

    fn write_max_key(&mut self) -> Result<(), WriterError> {
        match self.fallback_dialect("max key") {
            None => Ok(self.wrapped.write_max_key()?),
            Some(dialect) => extended::write_sentinel(self, dialect, ExtendedKey::MaxKey),
        }
    }

    fn write_native_value(&mut self, value: &Bson) -> Result<(), WriterError> {
        if self.wrapped.accepts_value() {
            return Ok(self.wrapped.write_value(value)?);
        }
        // Documents are forwarded as tokens, the wrapped writer might accept only them here
        let dialect = self.settings.extended_dialect;
        bson_value::write_value_tokens(self, dialect, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bson::{DocumentWriter, JavaScriptCodeWithScope, NativeWriterState},
        doc,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// Writes a single value as member `x` of a document
    fn write_member(
        write: impl FnOnce(&mut WriterAdapter<DocumentWriter>) -> Result<(), WriterError>,
    ) -> Result<Bson, Box<dyn std::error::Error>> {
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_start_object()?;
        writer.write_property_name("x")?;
        write(&mut writer)?;
        writer.write_end_object()?;
        let mut document = writer.into_inner().into_document().ok_or("no document")?;
        Ok(document.remove("x").ok_or("missing x")?)
    }

    #[test]
    fn structure() -> TestResult {
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_start_object()?;
        writer.write_property_name("a")?;
        writer.write_start_array()?;
        writer.write_int32(1)?;
        writer.write_int64(2)?;
        writer.write_double(3.5)?;
        writer.write_string("s")?;
        writer.write_boolean(false)?;
        writer.write_null()?;
        writer.write_end_array()?;
        writer.write_property_name("b")?;
        writer.write_start_object()?;
        writer.write_end_object()?;
        writer.write_end_object()?;
        writer.flush()?;

        assert_eq!(
            Some(doc! {
                "a" => vec![
                    Bson::Int32(1),
                    Bson::Int64(2),
                    Bson::Double(3.5),
                    Bson::from("s"),
                    Bson::Boolean(false),
                    Bson::Null,
                ],
                "b" => doc! {},
            }),
            writer.into_inner().into_document()
        );
        Ok(())
    }

    #[test]
    fn native_values() -> TestResult {
        let binary = Binary {
            subtype: BinarySubtype::UserDefined(0x80),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(
            Bson::Binary(binary.clone()),
            write_member(|w| w.write_binary_data(&binary))?
        );
        assert_eq!(
            Bson::ObjectId(ObjectId::from_bytes([5; 12])),
            write_member(|w| w.write_object_id(ObjectId::from_bytes([5; 12])))?
        );
        assert_eq!(
            Bson::RegularExpression(Regex::new("a", "i")),
            write_member(|w| w.write_regular_expression(&Regex::new("a", "i")))?
        );
        assert_eq!(
            Bson::JavaScriptCode("abc".to_owned()),
            write_member(|w| w.write_java_script("abc"))?
        );
        assert_eq!(
            Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code: "abc".to_owned(),
                scope: doc! { "y" => 1 },
            }),
            write_member(|w| w.write_java_script_with_scope("abc", &doc! { "y" => 1 }))?
        );
        assert_eq!(
            Bson::Symbol("sym".to_owned()),
            write_member(|w| w.write_symbol("sym"))?
        );
        assert_eq!(
            Bson::Timestamp(Timestamp::from_packed(0x0000_0001_0000_0002)),
            write_member(|w| w.write_timestamp(Timestamp::from_packed(0x0000_0001_0000_0002)))?
        );
        assert_eq!(Bson::MinKey, write_member(|w| w.write_min_key())?);
        assert_eq!(Bson::MaxKey, write_member(|w| w.write_max_key())?);
        assert_eq!(Bson::Undefined, write_member(|w| w.write_undefined())?);
        Ok(())
    }

    #[test]
    fn dates() -> TestResult {
        let epoch = chrono::DateTime::from_timestamp(0, 0).ok_or("out of range")?;
        assert_eq!(
            Bson::DateTime(DateTime::from_millis(0)),
            write_member(|w| w.write_date_time(epoch))?
        );
        assert_eq!(
            Bson::DateTime(DateTime::MIN),
            write_member(|w| w.write_native_date_time(DateTime::MIN))?
        );
        assert_eq!(
            Bson::DateTime(DateTime::MAX),
            write_member(|w| w.write_native_date_time(DateTime::MAX))?
        );
        Ok(())
    }

    #[test]
    fn bytes_and_guid() -> TestResult {
        assert_eq!(
            Bson::Binary(Binary::generic(vec![1, 2])),
            write_member(|w| w.write_bytes(&[1, 2]))?
        );

        let guid = Guid::parse_str("01020304-0506-0708-090a-0b0c0d0e0f10")?;
        match write_member(|w| w.write_guid(guid))? {
            Bson::Binary(binary) => {
                assert_eq!(BinarySubtype::UuidOld, binary.subtype);
                assert_eq!("0403020106050807090a0b0c0d0e0f10", hex::encode(&binary.bytes));
            }
            value => panic!("unexpected value: {value:?}"),
        }
        Ok(())
    }

    #[test]
    fn fallback_at_top_level() -> TestResult {
        let id = ObjectId::parse_str("112233445566778899aabbcc")?;

        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_object_id(id)?;
        assert_eq!(
            Some(doc! { "$$oid" => "112233445566778899aabbcc" }),
            writer.into_inner().into_document()
        );

        let mut writer = WriterAdapter::new_custom(
            DocumentWriter::new(),
            WriterSettings {
                extended_dialect: ExtendedJsonDialect::Canonical,
                ..Default::default()
            },
        );
        writer.write_timestamp(Timestamp::from_packed(0x0000_0001_0000_0002))?;
        assert_eq!(
            Some(doc! { "$timestamp" => doc! { "t" => 1_i64, "i" => 2_i64 } }),
            writer.into_inner().into_document()
        );

        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_undefined()?;
        assert_eq!(
            Some(doc! { "$$undefined" => true }),
            writer.into_inner().into_document()
        );

        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_java_script_with_scope("f()", &doc! { "y" => 1 })?;
        assert_eq!(
            Some(doc! { "$$code" => "f()", "$$scope" => doc! { "y" => 1 } }),
            writer.into_inner().into_document()
        );

        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_binary_data(&Binary {
            subtype: BinarySubtype::UserDefined(0x80),
            bytes: vec![0],
        })?;
        assert_eq!(
            Some(doc! { "$$binary" => "AA==", "$$type" => "80" }),
            writer.into_inner().into_document()
        );
        Ok(())
    }

    #[test]
    fn native_value_at_top_level() -> TestResult {
        let document = doc! {
            "id" => ObjectId::from_bytes([1; 12]),
            "nested" => vec![Bson::MinKey, Bson::Document(doc! { "d" => DateTime::MAX })],
        };
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_native_value(&Bson::Document(document.clone()))?;
        assert_eq!(Some(document), writer.into_inner().into_document());

        let mut writer = WriterAdapter::new(DocumentWriter::with_root_values());
        writer.write_native_value(&Bson::MaxKey)?;
        writer.write_native_value(&Bson::Int64(1))?;
        assert_eq!(
            vec![Bson::MaxKey, Bson::Int64(1)],
            writer.into_inner().into_values()
        );
        Ok(())
    }

    #[test]
    fn unsupported_operations() -> TestResult {
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.write_whitespace("  ")?;

        match writer.write_raw("{}") {
            Err(WriterError::Unsupported { operation }) => assert_eq!("write_raw", operation),
            r => panic!("unexpected result: {r:?}"),
        }
        assert!(writer.write_raw_value("1").is_err());
        assert!(writer.write_start_constructor("Date").is_err());
        assert!(writer.write_end_constructor().is_err());

        // Nothing has been written
        assert_eq!(NativeWriterState::Initial, writer.wrapped().state());
        Ok(())
    }

    #[test]
    fn invalid_usage() {
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        match writer.write_int32(1) {
            Err(WriterError::Native(_)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn close() -> TestResult {
        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.close()?;
        writer.close()?;
        assert_eq!(NativeWriterState::Initial, writer.wrapped().state());

        let mut writer = WriterAdapter::new_custom(
            DocumentWriter::new(),
            WriterSettings {
                close_output: true,
                ..Default::default()
            },
        );
        writer.close()?;
        writer.close()?;
        assert_eq!(NativeWriterState::Closed, writer.wrapped().state());

        let mut writer = WriterAdapter::new(DocumentWriter::new());
        writer.set_close_output(true);
        writer.close()?;
        assert_eq!(NativeWriterState::Closed, writer.into_inner().state());
        Ok(())
    }
}
