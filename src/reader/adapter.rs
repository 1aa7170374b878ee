use tracing::{debug, trace};

use super::{ReaderError, ReaderSettings, TokenReader};
use crate::{
    bson::{Bson, BsonError, ElementType, NativeReader, NativeReaderState},
    token::{TokenType, TokenValue},
};

/// A [`TokenReader`] presenting a [`NativeReader`] as token stream
///
/// Native values without an exact token equivalent are reported as the closest token, and
/// are additionally available without loss from [`native_value`](TokenReader::native_value):
///
/// | Native type | Token | Token value |
/// |---|---|---|
/// | object id | [`Bytes`](TokenType::Bytes) | the 12 bytes |
/// | binary, UUID subtypes with 16 bytes | [`Bytes`](TokenType::Bytes) | the GUID |
/// | other binary | [`Bytes`](TokenType::Bytes) | the bytes |
/// | date time | [`Date`](TokenType::Date) | the date, or the milliseconds if out of range |
/// | regular expression | [`String`](TokenType::String) | `/pattern/options` |
/// | JavaScript code, symbol | [`String`](TokenType::String) | the code respectively symbol |
/// | JavaScript code with scope | [`String`](TokenType::String) | only the code |
/// | timestamp | [`Integer`](TokenType::Integer) | time and increment packed into 64 bits |
/// | min key, max key | [`Undefined`](TokenType::Undefined) | none |
///
/// For JavaScript code with scope the scope is consumed from the native reader but only
/// retained in the native value; consumers which only look at the token lose it.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, reader::*, token::*};
/// let id = ObjectId::from_bytes([1; 12]);
/// let mut reader = ReaderAdapter::new(DocumentReader::new(doc! { "_id" => id }));
///
/// assert!(reader.read()?); // StartObject
/// assert!(reader.read()?); // PropertyName
/// assert!(reader.read()?);
/// assert_eq!(TokenType::Bytes, reader.token_type());
/// assert_eq!(Some(&TokenValue::Bytes(vec![1; 12])), reader.value());
/// assert_eq!(Some(&Bson::ObjectId(id)), reader.native_value());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ReaderAdapter<R: NativeReader> {
    wrapped: R,
    settings: ReaderSettings,
    is_closed: bool,
    token_type: TokenType,
    value: Option<TokenValue>,
    native_value: Option<Bson>,
    depth: usize,
}

impl<R: NativeReader> ReaderAdapter<R> {
    /// Creates an adapter with default settings
    pub fn new(wrapped: R) -> Self {
        ReaderAdapter::new_custom(wrapped, ReaderSettings::default())
    }

    /// Creates an adapter with custom settings
    pub fn new_custom(wrapped: R, settings: ReaderSettings) -> Self {
        ReaderAdapter {
            wrapped,
            settings,
            is_closed: false,
            token_type: TokenType::None,
            value: None,
            native_value: None,
            depth: 0,
        }
    }

    /// Sets whether closing the adapter also closes the wrapped reader
    pub fn set_close_input(&mut self, close_input: bool) {
        self.settings.close_input = close_input;
    }

    /// Gets the wrapped reader
    pub fn wrapped(&self) -> &R {
        &self.wrapped
    }

    /// Consumes the adapter and returns the wrapped reader
    pub fn into_inner(self) -> R {
        self.wrapped
    }

    fn set_token(&mut self, token_type: TokenType, value: Option<TokenValue>, native_value: Option<Bson>) {
        self.token_type = token_type;
        self.value = value;
        self.native_value = native_value;
    }

    /// Emits the token for the value the wrapped reader is positioned at
    fn read_value_token(&mut self) -> Result<(), ReaderError> {
        let element_type =
            self.wrapped
                .current_element_type()
                .ok_or(BsonError::InvalidReaderState {
                    method: "read",
                    state: self.wrapped.state(),
                })?;
        match element_type {
            // Containers are only entered; their content follows with the next calls
            ElementType::Document => {
                self.wrapped.read_start_document()?;
                self.depth += 1;
                self.set_token(TokenType::StartObject, None, None);
            }
            ElementType::Array => {
                self.wrapped.read_start_array()?;
                self.depth += 1;
                self.set_token(TokenType::StartArray, None, None);
            }
            _ => {
                let native_value = self.wrapped.read_value()?;
                let (token_type, value) = native_to_token(&native_value);
                self.set_token(token_type, value, Some(native_value));
            }
        }
        Ok(())
    }
}

/// Maps a scalar native value to its closest token
fn native_to_token(value: &Bson) -> (TokenType, Option<TokenValue>) {
    match value {
        Bson::Double(v) => (TokenType::Float, Some(TokenValue::Float(*v))),
        Bson::String(v) | Bson::JavaScriptCode(v) | Bson::Symbol(v) => {
            (TokenType::String, Some(TokenValue::String(v.clone())))
        }
        Bson::Int32(v) => (TokenType::Integer, Some(TokenValue::Integer((*v).into()))),
        Bson::Int64(v) => (TokenType::Integer, Some(TokenValue::Integer(*v))),
        Bson::Boolean(v) => (TokenType::Boolean, Some(TokenValue::Boolean(*v))),
        Bson::Null => (TokenType::Null, None),
        Bson::Undefined | Bson::MinKey | Bson::MaxKey => (TokenType::Undefined, None),
        Bson::ObjectId(v) => (TokenType::Bytes, Some(TokenValue::Bytes(v.bytes().to_vec()))),
        Bson::Binary(binary) => {
            let value = match binary.to_guid() {
                Some(guid) => TokenValue::Guid(guid),
                None => TokenValue::Bytes(binary.bytes.clone()),
            };
            (TokenType::Bytes, Some(value))
        }
        Bson::DateTime(date) => {
            let value = match date.to_chrono() {
                Some(date) => TokenValue::DateTime(date),
                None => TokenValue::Integer(date.timestamp_millis()),
            };
            (TokenType::Date, Some(value))
        }
        Bson::RegularExpression(regex) => (TokenType::String, Some(TokenValue::String(regex.to_string()))),
        Bson::JavaScriptCodeWithScope(code) => {
            (TokenType::String, Some(TokenValue::String(code.code.clone())))
        }
        // Reinterprets the bits, time values from 2^31 on become negative
        Bson::Timestamp(timestamp) => (
            TokenType::Integer,
            Some(TokenValue::Integer(timestamp.to_packed() as i64)),
        ),
        // Only reachable for containers passed in by mistake; containers are handled by the caller
        Bson::Document(_) => (TokenType::StartObject, None),
        Bson::Array(_) => (TokenType::StartArray, None),
    }
}

impl<R: NativeReader> TokenReader for ReaderAdapter<R> {
    fn read(&mut self) -> Result<bool, ReaderError> {
        loop {
            match self.wrapped.state() {
                NativeReaderState::Closed | NativeReaderState::Done => return Ok(false),
                NativeReaderState::Initial => {
                    if self.wrapped.is_at_end_of_file() {
                        trace!("native reader is at end of input");
                        return Ok(false);
                    }
                    if self.wrapped.read_element_type()?.is_none() {
                        return Ok(false);
                    }
                    // Now positioned at the top-level value
                }
                NativeReaderState::Type => {
                    self.wrapped.read_element_type()?;
                }
                NativeReaderState::Name => {
                    let name = self.wrapped.read_name()?;
                    self.set_token(TokenType::PropertyName, Some(TokenValue::String(name)), None);
                    return Ok(true);
                }
                NativeReaderState::Value => {
                    self.read_value_token()?;
                    return Ok(true);
                }
                NativeReaderState::EndOfArray => {
                    self.wrapped.read_end_array()?;
                    self.depth = self.depth.saturating_sub(1);
                    self.set_token(TokenType::EndArray, None, None);
                    return Ok(true);
                }
                NativeReaderState::EndOfDocument => {
                    self.wrapped.read_end_document()?;
                    self.depth = self.depth.saturating_sub(1);
                    self.set_token(TokenType::EndObject, None, None);
                    return Ok(true);
                }
                // The adapter always consumes the scope together with its code
                state @ NativeReaderState::ScopeDocument => {
                    return Err(BsonError::InvalidReaderState {
                        method: "read",
                        state,
                    }
                    .into())
                }
            }
        }
    }

    fn token_type(&self) -> TokenType {
        self.token_type
    }

    fn value(&self) -> Option<&TokenValue> {
        self.value.as_ref()
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn native_value(&self) -> Option<&Bson> {
        self.native_value.as_ref()
    }

    fn close(&mut self) {
        if self.is_closed {
            return;
        }
        self.is_closed = true;
        if self.settings.close_input {
            self.wrapped.close();
        }
        debug!(close_input = self.settings.close_input, "closed reader adapter");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bson::{
            Binary, BinarySubtype, DateTime, DocumentReader, Guid, JavaScriptCodeWithScope,
            ObjectId, Regex, Timestamp,
        },
        doc,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn adapter_for(value: Bson) -> ReaderAdapter<DocumentReader> {
        ReaderAdapter::new(DocumentReader::from_values(vec![value]))
    }

    fn read_all(reader: &mut impl TokenReader) -> Result<Vec<TokenType>, ReaderError> {
        let mut tokens = Vec::new();
        while reader.read()? {
            tokens.push(reader.token_type());
        }
        Ok(tokens)
    }

    #[test]
    fn initial_state() {
        let reader = ReaderAdapter::new(DocumentReader::new(doc! {}));
        assert_eq!(TokenType::None, reader.token_type());
        assert_eq!(None, reader.value());
        assert_eq!(None, reader.native_value());
        assert_eq!(0, reader.depth());
    }

    #[test]
    fn token_sequence() -> TestResult {
        let mut reader = ReaderAdapter::new(DocumentReader::new(doc! { "x" => 1 }));
        assert_eq!(
            vec![
                TokenType::StartObject,
                TokenType::PropertyName,
                TokenType::Integer,
                TokenType::EndObject
            ],
            read_all(&mut reader)?
        );
        // Token state stays unchanged at the end
        assert_eq!(false, reader.read()?);
        assert_eq!(TokenType::EndObject, reader.token_type());
        Ok(())
    }

    #[test]
    fn depth() -> TestResult {
        let mut reader =
            ReaderAdapter::new(DocumentReader::new(doc! { "x" => doc! { "y" => 2 } }));
        let mut depths = Vec::new();
        loop {
            depths.push(reader.depth());
            if !reader.read()? {
                break;
            }
        }
        assert_eq!(vec![0, 1, 1, 2, 2, 2, 1, 0], depths);
        Ok(())
    }

    #[test]
    fn native_values() -> TestResult {
        let mut reader = ReaderAdapter::new(DocumentReader::new(doc! {
            "x" => vec![Bson::Int32(1), Bson::Document(doc! { "y" => Bson::MaxKey })],
        }));
        let mut native_values = Vec::new();
        while reader.read()? {
            native_values.push(reader.native_value().cloned());
        }
        assert_eq!(
            vec![
                None,
                None,
                None,
                Some(Bson::Int32(1)),
                None,
                None,
                Some(Bson::MaxKey),
                None,
                None,
                None
            ],
            native_values
        );
        Ok(())
    }

    #[test]
    fn native_type_tokens() -> TestResult {
        fn assert_token(value: Bson, token_type: TokenType, token_value: Option<TokenValue>) -> TestResult {
            let mut reader = adapter_for(value.clone());
            assert!(reader.read()?);
            assert_eq!(token_type, reader.token_type());
            assert_eq!(token_value.as_ref(), reader.value());
            assert_eq!(Some(&value), reader.native_value());
            assert_eq!(false, reader.read()?);
            Ok(())
        }

        assert_token(
            Bson::ObjectId(ObjectId::from_bytes([3; 12])),
            TokenType::Bytes,
            Some(TokenValue::Bytes(vec![3; 12])),
        )?;
        assert_token(
            Bson::Binary(Binary {
                subtype: BinarySubtype::UserDefined(0x80),
                bytes: vec![1, 2],
            }),
            TokenType::Bytes,
            Some(TokenValue::Bytes(vec![1, 2])),
        )?;
        assert_token(
            Bson::Binary(Binary {
                subtype: BinarySubtype::UuidOld,
                bytes: (1..=16).collect(),
            }),
            TokenType::Bytes,
            Some(TokenValue::Guid(Guid::parse_str(
                "04030201-0605-0807-090a-0b0c0d0e0f10",
            )?)),
        )?;
        assert_token(
            Bson::RegularExpression(Regex::new("a.c", "i")),
            TokenType::String,
            Some(TokenValue::String("/a.c/i".to_owned())),
        )?;
        assert_token(
            Bson::Symbol("sym".to_owned()),
            TokenType::String,
            Some(TokenValue::String("sym".to_owned())),
        )?;
        assert_token(
            Bson::Timestamp(Timestamp {
                time: 1,
                increment: 2,
            }),
            TokenType::Integer,
            Some(TokenValue::Integer(0x0000_0001_0000_0002)),
        )?;
        assert_token(Bson::MinKey, TokenType::Undefined, None)?;
        assert_token(Bson::Undefined, TokenType::Undefined, None)?;
        assert_token(Bson::Null, TokenType::Null, None)?;
        assert_token(
            Bson::Int64(i64::MAX),
            TokenType::Integer,
            Some(TokenValue::Integer(i64::MAX)),
        )?;
        assert_token(
            Bson::DateTime(DateTime::MAX),
            TokenType::Date,
            Some(TokenValue::Integer(i64::MAX)),
        )?;
        assert_token(
            Bson::DateTime(DateTime::from_millis(0)),
            TokenType::Date,
            Some(TokenValue::DateTime(
                chrono::DateTime::from_timestamp(0, 0).ok_or("out of range")?,
            )),
        )?;
        Ok(())
    }

    #[test]
    fn code_with_scope_is_lossy_token() -> TestResult {
        let code = JavaScriptCodeWithScope {
            code: "f(x)".to_owned(),
            scope: doc! { "x" => 1 },
        };
        let mut reader =
            ReaderAdapter::new(DocumentReader::new(doc! { "c" => code.clone(), "n" => 2 }));
        assert!(reader.read()?); // StartObject
        assert!(reader.read()?); // c
        assert!(reader.read()?);
        assert_eq!(TokenType::String, reader.token_type());
        assert_eq!(Some(&TokenValue::String("f(x)".to_owned())), reader.value());
        // The scope is only retained in the native value
        assert_eq!(Some(&Bson::JavaScriptCodeWithScope(code)), reader.native_value());
        assert_eq!(1, reader.depth());

        // Scope content does not appear as tokens
        assert!(reader.read()?);
        assert_eq!(Some(&TokenValue::String("n".to_owned())), reader.value());
        Ok(())
    }

    #[test]
    fn empty_input() -> TestResult {
        let mut reader = ReaderAdapter::new(DocumentReader::from_values(Vec::new()));
        assert_eq!(false, reader.read()?);
        assert_eq!(TokenType::None, reader.token_type());
        assert_eq!(None, reader.read_as_bytes()?);
        assert_eq!(None, reader.read_as_int32()?);
        Ok(())
    }

    #[test]
    fn read_as_bytes() -> TestResult {
        assert_eq!(None, adapter_for(Bson::Null).read_as_bytes()?);
        assert_eq!(Some(Vec::new()), adapter_for(Bson::from("")).read_as_bytes()?);
        assert_eq!(Some(vec![0]), adapter_for(Bson::from("AA==")).read_as_bytes()?);
        assert_eq!(
            Some(Vec::new()),
            adapter_for(Bson::Array(Vec::new())).read_as_bytes()?
        );
        assert_eq!(
            Some(vec![0, 1]),
            adapter_for(Bson::Array(vec![Bson::Int32(0), Bson::Int32(1)])).read_as_bytes()?
        );
        assert_eq!(
            Some(vec![0]),
            adapter_for(Bson::Document(doc! { "$binary" => "AA==", "$type" => "00" }))
                .read_as_bytes()?
        );
        assert_eq!(
            Some(vec![1; 12]),
            adapter_for(Bson::ObjectId(ObjectId::from_bytes([1; 12]))).read_as_bytes()?
        );

        assert!(adapter_for(Bson::Undefined).read_as_bytes().is_err());
        assert!(adapter_for(Bson::Array(vec![Bson::Undefined]))
            .read_as_bytes()
            .is_err());
        match adapter_for(Bson::Document(doc! { "$type" => Bson::Undefined })).read_as_bytes() {
            Err(ReaderError::UnexpectedPropertyName { expected, actual }) => {
                assert_eq!("$binary", expected);
                assert_eq!("$type", actual);
            }
            r => panic!("unexpected result: {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn read_as_at_end_of_array() -> TestResult {
        let mut reader = adapter_for(Bson::Array(vec![Bson::from("AA==")]));
        assert!(reader.read()?); // StartArray
        assert_eq!(Some(vec![0]), reader.read_as_bytes()?);
        assert_eq!(None, reader.read_as_bytes()?);
        assert_eq!(TokenType::EndArray, reader.token_type());
        // Past the end of the input
        assert_eq!(None, reader.read_as_bytes()?);

        let mut reader = adapter_for(Bson::Array(vec![Bson::Int32(1)]));
        reader.read()?;
        assert_eq!(Some(1), reader.read_as_int32()?);
        assert_eq!(None, reader.read_as_int32()?);

        let mut reader = adapter_for(Bson::Array(vec![Bson::from("a")]));
        reader.read()?;
        assert_eq!(Some("a".to_owned()), reader.read_as_string()?);
        assert_eq!(None, reader.read_as_string()?);

        let mut reader = adapter_for(Bson::Array(vec![Bson::DateTime(DateTime::from_millis(0))]));
        reader.read()?;
        assert!(reader.read_as_date_time()?.is_some());
        assert_eq!(None, reader.read_as_date_time()?);

        let mut reader = adapter_for(Bson::Array(vec![Bson::Double(1.5)]));
        reader.read()?;
        assert_eq!(Some(1.5), reader.read_as_decimal()?);
        assert_eq!(None, reader.read_as_decimal()?);
        Ok(())
    }

    #[test]
    fn read_as_int32() -> TestResult {
        assert_eq!(Some(1), adapter_for(Bson::Double(1.0)).read_as_int32()?);
        assert_eq!(Some(1), adapter_for(Bson::from("1")).read_as_int32()?);
        assert_eq!(None, adapter_for(Bson::from("")).read_as_int32()?);
        assert_eq!(Some(-5), adapter_for(Bson::Int64(-5)).read_as_int32()?);

        assert!(adapter_for(Bson::Double(1.5)).read_as_int32().is_err());
        assert!(adapter_for(Bson::Int64(i64::MAX)).read_as_int32().is_err());
        assert!(adapter_for(Bson::from("abc")).read_as_int32().is_err());
        match adapter_for(Bson::Undefined).read_as_int32() {
            Err(ReaderError::UnexpectedToken { actual, .. }) => {
                assert_eq!(TokenType::Undefined, actual)
            }
            r => panic!("unexpected result: {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn read_as_string() -> TestResult {
        assert_eq!(Some("1".to_owned()), adapter_for(Bson::Double(1.0)).read_as_string()?);
        assert_eq!(Some("true".to_owned()), adapter_for(Bson::Boolean(true)).read_as_string()?);
        assert_eq!(Some("x".to_owned()), adapter_for(Bson::from("x")).read_as_string()?);
        assert_eq!(
            Some("1970-01-01T00:00:00.000Z".to_owned()),
            adapter_for(Bson::DateTime(DateTime::from_millis(0))).read_as_string()?
        );
        assert_eq!(None, adapter_for(Bson::Null).read_as_string()?);
        assert!(adapter_for(Bson::Undefined).read_as_string().is_err());
        assert!(adapter_for(Bson::Document(doc! {})).read_as_string().is_err());
        Ok(())
    }

    #[test]
    fn read_as_date_time() -> TestResult {
        let epoch = chrono::DateTime::from_timestamp(0, 0).ok_or("out of range")?;
        assert_eq!(None, adapter_for(Bson::from("")).read_as_date_time()?);
        assert_eq!(
            Some(epoch),
            adapter_for(Bson::from("1970-01-01T00:00:00Z")).read_as_date_time()?
        );
        assert_eq!(
            Some(epoch),
            adapter_for(Bson::Document(doc! { "$date" => 0_i64 })).read_as_date_time()?
        );
        assert_eq!(
            Some(epoch),
            adapter_for(Bson::DateTime(DateTime::from_millis(0))).read_as_date_time()?
        );
        assert!(adapter_for(Bson::DateTime(DateTime::MAX))
            .read_as_date_time()
            .is_err());
        assert!(adapter_for(Bson::Undefined).read_as_date_time().is_err());

        let with_offset = adapter_for(Bson::from("1970-01-01T02:00:00+02:00"))
            .read_as_date_time_offset()?
            .ok_or("missing date")?;
        assert_eq!(7200, with_offset.offset().local_minus_utc());
        assert_eq!(epoch, with_offset);
        let utc = adapter_for(Bson::DateTime(DateTime::from_millis(0)))
            .read_as_date_time_offset()?
            .ok_or("missing date")?;
        assert_eq!(0, utc.offset().local_minus_utc());
        Ok(())
    }

    #[test]
    fn read_as_decimal() -> TestResult {
        assert_eq!(Some(1.0), adapter_for(Bson::Int32(1)).read_as_decimal()?);
        assert_eq!(Some(2.5), adapter_for(Bson::from("2.5")).read_as_decimal()?);
        assert_eq!(None, adapter_for(Bson::from("")).read_as_decimal()?);
        assert!(adapter_for(Bson::from("x")).read_as_decimal().is_err());
        assert!(adapter_for(Bson::Undefined).read_as_decimal().is_err());
        Ok(())
    }

    #[test]
    fn skip() -> TestResult {
        let mut reader = ReaderAdapter::new(DocumentReader::new(doc! {
            "a" => doc! { "b" => vec![Bson::Int32(1), Bson::Document(doc! {})] },
            "c" => true,
        }));
        reader.read()?; // StartObject
        reader.read()?; // a
        reader.skip()?;
        assert_eq!(TokenType::EndObject, reader.token_type());
        assert_eq!(1, reader.depth());
        reader.read()?;
        assert_eq!(Some(&TokenValue::String("c".to_owned())), reader.value());
        Ok(())
    }

    #[test]
    fn close() -> TestResult {
        let mut reader = ReaderAdapter::new(DocumentReader::new(doc! {}));
        reader.close();
        reader.close();
        assert_eq!(NativeReaderState::Initial, reader.wrapped().state());

        let mut reader = ReaderAdapter::new_custom(
            DocumentReader::new(doc! {}),
            ReaderSettings { close_input: true },
        );
        reader.close();
        reader.close();
        assert_eq!(NativeReaderState::Closed, reader.wrapped().state());
        assert_eq!(false, reader.read()?);

        let mut reader = ReaderAdapter::new(DocumentReader::new(doc! {}));
        reader.set_close_input(true);
        reader.close();
        assert_eq!(NativeReaderState::Closed, reader.into_inner().state());
        Ok(())
    }
}
