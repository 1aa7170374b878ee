//! In-memory token sequence, used to hand native values between Serde and the converters

use crate::{
    bson::Guid,
    converters::ExtendedKey,
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{ExtendedJsonDialect, TokenWriter, WriterError},
};

pub(crate) type Token = (TokenType, Option<TokenValue>);

/// [`TokenWriter`] which records all written tokens
///
/// It has no native sink, so native values written to it take their extended-object form
/// in the canonical dialect.
#[derive(Default, Debug)]
pub(crate) struct TokenBuffer {
    tokens: Vec<Token>,
    extended_undefined: bool,
}

impl TokenBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer which records `undefined` as `{ "$undefined": true }`
    ///
    /// Serde has no equivalent of an `Undefined` token, only of its extended-object form.
    pub(crate) fn with_extended_undefined() -> Self {
        TokenBuffer {
            tokens: Vec::new(),
            extended_undefined: true,
        }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn into_reader(self) -> BufferedTokenReader {
        BufferedTokenReader {
            tokens: self.tokens,
            position: None,
            depth: 0,
            is_closed: false,
        }
    }

    fn push(&mut self, token_type: TokenType, value: Option<TokenValue>) -> Result<(), WriterError> {
        self.tokens.push((token_type, value));
        Ok(())
    }
}

impl TokenWriter for TokenBuffer {
    fn write_start_object(&mut self) -> Result<(), WriterError> {
        self.push(TokenType::StartObject, None)
    }

    fn write_end_object(&mut self) -> Result<(), WriterError> {
        self.push(TokenType::EndObject, None)
    }

    fn write_start_array(&mut self) -> Result<(), WriterError> {
        self.push(TokenType::StartArray, None)
    }

    fn write_end_array(&mut self) -> Result<(), WriterError> {
        self.push(TokenType::EndArray, None)
    }

    fn write_property_name(&mut self, name: &str) -> Result<(), WriterError> {
        self.push(
            TokenType::PropertyName,
            Some(TokenValue::String(name.to_owned())),
        )
    }

    fn write_null(&mut self) -> Result<(), WriterError> {
        self.push(TokenType::Null, None)
    }

    fn write_undefined(&mut self) -> Result<(), WriterError> {
        if !self.extended_undefined {
            return self.push(TokenType::Undefined, None);
        }
        self.write_start_object()?;
        self.write_property_name(&ExtendedKey::Undefined.name(ExtendedJsonDialect::Canonical))?;
        self.write_boolean(true)?;
        self.write_end_object()
    }

    fn write_string(&mut self, value: &str) -> Result<(), WriterError> {
        self.push(TokenType::String, Some(TokenValue::String(value.to_owned())))
    }

    fn write_int32(&mut self, value: i32) -> Result<(), WriterError> {
        self.push(TokenType::Integer, Some(TokenValue::Integer(value.into())))
    }

    fn write_int64(&mut self, value: i64) -> Result<(), WriterError> {
        self.push(TokenType::Integer, Some(TokenValue::Integer(value)))
    }

    fn write_double(&mut self, value: f64) -> Result<(), WriterError> {
        self.push(TokenType::Float, Some(TokenValue::Float(value)))
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), WriterError> {
        self.push(TokenType::Boolean, Some(TokenValue::Boolean(value)))
    }

    fn write_date_time(&mut self, value: chrono::DateTime<chrono::Utc>) -> Result<(), WriterError> {
        self.push(TokenType::Date, Some(TokenValue::DateTime(value)))
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), WriterError> {
        self.push(TokenType::Bytes, Some(TokenValue::Bytes(value.to_vec())))
    }

    fn write_guid(&mut self, value: Guid) -> Result<(), WriterError> {
        self.push(TokenType::Bytes, Some(TokenValue::Guid(value)))
    }

    fn write_raw(&mut self, _json: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "raw JSON",
        })
    }

    fn write_raw_value(&mut self, _json: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "raw JSON value",
        })
    }

    fn write_start_constructor(&mut self, _name: &str) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "constructor",
        })
    }

    fn write_end_constructor(&mut self) -> Result<(), WriterError> {
        Err(WriterError::Unsupported {
            operation: "constructor",
        })
    }

    fn write_whitespace(&mut self, _whitespace: &str) -> Result<(), WriterError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        Ok(())
    }
}

/// [`TokenReader`] over the tokens recorded by a [`TokenBuffer`]
#[derive(Debug)]
pub(crate) struct BufferedTokenReader {
    tokens: Vec<Token>,
    position: Option<usize>,
    depth: usize,
    is_closed: bool,
}

impl BufferedTokenReader {
    fn current(&self) -> Option<&Token> {
        self.position.and_then(|position| self.tokens.get(position))
    }
}

impl TokenReader for BufferedTokenReader {
    fn read(&mut self) -> Result<bool, ReaderError> {
        let next = self.position.map_or(0, |position| position + 1);
        if self.is_closed || next >= self.tokens.len() {
            return Ok(false);
        }
        self.position = Some(next);

        let token_type = self.tokens[next].0;
        if token_type.is_start_token() {
            self.depth += 1;
        } else if token_type.is_end_token() {
            self.depth = self.depth.saturating_sub(1);
        }
        Ok(true)
    }

    fn token_type(&self) -> TokenType {
        self.current()
            .map_or(TokenType::None, |(token_type, _)| *token_type)
    }

    fn value(&self) -> Option<&TokenValue> {
        self.current().and_then(|(_, value)| value.as_ref())
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn close(&mut self) {
        self.is_closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn replay() -> TestResult {
        let mut buffer = TokenBuffer::new();
        buffer.write_start_object()?;
        buffer.write_property_name("a")?;
        buffer.write_start_array()?;
        buffer.write_int32(1)?;
        buffer.write_end_array()?;
        buffer.write_end_object()?;
        assert_eq!(6, buffer.tokens().len());

        let mut reader = buffer.into_reader();
        assert_eq!(TokenType::None, reader.token_type());
        let mut sampled = Vec::new();
        while reader.read()? {
            sampled.push((reader.token_type(), reader.depth()));
        }
        assert_eq!(
            vec![
                (TokenType::StartObject, 1),
                (TokenType::PropertyName, 1),
                (TokenType::StartArray, 2),
                (TokenType::Integer, 2),
                (TokenType::EndArray, 1),
                (TokenType::EndObject, 0),
            ],
            sampled
        );
        // Stays at the last token
        assert_eq!(TokenType::EndObject, reader.token_type());
        Ok(())
    }

    #[test]
    fn close() -> TestResult {
        let mut buffer = TokenBuffer::new();
        buffer.write_null()?;
        buffer.write_null()?;
        let mut reader = buffer.into_reader();
        assert!(reader.read()?);
        reader.close();
        assert!(!reader.read()?);
        Ok(())
    }

    #[test]
    fn extended_undefined() -> TestResult {
        let mut buffer = TokenBuffer::new();
        buffer.write_undefined()?;
        assert_eq!(&[(TokenType::Undefined, None)], buffer.tokens());

        let mut buffer = TokenBuffer::with_extended_undefined();
        buffer.write_undefined()?;
        assert_eq!(
            &[
                (TokenType::StartObject, None),
                (
                    TokenType::PropertyName,
                    Some(TokenValue::String("$undefined".to_owned()))
                ),
                (TokenType::Boolean, Some(TokenValue::Boolean(true))),
                (TokenType::EndObject, None),
            ],
            buffer.tokens()
        );
        Ok(())
    }

    #[test]
    fn unsupported() {
        let mut buffer = TokenBuffer::new();
        match buffer.write_raw("1") {
            Err(WriterError::Unsupported { operation }) => assert_eq!("raw JSON", operation),
            r => panic!("unexpected result: {r:?}"),
        }
    }
}
