//! Common library module for integration tests
//!
//! The token reader and writer here are built on top of serde_json's `Value` and know nothing
//! about native values, like a consumer of the token API which is unaware of the adapters.
//!
//! **Important:** This code is only for integration test and demonstration purposes;
//! it is not intended to be used in production code.
// See https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

// Not every test file uses every item
#![allow(dead_code)]

use base64::{prelude::BASE64_STANDARD, Engine};
use bson_token_adapter::{
    bson::Guid,
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{TokenWriter, WriterError},
};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

type Token = (TokenType, Option<TokenValue>);

/// Reads all tokens of the reader, starting after its current token
pub fn read_all_tokens(reader: &mut impl TokenReader) -> Result<Vec<Token>, ReaderError> {
    let mut tokens = Vec::new();
    while reader.read()? {
        tokens.push((reader.token_type(), reader.value().cloned()));
    }
    Ok(tokens)
}

/// [`TokenReader`] over a `serde_json::Value`
pub struct JsonValueReader {
    tokens: Vec<Token>,
    position: Option<usize>,
    depth: usize,
    is_closed: bool,
}

fn push_tokens(value: &Value, tokens: &mut Vec<Token>) {
    match value {
        Value::Null => tokens.push((TokenType::Null, None)),
        Value::Bool(b) => tokens.push((TokenType::Boolean, Some(TokenValue::Boolean(*b)))),
        Value::Number(n) => tokens.push(match n.as_i64() {
            Some(i) => (TokenType::Integer, Some(TokenValue::Integer(i))),
            None => (
                TokenType::Float,
                Some(TokenValue::Float(n.as_f64().unwrap())),
            ),
        }),
        Value::String(s) => tokens.push((TokenType::String, Some(TokenValue::String(s.clone())))),
        Value::Array(array) => {
            tokens.push((TokenType::StartArray, None));
            for item in array {
                push_tokens(item, tokens);
            }
            tokens.push((TokenType::EndArray, None));
        }
        Value::Object(object) => {
            tokens.push((TokenType::StartObject, None));
            for (name, member_value) in object {
                tokens.push((
                    TokenType::PropertyName,
                    Some(TokenValue::String(name.clone())),
                ));
                push_tokens(member_value, tokens);
            }
            tokens.push((TokenType::EndObject, None));
        }
    }
}

impl JsonValueReader {
    pub fn new(value: &Value) -> Self {
        let mut tokens = Vec::new();
        push_tokens(value, &mut tokens);
        JsonValueReader {
            tokens,
            position: None,
            depth: 0,
            is_closed: false,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.position.and_then(|position| self.tokens.get(position))
    }
}

impl TokenReader for JsonValueReader {
    fn read(&mut self) -> Result<bool, ReaderError> {
        let next = self.position.map_or(0, |position| position + 1);
        if self.is_closed || next >= self.tokens.len() {
            return Ok(false);
        }
        self.position = Some(next);
        match self.tokens[next].0 {
            TokenType::StartObject | TokenType::StartArray => self.depth += 1,
            TokenType::EndObject | TokenType::EndArray => self.depth -= 1,
            _ => {}
        }
        Ok(true)
    }

    fn token_type(&self) -> TokenType {
        self.current().map_or(TokenType::None, |token| token.0)
    }

    fn value(&self) -> Option<&TokenValue> {
        self.current().and_then(|token| token.1.as_ref())
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn close(&mut self) {
        self.is_closed = true;
    }
}

enum StackValue {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

/// Container being built, with the member name it has in its enclosing object
struct StackEntry {
    name: Option<String>,
    value: StackValue,
}

/// [`TokenWriter`] building a `serde_json::Value`
///
/// It has no native sink, so native values are written to it as extended objects.
pub struct JsonValueWriter {
    stack: Vec<StackEntry>,
    pending_name: Option<String>,
    final_value: Option<Value>,
}

impl JsonValueWriter {
    pub fn new() -> Self {
        JsonValueWriter {
            stack: Vec::new(),
            pending_name: None,
            final_value: None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        self.final_value
    }

    fn start_container(&mut self, value: StackValue) {
        // The name belongs to the enclosing object, nested members must not overwrite it
        let name = self.pending_name.take();
        self.stack.push(StackEntry { name, value });
    }

    fn add_value(&mut self, value: Value) -> Result<(), WriterError> {
        let name = self.pending_name.take();
        self.add_named_value(name, value)
    }

    fn add_named_value(&mut self, name: Option<String>, value: Value) -> Result<(), WriterError> {
        match self.stack.last_mut().map(|entry| &mut entry.value) {
            Some(StackValue::Array(array)) => array.push(value),
            Some(StackValue::Object(object)) => {
                let name = name.expect("Incorrect writer usage: Member name is expected");
                object.insert(name, value);
            }
            None => {
                if self.final_value.is_some() {
                    panic!("Incorrect writer usage: Top-level value has already been written")
                }
                self.final_value = Some(value);
            }
        }
        Ok(())
    }
}

fn unsupported(operation: &'static str) -> Result<(), WriterError> {
    Err(WriterError::Unsupported { operation })
}

impl TokenWriter for JsonValueWriter {
    fn write_start_object(&mut self) -> Result<(), WriterError> {
        self.start_container(StackValue::Object(Map::new()));
        Ok(())
    }

    fn write_end_object(&mut self) -> Result<(), WriterError> {
        match self.stack.pop() {
            Some(StackEntry {
                name,
                value: StackValue::Object(object),
            }) => self.add_named_value(name, Value::Object(object)),
            _ => panic!("Incorrect writer usage: Cannot end object; not inside object"),
        }
    }

    fn write_start_array(&mut self) -> Result<(), WriterError> {
        self.start_container(StackValue::Array(Vec::new()));
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<(), WriterError> {
        match self.stack.pop() {
            Some(StackEntry {
                name,
                value: StackValue::Array(array),
            }) => self.add_named_value(name, Value::Array(array)),
            _ => panic!("Incorrect writer usage: Cannot end array; not inside array"),
        }
    }

    fn write_property_name(&mut self, name: &str) -> Result<(), WriterError> {
        self.pending_name = Some(name.to_owned());
        Ok(())
    }

    fn write_null(&mut self) -> Result<(), WriterError> {
        self.add_value(Value::Null)
    }

    fn write_undefined(&mut self) -> Result<(), WriterError> {
        let mut object = Map::new();
        object.insert("$undefined".to_owned(), Value::Bool(true));
        self.add_value(Value::Object(object))
    }

    fn write_string(&mut self, value: &str) -> Result<(), WriterError> {
        self.add_value(Value::String(value.to_owned()))
    }

    fn write_int32(&mut self, value: i32) -> Result<(), WriterError> {
        self.add_value(Value::from(value))
    }

    fn write_int64(&mut self, value: i64) -> Result<(), WriterError> {
        self.add_value(Value::from(value))
    }

    fn write_double(&mut self, value: f64) -> Result<(), WriterError> {
        let number = Number::from_f64(value).ok_or_else(|| WriterError::InvalidValue {
            message: format!("non-finite number: {value}"),
        })?;
        self.add_value(Value::Number(number))
    }

    fn write_boolean(&mut self, value: bool) -> Result<(), WriterError> {
        self.add_value(Value::Bool(value))
    }

    fn write_date_time(&mut self, value: chrono::DateTime<chrono::Utc>) -> Result<(), WriterError> {
        self.add_value(Value::String(
            value.to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<(), WriterError> {
        self.add_value(Value::String(BASE64_STANDARD.encode(value)))
    }

    fn write_guid(&mut self, value: Guid) -> Result<(), WriterError> {
        self.add_value(Value::String(value.to_string()))
    }

    fn write_raw(&mut self, _json: &str) -> Result<(), WriterError> {
        unsupported("raw JSON")
    }

    fn write_raw_value(&mut self, _json: &str) -> Result<(), WriterError> {
        unsupported("raw JSON value")
    }

    fn write_start_constructor(&mut self, _name: &str) -> Result<(), WriterError> {
        unsupported("constructor")
    }

    fn write_end_constructor(&mut self) -> Result<(), WriterError> {
        unsupported("constructor")
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

/// Copies all remaining tokens of the reader to the writer, looking only at the token types
/// and values like a consumer which is unaware of native values
pub fn transfer_tokens(
    reader: &mut impl TokenReader,
    writer: &mut impl TokenWriter,
) -> Result<(), Box<dyn std::error::Error>> {
    while reader.read()? {
        match (reader.token_type(), reader.value()) {
            (TokenType::StartObject, _) => writer.write_start_object()?,
            (TokenType::EndObject, _) => writer.write_end_object()?,
            (TokenType::StartArray, _) => writer.write_start_array()?,
            (TokenType::EndArray, _) => writer.write_end_array()?,
            (TokenType::PropertyName, Some(TokenValue::String(name))) => {
                writer.write_property_name(name)?
            }
            (TokenType::String, Some(TokenValue::String(s))) => writer.write_string(s)?,
            (TokenType::Integer, Some(TokenValue::Integer(i))) => writer.write_int64(*i)?,
            (TokenType::Float, Some(TokenValue::Float(f))) => writer.write_double(*f)?,
            (TokenType::Boolean, Some(TokenValue::Boolean(b))) => writer.write_boolean(*b)?,
            (TokenType::Null, _) => writer.write_null()?,
            (TokenType::Undefined, _) => writer.write_undefined()?,
            (TokenType::Date, Some(TokenValue::DateTime(date))) => writer.write_date_time(*date)?,
            (TokenType::Date, Some(TokenValue::Integer(millis))) => writer.write_int64(*millis)?,
            (TokenType::Bytes, Some(TokenValue::Bytes(bytes))) => writer.write_bytes(bytes)?,
            (TokenType::Bytes, Some(TokenValue::Guid(guid))) => writer.write_guid(*guid)?,
            (token_type, value) => {
                return Err(format!("unexpected token {token_type} with value {value:?}").into())
            }
        }
    }
    Ok(())
}
