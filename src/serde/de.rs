// Structure follows https://serde.rs/impl-deserializer.html

use std::{convert::Infallible, fmt::Display, num::TryFromIntError};

use serde::{
    de::{
        value::{StrDeserializer, StringDeserializer},
        DeserializeSeed, Error, Unexpected, Visitor,
    },
    forward_to_deserialize_any, Deserialize, Deserializer,
};
use thiserror::Error;

use super::{buffer::TokenBuffer, native::NATIVE_VALUE_NEWTYPE};
use crate::{
    converters::{
        extended, TokenConverter, BINARY_DATA_CONVERTER, BOOLEAN_CONVERTER, BSON_VALUE_CONVERTER,
        DOUBLE_CONVERTER, INT64_CONVERTER,
    },
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
};

/// Error returned by [`TokenReaderDeserializer`]
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DeserializerError {
    /// Error message reported by a `Deserialize` implementation or a visitor, or a
    /// mismatch between the tokens and the type being deserialized
    #[error("{0}")]
    Custom(String),
    /// More arrays and objects are nested than the deserializer allows; the value is the
    /// limit
    #[error("maximum nesting depth {0} exceeded")]
    MaxNestingDepthExceeded(u32),
    /// The token reader failed, either because of malformed tokens or because the wrapped
    /// native reader failed
    #[error("{0}")]
    ReaderError(#[from] ReaderError),
    /// An integer does not fit into the requested integer type, or a map key does not
    /// parse as the requested number type
    #[error("{0}")]
    InvalidNumber(String),
}

impl serde::de::Error for DeserializerError {
    fn custom<T: Display>(msg: T) -> Self {
        DeserializerError::Custom(msg.to_string())
    }
}

impl From<TryFromIntError> for DeserializerError {
    fn from(value: TryFromIntError) -> Self {
        DeserializerError::InvalidNumber(value.to_string())
    }
}

// Widening to i64 and i128
impl From<Infallible> for DeserializerError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

/// Serde `Deserializer` which pulls tokens from a [`TokenReader`]
///
/// Native values, such as an [`ObjectId`](crate::bson::ObjectId) exposed by a
/// [`ReaderAdapter`](crate::reader::ReaderAdapter), are read with the
/// [converters](crate::converters) and handed to the `Deserialize` implementations of the
/// native types as they are. Their extended-object encodings are recognized as well.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, reader::*, serde::*};
/// # use serde::*;
/// let id = ObjectId::from_bytes([1; 12]);
/// let mut reader = ReaderAdapter::new(DocumentReader::new(doc! {
///     "_id" => id,
///     "name" => "a",
/// }));
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Entry {
///     _id: ObjectId,
///     name: String,
/// }
///
/// let entry = Entry::deserialize(&mut TokenReaderDeserializer::new(&mut reader))?;
/// assert_eq!(Entry { _id: id, name: "a".to_owned() }, entry);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Token mapping
/// Types which accept any value (`deserialize_any`, for example `serde_json::Value`) see
/// the tokens as JSON would have them:
/// - Date tokens become RFC 3339 strings, or the milliseconds as `i64` when the date is
///   outside of the calendar range
/// - Bytes tokens become byte buffers, GUIDs their 16 bytes
/// - Undefined tokens become unit, like Null
/// - extended objects stay plain maps; only the native types interpret them
///
/// # Error handling
/// After an error the position of the reader is unspecified, and this deserializer
/// should not be used any further.
///
/// # Panics
/// The sequence, map and enum access values handed to visitors panic on out-of-order
/// calls, for example reading two map keys without the value in between.
#[derive(Debug)]
pub struct TokenReaderDeserializer<'a, R: TokenReader> {
    reader: &'a mut R,
    max_nesting_depth: u32,
    /// Number of arrays and objects this deserializer is currently inside of
    depth: u32,
    /// Whether the current token of the reader has been read but not consumed yet
    peeked: bool,
}

const DEFAULT_MAX_NESTING_DEPTH: u32 = 128;

impl<'a, R: TokenReader> TokenReaderDeserializer<'a, R> {
    /// Creates a deserializer for the value starting at the next token of the reader
    ///
    /// At most 128 arrays and objects may be nested, see
    /// [`new_with_custom_nesting_limit`](Self::new_with_custom_nesting_limit).
    pub fn new(reader: &'a mut R) -> Self {
        Self::new_with_custom_nesting_limit(reader, DEFAULT_MAX_NESTING_DEPTH)
    }

    /// Creates a deserializer which allows at most `max_nesting_depth` nested arrays and
    /// objects
    ///
    /// With a limit of 1, `[1, 2]` can be deserialized but `[[1], 2]` fails with
    /// [`DeserializerError::MaxNestingDepthExceeded`]. Only containers started by this
    /// deserializer count. Native values are read whole by the converters; the limit then
    /// applies to the tokens their `Deserialize` implementation visits.
    pub fn new_with_custom_nesting_limit(reader: &'a mut R, max_nesting_depth: u32) -> Self {
        TokenReaderDeserializer {
            reader,
            max_nesting_depth,
            depth: 0,
            peeked: false,
        }
    }

    /// Makes the first token of the next value the current token, and returns its type
    fn peek(&mut self) -> Result<TokenType, DeserializerError> {
        if !self.peeked {
            if !self.reader.read()? {
                return Err(ReaderError::UnexpectedEndOfInput.into());
            }
            self.peeked = true;
        }
        Ok(self.reader.token_type())
    }

    /// Marks the current token, or the value ending at it, as consumed
    fn consume(&mut self) {
        self.peeked = false;
    }

    /// Consumes the start token of an array or object
    fn enter(&mut self) -> Result<(), DeserializerError> {
        if self.depth >= self.max_nesting_depth {
            return Err(DeserializerError::MaxNestingDepthExceeded(
                self.max_nesting_depth,
            ));
        }
        self.depth += 1;
        self.consume();
        Ok(())
    }

    /// Consumes the end token of the array or object entered last
    fn leave(&mut self, end: TokenType) -> Result<(), DeserializerError> {
        let actual = self.peek()?;
        if actual != end {
            return Err(ReaderError::unexpected_token(end.to_string(), actual).into());
        }
        self.consume();
        self.depth -= 1;
        Ok(())
    }

    /// Reads the next value with a converter; `null` is an error
    fn read_with<'de, C: TokenConverter, V: Visitor<'de>>(
        &mut self,
        converter: &C,
        visitor: &V,
    ) -> Result<C::Value, DeserializerError> {
        self.peek()?;
        let value = converter.read_token_value(&mut *self.reader)?;
        self.consume();
        value.ok_or_else(|| DeserializerError::invalid_type(Unexpected::Unit, visitor))
    }

    fn read_integer<'de, V: Visitor<'de>>(&mut self, visitor: &V) -> Result<i64, DeserializerError> {
        self.read_with(&INT64_CONVERTER, visitor)
    }

    fn read_string<'de, V: Visitor<'de>>(
        &mut self,
        visitor: &V,
    ) -> Result<String, DeserializerError> {
        match self.peek()? {
            TokenType::String => {
                let value = extended::current_str(&*self.reader)?.to_owned();
                self.consume();
                Ok(value)
            }
            actual => Err(unexpected_token_type(actual, visitor)),
        }
    }

    /// Reads a native value, hands its tokens to the visitor through a nested deserializer
    fn deserialize_native<'de, V: Visitor<'de>>(
        &mut self,
        visitor: V,
    ) -> Result<V::Value, DeserializerError> {
        self.peek()?;
        let value = BSON_VALUE_CONVERTER.read_token_value(&mut *self.reader)?;
        self.consume();

        let mut buffer = TokenBuffer::with_extended_undefined();
        BSON_VALUE_CONVERTER
            .write_token_value(&mut buffer, value.as_ref())
            .map_err(DeserializerError::custom)?;
        let mut buffered = buffer.into_reader();
        visitor.visit_newtype_struct(&mut TokenReaderDeserializer::new_with_custom_nesting_limit(
            &mut buffered,
            self.max_nesting_depth.saturating_sub(self.depth),
        ))
    }

    fn deserialize_array<'de, V: Visitor<'de>>(
        &mut self,
        visitor: V,
        expected_len: Option<usize>,
    ) -> Result<V::Value, DeserializerError> {
        match self.peek()? {
            TokenType::StartArray => self.enter()?,
            actual => return Err(unexpected_token_type(actual, &visitor)),
        }
        let mut elements = ArrayAccess {
            de: self,
            expected_len,
            len: 0,
        };
        let value = visitor.visit_seq(&mut elements)?;
        let len = elements.len;
        match expected_len {
            Some(expected_len) if len < expected_len => Err(DeserializerError::invalid_length(
                len,
                &format!("array of length {expected_len}").as_str(),
            )),
            _ => {
                self.leave(TokenType::EndArray)?;
                Ok(value)
            }
        }
    }
}

/// Describes a token the way Serde error messages describe values
fn unexpected_token_type<'de, V: Visitor<'de>>(
    token_type: TokenType,
    visitor: &V,
) -> DeserializerError {
    let unexpected = match token_type {
        TokenType::StartArray => Unexpected::Seq,
        TokenType::StartObject => Unexpected::Map,
        TokenType::Null | TokenType::Undefined => Unexpected::Unit,
        TokenType::String => Unexpected::Other("string"),
        TokenType::Integer | TokenType::Float => Unexpected::Other("number"),
        TokenType::Boolean => Unexpected::Other("bool"),
        TokenType::Date => Unexpected::Other("date"),
        TokenType::Bytes => Unexpected::Other("bytes"),
        TokenType::PropertyName => Unexpected::Other("property name"),
        TokenType::EndArray | TokenType::EndObject => Unexpected::Other("end of container"),
        TokenType::None | TokenType::EndOfStream => Unexpected::Other("end of input"),
    };
    DeserializerError::invalid_type(unexpected, visitor)
}

/// Reads an int64 and narrows it to the visited type, see `From<TryFromIntError>`
macro_rules! deserialize_from_int64 {
    ($($deserialize:ident => $visit:ident),+ $(,)?) => {
        $(
            fn $deserialize<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                let value = self.read_integer(&visitor)?;
                visitor.$visit(value.try_into()?)
            }
        )+
    };
}

// Borrowing from the input (`'de`) is not supported, strings are always owned
impl<'de, R: TokenReader> Deserializer<'de> for &mut TokenReaderDeserializer<'_, R> {
    type Error = DeserializerError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let token_type = self.peek()?;
        match token_type {
            TokenType::StartArray => return self.deserialize_seq(visitor),
            TokenType::StartObject => return self.deserialize_map(visitor),
            _ => {}
        }

        self.consume();
        match (token_type, self.reader.value()) {
            (TokenType::String, Some(TokenValue::String(s))) => visitor.visit_string(s.clone()),
            (TokenType::Integer, Some(TokenValue::Integer(i))) => visitor.visit_i64(*i),
            (TokenType::Float, Some(TokenValue::Float(f))) => visitor.visit_f64(*f),
            (TokenType::Boolean, Some(TokenValue::Boolean(b))) => visitor.visit_bool(*b),
            (TokenType::Null | TokenType::Undefined, _) => visitor.visit_unit(),
            (TokenType::Date, Some(TokenValue::DateTime(date))) => {
                visitor.visit_string(date.to_rfc3339())
            }
            (TokenType::Date, Some(TokenValue::Integer(millis))) => visitor.visit_i64(*millis),
            (TokenType::Bytes, Some(value)) => match value.to_bytes() {
                Some(bytes) => visitor.visit_byte_buf(bytes),
                None => Err(ReaderError::invalid_value("Bytes token has no bytes value").into()),
            },
            (actual, _) => Err(ReaderError::unexpected_token("value", actual).into()),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = self.read_with(&BOOLEAN_CONVERTER, &visitor)?;
        visitor.visit_bool(value)
    }

    // All integer types go through int64, which also accepts native Int32 and Int64 values
    deserialize_from_int64! {
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = self.read_with(&DOUBLE_CONVERTER, &visitor)?;
        visitor.visit_f32(value as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = self.read_with(&DOUBLE_CONVERTER, &visitor)?;
        visitor.visit_f64(value)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    // Only String tokens; dates and the code of native JavaScript values are not coerced

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = self.read_string(&visitor)?;
        visitor.visit_str(&value)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let value = self.read_string(&visitor)?;
        visitor.visit_string(value)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_byte_buf(visitor)
    }

    /// Strings are passed as their UTF-8 bytes and arrays element by element. Everything else
    /// is read as binary data: Bytes tokens, native binary values and `$binary` objects.
    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::String => {
                let value = self.read_string(&visitor)?;
                visitor.visit_byte_buf(value.into_bytes())
            }
            TokenType::StartArray => self.deserialize_seq(visitor),
            _ => {
                let value = self.read_with(&BINARY_DATA_CONVERTER, &visitor)?;
                visitor.visit_byte_buf(value.bytes)
            }
        }
    }

    /// Null is `None`; Undefined is not, so that `Option<Undefined>` keeps it
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::Null => {
                self.consume();
                visitor.visit_none()
            }
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::Null => {
                self.consume();
                visitor.visit_unit()
            }
            actual => Err(unexpected_token_type(actual, &visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    /// The native types announce themselves with a reserved newtype name; their whole value
    /// is then read with the converters, keeping native values of the reader intact
    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        if name == NATIVE_VALUE_NEWTYPE {
            return self.deserialize_native(visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_array(visitor, None)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_array(visitor, Some(len))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_array(visitor, Some(len))
    }

    /// Objects only, duplicate names are passed on as they are. Extended objects arrive
    /// here as plain maps.
    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::StartObject => self.enter()?,
            actual => return Err(unexpected_token_type(actual, &visitor)),
        }
        let mut members = ObjectAccess {
            de: self,
            expects_value: false,
        };
        let value = visitor.visit_map(&mut members)?;
        if members.expects_value {
            panic!("Incorrect deserializer usage: Value of the last map entry was not read");
        }
        self.leave(TokenType::EndObject)?;
        Ok(value)
    }

    /// Structs are accepted as object or, with fields in declaration order, as array
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::StartArray => self.deserialize_seq(visitor),
            TokenType::StartObject => self.deserialize_map(visitor),
            actual => Err(unexpected_token_type(actual, &visitor)),
        }
    }

    /// A unit variant is its name as String token, every other variant an object with the
    /// variant name as only property
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.peek()? {
            TokenType::StartObject => {
                self.enter()?;
                let mut variant = ObjectVariant {
                    de: self,
                    value_read: false,
                };
                let value = visitor.visit_enum(&mut variant)?;
                if !variant.value_read {
                    panic!("Incorrect deserializer usage: Variant value was not read");
                }
                self.leave(TokenType::EndObject)?;
                Ok(value)
            }
            TokenType::String => {
                let mut variant = NameOnlyVariant {
                    de: self,
                    value_read: false,
                };
                let value = visitor.visit_enum(&mut variant)?;
                if !variant.value_read {
                    panic!("Incorrect deserializer usage: Variant value was not read");
                }
                Ok(value)
            }
            actual => Err(unexpected_token_type(actual, &visitor)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.peek()?;
        self.reader.skip()?;
        self.consume();
        visitor.visit_unit()
    }
}

/// Elements of an array, optionally with a fixed length for tuples
#[derive(Debug)]
struct ArrayAccess<'s, 'a, R: TokenReader> {
    de: &'s mut TokenReaderDeserializer<'a, R>,
    expected_len: Option<usize>,
    len: usize,
}

impl<'de, R: TokenReader> serde::de::SeqAccess<'de> for &mut ArrayAccess<'_, '_, R> {
    type Error = DeserializerError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        if self.de.peek()? == TokenType::EndArray {
            return Ok(None);
        }
        self.len += 1;
        match self.expected_len {
            Some(expected_len) if self.len > expected_len => Err(
                DeserializerError::invalid_length(
                    self.len,
                    &format!("array of length {expected_len}").as_str(),
                ),
            ),
            _ => seed.deserialize(&mut *self.de).map(Some),
        }
    }
}

/// Members of an object
#[derive(Debug)]
struct ObjectAccess<'s, 'a, R: TokenReader> {
    de: &'s mut TokenReaderDeserializer<'a, R>,
    expects_value: bool,
}

impl<R: TokenReader> ObjectAccess<'_, '_, R> {
    /// Reads the next property name, or `None` at the end of the object
    fn next_name(&mut self) -> Result<Option<String>, DeserializerError> {
        match self.de.peek()? {
            TokenType::EndObject => Ok(None),
            TokenType::PropertyName => {
                let name = extended::current_str(&*self.de.reader)?.to_owned();
                self.de.consume();
                Ok(Some(name))
            }
            actual => Err(ReaderError::unexpected_token("property name", actual).into()),
        }
    }
}

impl<'de, R: TokenReader> serde::de::MapAccess<'de> for &mut ObjectAccess<'_, '_, R> {
    type Error = DeserializerError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        if self.expects_value {
            panic!("Incorrect deserializer usage: Map key requested before value was read")
        }
        let Some(name) = self.next_name()? else {
            return Ok(None);
        };
        let key = seed.deserialize(PropertyNameDeserializer { name: &name })?;
        self.expects_value = true;
        Ok(Some(key))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        if !self.expects_value {
            panic!("Incorrect deserializer usage: Map value requested before key was read")
        }
        self.expects_value = false;
        seed.deserialize(&mut *self.de)
    }
}

/// Deserializes a property name as map key; number and bool keys are parsed from it
#[derive(Debug)]
struct PropertyNameDeserializer<'a> {
    name: &'a str,
}

impl PropertyNameDeserializer<'_> {
    fn parse<T: std::str::FromStr>(&self) -> Result<T, DeserializerError> {
        self.name.parse().map_err(|_| {
            DeserializerError::InvalidNumber(format!(
                "map key '{}' is not a valid number of the requested type",
                self.name
            ))
        })
    }
}

macro_rules! deserialize_parsed_key {
    ($($deserialize:ident => $visit:ident),+ $(,)?) => {
        $(
            fn $deserialize<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                visitor.$visit(self.parse()?)
            }
        )+
    };
}

impl<'de> Deserializer<'de> for PropertyNameDeserializer<'_> {
    type Error = DeserializerError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_str(self.name)
    }

    deserialize_parsed_key! {
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.name {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            _ => Err(DeserializerError::invalid_type(
                Unexpected::Str(self.name),
                &visitor,
            )),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        StrDeserializer::new(self.name).deserialize_enum(name, variants, visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bytes(self.name.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_byte_buf(self.name.as_bytes().to_vec())
    }

    forward_to_deserialize_any! {
        char str string unit unit_struct seq tuple tuple_struct map
        struct identifier ignored_any
    }
}

/// Variant written as `{"name": value}`
#[derive(Debug)]
struct ObjectVariant<'s, 'a, R: TokenReader> {
    de: &'s mut TokenReaderDeserializer<'a, R>,
    /// Set once the visitor asked for the value; the closing token follows it
    value_read: bool,
}

impl<'de, R: TokenReader> serde::de::EnumAccess<'de> for &mut ObjectVariant<'_, '_, R> {
    type Error = DeserializerError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let name = match self.de.peek()? {
            TokenType::PropertyName => extended::current_str(&*self.de.reader)?.to_owned(),
            actual => return Err(ReaderError::unexpected_token("variant name", actual).into()),
        };
        self.de.consume();
        let variant = seed.deserialize(StringDeserializer::<Self::Error>::new(name))?;
        Ok((variant, self))
    }
}

impl<'de, R: TokenReader> serde::de::VariantAccess<'de> for &mut ObjectVariant<'_, '_, R> {
    type Error = DeserializerError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        self.value_read = true;
        <()>::deserialize(&mut *self.de)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        self.value_read = true;
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value_read = true;
        self.de.deserialize_tuple(len, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value_read = true;
        self.de.deserialize_struct("", fields, visitor)
    }
}

/// Unit variant written as its name
#[derive(Debug)]
struct NameOnlyVariant<'s, 'a, R: TokenReader> {
    de: &'s mut TokenReaderDeserializer<'a, R>,
    value_read: bool,
}

impl<'de, R: TokenReader> serde::de::EnumAccess<'de> for &mut NameOnlyVariant<'_, '_, R> {
    type Error = DeserializerError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

fn not_a_unit_variant(expected: &'static str) -> DeserializerError {
    DeserializerError::invalid_type(Unexpected::UnitVariant, &expected)
}

impl<'de, R: TokenReader> serde::de::VariantAccess<'de> for &mut NameOnlyVariant<'_, '_, R> {
    type Error = DeserializerError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        self.value_read = true;
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        _seed: T,
    ) -> Result<T::Value, Self::Error> {
        Err(not_a_unit_variant("newtype variant"))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(not_a_unit_variant("tuple variant"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(not_a_unit_variant("struct variant"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;

    use super::*;
    use crate::{
        bson::{Bson, DocumentReader, ObjectId, Timestamp},
        doc,
        reader::ReaderAdapter,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn reader(values: Vec<Bson>) -> ReaderAdapter<DocumentReader> {
        ReaderAdapter::new(DocumentReader::from_values(values))
    }

    fn deserialize<T: for<'de> Deserialize<'de>>(value: Bson) -> Result<T, DeserializerError> {
        let mut reader = reader(vec![value]);
        T::deserialize(&mut TokenReaderDeserializer::new(&mut reader))
    }

    #[test]
    fn deserialize_primitives() -> TestResult {
        assert_eq!(true, deserialize::<bool>(Bson::Boolean(true))?);
        assert_eq!(-3_i8, deserialize::<i8>(Bson::Int32(-3))?);
        assert_eq!(5_u64, deserialize::<u64>(Bson::Int64(5))?);
        assert_eq!(1.5, deserialize::<f64>(Bson::Double(1.5))?);
        assert_eq!(2.0, deserialize::<f64>(Bson::Int32(2))?);
        assert_eq!("a", deserialize::<String>(Bson::from("a"))?);
        assert_eq!('c', deserialize::<char>(Bson::from("c"))?);
        assert_eq!(None, deserialize::<Option<i32>>(Bson::Null)?);
        assert_eq!(Some(1), deserialize::<Option<i32>>(Bson::Int32(1))?);
        Ok(())
    }

    #[test]
    fn deserialize_number_out_of_range() {
        match deserialize::<u8>(Bson::Int32(256)) {
            Err(DeserializerError::InvalidNumber(_)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
        match deserialize::<u32>(Bson::Int32(-1)) {
            Err(DeserializerError::InvalidNumber(_)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn deserialize_null_for_non_optional() {
        match deserialize::<bool>(Bson::Null) {
            Err(DeserializerError::Custom(message)) => {
                assert_eq!("invalid type: unit value, expected a boolean", message)
            }
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn deserialize_struct() -> TestResult {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Inner {
            ts: Timestamp,
            values: Vec<i64>,
        }

        #[derive(Deserialize, PartialEq, Debug)]
        struct Outer {
            id: ObjectId,
            inner: Inner,
            #[serde(default)]
            missing: Option<String>,
        }

        let id = ObjectId::from_bytes([3; 12]);
        let value = deserialize::<Outer>(Bson::Document(doc! {
            "id" => id,
            "ignored" => doc! { "a" => vec![Bson::Int32(1)] },
            "inner" => doc! {
                "ts" => Timestamp { time: 1, increment: 2 },
                "values" => vec![Bson::Int32(1), Bson::Int64(2)],
            },
        }))?;
        assert_eq!(
            Outer {
                id,
                inner: Inner {
                    ts: Timestamp { time: 1, increment: 2 },
                    values: vec![1, 2],
                },
                missing: None,
            },
            value
        );
        Ok(())
    }

    #[test]
    fn deserialize_native_from_extended_object() -> TestResult {
        let id = ObjectId::from_bytes([3; 12]);
        let value = deserialize::<ObjectId>(Bson::Document(doc! { "$$oid" => id.to_hex() }))?;
        assert_eq!(id, value);
        Ok(())
    }

    #[test]
    fn deserialize_any() -> TestResult {
        let value = deserialize::<HashMap<String, serde_json::Value>>(Bson::Document(doc! {
            "a" => 1,
            "b" => vec![Bson::Boolean(true), Bson::Null, Bson::Undefined],
        }))?;
        assert_eq!(
            HashMap::from([
                ("a".to_owned(), serde_json::json!(1)),
                ("b".to_owned(), serde_json::json!([true, null, null])),
            ]),
            value
        );
        Ok(())
    }

    #[test]
    fn deserialize_enum() -> TestResult {
        #[derive(Deserialize, PartialEq, Debug)]
        enum E {
            A,
            B(i32),
            C { x: bool },
        }

        assert_eq!(E::A, deserialize::<E>(Bson::from("A"))?);
        assert_eq!(E::B(1), deserialize::<E>(Bson::Document(doc! { "B" => 1 }))?);
        assert_eq!(
            E::C { x: true },
            deserialize::<E>(Bson::Document(doc! { "C" => doc! { "x" => true } }))?
        );
        Ok(())
    }

    #[test]
    fn deserialize_tuple_length() {
        match deserialize::<(i32, i32)>(Bson::Array(vec![Bson::Int32(1)])) {
            Err(DeserializerError::Custom(message)) => {
                assert_eq!("invalid length 1, expected a tuple of size 2", message)
            }
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn deserialize_map_number_keys() -> TestResult {
        let value = deserialize::<HashMap<u32, bool>>(Bson::Document(doc! { "12" => true }))?;
        assert_eq!(HashMap::from([(12, true)]), value);

        match deserialize::<HashMap<u32, bool>>(Bson::Document(doc! { "x" => true })) {
            Err(DeserializerError::InvalidNumber(message)) => assert_eq!(
                "map key 'x' is not a valid number of the requested type",
                message
            ),
            r => panic!("unexpected result: {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn nesting_limit() {
        let mut reader = reader(vec![Bson::Array(vec![Bson::Array(vec![Bson::Array(
            vec![],
        )])])]);
        let mut deserializer = TokenReaderDeserializer::new_with_custom_nesting_limit(&mut reader, 2);
        match serde_json::Value::deserialize(&mut deserializer) {
            Err(DeserializerError::MaxNestingDepthExceeded(2)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn sibling_containers_at_nesting_limit() -> TestResult {
        let mut reader = reader(vec![Bson::Array(vec![
            Bson::Array(vec![Bson::Int32(1)]),
            Bson::Array(vec![Bson::Int64(-2)]),
        ])]);
        let mut deserializer = TokenReaderDeserializer::new_with_custom_nesting_limit(&mut reader, 2);
        let value = <(Vec<i128>, Vec<i16>)>::deserialize(&mut deserializer)?;
        assert_eq!((vec![1], vec![-2]), value);
        Ok(())
    }

    #[test]
    fn end_of_input() {
        let mut reader = reader(vec![]);
        match bool::deserialize(&mut TokenReaderDeserializer::new(&mut reader)) {
            Err(DeserializerError::ReaderError(ReaderError::UnexpectedEndOfInput)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn multiple_top_level_values() -> TestResult {
        let mut reader = reader(vec![Bson::Int32(1), Bson::Document(doc! { "a" => "b" })]);
        let first = i32::deserialize(&mut TokenReaderDeserializer::new(&mut reader))?;
        let second = HashMap::<String, String>::deserialize(&mut TokenReaderDeserializer::new(
            &mut reader,
        ))?;
        assert_eq!(1, first);
        assert_eq!(HashMap::from([("a".to_owned(), "b".to_owned())]), second);
        Ok(())
    }
}
