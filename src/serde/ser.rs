use std::fmt::Display;

use serde::ser::{Impossible, Serialize, Serializer};
use thiserror::Error;

use super::{buffer::TokenBuffer, native::NATIVE_VALUE_NEWTYPE};
use crate::{
    converters::{extended, TokenConverter, BSON_VALUE_CONVERTER},
    writer::{TokenWriter, WriterError},
};

// Implementation based on:
// - https://serde.rs/impl-serializer.html
// - https://github.com/serde-rs/json/blob/v1.0.107/src/ser.rs

/// Error which occurred while serializing a value
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SerializerError {
    /// A custom error, normally created by the `SerializerError::custom` function
    ///
    /// The data of this enum variant is a message describing the error.
    #[error("{0}")]
    Custom(String),
    /// The underlying [`TokenWriter`] encountered an error
    #[error("{0}")]
    WriterError(#[from] WriterError),
    /// A number value cannot be represented as native integer
    ///
    /// The native format only has signed 32-bit and 64-bit integers, so for example
    /// a `u64` larger than `i64::MAX` cannot be serialized.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    /// An incorrect number of elements was serialized
    ///
    /// This error is created when the claimed expected number of elements or fields passed
    /// to compound value serialization methods such as `TokenWriterSerializer::serialize_struct`
    /// does not match the actual number of serialized elements or fields.
    #[error("incorrect elements count, expected {expected} but got {actual}")]
    IncorrectElementsCount {
        /// The expected number of elements
        expected: usize,
        /// The actual number of serialized elements
        ///
        /// When more elements than expected are encountered serialization fails fast. In that
        /// case the `actual` value will just be `expected + 1`.
        actual: usize,
    },
    /// A map key was serialized which cannot be converted to a property name
    #[error("map key cannot be converted to string")]
    MapKeyNotString,
}

impl serde::ser::Error for SerializerError {
    fn custom<T: Display>(msg: T) -> Self {
        SerializerError::Custom(msg.to_string())
    }
}

/// Serde `Serializer` which writes to a [`TokenWriter`]
///
/// Values of the native types, such as [`ObjectId`](crate::bson::ObjectId), are written with
/// the [converters](crate::converters). A writer with a
/// [native sink](TokenWriter::native_sink), such as the
/// [`WriterAdapter`](crate::writer::WriterAdapter), therefore receives them as native
/// values; other writers receive their extended-object encoding.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, writer::*, serde::*};
/// # use serde::*;
/// #[derive(Serialize)]
/// struct MyStruct {
///     _id: ObjectId,
///     count: u32,
/// }
///
/// let id = ObjectId::from_bytes([1; 12]);
/// let mut writer = WriterAdapter::new(DocumentWriter::new());
/// let mut serializer = TokenWriterSerializer::new(&mut writer);
/// MyStruct { _id: id, count: 3 }.serialize(&mut serializer)?;
///
/// let document = writer.into_inner().into_document().ok_or("no document")?;
/// assert_eq!(doc! { "_id" => id, "count" => 3_i64 }, document);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Error handling
/// A [`SerializerError`] is returned when the underlying `TokenWriter` or the
/// serializer itself encounters an error.
///
/// When one of the methods of this serializer return an error, serialization must be
/// aborted. Trying to call any serializer methods afterwards can lead to unspecified
/// behavior, such as errors, panics or incorrect data.
///
/// # Panics
/// The `SerializeMap` implementation panics when keys and values are not serialized
/// alternately.
#[derive(Debug)]
pub struct TokenWriterSerializer<'a, W: ?Sized> {
    writer: &'a mut W,
}

impl<'a, W: TokenWriter + ?Sized> TokenWriterSerializer<'a, W> {
    /// Creates a serializer wrapping a [`TokenWriter`]
    ///
    /// The writer should be positioned to write the next value, for example it should
    /// not have written a top-level value yet, or it should be inside of an array or after
    /// a property name.
    pub fn new(writer: &'a mut W) -> Self {
        TokenWriterSerializer { writer }
    }

    /// Writes a native value with the converters
    ///
    /// The value serializes its extended-object form, which is collected and read back
    /// as native value first.
    fn serialize_native<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        let mut buffer = TokenBuffer::new();
        value.serialize(&mut TokenWriterSerializer::new(&mut buffer))?;

        let mut reader = buffer.into_reader();
        let native_value = extended::read_token(&mut reader)
            .and_then(|_| BSON_VALUE_CONVERTER.read_token_value(&mut reader))
            .map_err(|e| SerializerError::Custom(format!("invalid native value: {e}")))?;
        BSON_VALUE_CONVERTER.write_token_value(self.writer, native_value.as_ref())?;
        Ok(())
    }
}

fn to_i64<N: TryInto<i64> + Display + Copy>(number: N) -> Result<i64, SerializerError> {
    number
        .try_into()
        .map_err(|_| SerializerError::InvalidNumber(format!("{number} is out of range for int64")))
}

/// This implementation of [`Serializer`] follows Serde JSON's behavior where the token
/// grammar matches JSON. Integers are written as 32-bit integers where the Rust type fits,
/// and as 64-bit integers otherwise.
impl<'s, 'a, W: TokenWriter + ?Sized> Serializer for &'s mut TokenWriterSerializer<'a, W> {
    // No result type; data is written to the TokenWriter
    type Ok = ();

    type Error = SerializerError;

    type SerializeSeq = Compound<'s, 'a, W>;
    type SerializeTuple = Compound<'s, 'a, W>;
    type SerializeTupleStruct = Compound<'s, 'a, W>;
    type SerializeTupleVariant = Compound<'s, 'a, W>;
    type SerializeMap = SerializeMap<'s, 'a, W>;
    type SerializeStruct = Compound<'s, 'a, W>;
    type SerializeStructVariant = Compound<'s, 'a, W>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.writer.write_boolean(v)?;
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i32(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i32(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.writer.write_int32(v)?;
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.writer.write_int64(v)?;
        Ok(())
    }

    /// Serialize an `i128` value
    ///
    /// A [`SerializerError::InvalidNumber`] is returned if the value does not fit into an `i64`.
    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_i64(v)?)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i32(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i32(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(v.into())
    }

    /// Serialize a `u64` value
    ///
    /// A [`SerializerError::InvalidNumber`] is returned if the value does not fit into an `i64`.
    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_i64(v)?)
    }

    /// Serialize a `u128` value
    ///
    /// A [`SerializerError::InvalidNumber`] is returned if the value does not fit into an `i64`.
    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_i64(v)?)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_f64(v.into())
    }

    /// Serialize an `f64` value
    ///
    /// Unlike JSON the native format can represent NaN and Infinity, so these are
    /// written as they are.
    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.writer.write_double(v)?;
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(v.encode_utf8(&mut [0; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.writer.write_string(v)?;
        Ok(())
    }

    /// Serialize a chunk of raw byte data
    ///
    /// This implementation writes a [`Bytes`](crate::token::TokenType::Bytes) token, which
    /// the [`WriterAdapter`](crate::writer::WriterAdapter) writes as generic binary data.
    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.writer.write_bytes(v)?;
        Ok(())
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.writer.write_null()?;
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.writer.write_null()?;
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.writer.write_null()?;
        Ok(())
    }

    /// Serialize a unit variant like `E::A` in `enum E { A, B }`
    ///
    /// This implementation writes the `variant` as string value, the given name and
    /// variant index are ignored.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.writer.write_string(variant)?;
        Ok(())
    }

    /// Serialize a newtype struct like `struct Millimeters(u8)`
    ///
    /// The native value types are written with the converters, every other newtype struct
    /// just serializes the provided value.
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        if name == NATIVE_VALUE_NEWTYPE {
            return self.serialize_native(value);
        }
        value.serialize(self)
    }

    /// Serialize a newtype variant like `E::N` in `enum E { N(u8) }`
    ///
    /// This implementation writes an object with a single property whose name
    /// is the `variant` and whose value is the serialized `value`.
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        self.writer.write_start_object()?;
        self.writer.write_property_name(variant)?;
        value.serialize(&mut *self)?;
        self.writer.write_end_object()?;
        Ok(())
    }

    /// Begin to serialize a variably sized sequence
    ///
    /// This implementation writes an array. If `len` is `Some`, serializing a different
    /// number of elements than `len` will cause a [`SerializerError::IncorrectElementsCount`].
    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        self.writer.write_start_array()?;
        Ok(Compound::new(self, len, Closing::Array))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    /// Begin to serialize a tuple variant like `E::T` in `enum E { T(u8, u8) }`
    ///
    /// This implementation writes an object with a single property whose name is
    /// `variant` and whose value is an array of the fields.
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        // Writes `{ variant: [`
        self.writer.write_start_object()?;
        self.writer.write_property_name(variant)?;
        self.writer.write_start_array()?;
        Ok(Compound::new(self, Some(len), Closing::ArrayInObject))
    }

    /// Begin to serialize a map
    ///
    /// This implementation writes an object. Keys have to be strings, chars, booleans or
    /// numbers; numbers and booleans are converted to their string representation.
    /// Duplicate keys are not detected or prevented.
    ///
    /// # Panics
    /// For every [`SerializeMap::serialize_key`](serde::ser::SerializeMap::serialize_key)
    /// call a [`SerializeMap::serialize_value`](serde::ser::SerializeMap::serialize_value)
    /// call has to follow, otherwise a panic will occur.
    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        self.writer.write_start_object()?;
        Ok(SerializeMap {
            compound: Compound::new(self, len, Closing::Object),
            // Initially entry key is expected
            expects_entry_value: false,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.writer.write_start_object()?;
        Ok(Compound::new(self, Some(len), Closing::Object))
    }

    /// Begin to serialize a struct variant like `E::S` in `enum E { S { r: u8, g: u8, b: u8 } }`
    ///
    /// This implementation writes an object with a single property whose name is
    /// `variant` and whose value is an object of the fields.
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        // Writes `{ variant: {`
        self.writer.write_start_object()?;
        self.writer.write_property_name(variant)?;
        self.writer.write_start_object()?;
        Ok(Compound::new(self, Some(len), Closing::ObjectInObject))
    }
}

/// Tokens which close a compound value
#[derive(Clone, Copy, Debug)]
enum Closing {
    Array,
    ArrayInObject,
    Object,
    ObjectInObject,
}

/// Serializer for the elements or fields of arrays, objects, structs and variants
#[doc(hidden)]
#[derive(Debug)]
pub struct Compound<'s, 'a, W: ?Sized> {
    ser: &'s mut TokenWriterSerializer<'a, W>,
    expected_len: Option<usize>,
    len: usize,
    closing: Closing,
}

impl<'s, 'a, W: TokenWriter + ?Sized> Compound<'s, 'a, W> {
    fn new(
        ser: &'s mut TokenWriterSerializer<'a, W>,
        expected_len: Option<usize>,
        closing: Closing,
    ) -> Self {
        Compound {
            ser,
            expected_len,
            len: 0,
            closing,
        }
    }

    /// Counts the next element, failing fast when there are more elements than expected
    fn count_element(&mut self) -> Result<(), SerializerError> {
        if let Some(expected_len) = self.expected_len {
            if self.len >= expected_len {
                return Err(SerializerError::IncorrectElementsCount {
                    expected: expected_len,
                    // + 1 for currently added element
                    actual: self.len + 1,
                });
            }
        }
        self.len += 1;
        Ok(())
    }

    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        self.count_element()?;
        value.serialize(&mut *self.ser)
    }

    fn field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), SerializerError> {
        self.count_element()?;
        self.ser.writer.write_property_name(key)?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), SerializerError> {
        if let Some(expected_len) = self.expected_len {
            if self.len < expected_len {
                return Err(SerializerError::IncorrectElementsCount {
                    expected: expected_len,
                    actual: self.len,
                });
            }
        }

        let writer = &mut *self.ser.writer;
        match self.closing {
            Closing::Array => writer.write_end_array()?,
            Closing::ArrayInObject => {
                writer.write_end_array()?;
                writer.write_end_object()?;
            }
            Closing::Object => writer.write_end_object()?,
            Closing::ObjectInObject => {
                writer.write_end_object()?;
                writer.write_end_object()?;
            }
        }
        Ok(())
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeSeq for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeTuple for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeTupleStruct for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeTupleVariant for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeStruct for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.field(key, value)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Self::Error> {
        // Derived impls leave skipped fields out of the `len` they pass in
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeStructVariant for Compound<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.field(key, value)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Self::Error> {
        // Derived impls leave skipped fields out of the `len` they pass in
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Compound::end(self)
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct SerializeMap<'s, 'a, W: ?Sized> {
    compound: Compound<'s, 'a, W>,
    expects_entry_value: bool,
}

impl<W: TokenWriter + ?Sized> serde::ser::SerializeMap for SerializeMap<'_, '_, W> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        if self.expects_entry_value {
            panic!("Incorrect usage: Cannot serialize key when value is expected")
        }
        self.compound.count_element()?;
        self.expects_entry_value = true;
        key.serialize(&mut MapKeyStringSerializer {
            writer: &mut *self.compound.ser.writer,
        })
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        if !self.expects_entry_value {
            panic!("Incorrect usage: Cannot serialize value when key is expected")
        }
        self.expects_entry_value = false;
        value.serialize(&mut *self.compound.ser)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        if self.expects_entry_value {
            panic!("Incorrect usage: Cannot end map when value is expected")
        }
        self.compound.end()
    }
}

/// Serializer for serializing a map key as property name
///
/// Roughly matches serde_json's internal [`MapKeySerializer`](https://github.com/serde-rs/json/blob/v1.0.107/src/ser.rs#L791).
#[derive(Debug)]
struct MapKeyStringSerializer<'a, W: ?Sized> {
    writer: &'a mut W,
}

impl<W: TokenWriter + ?Sized> MapKeyStringSerializer<'_, W> {
    fn serialize_display_key<N: Display>(&mut self, key: N) -> Result<(), SerializerError> {
        self.writer.write_property_name(&key.to_string())?;
        Ok(())
    }
}

fn err_key_not_string<T>() -> Result<T, SerializerError> {
    Err(SerializerError::MapKeyNotString)
}

impl<W: TokenWriter + ?Sized> Serializer for &mut MapKeyStringSerializer<'_, W> {
    type Ok = ();
    type Error = SerializerError;
    type SerializeSeq = Impossible<(), Self::Error>;
    type SerializeTuple = Impossible<(), Self::Error>;
    type SerializeTupleStruct = Impossible<(), Self::Error>;
    type SerializeTupleVariant = Impossible<(), Self::Error>;
    type SerializeMap = Impossible<(), Self::Error>;
    type SerializeStruct = Impossible<(), Self::Error>;
    type SerializeStructVariant = Impossible<(), Self::Error>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_display_key(v)
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.writer.write_property_name(v)?;
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    /* The following types are not supported as key */

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok, Self::Error> {
        err_key_not_string()
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        err_key_not_string()
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        err_key_not_string()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        err_key_not_string()
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        err_key_not_string()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        err_key_not_string()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        err_key_not_string()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        err_key_not_string()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        err_key_not_string()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        err_key_not_string()
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        err_key_not_string()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        err_key_not_string()
    }
}
