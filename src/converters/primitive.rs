//! Converters for the native types which have a direct token equivalent

use super::{extended, TokenConverter};
use crate::{
    bson::Bson,
    reader::{ReaderError, TokenReader},
    token::{TokenType, TokenValue},
    writer::{TokenWriter, WriterError},
};

/// Converter for booleans
#[derive(Debug)]
pub struct BooleanConverter;

/// Converter for 32-bit integers
///
/// Integers outside of the `i32` range are a format error.
#[derive(Debug)]
pub struct Int32Converter;

/// Converter for 64-bit integers
#[derive(Debug)]
pub struct Int64Converter;

/// Converter for floating point numbers
///
/// Integers are accepted as well and converted to `f64`.
#[derive(Debug)]
pub struct DoubleConverter;

impl TokenConverter for BooleanConverter {
    type Value = bool;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<bool>, ReaderError> {
        if let Some(Bson::Boolean(b)) = reader.native_value() {
            return Ok(Some(*b));
        }
        match (reader.token_type(), reader.value()) {
            (TokenType::Null, _) => Ok(None),
            (TokenType::Boolean, Some(TokenValue::Boolean(b))) => Ok(Some(*b)),
            (actual, _) => Err(ReaderError::unexpected_token("boolean", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&bool>,
    ) -> Result<(), WriterError> {
        match value {
            Some(b) => writer.write_boolean(*b),
            None => writer.write_null(),
        }
    }
}

impl TokenConverter for Int32Converter {
    type Value = i32;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<i32>, ReaderError> {
        if let Some(Bson::Int32(i)) = reader.native_value() {
            return Ok(Some(*i));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Integer => {
                let value = extended::current_integer(reader)?;
                i32::try_from(value).map(Some).map_err(|_| {
                    ReaderError::invalid_value(format!("{value} is out of range for int32"))
                })
            }
            actual => Err(ReaderError::unexpected_token("int32", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&i32>,
    ) -> Result<(), WriterError> {
        match value {
            Some(i) => writer.write_int32(*i),
            None => writer.write_null(),
        }
    }
}

impl TokenConverter for Int64Converter {
    type Value = i64;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<i64>, ReaderError> {
        match reader.native_value() {
            Some(Bson::Int64(i)) => return Ok(Some(*i)),
            Some(Bson::Int32(i)) => return Ok(Some((*i).into())),
            _ => {}
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Integer => extended::current_integer(reader).map(Some),
            actual => Err(ReaderError::unexpected_token("int64", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&i64>,
    ) -> Result<(), WriterError> {
        match value {
            Some(i) => writer.write_int64(*i),
            None => writer.write_null(),
        }
    }
}

impl TokenConverter for DoubleConverter {
    type Value = f64;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<f64>, ReaderError> {
        if let Some(Bson::Double(f)) = reader.native_value() {
            return Ok(Some(*f));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Integer | TokenType::Float => extended::current_float(reader).map(Some),
            actual => Err(ReaderError::unexpected_token("double", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&f64>,
    ) -> Result<(), WriterError> {
        match value {
            Some(f) => writer.write_double(*f),
            None => writer.write_null(),
        }
    }
}
