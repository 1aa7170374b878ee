//! Converters for the value-less native types

use super::{extended, read_extended_object, write_native_or_extended, ExtendedKey, TokenConverter};
use crate::{
    bson::{Bson, MaxKey, MinKey, Undefined},
    reader::{ReaderError, TokenReader},
    token::TokenType,
    writer::{TokenWriter, WriterError},
};

/// Converter for the [`MinKey`] sentinel
///
/// Reads the native value or `{ "$minKey": <any> }`.
#[derive(Debug)]
pub struct MinKeyConverter;

impl TokenConverter for MinKeyConverter {
    type Value = MinKey;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<MinKey>, ReaderError> {
        if let Some(Bson::MinKey) = reader.native_value() {
            return Ok(Some(MinKey));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::MinKey, extended::read_sentinel_body)?;
                Ok(Some(MinKey))
            }
            actual => Err(ReaderError::unexpected_token("min key", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&MinKey>,
    ) -> Result<(), WriterError> {
        if value.is_none() {
            return writer.write_null();
        }
        write_native_or_extended(
            writer,
            |sink| sink.write_min_key(),
            |w, dialect| extended::write_sentinel(w, dialect, ExtendedKey::MinKey),
        )
    }
}

/// Converter for the [`MaxKey`] sentinel
///
/// Reads the native value or `{ "$maxKey": <any> }`.
#[derive(Debug)]
pub struct MaxKeyConverter;

impl TokenConverter for MaxKeyConverter {
    type Value = MaxKey;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<MaxKey>, ReaderError> {
        if let Some(Bson::MaxKey) = reader.native_value() {
            return Ok(Some(MaxKey));
        }
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::StartObject => {
                read_extended_object(reader, ExtendedKey::MaxKey, extended::read_sentinel_body)?;
                Ok(Some(MaxKey))
            }
            actual => Err(ReaderError::unexpected_token("max key", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&MaxKey>,
    ) -> Result<(), WriterError> {
        if value.is_none() {
            return writer.write_null();
        }
        write_native_or_extended(
            writer,
            |sink| sink.write_max_key(),
            |w, dialect| extended::write_sentinel(w, dialect, ExtendedKey::MaxKey),
        )
    }
}

/// Converter for the deprecated [`Undefined`] value
///
/// Reads an [`Undefined`](TokenType::Undefined) token or `{ "$undefined": <any> }`, and
/// writes with [`TokenWriter::write_undefined`].
#[derive(Debug)]
pub struct UndefinedConverter;

impl TokenConverter for UndefinedConverter {
    type Value = Undefined;

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<Undefined>, ReaderError> {
        match reader.token_type() {
            TokenType::Null => Ok(None),
            TokenType::Undefined => Ok(Some(Undefined)),
            TokenType::StartObject => {
                read_extended_object(
                    reader,
                    ExtendedKey::Undefined,
                    extended::read_sentinel_body,
                )?;
                Ok(Some(Undefined))
            }
            actual => Err(ReaderError::unexpected_token("undefined", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        value: Option<&Undefined>,
    ) -> Result<(), WriterError> {
        match value {
            Some(_) => writer.write_undefined(),
            None => writer.write_null(),
        }
    }
}

/// Converter for `null`
///
/// Since `null` is itself the value this converter reads, a [`Null`](TokenType::Null) token
/// is `Some(())`; every other token is a format error. Writing always writes `null`.
#[derive(Debug)]
pub struct NullConverter;

impl TokenConverter for NullConverter {
    type Value = ();

    fn read_token_value<R: TokenReader + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<Option<()>, ReaderError> {
        match reader.token_type() {
            TokenType::Null => Ok(Some(())),
            actual => Err(ReaderError::unexpected_token("null", actual)),
        }
    }

    fn write_token_value<W: TokenWriter + ?Sized>(
        &self,
        writer: &mut W,
        _value: Option<&()>,
    ) -> Result<(), WriterError> {
        writer.write_null()
    }
}
