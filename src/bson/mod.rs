//! Module for the native document model
//!
//! The native format is a binary, typed document format: a document is an ordered list of
//! named elements, and every element carries an [`ElementType`]. Besides the types a JSON-like
//! token grammar can express directly (numbers, strings, booleans, `null`, arrays and
//! objects) the format has native types such as [`ObjectId`], [`Binary`] data with a
//! [`BinarySubtype`], UTC [`DateTime`] values, regular expressions, [`Timestamp`]s,
//! JavaScript code (optionally with a scope document) and the min / max key sentinels.
//!
//! [`NativeReader`] and [`NativeWriter`] are the cursor-style interfaces the adapters of this
//! crate wrap. [`DocumentReader`] and [`DocumentWriter`] implement them in memory, and
//! [`Document::to_bytes`] / [`Document::from_bytes`] convert between documents and the binary
//! encoding.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use duplicate::duplicate_item;
use thiserror::Error;

mod document;
mod native_reader;
mod native_writer;
mod raw;

pub use document::*;
pub use native_reader::*;
pub use native_writer::*;

/// Type of a native element, as stored in the binary encoding
#[derive(PartialEq, Eq, Hash, Clone, Copy, strum::Display, strum::FromRepr, Debug)]
#[repr(u8)]
pub enum ElementType {
    /// 64-bit floating point number
    Double = 0x01,
    /// UTF-8 string
    String = 0x02,
    /// Embedded document
    Document = 0x03,
    /// Array; encoded as document whose keys are the indices
    Array = 0x04,
    /// Binary data with a subtype
    Binary = 0x05,
    /// Deprecated `undefined` value
    Undefined = 0x06,
    /// 12-byte object identifier
    ObjectId = 0x07,
    /// Boolean value
    Boolean = 0x08,
    /// Milliseconds since the Unix epoch
    DateTime = 0x09,
    /// `null` value
    Null = 0x0A,
    /// Regular expression with options
    RegularExpression = 0x0B,
    /// JavaScript code
    JavaScriptCode = 0x0D,
    /// Deprecated symbol
    Symbol = 0x0E,
    /// JavaScript code with a scope document
    JavaScriptCodeWithScope = 0x0F,
    /// 32-bit signed integer
    Int32 = 0x10,
    /// Internal replication timestamp
    Timestamp = 0x11,
    /// 64-bit signed integer
    Int64 = 0x12,
    /// Sentinel comparing greater than every other value
    MaxKey = 0x7F,
    /// Sentinel comparing less than every other value
    MinKey = 0xFF,
}

/// Subtype of [`Binary`] data
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum BinarySubtype {
    /// Generic binary data (`0x00`)
    Generic,
    /// Function (`0x01`)
    Function,
    /// Old binary format (`0x02`), stored with an additional inner length
    BinaryOld,
    /// UUID in the legacy little-endian field order (`0x03`)
    UuidOld,
    /// UUID in standard byte order (`0x04`)
    Uuid,
    /// MD5 digest (`0x05`)
    Md5,
    /// User defined data (`0x80` to `0xFF`)
    UserDefined(u8),
    /// Subtype reserved for future use
    Reserved(u8),
}

impl From<u8> for BinarySubtype {
    fn from(value: u8) -> Self {
        match value {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            0x80..=0xFF => BinarySubtype::UserDefined(value),
            _ => BinarySubtype::Reserved(value),
        }
    }
}

impl From<BinarySubtype> for u8 {
    fn from(value: BinarySubtype) -> Self {
        match value {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::UserDefined(v) | BinarySubtype::Reserved(v) => v,
        }
    }
}

/// Error which occurred in the native layer
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BsonError {
    /// A reader method was called in a state which does not permit it
    #[error("{method} cannot be called when the reader state is {state}")]
    InvalidReaderState {
        /// Name of the called method
        method: &'static str,
        /// State of the reader at the time of the call
        state: NativeReaderState,
    },
    /// A writer method was called in a state which does not permit it
    #[error("{method} cannot be called when the writer state is {state}")]
    InvalidWriterState {
        /// Name of the called method
        method: &'static str,
        /// State of the writer at the time of the call
        state: NativeWriterState,
    },
    /// The current element has a different type than the one requested
    #[error("expected element type {expected} but got {actual}")]
    UnexpectedElementType {
        /// The requested element type
        expected: ElementType,
        /// The actual element type
        actual: ElementType,
    },
    /// A string could not be parsed as [`ObjectId`] or [`Guid`]
    #[error("invalid {kind} string '{value}'")]
    InvalidIdentifier {
        /// Kind of identifier, for example "object id"
        kind: &'static str,
        /// The rejected string
        value: String,
    },
    /// Binary data does not have the expected structure
    #[error("malformed binary document at offset {offset}: {message}")]
    Malformed {
        /// Offset of the problem within the data
        offset: usize,
        /// Message describing the problem
        message: String,
    },
    /// A name or string contains a NUL character where the encoding does not allow it
    #[error("'{0}' contains a NUL character")]
    NulCharacter(String),
}

/// 12-byte object identifier
///
/// The string representation is the 24 character lowercase hex form of the bytes.
///
/// # Examples
/// ```
/// # use bson_token_adapter::bson::ObjectId;
/// let id: ObjectId = "0102030405060708090a0b0c".parse()?;
/// assert_eq!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12], id.bytes());
/// assert_eq!("0102030405060708090a0b0c", id.to_hex());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Creates an object id from its raw bytes
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Parses the 24 character hex form
    pub fn parse_str(s: &str) -> Result<Self, BsonError> {
        let mut bytes = [0_u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| BsonError::InvalidIdentifier {
            kind: "object id",
            value: s.to_owned(),
        })?;
        Ok(ObjectId(bytes))
    }

    /// Gets the raw bytes
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Gets the 24 character lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for ObjectId {
    type Error = BsonError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 12] = value
            .try_into()
            .map_err(|_| BsonError::InvalidIdentifier {
                kind: "object id",
                value: hex::encode(value),
            })?;
        Ok(ObjectId(bytes))
    }
}

impl FromStr for ObjectId {
    type Err = BsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// 128-bit globally unique identifier
///
/// The bytes are stored in standard (big-endian) order. Binary data of subtype
/// [`BinarySubtype::UuidOld`] uses the legacy order in which the first three groups are
/// little-endian, see [`to_legacy_bytes`](Self::to_legacy_bytes).
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Guid([u8; 16]);

/// Index permutation between standard and legacy byte order; its own inverse
const LEGACY_GUID_ORDER: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

impl Guid {
    /// Creates a GUID from bytes in standard order
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    /// Creates a GUID from bytes in legacy order
    pub fn from_legacy_bytes(bytes: [u8; 16]) -> Self {
        Guid(LEGACY_GUID_ORDER.map(|i| bytes[i]))
    }

    /// Gets the bytes in standard order
    pub const fn bytes(&self) -> [u8; 16] {
        self.0
    }

    /// Gets the bytes in legacy order
    pub fn to_legacy_bytes(&self) -> [u8; 16] {
        LEGACY_GUID_ORDER.map(|i| self.0[i])
    }

    /// Parses the hyphenated form, for example `01020304-0506-0708-090a-0b0c0d0e0f10`
    pub fn parse_str(s: &str) -> Result<Self, BsonError> {
        let err = || BsonError::InvalidIdentifier {
            kind: "GUID",
            value: s.to_owned(),
        };
        let groups: Vec<&str> = s.split('-').collect();
        if groups.iter().map(|g| g.len()).collect::<Vec<_>>() != [8, 4, 4, 4, 12] {
            return Err(err());
        }
        let mut bytes = [0_u8; 16];
        hex::decode_to_slice(groups.concat(), &mut bytes).map_err(|_| err())?;
        Ok(Guid(bytes))
    }
}

impl FromStr for Guid {
    type Err = BsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse_str(s)
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&b[0..4]),
            hex::encode(&b[4..6]),
            hex::encode(&b[6..8]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16])
        )
    }
}

/// Binary data with a subtype
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Binary {
    /// Subtype of the data
    pub subtype: BinarySubtype,
    /// The data; for [`BinarySubtype::BinaryOld`] without the inner length prefix
    pub bytes: Vec<u8>,
}

impl Binary {
    /// Creates generic binary data
    pub fn generic(bytes: Vec<u8>) -> Self {
        Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }
    }

    /// Creates binary data holding a GUID, in standard or legacy representation
    pub fn from_guid(guid: Guid, subtype: BinarySubtype) -> Self {
        let bytes = if subtype == BinarySubtype::UuidOld {
            guid.to_legacy_bytes()
        } else {
            guid.bytes()
        };
        Binary {
            subtype,
            bytes: bytes.to_vec(),
        }
    }

    /// Interprets the data as GUID
    ///
    /// Returns `None` unless the subtype is one of the UUID subtypes and there are exactly 16 bytes.
    pub fn to_guid(&self) -> Option<Guid> {
        let bytes: [u8; 16] = self.bytes.as_slice().try_into().ok()?;
        match self.subtype {
            BinarySubtype::UuidOld => Some(Guid::from_legacy_bytes(bytes)),
            BinarySubtype::Uuid => Some(Guid::from_bytes(bytes)),
            _ => None,
        }
    }
}

/// UTC date time as milliseconds since the Unix epoch
///
/// The full `i64` range is representable, even though only a part of it can be converted
/// to a calendar date, see [`to_chrono`](Self::to_chrono).
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DateTime(i64);

impl DateTime {
    /// Smallest representable date time
    pub const MIN: DateTime = DateTime(i64::MIN);
    /// Largest representable date time
    pub const MAX: DateTime = DateTime(i64::MAX);

    /// Creates a date time from milliseconds since the Unix epoch
    pub const fn from_millis(millis: i64) -> Self {
        DateTime(millis)
    }

    /// Gets the milliseconds since the Unix epoch
    pub const fn timestamp_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a calendar date, or returns `None` if the value is outside of its range
    pub fn to_chrono(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.0)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DateTime {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        DateTime(value.timestamp_millis())
    }
}

/// Regular expression with its options
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Regex {
    /// The pattern
    pub pattern: String,
    /// The options, for example `i` for case insensitive matching
    pub options: String,
}

impl Regex {
    /// Creates a regular expression
    pub fn new(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Regex {
            pattern: pattern.into(),
            options: options.into(),
        }
    }
}

/// Formats as `/pattern/options`
impl Display for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.options)
    }
}

/// Timestamp consisting of seconds and an ordinal increment
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub time: u32,
    /// Ordinal within the second
    pub increment: u32,
}

impl Timestamp {
    /// Unpacks a value whose high 32 bits are the time and whose low 32 bits are the increment
    pub const fn from_packed(value: u64) -> Self {
        Timestamp {
            time: (value >> 32) as u32,
            increment: value as u32,
        }
    }

    /// Packs time and increment into a single value, time in the high 32 bits
    pub const fn to_packed(&self) -> u64 {
        ((self.time as u64) << 32) | self.increment as u64
    }
}

/// JavaScript code together with the scope it is evaluated in
#[derive(PartialEq, Clone, Debug)]
pub struct JavaScriptCodeWithScope {
    /// The code
    pub code: String,
    /// The scope document
    pub scope: Document,
}

/// Min key sentinel, see [`Bson::MinKey`]
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct MinKey;

/// Max key sentinel, see [`Bson::MaxKey`]
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct MaxKey;

/// Deprecated `undefined` value, see [`Bson::Undefined`]
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Undefined;

/// A native value
#[derive(PartialEq, Clone, Debug)]
pub enum Bson {
    /// 64-bit floating point number
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Embedded document
    Document(Document),
    /// Array
    Array(Vec<Bson>),
    /// Binary data
    Binary(Binary),
    /// Deprecated `undefined`
    Undefined,
    /// Object identifier
    ObjectId(ObjectId),
    /// Boolean
    Boolean(bool),
    /// UTC date time
    DateTime(DateTime),
    /// `null`
    Null,
    /// Regular expression
    RegularExpression(Regex),
    /// JavaScript code
    JavaScriptCode(String),
    /// Deprecated symbol
    Symbol(String),
    /// JavaScript code with scope
    JavaScriptCodeWithScope(JavaScriptCodeWithScope),
    /// 32-bit signed integer
    Int32(i32),
    /// Timestamp
    Timestamp(Timestamp),
    /// 64-bit signed integer
    Int64(i64),
    /// Min key sentinel
    MinKey,
    /// Max key sentinel
    MaxKey,
}

impl Bson {
    /// Gets the element type of this value
    pub fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(_) => ElementType::Double,
            Bson::String(_) => ElementType::String,
            Bson::Document(_) => ElementType::Document,
            Bson::Array(_) => ElementType::Array,
            Bson::Binary(_) => ElementType::Binary,
            Bson::Undefined => ElementType::Undefined,
            Bson::ObjectId(_) => ElementType::ObjectId,
            Bson::Boolean(_) => ElementType::Boolean,
            Bson::DateTime(_) => ElementType::DateTime,
            Bson::Null => ElementType::Null,
            Bson::RegularExpression(_) => ElementType::RegularExpression,
            Bson::JavaScriptCode(_) => ElementType::JavaScriptCode,
            Bson::Symbol(_) => ElementType::Symbol,
            Bson::JavaScriptCodeWithScope(_) => ElementType::JavaScriptCodeWithScope,
            Bson::Int32(_) => ElementType::Int32,
            Bson::Timestamp(_) => ElementType::Timestamp,
            Bson::Int64(_) => ElementType::Int64,
            Bson::MinKey => ElementType::MinKey,
            Bson::MaxKey => ElementType::MaxKey,
        }
    }

    /// Gets the document if this value is a document
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::Document(document) => Some(document),
            _ => None,
        }
    }
}

#[duplicate_item(
    source_type   variant;
    [f64]         [Double];
    [String]      [String];
    [Document]    [Document];
    [Vec<Bson>]   [Array];
    [Binary]      [Binary];
    [ObjectId]    [ObjectId];
    [bool]        [Boolean];
    [DateTime]    [DateTime];
    [Regex]       [RegularExpression];
    [JavaScriptCodeWithScope] [JavaScriptCodeWithScope];
    [i32]         [Int32];
    [Timestamp]   [Timestamp];
    [i64]         [Int64];
)]
impl From<source_type> for Bson {
    fn from(value: source_type) -> Self {
        Bson::variant(value)
    }
}

#[duplicate_item(
    source_type;
    [MinKey];
    [MaxKey];
    [Undefined];
)]
impl From<source_type> for Bson {
    fn from(_: source_type) -> Self {
        Bson::source_type
    }
}

impl From<&str> for Bson {
    fn from(value: &str) -> Self {
        Bson::String(value.to_owned())
    }
}
