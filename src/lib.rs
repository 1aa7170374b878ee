#![warn(missing_docs)]
#![forbid(unsafe_code)]
// Allow needless `return` because that makes it sometimes more obvious that
// an expression is the result of the function
#![allow(clippy::needless_return)]
// Allow `assert_eq!(true, ...)` because in some cases it is used to check a bool
// value and not a 'flag' / 'state', and `assert_eq!` makes that more explicit
#![allow(clippy::bool_assert_comparison)]
// Enable 'unused' warnings for doc tests (are disabled by default)
#![doc(test(no_crate_inject))]
#![doc(test(attr(warn(unused))))]
// Fail on warnings in doc tests
#![doc(test(attr(deny(warnings))))]
// When `docsrs` configuration flag is set enable banner for features in documentation
// See https://stackoverflow.com/q/61417452
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Adapter between JSON-like token streams and a typed binary document format.
//!
//! Code written against a JSON-style token API, such as a generic object mapper, normally only
//! knows objects, arrays, strings, numbers, booleans and `null`. The native document format
//! has more types: object ids, binary data with a subtype, UTC date times, regular
//! expressions, timestamps, JavaScript code and the min / max key sentinels. This crate lets
//! such code read and write native documents without losing those types:
//!
//! - [`ReaderAdapter`](reader::ReaderAdapter) presents a [`NativeReader`](bson::NativeReader)
//!   as a pull-based [`TokenReader`](reader::TokenReader), and additionally exposes the
//!   [native value](reader::TokenReader::native_value) of the current token.
//! - [`WriterAdapter`](writer::WriterAdapter) accepts tokens through the
//!   [`TokenWriter`](writer::TokenWriter) trait and writes them to a
//!   [`NativeWriter`](bson::NativeWriter); native values are stored directly.
//! - The [converters](converters) read a native value from whichever shape a token stream
//!   provides (native value, plain token or extended object like `{"$oid": "..."}`) and
//!   write native values natively where possible, and as extended objects otherwise.
//!
//! # Terminology
//!
//! - *document*: ordered list of named elements, the native counterpart of an object
//! - *extended object*: object whose first property name is a reserved `$`-prefixed key,
//!   encoding a native value in plain tokens, for example `{"$date": 1700000000000}`
//! - *double-dollar dialect*: the same encoding with `$$` prefixed keys, for example
//!   `{"$$oid": "..."}`, which the native layer stores as an ordinary document
//!
//! # Usage examples
//!
//! ## Reading
//!
//! ```
//! # use bson_token_adapter::{doc, bson::*, reader::*, token::*};
//! let id = ObjectId::from_bytes([1; 12]);
//! let document = doc! { "_id" => id, "n" => 1 };
//! let mut reader = ReaderAdapter::new(DocumentReader::new(document));
//!
//! reader.read()?;
//! assert_eq!(TokenType::StartObject, reader.token_type());
//! reader.read()?;
//! assert_eq!(Some(&TokenValue::String("_id".to_owned())), reader.value());
//!
//! // Token-only consumers see the object id as bytes, native-aware ones get the value itself
//! reader.read()?;
//! assert_eq!(TokenType::Bytes, reader.token_type());
//! assert_eq!(Some(&Bson::ObjectId(id)), reader.native_value());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Writing
//!
//! ```
//! # use bson_token_adapter::{doc, bson::*, writer::*};
//! let mut writer = WriterAdapter::new(DocumentWriter::new());
//! writer.write_start_object()?;
//! writer.write_property_name("a")?;
//! writer.write_start_array()?;
//! writer.write_int32(1)?;
//! writer.write_boolean(true)?;
//! writer.write_end_array()?;
//! writer.write_end_object()?;
//!
//! assert_eq!(
//!     Some(doc! { "a" => vec![Bson::Int32(1), Bson::Boolean(true)] }),
//!     writer.into_inner().into_document()
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Serde integration
//! Optional integration with [Serde](https://docs.rs/serde/latest/serde/) exists to
//! allow writing a `Serialize` to a `TokenWriter` and reading a `Deserialize` from
//! a `TokenReader`. See the [`serde` module](crate::serde) of this crate for more information.

pub mod bson;
pub mod converters;
pub mod reader;
pub mod token;
pub mod writer;

#[cfg(feature = "serde")]
pub mod serde;
