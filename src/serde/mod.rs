//! Provides integration with [Serde](https://docs.rs/serde/latest/serde/)
//!
//! This module provides optional integration with Serde by allowing [`Serialize`](serde::ser::Serialize)
//! types to be written to a [`TokenWriter`](crate::writer::TokenWriter) and [`Deserialize`](serde::de::Deserialize)
//! types to be read from a [`TokenReader`](crate::reader::TokenReader). Combined with the
//! [`WriterAdapter`](crate::writer::WriterAdapter) and [`ReaderAdapter`](crate::reader::ReaderAdapter)
//! this maps Rust structs to and from the native layer. For compatibility this module tries to
//! match Serde JSON's behavior for the token grammar, but there might be small differences.
//!
//! The native value types such as [`ObjectId`](crate::bson::ObjectId) implement `Serialize`
//! and `Deserialize` as well. Within this crate they are stored natively; with any other
//! Serde format they take their extended-object form, for example `{"$oid": "..."}`.
//!
//! To enable this optional integration, specify the `serde` feature in your `Cargo.toml` file
//! for the dependency on this crate:
//! ```toml
//! [dependencies]
//! bson-token-adapter = { version = "...", features = ["serde"] }
//! ```
//!
//! The most convenient way to use the Serde integration is by using [`SerdeAdapter`].
//! Alternatively [`TokenWriterSerializer`] and [`TokenReaderDeserializer`]
//! can be used directly, for example to write a value in the middle of a document.
//!
//! # Usage examples
//!
//! ## Serialization
//! ```
//! # use bson_token_adapter::{doc, bson::*, writer::*, serde::*};
//! # use serde::*;
//! let mut writer = WriterAdapter::new(DocumentWriter::new());
//!
//! // Start writing the enclosing data using the regular TokenWriter methods
//! writer.write_start_object()?;
//! writer.write_property_name("outer")?;
//!
//! #[derive(Serialize)]
//! struct MyStruct {
//!     text: String,
//!     created: DateTime,
//! }
//!
//! let value = MyStruct {
//!     text: "some text".to_owned(),
//!     created: DateTime::from_millis(5),
//! };
//! // Serialize the value as next value
//! value.serialize(&mut TokenWriterSerializer::new(&mut writer))?;
//!
//! // Write the remainder of the enclosing data
//! writer.write_end_object()?;
//!
//! assert_eq!(
//!     Some(doc! {
//!         "outer" => doc! { "text" => "some text", "created" => DateTime::from_millis(5) }
//!     }),
//!     writer.into_inner().into_document()
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Deserialization
//! ```
//! # use bson_token_adapter::{doc, bson::*, reader::*, serde::*};
//! # use serde::*;
//! let document = doc! {
//!     "outer" => doc! { "text" => "some text", "created" => DateTime::from_millis(5) }
//! };
//! let mut reader = ReaderAdapter::new(DocumentReader::new(document));
//!
//! // Skip outer data using the regular TokenReader methods
//! reader.read()?; // StartObject
//! reader.read()?; // outer
//!
//! #[derive(Deserialize, PartialEq, Debug)]
//! struct MyStruct {
//!     text: String,
//!     created: DateTime,
//! }
//!
//! let value = MyStruct::deserialize(&mut TokenReaderDeserializer::new(&mut reader))?;
//! assert_eq!(
//!     value,
//!     MyStruct { text: "some text".to_owned(), created: DateTime::from_millis(5) }
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export everything directly under `serde`; mainly because the sub-modules do not
// contain many structs and enums and to flatten documentation hierarchy
mod adapter;
pub use adapter::*;
mod buffer;
mod de;
pub use de::*;
mod native;
mod ser;
pub use ser::*;
