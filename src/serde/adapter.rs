use std::{
    any::{type_name, TypeId},
    fmt::{Debug, Formatter},
    marker::PhantomData,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{DeserializerError, SerializerError, TokenReaderDeserializer, TokenWriterSerializer};
use crate::{
    bson::{
        Binary, Bson, DateTime, Document, JavaScriptCodeWithScope, MaxKey, MinKey, NativeReader,
        NativeWriter, ObjectId, Regex, Timestamp, Undefined,
    },
    reader::{ReaderAdapter, ReaderSettings, TokenReader},
    writer::{TokenWriter, WriterAdapter, WriterSettings},
};

/// Reads and writes values of type `T` from and to the native layer with Serde
///
/// Serialization goes through a [`WriterAdapter`], deserialization through a
/// [`ReaderAdapter`], so native values nested anywhere inside of `T` are stored natively.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*, serde::*};
/// # use serde::*;
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Entry {
///     _id: ObjectId,
///     tags: Vec<String>,
/// }
///
/// let entry = Entry {
///     _id: ObjectId::from_bytes([2; 12]),
///     tags: vec!["a".to_owned()],
/// };
/// let adapter = SerdeAdapter::<Entry>::new();
/// let writer = adapter.serialize(DocumentWriter::new(), &entry)?;
/// let document = writer.into_document().ok_or("no document")?;
/// assert_eq!(Some(&Bson::ObjectId(entry._id)), document.get("_id"));
///
/// let read = adapter.deserialize(DocumentReader::new(document))?;
/// assert_eq!(entry, read);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SerdeAdapter<T> {
    reader_settings: ReaderSettings,
    writer_settings: WriterSettings,
    _type: PhantomData<fn() -> T>,
}

// Implemented manually to not require `T: Debug` or `T: Clone`
impl<T> Debug for SerdeAdapter<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerdeAdapter")
            .field("type", &type_name::<T>())
            .field("reader_settings", &self.reader_settings)
            .field("writer_settings", &self.writer_settings)
            .finish()
    }
}

impl<T> Clone for SerdeAdapter<T> {
    fn clone(&self) -> Self {
        SerdeAdapter::new_custom(self.reader_settings.clone(), self.writer_settings.clone())
    }
}

impl<T> Default for SerdeAdapter<T> {
    fn default() -> Self {
        SerdeAdapter::new()
    }
}

impl<T> SerdeAdapter<T> {
    /// Creates an adapter with default settings
    pub fn new() -> Self {
        SerdeAdapter::new_custom(ReaderSettings::default(), WriterSettings::default())
    }

    /// Creates an adapter whose reader and writer adapters use custom settings
    pub fn new_custom(reader_settings: ReaderSettings, writer_settings: WriterSettings) -> Self {
        SerdeAdapter {
            reader_settings,
            writer_settings,
            _type: PhantomData,
        }
    }

    /// Serializes the value as next value of an existing writer adapter
    pub fn serialize_into<W: NativeWriter>(
        &self,
        writer: &mut WriterAdapter<W>,
        value: &T,
    ) -> Result<(), SerializerError>
    where
        T: Serialize,
    {
        value.serialize(&mut TokenWriterSerializer::new(writer))?;
        writer.flush()?;
        Ok(())
    }

    /// Serializes the value to the native writer and returns the writer afterwards
    ///
    /// The writer is wrapped in a [`WriterAdapter`] using the writer settings of this adapter.
    pub fn serialize<W: NativeWriter>(&self, writer: W, value: &T) -> Result<W, SerializerError>
    where
        T: Serialize,
    {
        let mut writer = WriterAdapter::new_custom(writer, self.writer_settings.clone());
        self.serialize_into(&mut writer, value)?;
        if self.writer_settings.close_output {
            writer.close()?;
        }
        Ok(writer.into_inner())
    }

    /// Deserializes the next value of an existing reader adapter
    pub fn deserialize_from<R: NativeReader>(
        &self,
        reader: &mut ReaderAdapter<R>,
    ) -> Result<T, DeserializerError>
    where
        T: DeserializeOwned,
    {
        T::deserialize(&mut TokenReaderDeserializer::new(reader))
    }

    /// Deserializes a value from the native reader
    ///
    /// The reader is wrapped in a [`ReaderAdapter`] using the reader settings of this adapter.
    pub fn deserialize<R: NativeReader>(&self, reader: R) -> Result<T, DeserializerError>
    where
        T: DeserializeOwned,
    {
        let mut reader = ReaderAdapter::new_custom(reader, self.reader_settings.clone());
        let value = self.deserialize_from(&mut reader)?;
        if self.reader_settings.close_input {
            reader.close();
        }
        Ok(value)
    }
}

/// Hands out [`SerdeAdapter`]s for the types accepted by a predicate
///
/// The predicate is called with the [type name](std::any::type_name) of the requested type.
/// The native value types, such as [`ObjectId`] or [`Document`], are never handled by the
/// provider; they are written to and read from the native layer directly.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{bson::*, serde::*};
/// # use serde::*;
/// #[derive(Serialize, Deserialize)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let provider = SerializationProvider::new(|name| name.ends_with("::Point"));
/// assert!(provider.adapter_for::<Point>().is_some());
/// assert!(provider.adapter_for::<String>().is_none());
/// // Native types are never handed out
/// assert!(SerializationProvider::new(|_| true).adapter_for::<ObjectId>().is_none());
/// ```
pub struct SerializationProvider {
    predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
    reader_settings: ReaderSettings,
    writer_settings: WriterSettings,
}

impl Debug for SerializationProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationProvider")
            .field("reader_settings", &self.reader_settings)
            .field("writer_settings", &self.writer_settings)
            .finish_non_exhaustive()
    }
}

fn is_native_type<T: ?Sized + 'static>() -> bool {
    let id = TypeId::of::<T>();
    [
        TypeId::of::<Bson>(),
        TypeId::of::<Document>(),
        TypeId::of::<ObjectId>(),
        TypeId::of::<Binary>(),
        TypeId::of::<DateTime>(),
        TypeId::of::<Regex>(),
        TypeId::of::<JavaScriptCodeWithScope>(),
        TypeId::of::<Timestamp>(),
        TypeId::of::<MinKey>(),
        TypeId::of::<MaxKey>(),
        TypeId::of::<Undefined>(),
    ]
    .contains(&id)
}

impl SerializationProvider {
    /// Creates a provider whose adapters use default settings
    pub fn new(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        SerializationProvider::new_custom(
            predicate,
            ReaderSettings::default(),
            WriterSettings::default(),
        )
    }

    /// Creates a provider whose adapters use custom settings
    pub fn new_custom(
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        reader_settings: ReaderSettings,
        writer_settings: WriterSettings,
    ) -> Self {
        SerializationProvider {
            predicate: Box::new(predicate),
            reader_settings,
            writer_settings,
        }
    }

    /// Gets an adapter for `T`, or `None` if the provider does not handle the type
    pub fn adapter_for<T: 'static>(&self) -> Option<SerdeAdapter<T>>
    where
        T: Serialize + for<'de> Deserialize<'de>,
    {
        let name = type_name::<T>();
        if is_native_type::<T>() || !(self.predicate)(name) {
            debug!(type_name = name, "type is not handled by the serialization provider");
            return None;
        }
        Some(SerdeAdapter::new_custom(
            self.reader_settings.clone(),
            self.writer_settings.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::{
        bson::{DocumentReader, DocumentWriter},
        doc,
        writer::ExtendedJsonDialect,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Record {
        id: ObjectId,
        created: DateTime,
        version: Timestamp,
        payload: Binary,
        #[serde(default)]
        note: Option<String>,
    }

    fn record() -> Record {
        Record {
            id: ObjectId::from_bytes([5; 12]),
            created: DateTime::from_millis(1_000),
            version: Timestamp {
                time: 10,
                increment: 2,
            },
            payload: Binary::generic(vec![1, 2, 3]),
            note: None,
        }
    }

    #[test]
    fn serialize_stores_native_values() -> TestResult {
        let record = record();
        let writer = SerdeAdapter::new().serialize(DocumentWriter::new(), &record)?;
        assert_eq!(
            Some(doc! {
                "id" => record.id,
                "created" => record.created,
                "version" => record.version,
                "payload" => record.payload.clone(),
                "note" => Bson::Null,
            }),
            writer.into_document()
        );
        Ok(())
    }

    #[test]
    fn round_trip() -> TestResult {
        let adapter = SerdeAdapter::<Record>::new();
        let record = record();
        let document = adapter
            .serialize(DocumentWriter::new(), &record)?
            .into_document()
            .ok_or("no document")?;
        assert_eq!(record, adapter.deserialize(DocumentReader::new(document))?);
        Ok(())
    }

    #[test]
    fn deserialize_extended_objects() -> TestResult {
        #[derive(Deserialize, PartialEq, Debug)]
        struct WithId {
            id: ObjectId,
        }

        // Stored by a writer which did not know about native values
        let document = doc! { "id" => doc! { "$$oid" => "050505050505050505050505" } };
        let value = SerdeAdapter::<WithId>::new().deserialize(DocumentReader::new(document))?;
        assert_eq!(
            WithId {
                id: ObjectId::from_bytes([5; 12])
            },
            value
        );
        Ok(())
    }

    #[test]
    fn serialize_multiple_values() -> TestResult {
        let adapter = SerdeAdapter::<Vec<i32>>::new_custom(
            ReaderSettings::default(),
            WriterSettings {
                extended_dialect: ExtendedJsonDialect::Canonical,
                ..Default::default()
            },
        );
        let mut writer = WriterAdapter::new(DocumentWriter::with_root_values());
        adapter.serialize_into(&mut writer, &vec![1])?;
        adapter.serialize_into(&mut writer, &vec![2, 3])?;
        assert_eq!(
            vec![
                Bson::Array(vec![Bson::Int32(1)]),
                Bson::Array(vec![Bson::Int32(2), Bson::Int32(3)]),
            ],
            writer.into_inner().into_values()
        );
        Ok(())
    }

    #[test]
    fn provider() {
        let provider = SerializationProvider::new(|name| name.ends_with("::Record"));
        assert!(provider.adapter_for::<Record>().is_some());
        assert!(provider.adapter_for::<Vec<i32>>().is_none());

        let provider = SerializationProvider::new(|_| true);
        assert!(provider.adapter_for::<Vec<i32>>().is_some());
        assert!(provider.adapter_for::<Bson>().is_none());
        assert!(provider.adapter_for::<Document>().is_none());
        assert!(provider.adapter_for::<Regex>().is_none());
        assert!(provider.adapter_for::<MinKey>().is_none());
    }
}
