#![cfg(feature = "serde")]

use std::collections::BTreeMap;

use bson_token_adapter::{
    bson::{
        Binary, BinarySubtype, Bson, DateTime, Document, DocumentReader, DocumentWriter, MinKey,
        ObjectId, Regex, Timestamp, Undefined,
    },
    doc,
    reader::TokenReader,
    serde::{SerdeAdapter, SerializationProvider, TokenReaderDeserializer, TokenWriterSerializer},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use test_lib::{JsonValueReader, JsonValueWriter};

mod test_lib;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Serializes to a token writer without native sink, and checks that Serde JSON produces
/// the same value
fn assert_serialized<S: Serialize>(s: S, expected: serde_json::Value) {
    let mut writer = JsonValueWriter::new();
    s.serialize(&mut TokenWriterSerializer::new(&mut writer))
        .unwrap();
    assert_eq!(Some(&expected), writer.into_value().as_ref());

    let serde_json = serde_json::to_value(&s).unwrap();
    assert_eq!(
        expected, serde_json,
        "Serde JSON output does not match expected value"
    );
}

/// Deserializes from a token reader, and checks that Serde JSON produces the same value
fn assert_deserialized<D: DeserializeOwned + PartialEq + std::fmt::Debug>(
    json: serde_json::Value,
    expected: D,
) {
    let mut reader = JsonValueReader::new(&json);
    let value = D::deserialize(&mut TokenReaderDeserializer::new(&mut reader)).unwrap();
    assert_eq!(expected, value);
    assert!(!reader.read().unwrap(), "reader has trailing tokens");

    let serde_json_value: D = serde_json::from_value(json).unwrap();
    assert_eq!(
        expected, serde_json_value,
        "Serde JSON value does not match expected value"
    );
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Event {
    id: ObjectId,
    at: DateTime,
    payload: Binary,
    version: Timestamp,
    tags: Vec<String>,
    #[serde(default)]
    comment: Option<String>,
}

fn event() -> Event {
    Event {
        id: ObjectId::from_bytes([0x0A; 12]),
        at: DateTime::from_millis(86_400_000),
        payload: Binary {
            subtype: BinarySubtype::UserDefined(0x81),
            bytes: vec![0xFF],
        },
        version: Timestamp {
            time: 3,
            increment: 4,
        },
        tags: vec!["x".to_owned()],
        comment: None,
    }
}

#[test]
fn serialize_extended_shapes() {
    assert_serialized(
        event(),
        json!({
            "id": {"$oid": "0a0a0a0a0a0a0a0a0a0a0a0a"},
            "at": {"$date": 86_400_000},
            "payload": {"$binary": "/w==", "$type": "81"},
            "version": {"$timestamp": {"t": 3, "i": 4}},
            "tags": ["x"],
            "comment": null,
        }),
    );
    assert_serialized(
        Regex::new("^a", "m"),
        json!({"$regex": "^a", "$options": "m"}),
    );

    assert_serialized(
        BTreeMap::from([("min", Bson::MinKey), ("undefined", Bson::Undefined)]),
        json!({"min": {"$minKey": 1}, "undefined": {"$undefined": true}}),
    );
    assert_serialized(MinKey, json!({"$minKey": 1}));
    assert_serialized(Undefined, json!({"$undefined": true}));
}

#[test]
fn deserialize_extended_shapes() {
    assert_deserialized(
        json!({
            "id": {"$oid": "0a0a0a0a0a0a0a0a0a0a0a0a"},
            "at": {"$date": 86_400_000},
            "payload": {"$binary": "/w==", "$type": "81"},
            "version": {"$timestamp": {"t": 3, "i": 4}},
            "tags": ["x"],
        }),
        event(),
    );

    assert_deserialized(
        json!({"$date": "1970-01-02T00:00:00Z"}),
        DateTime::from_millis(86_400_000),
    );
    assert_deserialized(
        json!({"n": 1, "big": 5_000_000_000_i64}),
        doc! { "n" => 1, "big" => 5_000_000_000_i64 },
    );
}

#[test]
fn serde_adapter_round_trip() -> TestResult {
    let adapter = SerdeAdapter::<Event>::new();
    let writer = adapter.serialize(DocumentWriter::new(), &event())?;
    let document = writer.into_document().ok_or("no document")?;

    // Native values are stored natively, not as extended objects
    assert_eq!(Some(&Bson::ObjectId(event().id)), document.get("id"));
    assert_eq!(Some(&Bson::DateTime(event().at)), document.get("at"));
    assert_eq!(Some(&Bson::Null), document.get("comment"));

    let document = Document::from_bytes(&document.to_bytes()?)?;
    assert_eq!(event(), adapter.deserialize(DocumentReader::new(document))?);
    Ok(())
}

#[test]
fn serde_adapter_native_value_fields() -> TestResult {
    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        any: Bson,
        nested: Document,
    }

    let wrapper = Wrapper {
        any: Bson::Timestamp(Timestamp {
            time: 1,
            increment: 1,
        }),
        nested: doc! { "b" => MinKey, "a" => Bson::Array(vec![Bson::Undefined]) },
    };
    let adapter = SerdeAdapter::<Wrapper>::new();
    let document = adapter
        .serialize(DocumentWriter::new(), &wrapper)?
        .into_document()
        .ok_or("no document")?;
    assert_eq!(
        doc! {
            "any" => Timestamp { time: 1, increment: 1 },
            "nested" => doc! { "b" => MinKey, "a" => Bson::Array(vec![Bson::Undefined]) },
        },
        document
    );
    assert_eq!(wrapper, adapter.deserialize(DocumentReader::new(document))?);
    Ok(())
}

#[test]
fn provider_selects_types() {
    let provider = SerializationProvider::new(|name| name.contains("::Event"));
    assert!(provider.adapter_for::<Event>().is_some());
    assert!(provider.adapter_for::<Vec<Event>>().is_some());
    assert!(provider.adapter_for::<String>().is_none());
    assert!(provider.adapter_for::<DateTime>().is_none());
}
