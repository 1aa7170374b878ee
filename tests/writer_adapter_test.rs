use bson_token_adapter::{
    bson::{
        Binary, BinarySubtype, Bson, DateTime, DocumentReader, DocumentWriter, Guid,
        JavaScriptCodeWithScope, MaxKey, MinKey, NativeWriter, NativeWriterState, ObjectId, Regex,
        Timestamp, Undefined,
    },
    converters::{TokenConverter, BSON_VALUE_CONVERTER, OBJECT_ID_CONVERTER},
    doc,
    reader::{ReaderAdapter, TokenReader},
    writer::{ExtendedJsonDialect, TokenWriter, WriterAdapter, WriterError, WriterSettings},
};
use serde_json::json;
use test_lib::{JsonValueReader, JsonValueWriter};

mod test_lib;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn extended_objects_become_native() -> TestResult {
    let json = json!({
        "a_id": {"$oid": "0102030405060708090a0b0c"},
        "b_bin": {"$binary": "AQID", "$type": "80"},
        "c_date": {"$date": 1500},
        "d_ts": {"$timestamp": {"t": 1, "i": 2}},
        "e_min": {"$$minKey": 1},
        "f_code": {"$code": "f()", "$scope": {"x": 1}},
        "g_sym": {"$$symbol": "s"},
        "h_undef": {"$undefined": true},
        "i_plain": {"$type": "not leading"},
        "j_num": 5,
        "k_regex": {"$regex": "a+", "$options": "i"},
        "l_regex": {"$$regex": "b", "$$options": ""},
    });
    let mut reader = JsonValueReader::new(&json);
    reader.read()?;
    let value = BSON_VALUE_CONVERTER.read_token_value(&mut reader)?;

    let mut writer = WriterAdapter::new(DocumentWriter::new());
    BSON_VALUE_CONVERTER.write_token_value(&mut writer, value.as_ref())?;
    assert_eq!(
        Some(doc! {
            "a_id" => ObjectId::parse_str("0102030405060708090a0b0c")?,
            "b_bin" => Binary {
                subtype: BinarySubtype::UserDefined(0x80),
                bytes: vec![1, 2, 3],
            },
            "c_date" => DateTime::from_millis(1500),
            "d_ts" => Timestamp { time: 1, increment: 2 },
            "e_min" => MinKey,
            "f_code" => JavaScriptCodeWithScope {
                code: "f()".to_owned(),
                scope: doc! { "x" => 1 },
            },
            "g_sym" => Bson::Symbol("s".to_owned()),
            "h_undef" => Undefined,
            "i_plain" => doc! { "$type" => "not leading" },
            "j_num" => 5,
            "k_regex" => Regex::new("a+", "i"),
            "l_regex" => Regex::new("b", ""),
        }),
        writer.into_inner().into_document()
    );
    Ok(())
}

#[test]
fn native_values_to_unaware_writer() -> TestResult {
    let document = doc! {
        "id" => ObjectId::from_bytes([1; 12]),
        "bin" => Binary::generic(vec![1, 2, 3]),
        "date" => DateTime::from_millis(1500),
        "ts" => Timestamp { time: 1, increment: 2 },
        "min" => MinKey,
        "max" => MaxKey,
        "undef" => Undefined,
        "regex" => Regex::new("a", "i"),
        "code" => Bson::JavaScriptCode("f()".to_owned()),
        "scoped" => JavaScriptCodeWithScope {
            code: "g()".to_owned(),
            scope: doc! { "x" => 1 },
        },
        "sym" => Bson::Symbol("s".to_owned()),
    };

    let mut writer = JsonValueWriter::new();
    BSON_VALUE_CONVERTER.write_token_value(&mut writer, Some(&Bson::Document(document)))?;
    assert_eq!(
        Some(json!({
            "id": {"$oid": "010101010101010101010101"},
            "bin": {"$binary": "AQID", "$type": "00"},
            "date": {"$date": 1500},
            "ts": {"$timestamp": {"t": 1, "i": 2}},
            "min": {"$minKey": 1},
            "max": {"$maxKey": 1},
            "undef": {"$undefined": true},
            "regex": {"$regex": "a", "$options": "i"},
            "code": {"$code": "f()"},
            "scoped": {"$code": "g()", "$scope": {"x": 1}},
            "sym": {"$symbol": "s"},
        })),
        writer.into_value()
    );
    Ok(())
}

#[test]
fn fallback_dialect_from_settings() -> TestResult {
    let id = ObjectId::from_bytes([4; 12]);
    let mut writer = WriterAdapter::new_custom(
        DocumentWriter::new(),
        WriterSettings {
            extended_dialect: ExtendedJsonDialect::Canonical,
            ..Default::default()
        },
    );
    // The wrapped writer only accepts a document at the top level
    OBJECT_ID_CONVERTER.write_token_value(&mut writer, Some(&id))?;
    let document = writer.into_inner().into_document().ok_or("no document")?;
    assert_eq!(doc! { "$oid" => "040404040404040404040404" }, document);

    // Reading it back restores the object id
    let mut reader = ReaderAdapter::new(DocumentReader::new(document));
    reader.read()?;
    assert_eq!(Some(id), OBJECT_ID_CONVERTER.read_token_value(&mut reader)?);
    Ok(())
}

#[test]
fn token_grammar_extensions() -> TestResult {
    let guid = Guid::from_bytes([9; 16]);
    let date = chrono::DateTime::from_timestamp_millis(2_000).ok_or("invalid date")?;

    let mut writer = WriterAdapter::new(DocumentWriter::new());
    writer.write_start_object()?;
    writer.write_whitespace("\n  ")?;
    writer.write_property_name("date")?;
    writer.write_date_time(date)?;
    writer.write_property_name("bytes")?;
    writer.write_bytes(&[1, 2])?;
    writer.write_property_name("guid")?;
    writer.write_guid(guid)?;
    writer.write_property_name("undefined")?;
    writer.write_undefined()?;
    writer.write_end_object()?;

    assert_eq!(
        Some(doc! {
            "date" => DateTime::from_millis(2_000),
            "bytes" => Binary::generic(vec![1, 2]),
            "guid" => Binary::from_guid(guid, BinarySubtype::UuidOld),
            "undefined" => Undefined,
        }),
        writer.into_inner().into_document()
    );
    Ok(())
}

#[test]
fn unsupported_operations() -> TestResult {
    let mut writer = WriterAdapter::new(DocumentWriter::new());
    writer.write_start_object()?;
    writer.write_property_name("a")?;

    for result in [
        writer.write_raw("1"),
        writer.write_raw_value("1"),
        writer.write_start_constructor("Date"),
        writer.write_end_constructor(),
    ] {
        match result {
            Err(WriterError::Unsupported { .. }) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    // The writer is still usable
    writer.write_int32(1)?;
    writer.write_end_object()?;
    assert_eq!(Some(doc! { "a" => 1 }), writer.into_inner().into_document());
    Ok(())
}

#[test]
fn close_output() -> TestResult {
    let mut writer = WriterAdapter::new(DocumentWriter::new());
    writer.close()?;
    assert_ne!(NativeWriterState::Closed, writer.wrapped().state());

    let mut writer = WriterAdapter::new(DocumentWriter::new());
    writer.set_close_output(true);
    writer.close()?;
    assert_eq!(NativeWriterState::Closed, writer.wrapped().state());
    // Closing again has no effect
    writer.close()?;
    Ok(())
}
