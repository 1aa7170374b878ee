//! Binary encoding of documents
//!
//! A document is encoded as its total length (`i32`, little-endian, including the length
//! itself and the trailing NUL), followed by its elements and a terminating `0x00`. Each
//! element is its type byte, its name as NUL-terminated string and the type specific payload.

use super::{
    Binary, BinarySubtype, Bson, BsonError, DateTime, Document, ElementType,
    JavaScriptCodeWithScope, ObjectId, Regex, Timestamp,
};

/// Deepest nesting [`Document::from_bytes`] accepts before rejecting the data
const MAX_DECODE_DEPTH: usize = 100;

impl Document {
    /// Encodes the document in the binary format
    ///
    /// Fails if a name, a regular expression pattern or options contain a NUL character.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BsonError> {
        let mut out = Vec::new();
        encode_document(&mut out, self.iter())?;
        Ok(out)
    }

    /// Decodes a document from the binary format
    ///
    /// The data must contain exactly one document, trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Document, BsonError> {
        let mut decoder = Decoder {
            bytes,
            pos: 0,
            depth: 0,
        };
        let document = decoder.read_document()?;
        if decoder.pos != bytes.len() {
            return Err(decoder.malformed("trailing data after document"));
        }
        Ok(document)
    }
}

fn encode_document<'a>(
    out: &mut Vec<u8>,
    elements: impl Iterator<Item = (&'a str, &'a Bson)>,
) -> Result<(), BsonError> {
    let start = out.len();
    out.extend_from_slice(&[0; 4]);
    for (name, value) in elements {
        out.push(value.element_type() as u8);
        write_cstring(out, name)?;
        encode_value(out, value)?;
    }
    out.push(0);
    patch_length(out, start);
    Ok(())
}

fn patch_length(out: &mut [u8], start: usize) {
    let len = (out.len() - start) as i32;
    out[start..start + 4].copy_from_slice(&len.to_le_bytes());
}

fn write_cstring(out: &mut Vec<u8>, s: &str) -> Result<(), BsonError> {
    if s.contains('\0') {
        return Err(BsonError::NulCharacter(s.to_owned()));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

fn encode_value(out: &mut Vec<u8>, value: &Bson) -> Result<(), BsonError> {
    match value {
        Bson::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        Bson::String(s) | Bson::JavaScriptCode(s) | Bson::Symbol(s) => write_string(out, s),
        Bson::Document(document) => encode_document(out, document.iter())?,
        Bson::Array(values) => {
            let names: Vec<String> = (0..values.len()).map(|i| i.to_string()).collect();
            encode_document(out, names.iter().map(String::as_str).zip(values.iter()))?
        }
        Bson::Binary(binary) => {
            let subtype = u8::from(binary.subtype);
            if binary.subtype == BinarySubtype::BinaryOld {
                out.extend_from_slice(&(binary.bytes.len() as i32 + 4).to_le_bytes());
                out.push(subtype);
                out.extend_from_slice(&(binary.bytes.len() as i32).to_le_bytes());
            } else {
                out.extend_from_slice(&(binary.bytes.len() as i32).to_le_bytes());
                out.push(subtype);
            }
            out.extend_from_slice(&binary.bytes);
        }
        Bson::Undefined | Bson::Null | Bson::MinKey | Bson::MaxKey => {}
        Bson::ObjectId(id) => out.extend_from_slice(&id.bytes()),
        Bson::Boolean(b) => out.push(u8::from(*b)),
        Bson::DateTime(d) => out.extend_from_slice(&d.timestamp_millis().to_le_bytes()),
        Bson::RegularExpression(regex) => {
            write_cstring(out, &regex.pattern)?;
            write_cstring(out, &regex.options)?;
        }
        Bson::JavaScriptCodeWithScope(code_with_scope) => {
            let start = out.len();
            out.extend_from_slice(&[0; 4]);
            write_string(out, &code_with_scope.code);
            encode_document(out, code_with_scope.scope.iter())?;
            patch_length(out, start);
        }
        Bson::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Bson::Timestamp(t) => out.extend_from_slice(&t.to_packed().to_le_bytes()),
        Bson::Int64(v) => out.extend_from_slice(&v.to_le_bytes()),
    }
    Ok(())
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Decoder<'_> {
    fn malformed(&self, message: impl Into<String>) -> BsonError {
        BsonError::Malformed {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&[u8], BsonError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.malformed(format!("expected {len} more bytes")))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], BsonError> {
        let mut array = [0; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn read_u8(&mut self) -> Result<u8, BsonError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32, BsonError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    fn read_length(&mut self, min: i32) -> Result<usize, BsonError> {
        let len = self.read_i32()?;
        if len < min {
            return Err(self.malformed(format!("invalid length {len}")));
        }
        Ok(len as usize)
    }

    fn read_cstring(&mut self) -> Result<String, BsonError> {
        let remaining = &self.bytes[self.pos..];
        let nul = remaining
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| self.malformed("unterminated string"))?;
        let s = std::str::from_utf8(&remaining[..nul])
            .map_err(|e| self.malformed(format!("invalid UTF-8: {e}")))?
            .to_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    fn read_string(&mut self) -> Result<String, BsonError> {
        let len = self.read_length(1)?;
        let start = self.pos;
        let data = self.take(len)?;
        if data[len - 1] != 0 {
            self.pos = start + len - 1;
            return Err(self.malformed("string is not NUL-terminated"));
        }
        std::str::from_utf8(&data[..len - 1])
            .map(str::to_owned)
            .map_err(|e| BsonError::Malformed {
                offset: start,
                message: format!("invalid UTF-8: {e}"),
            })
    }

    fn read_document(&mut self) -> Result<Document, BsonError> {
        Ok(self.read_elements()?.into_iter().collect())
    }

    fn read_elements(&mut self) -> Result<Vec<(String, Bson)>, BsonError> {
        if self.depth >= MAX_DECODE_DEPTH {
            return Err(self.malformed("maximum nesting depth exceeded"));
        }
        self.depth += 1;

        let start = self.pos;
        let len = self.read_length(5)?;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.malformed(format!("document length {len} exceeds data")))?;

        let mut elements = Vec::new();
        loop {
            let type_byte = self.read_u8()?;
            if type_byte == 0 {
                break;
            }
            let element_type = ElementType::from_repr(type_byte)
                .ok_or_else(|| self.malformed(format!("unknown element type {type_byte:#04x}")))?;
            let name = self.read_cstring()?;
            let value = self.read_value(element_type)?;
            elements.push((name, value));
        }
        if self.pos != end {
            return Err(self.malformed(format!("document length {len} does not match content")));
        }

        self.depth -= 1;
        Ok(elements)
    }

    fn read_value(&mut self, element_type: ElementType) -> Result<Bson, BsonError> {
        Ok(match element_type {
            ElementType::Double => Bson::Double(f64::from_le_bytes(self.take_array()?)),
            ElementType::String => Bson::String(self.read_string()?),
            ElementType::Document => Bson::Document(self.read_document()?),
            ElementType::Array => Bson::Array(
                self.read_elements()?
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect(),
            ),
            ElementType::Binary => {
                let len = self.read_length(0)?;
                let subtype = BinarySubtype::from(self.read_u8()?);
                let bytes = if subtype == BinarySubtype::BinaryOld {
                    let inner_len = self.read_length(0)?;
                    if inner_len + 4 != len {
                        return Err(self.malformed("inconsistent old binary length"));
                    }
                    self.take(inner_len)?.to_vec()
                } else {
                    self.take(len)?.to_vec()
                };
                Bson::Binary(Binary { subtype, bytes })
            }
            ElementType::Undefined => Bson::Undefined,
            ElementType::ObjectId => Bson::ObjectId(ObjectId::from_bytes(self.take_array()?)),
            ElementType::Boolean => match self.read_u8()? {
                0 => Bson::Boolean(false),
                1 => Bson::Boolean(true),
                b => return Err(self.malformed(format!("invalid boolean value {b}"))),
            },
            ElementType::DateTime => {
                Bson::DateTime(DateTime::from_millis(i64::from_le_bytes(self.take_array()?)))
            }
            ElementType::Null => Bson::Null,
            ElementType::RegularExpression => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                Bson::RegularExpression(Regex { pattern, options })
            }
            ElementType::JavaScriptCode => Bson::JavaScriptCode(self.read_string()?),
            ElementType::Symbol => Bson::Symbol(self.read_string()?),
            ElementType::JavaScriptCodeWithScope => {
                let start = self.pos;
                let len = self.read_length(14)?;
                let code = self.read_string()?;
                let scope = self.read_document()?;
                if self.pos - start != len {
                    return Err(self.malformed("inconsistent code with scope length"));
                }
                Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope })
            }
            ElementType::Int32 => Bson::Int32(i32::from_le_bytes(self.take_array()?)),
            ElementType::Timestamp => {
                Bson::Timestamp(Timestamp::from_packed(u64::from_le_bytes(self.take_array()?)))
            }
            ElementType::Int64 => Bson::Int64(i64::from_le_bytes(self.take_array()?)),
            ElementType::MinKey => Bson::MinKey,
            ElementType::MaxKey => Bson::MaxKey,
        })
    }
}
