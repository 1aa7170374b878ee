use super::{
    Binary, Bson, BsonError, DateTime, Document, ElementType, JavaScriptCodeWithScope, ObjectId,
    Regex, Timestamp,
};

/// State of a [`NativeReader`]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum NativeReaderState {
    /// Before the first element, or between top-level values
    Initial,
    /// Inside a document or array, the type of the next element has not been read yet
    Type,
    /// The type of the next document element has been read, its name has not
    Name,
    /// Positioned at a value
    Value,
    /// The code of a code with scope value has been read, its scope document is next
    ScopeDocument,
    /// The end of the current array has been reached
    EndOfArray,
    /// The end of the current document has been reached
    EndOfDocument,
    /// The top-level document has been consumed
    Done,
    /// The reader has been closed
    Closed,
}

/// A cursor over native documents
///
/// The reader is driven with [`read_element_type`](Self::read_element_type): inside a
/// document it moves to [`NativeReaderState::Name`], inside an array (whose element names
/// are skipped) and at the top level it moves to [`NativeReaderState::Value`], and at the
/// end of a container it moves to [`NativeReaderState::EndOfDocument`] respectively
/// [`NativeReaderState::EndOfArray`].
///
/// Methods return [`BsonError::InvalidReaderState`] when called in a state which does
/// not permit them, and [`BsonError::UnexpectedElementType`] when reading a value of the
/// wrong type.
pub trait NativeReader {
    /// Gets the current state
    fn state(&self) -> NativeReaderState;

    /// Gets the type of the current element, if the reader is positioned at one
    fn current_element_type(&self) -> Option<ElementType>;

    /// Whether all top-level values have been consumed
    ///
    /// Only meaningful in state [`NativeReaderState::Initial`].
    fn is_at_end_of_file(&self) -> bool;

    /// Reads the type of the next element
    ///
    /// Returns `None` at the end of the current document or array, or when there are no more
    /// top-level values.
    fn read_element_type(&mut self) -> Result<Option<ElementType>, BsonError>;

    /// Reads the name of the current document element
    fn read_name(&mut self) -> Result<String, BsonError>;

    /// Starts reading the current document value (or the scope document)
    fn read_start_document(&mut self) -> Result<(), BsonError>;
    /// Finishes reading the current document
    fn read_end_document(&mut self) -> Result<(), BsonError>;
    /// Starts reading the current array value
    fn read_start_array(&mut self) -> Result<(), BsonError>;
    /// Finishes reading the current array
    fn read_end_array(&mut self) -> Result<(), BsonError>;

    /// Reads a double value
    fn read_double(&mut self) -> Result<f64, BsonError>;
    /// Reads a string value
    fn read_string(&mut self) -> Result<String, BsonError>;
    /// Reads a 32-bit integer value
    fn read_int32(&mut self) -> Result<i32, BsonError>;
    /// Reads a 64-bit integer value
    fn read_int64(&mut self) -> Result<i64, BsonError>;
    /// Reads a boolean value
    fn read_boolean(&mut self) -> Result<bool, BsonError>;
    /// Reads a `null` value
    fn read_null(&mut self) -> Result<(), BsonError>;
    /// Reads an `undefined` value
    fn read_undefined(&mut self) -> Result<(), BsonError>;
    /// Reads an object id value
    fn read_object_id(&mut self) -> Result<ObjectId, BsonError>;
    /// Reads a binary value
    fn read_binary(&mut self) -> Result<Binary, BsonError>;
    /// Reads a date time value
    fn read_date_time(&mut self) -> Result<DateTime, BsonError>;
    /// Reads a regular expression value
    fn read_regular_expression(&mut self) -> Result<Regex, BsonError>;
    /// Reads a JavaScript code value
    fn read_java_script(&mut self) -> Result<String, BsonError>;
    /// Reads the code of a code with scope value
    ///
    /// Afterwards the reader is in state [`NativeReaderState::ScopeDocument`] and the scope
    /// has to be read with [`read_start_document`](Self::read_start_document).
    fn read_java_script_with_scope(&mut self) -> Result<String, BsonError>;
    /// Reads a symbol value
    fn read_symbol(&mut self) -> Result<String, BsonError>;
    /// Reads a timestamp value
    fn read_timestamp(&mut self) -> Result<Timestamp, BsonError>;
    /// Reads a min key value
    fn read_min_key(&mut self) -> Result<(), BsonError>;
    /// Reads a max key value
    fn read_max_key(&mut self) -> Result<(), BsonError>;

    /// Skips the current value, including all nested values
    fn skip_value(&mut self) -> Result<(), BsonError>;

    /// Closes the reader; closing again has no effect
    fn close(&mut self);

    /// Reads the current value, including all nested values, into a [`Bson`]
    ///
    /// The reader must be in state [`NativeReaderState::Value`].
    fn read_value(&mut self) -> Result<Bson, BsonError> {
        let element_type =
            self.current_element_type()
                .ok_or(BsonError::InvalidReaderState {
                    method: "read_value",
                    state: self.state(),
                })?;
        Ok(match element_type {
            ElementType::Double => Bson::Double(self.read_double()?),
            ElementType::String => Bson::String(self.read_string()?),
            ElementType::Document => {
                self.read_start_document()?;
                Bson::Document(read_document_content(self)?)
            }
            ElementType::Array => {
                self.read_start_array()?;
                let mut values = Vec::new();
                while self.read_element_type()?.is_some() {
                    values.push(self.read_value()?);
                }
                self.read_end_array()?;
                Bson::Array(values)
            }
            ElementType::Binary => Bson::Binary(self.read_binary()?),
            ElementType::Undefined => {
                self.read_undefined()?;
                Bson::Undefined
            }
            ElementType::ObjectId => Bson::ObjectId(self.read_object_id()?),
            ElementType::Boolean => Bson::Boolean(self.read_boolean()?),
            ElementType::DateTime => Bson::DateTime(self.read_date_time()?),
            ElementType::Null => {
                self.read_null()?;
                Bson::Null
            }
            ElementType::RegularExpression => Bson::RegularExpression(self.read_regular_expression()?),
            ElementType::JavaScriptCode => Bson::JavaScriptCode(self.read_java_script()?),
            ElementType::Symbol => Bson::Symbol(self.read_symbol()?),
            ElementType::JavaScriptCodeWithScope => {
                let code = self.read_java_script_with_scope()?;
                self.read_start_document()?;
                let scope = read_document_content(self)?;
                Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope })
            }
            ElementType::Int32 => Bson::Int32(self.read_int32()?),
            ElementType::Timestamp => Bson::Timestamp(self.read_timestamp()?),
            ElementType::Int64 => Bson::Int64(self.read_int64()?),
            ElementType::MinKey => {
                self.read_min_key()?;
                Bson::MinKey
            }
            ElementType::MaxKey => {
                self.read_max_key()?;
                Bson::MaxKey
            }
        })
    }
}

/// Reads the elements of a started document, and ends it
fn read_document_content<R: NativeReader + ?Sized>(reader: &mut R) -> Result<Document, BsonError> {
    let mut document = Document::new();
    while reader.read_element_type()?.is_some() {
        let name = reader.read_name()?;
        document.insert(name, reader.read_value()?);
    }
    reader.read_end_document()?;
    Ok(document)
}

enum Container {
    Document(std::vec::IntoIter<(String, Bson)>),
    Array(std::vec::IntoIter<Bson>),
}

/// In-memory [`NativeReader`]
///
/// Either reads a single document, after which the reader is [`NativeReaderState::Done`],
/// or a sequence of top-level values of any type, in which case the reader returns to
/// [`NativeReaderState::Initial`] after each of them.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*};
/// let mut reader = DocumentReader::new(doc! { "x" => 1 });
/// assert_eq!(Some(ElementType::Document), reader.read_element_type()?);
/// reader.read_start_document()?;
/// assert_eq!(Some(ElementType::Int32), reader.read_element_type()?);
/// assert_eq!("x", reader.read_name()?);
/// assert_eq!(1, reader.read_int32()?);
/// assert_eq!(None, reader.read_element_type()?);
/// reader.read_end_document()?;
/// assert_eq!(NativeReaderState::Done, reader.state());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DocumentReader {
    state: NativeReaderState,
    /// Remaining top-level values
    top_level: std::vec::IntoIter<Bson>,
    /// Whether the reader returns to `Initial` after a top-level value
    multi_value: bool,
    stack: Vec<Container>,
    current_name: Option<String>,
    current_value: Option<Bson>,
}

impl DocumentReader {
    /// Creates a reader for a single document
    pub fn new(document: Document) -> Self {
        Self::create(vec![Bson::Document(document)], false)
    }

    /// Creates a reader for a sequence of top-level values
    pub fn from_values(values: Vec<Bson>) -> Self {
        Self::create(values, true)
    }

    fn create(values: Vec<Bson>, multi_value: bool) -> Self {
        DocumentReader {
            state: NativeReaderState::Initial,
            top_level: values.into_iter(),
            multi_value,
            stack: Vec::new(),
            current_name: None,
            current_value: None,
        }
    }

    fn invalid_state(&self, method: &'static str) -> BsonError {
        BsonError::InvalidReaderState {
            method,
            state: self.state,
        }
    }

    fn check_state(&self, method: &'static str, expected: NativeReaderState) -> Result<(), BsonError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(method))
        }
    }

    /// Takes the current value, verifying that it has the expected type
    fn take_value(&mut self, method: &'static str, expected: ElementType) -> Result<Bson, BsonError> {
        self.check_state(method, NativeReaderState::Value)?;
        match &self.current_value {
            Some(value) if value.element_type() == expected => {}
            Some(value) => {
                return Err(BsonError::UnexpectedElementType {
                    expected,
                    actual: value.element_type(),
                })
            }
            None => return Err(self.invalid_state(method)),
        }
        self.current_value.take().ok_or_else(|| self.invalid_state(method))
    }

    /// Moves to the state following a completely consumed value
    fn finish_value(&mut self) {
        self.current_name = None;
        self.state = if !self.stack.is_empty() {
            NativeReaderState::Type
        } else if self.multi_value {
            NativeReaderState::Initial
        } else {
            NativeReaderState::Done
        };
    }
}

macro_rules! read_scalar {
    ($method:ident, $ty:ty, $variant:ident) => {
        fn $method(&mut self) -> Result<$ty, BsonError> {
            match self.take_value(stringify!($method), ElementType::$variant)? {
                Bson::$variant(value) => {
                    self.finish_value();
                    Ok(value)
                }
                _ => unreachable!("type was checked by take_value"),
            }
        }
    };
    ($method:ident, $variant:ident) => {
        fn $method(&mut self) -> Result<(), BsonError> {
            self.take_value(stringify!($method), ElementType::$variant)?;
            self.finish_value();
            Ok(())
        }
    };
}

impl NativeReader for DocumentReader {
    fn state(&self) -> NativeReaderState {
        self.state
    }

    fn current_element_type(&self) -> Option<ElementType> {
        self.current_value.as_ref().map(Bson::element_type)
    }

    fn is_at_end_of_file(&self) -> bool {
        self.state == NativeReaderState::Initial && self.top_level.len() == 0
    }

    fn read_element_type(&mut self) -> Result<Option<ElementType>, BsonError> {
        match self.state {
            NativeReaderState::Initial => match self.top_level.next() {
                Some(value) => {
                    let element_type = value.element_type();
                    self.current_value = Some(value);
                    self.state = NativeReaderState::Value;
                    Ok(Some(element_type))
                }
                None => {
                    self.state = NativeReaderState::Done;
                    Ok(None)
                }
            },
            NativeReaderState::Type => match self.stack.last_mut() {
                Some(Container::Document(iter)) => match iter.next() {
                    Some((name, value)) => {
                        let element_type = value.element_type();
                        self.current_name = Some(name);
                        self.current_value = Some(value);
                        self.state = NativeReaderState::Name;
                        Ok(Some(element_type))
                    }
                    None => {
                        self.state = NativeReaderState::EndOfDocument;
                        Ok(None)
                    }
                },
                Some(Container::Array(iter)) => match iter.next() {
                    Some(value) => {
                        let element_type = value.element_type();
                        self.current_value = Some(value);
                        self.state = NativeReaderState::Value;
                        Ok(Some(element_type))
                    }
                    None => {
                        self.state = NativeReaderState::EndOfArray;
                        Ok(None)
                    }
                },
                None => Err(self.invalid_state("read_element_type")),
            },
            // Reading the type again where it is already known is a no-op
            NativeReaderState::Name | NativeReaderState::Value => Ok(self.current_element_type()),
            NativeReaderState::EndOfDocument | NativeReaderState::EndOfArray => Ok(None),
            _ => Err(self.invalid_state("read_element_type")),
        }
    }

    fn read_name(&mut self) -> Result<String, BsonError> {
        self.check_state("read_name", NativeReaderState::Name)?;
        self.state = NativeReaderState::Value;
        self.current_name
            .clone()
            .ok_or_else(|| self.invalid_state("read_name"))
    }

    fn read_start_document(&mut self) -> Result<(), BsonError> {
        if self.state != NativeReaderState::ScopeDocument {
            self.check_state("read_start_document", NativeReaderState::Value)?;
        }
        let document = match self.current_value.take() {
            Some(Bson::Document(document)) => document,
            Some(other) => {
                let actual = other.element_type();
                self.current_value = Some(other);
                return Err(BsonError::UnexpectedElementType {
                    expected: ElementType::Document,
                    actual,
                });
            }
            None => return Err(self.invalid_state("read_start_document")),
        };
        self.stack.push(Container::Document(document.into_iter()));
        self.current_name = None;
        self.state = NativeReaderState::Type;
        Ok(())
    }

    fn read_end_document(&mut self) -> Result<(), BsonError> {
        if self.state == NativeReaderState::Type {
            // Allow ending directly when the remaining elements are exhausted
            self.read_element_type()?;
        }
        self.check_state("read_end_document", NativeReaderState::EndOfDocument)?;
        self.stack.pop();
        self.finish_value();
        Ok(())
    }

    fn read_start_array(&mut self) -> Result<(), BsonError> {
        match self.take_value("read_start_array", ElementType::Array)? {
            Bson::Array(values) => {
                self.stack.push(Container::Array(values.into_iter()));
                self.state = NativeReaderState::Type;
                Ok(())
            }
            _ => unreachable!("type was checked by take_value"),
        }
    }

    fn read_end_array(&mut self) -> Result<(), BsonError> {
        if self.state == NativeReaderState::Type {
            self.read_element_type()?;
        }
        self.check_state("read_end_array", NativeReaderState::EndOfArray)?;
        self.stack.pop();
        self.finish_value();
        Ok(())
    }

    read_scalar!(read_double, f64, Double);
    read_scalar!(read_string, String, String);
    read_scalar!(read_int32, i32, Int32);
    read_scalar!(read_int64, i64, Int64);
    read_scalar!(read_boolean, bool, Boolean);
    read_scalar!(read_null, Null);
    read_scalar!(read_undefined, Undefined);
    read_scalar!(read_object_id, ObjectId, ObjectId);
    read_scalar!(read_binary, Binary, Binary);
    read_scalar!(read_date_time, DateTime, DateTime);
    read_scalar!(read_regular_expression, Regex, RegularExpression);
    read_scalar!(read_java_script, String, JavaScriptCode);
    read_scalar!(read_symbol, String, Symbol);
    read_scalar!(read_timestamp, Timestamp, Timestamp);
    read_scalar!(read_min_key, MinKey);
    read_scalar!(read_max_key, MaxKey);

    fn read_java_script_with_scope(&mut self) -> Result<String, BsonError> {
        match self.take_value(
            "read_java_script_with_scope",
            ElementType::JavaScriptCodeWithScope,
        )? {
            Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope }) => {
                self.current_value = Some(Bson::Document(scope));
                self.state = NativeReaderState::ScopeDocument;
                Ok(code)
            }
            _ => unreachable!("type was checked by take_value"),
        }
    }

    fn skip_value(&mut self) -> Result<(), BsonError> {
        self.check_state("skip_value", NativeReaderState::Value)?;
        self.current_value = None;
        self.finish_value();
        Ok(())
    }

    fn close(&mut self) {
        self.state = NativeReaderState::Closed;
    }
}
