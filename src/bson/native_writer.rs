use super::{
    Binary, Bson, BsonError, DateTime, Document, JavaScriptCodeWithScope, ObjectId, Regex,
    Timestamp,
};

/// State of a [`NativeWriter`]
#[derive(PartialEq, Eq, Clone, Copy, strum::Display, Debug)]
pub enum NativeWriterState {
    /// Expecting a top-level value
    Initial,
    /// Inside a document, expecting the name of the next element or the end of the document
    Name,
    /// Expecting a value; inside an array the end of the array is permitted as well
    Value,
    /// The code of a code with scope value has been written, its scope document is next
    ScopeDocument,
    /// The top-level document has been written
    Done,
    /// The writer has been closed
    Closed,
}

/// A cursor producing native documents
///
/// Inside documents every value has to be preceded by [`write_name`](Self::write_name),
/// inside arrays values are written directly.
///
/// Methods return [`BsonError::InvalidWriterState`] when called in a state which does
/// not permit them.
pub trait NativeWriter {
    /// Gets the current state
    fn state(&self) -> NativeWriterState;

    /// Whether the writer currently accepts a (non-document) value
    fn accepts_value(&self) -> bool;

    /// Writes the name of the next document element
    fn write_name(&mut self, name: &str) -> Result<(), BsonError>;

    /// Starts a document (or the scope document of a code with scope value)
    fn write_start_document(&mut self) -> Result<(), BsonError>;
    /// Ends the current document
    fn write_end_document(&mut self) -> Result<(), BsonError>;
    /// Starts an array
    fn write_start_array(&mut self) -> Result<(), BsonError>;
    /// Ends the current array
    fn write_end_array(&mut self) -> Result<(), BsonError>;

    /// Writes a double value
    fn write_double(&mut self, value: f64) -> Result<(), BsonError>;
    /// Writes a string value
    fn write_string(&mut self, value: &str) -> Result<(), BsonError>;
    /// Writes a 32-bit integer value
    fn write_int32(&mut self, value: i32) -> Result<(), BsonError>;
    /// Writes a 64-bit integer value
    fn write_int64(&mut self, value: i64) -> Result<(), BsonError>;
    /// Writes a boolean value
    fn write_boolean(&mut self, value: bool) -> Result<(), BsonError>;
    /// Writes a `null` value
    fn write_null(&mut self) -> Result<(), BsonError>;
    /// Writes an `undefined` value
    fn write_undefined(&mut self) -> Result<(), BsonError>;
    /// Writes an object id value
    fn write_object_id(&mut self, value: ObjectId) -> Result<(), BsonError>;
    /// Writes a binary value
    fn write_binary(&mut self, value: &Binary) -> Result<(), BsonError>;
    /// Writes a date time value
    fn write_date_time(&mut self, value: DateTime) -> Result<(), BsonError>;
    /// Writes a regular expression value
    fn write_regular_expression(&mut self, value: &Regex) -> Result<(), BsonError>;
    /// Writes a JavaScript code value
    fn write_java_script(&mut self, code: &str) -> Result<(), BsonError>;
    /// Writes the code of a code with scope value
    ///
    /// Afterwards the writer is in state [`NativeWriterState::ScopeDocument`] and the scope
    /// has to be written as document.
    fn write_java_script_with_scope(&mut self, code: &str) -> Result<(), BsonError>;
    /// Writes a symbol value
    fn write_symbol(&mut self, value: &str) -> Result<(), BsonError>;
    /// Writes a timestamp value
    fn write_timestamp(&mut self, value: Timestamp) -> Result<(), BsonError>;
    /// Writes a min key value
    fn write_min_key(&mut self) -> Result<(), BsonError>;
    /// Writes a max key value
    fn write_max_key(&mut self) -> Result<(), BsonError>;

    /// Flushes buffered data, if any
    fn flush(&mut self) -> Result<(), BsonError>;

    /// Closes the writer; closing again has no effect
    fn close(&mut self);

    /// Writes a complete value, including all nested values
    fn write_value(&mut self, value: &Bson) -> Result<(), BsonError> {
        match value {
            Bson::Double(v) => self.write_double(*v),
            Bson::String(v) => self.write_string(v),
            Bson::Document(document) => {
                self.write_start_document()?;
                write_document_content(self, document)
            }
            Bson::Array(values) => {
                self.write_start_array()?;
                for value in values {
                    self.write_value(value)?;
                }
                self.write_end_array()
            }
            Bson::Binary(v) => self.write_binary(v),
            Bson::Undefined => self.write_undefined(),
            Bson::ObjectId(v) => self.write_object_id(*v),
            Bson::Boolean(v) => self.write_boolean(*v),
            Bson::DateTime(v) => self.write_date_time(*v),
            Bson::Null => self.write_null(),
            Bson::RegularExpression(v) => self.write_regular_expression(v),
            Bson::JavaScriptCode(v) => self.write_java_script(v),
            Bson::Symbol(v) => self.write_symbol(v),
            Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope }) => {
                self.write_java_script_with_scope(code)?;
                self.write_start_document()?;
                write_document_content(self, scope)
            }
            Bson::Int32(v) => self.write_int32(*v),
            Bson::Timestamp(v) => self.write_timestamp(*v),
            Bson::Int64(v) => self.write_int64(*v),
            Bson::MinKey => self.write_min_key(),
            Bson::MaxKey => self.write_max_key(),
        }
    }
}

/// Writes the elements of a document and ends it
fn write_document_content<W: NativeWriter + ?Sized>(
    writer: &mut W,
    document: &Document,
) -> Result<(), BsonError> {
    for (name, value) in document.iter() {
        writer.write_name(name)?;
        writer.write_value(value)?;
    }
    writer.write_end_document()
}

enum Frame {
    Document {
        document: Document,
        pending_name: Option<String>,
        /// Set if this is the scope of a code with scope value
        scope_code: Option<String>,
    },
    Array(Vec<Bson>),
}

/// In-memory [`NativeWriter`]
///
/// By default exactly one top-level document can be written. A writer created with
/// [`with_root_values`](Self::with_root_values) accepts any number of top-level values
/// of any type.
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::*};
/// let mut writer = DocumentWriter::new();
/// writer.write_start_document()?;
/// writer.write_name("x")?;
/// writer.write_int32(1)?;
/// writer.write_end_document()?;
/// assert_eq!(Some(doc! { "x" => 1 }), writer.into_document());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DocumentWriter {
    state: NativeWriterState,
    multi_value: bool,
    stack: Vec<Frame>,
    scope_code: Option<String>,
    values: Vec<Bson>,
}

impl Default for DocumentWriter {
    fn default() -> Self {
        DocumentWriter::new()
    }
}

impl DocumentWriter {
    /// Creates a writer for a single top-level document
    pub fn new() -> Self {
        DocumentWriter {
            state: NativeWriterState::Initial,
            multi_value: false,
            stack: Vec::new(),
            scope_code: None,
            values: Vec::new(),
        }
    }

    /// Creates a writer for a sequence of top-level values
    pub fn with_root_values() -> Self {
        DocumentWriter {
            multi_value: true,
            ..DocumentWriter::new()
        }
    }

    /// Gets the top-level values written so far
    pub fn values(&self) -> &[Bson] {
        &self.values
    }

    /// Consumes the writer and returns the top-level values
    pub fn into_values(self) -> Vec<Bson> {
        self.values
    }

    /// Consumes the writer and returns the first top-level value, if it is a document
    pub fn into_document(self) -> Option<Document> {
        match self.values.into_iter().next() {
            Some(Bson::Document(document)) => Some(document),
            _ => None,
        }
    }

    fn invalid_state(&self, method: &'static str) -> BsonError {
        BsonError::InvalidWriterState {
            method,
            state: self.state,
        }
    }

    fn check_accepts_value(&self, method: &'static str) -> Result<(), BsonError> {
        if self.accepts_value() {
            Ok(())
        } else {
            Err(self.invalid_state(method))
        }
    }

    /// Stores a completed value in its parent and moves to the following state
    fn push_value(&mut self, value: Bson) {
        match self.stack.last_mut() {
            Some(Frame::Document {
                document,
                pending_name,
                ..
            }) => {
                let name = pending_name.take().unwrap_or_default();
                document.insert(name, value);
                self.state = NativeWriterState::Name;
            }
            Some(Frame::Array(values)) => {
                values.push(value);
                self.state = NativeWriterState::Value;
            }
            None => {
                self.values.push(value);
                self.state = if self.multi_value {
                    NativeWriterState::Initial
                } else {
                    NativeWriterState::Done
                };
            }
        }
    }
}

macro_rules! write_scalar {
    ($method:ident, $ty:ty, |$v:ident| $value:expr) => {
        fn $method(&mut self, $v: $ty) -> Result<(), BsonError> {
            self.check_accepts_value(stringify!($method))?;
            self.push_value($value);
            Ok(())
        }
    };
    ($method:ident, $value:expr) => {
        fn $method(&mut self) -> Result<(), BsonError> {
            self.check_accepts_value(stringify!($method))?;
            self.push_value($value);
            Ok(())
        }
    };
}

impl NativeWriter for DocumentWriter {
    fn state(&self) -> NativeWriterState {
        self.state
    }

    fn accepts_value(&self) -> bool {
        match self.state {
            NativeWriterState::Value => true,
            NativeWriterState::Initial => self.multi_value,
            _ => false,
        }
    }

    fn write_name(&mut self, name: &str) -> Result<(), BsonError> {
        if self.state != NativeWriterState::Name {
            return Err(self.invalid_state("write_name"));
        }
        if let Some(Frame::Document { pending_name, .. }) = self.stack.last_mut() {
            *pending_name = Some(name.to_owned());
        }
        self.state = NativeWriterState::Value;
        Ok(())
    }

    fn write_start_document(&mut self) -> Result<(), BsonError> {
        match self.state {
            NativeWriterState::Initial | NativeWriterState::Value | NativeWriterState::ScopeDocument => {}
            _ => return Err(self.invalid_state("write_start_document")),
        }
        self.stack.push(Frame::Document {
            document: Document::new(),
            pending_name: None,
            scope_code: self.scope_code.take(),
        });
        self.state = NativeWriterState::Name;
        Ok(())
    }

    fn write_end_document(&mut self) -> Result<(), BsonError> {
        if self.state != NativeWriterState::Name {
            return Err(self.invalid_state("write_end_document"));
        }
        match self.stack.pop() {
            Some(Frame::Document {
                document,
                scope_code: Some(code),
                ..
            }) => {
                self.push_value(Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                    code,
                    scope: document,
                }));
                Ok(())
            }
            Some(Frame::Document { document, .. }) => {
                self.push_value(Bson::Document(document));
                Ok(())
            }
            Some(frame @ Frame::Array(_)) => {
                self.stack.push(frame);
                Err(self.invalid_state("write_end_document"))
            }
            None => Err(self.invalid_state("write_end_document")),
        }
    }

    fn write_start_array(&mut self) -> Result<(), BsonError> {
        self.check_accepts_value("write_start_array")?;
        self.stack.push(Frame::Array(Vec::new()));
        self.state = NativeWriterState::Value;
        Ok(())
    }

    fn write_end_array(&mut self) -> Result<(), BsonError> {
        if self.state != NativeWriterState::Value {
            return Err(self.invalid_state("write_end_array"));
        }
        match self.stack.pop() {
            Some(Frame::Array(values)) => {
                self.push_value(Bson::Array(values));
                Ok(())
            }
            Some(frame) => {
                self.stack.push(frame);
                Err(self.invalid_state("write_end_array"))
            }
            None => Err(self.invalid_state("write_end_array")),
        }
    }

    write_scalar!(write_double, f64, |v| Bson::Double(v));
    write_scalar!(write_string, &str, |v| Bson::String(v.to_owned()));
    write_scalar!(write_int32, i32, |v| Bson::Int32(v));
    write_scalar!(write_int64, i64, |v| Bson::Int64(v));
    write_scalar!(write_boolean, bool, |v| Bson::Boolean(v));
    write_scalar!(write_null, Bson::Null);
    write_scalar!(write_undefined, Bson::Undefined);
    write_scalar!(write_object_id, ObjectId, |v| Bson::ObjectId(v));
    write_scalar!(write_binary, &Binary, |v| Bson::Binary(v.clone()));
    write_scalar!(write_date_time, DateTime, |v| Bson::DateTime(v));
    write_scalar!(write_regular_expression, &Regex, |v| Bson::RegularExpression(v.clone()));
    write_scalar!(write_java_script, &str, |v| Bson::JavaScriptCode(v.to_owned()));
    write_scalar!(write_symbol, &str, |v| Bson::Symbol(v.to_owned()));
    write_scalar!(write_timestamp, Timestamp, |v| Bson::Timestamp(v));
    write_scalar!(write_min_key, Bson::MinKey);
    write_scalar!(write_max_key, Bson::MaxKey);

    fn write_java_script_with_scope(&mut self, code: &str) -> Result<(), BsonError> {
        self.check_accepts_value("write_java_script_with_scope")?;
        self.scope_code = Some(code.to_owned());
        self.state = NativeWriterState::ScopeDocument;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BsonError> {
        if self.state == NativeWriterState::Closed {
            return Err(self.invalid_state("flush"));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.state = NativeWriterState::Closed;
    }
}
