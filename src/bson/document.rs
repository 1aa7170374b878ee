use super::Bson;

/// Ordered collection of named native values
///
/// Element order is preserved; inserting an existing name replaces the value in place.
#[derive(PartialEq, Clone, Default, Debug)]
pub struct Document {
    elements: Vec<(String, Bson)>,
}

impl Document {
    /// Creates an empty document
    pub fn new() -> Self {
        Document::default()
    }

    /// Inserts a value, returning the previous value for the name if there was one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        let name = name.into();
        let value = value.into();
        if let Some((_, existing)) = self.elements.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(existing, value));
        }
        self.elements.push((name, value));
        None
    }

    /// Gets the value for a name
    pub fn get(&self, name: &str) -> Option<&Bson> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Whether the document has an element with the name
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes the element with the name and returns its value
    pub fn remove(&mut self, name: &str) -> Option<Bson> {
        let index = self.elements.iter().position(|(n, _)| n == name)?;
        Some(self.elements.remove(index).1)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over the elements in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.elements.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterates over the element names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|(n, _)| n.as_str())
    }
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = std::vec::IntoIter<(String, Bson)>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<K: Into<String>, V: Into<Bson>> FromIterator<(K, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut document = Document::new();
        for (name, value) in iter {
            document.insert(name, value);
        }
        document
    }
}

/// Creates a [`Document`](crate::bson::Document) from `name => value` pairs
///
/// Values are converted with [`Into<Bson>`](crate::bson::Bson).
///
/// # Examples
/// ```
/// # use bson_token_adapter::{doc, bson::Bson};
/// let document = doc! { "x" => 1, "y" => doc! { "z" => "text" } };
/// assert_eq!(Some(&Bson::Int32(1)), document.get("x"));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::bson::Document::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::bson::Document::new();
        $(
            document.insert($name, $value);
        )+
        document
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut document = crate::doc! { "a" => 1, "b" => 2 };
        assert_eq!(Some(Bson::Int32(1)), document.insert("a", 3));
        assert_eq!(vec!["a", "b"], document.keys().collect::<Vec<_>>());
        assert_eq!(Some(&Bson::Int32(3)), document.get("a"));
        assert_eq!(2, document.len());
    }

    #[test]
    fn remove() {
        let mut document = crate::doc! { "a" => 1, "b" => true };
        assert_eq!(Some(Bson::Int32(1)), document.remove("a"));
        assert_eq!(None, document.remove("a"));
        assert!(!document.contains_key("a"));
        assert_eq!(
            vec![("b".to_owned(), Bson::Boolean(true))],
            document.into_iter().collect::<Vec<_>>()
        );
    }
}
