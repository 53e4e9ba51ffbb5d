//! Query parameter building for list and export endpoints.

use url::form_urlencoded;

/// Ordered multimap of query parameters.
///
/// Absent and empty values are dropped on insert, so filter structs can push
/// every field unconditionally. Array filters repeat the parameter name once
/// per value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
  pairs: Vec<(String, String)>,
}

impl QueryParams {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a parameter, skipping empty values.
  pub fn push(&mut self, name: &str, value: impl ToString) {
    let value = value.to_string();
    if value.is_empty() {
      return;
    }
    self.pairs.push((name.to_string(), value));
  }

  /// Append a parameter if present.
  pub fn push_opt<T: ToString>(&mut self, name: &str, value: Option<T>) {
    if let Some(value) = value {
      self.push(name, value);
    }
  }

  /// Append one parameter per value, all under the same name.
  pub fn push_all<I, T>(&mut self, name: &str, values: I)
  where
    I: IntoIterator<Item = T>,
    T: ToString,
  {
    for value in values {
      self.push(name, value);
    }
  }

  /// Builder-style variant of [`QueryParams::push`].
  pub fn with(mut self, name: &str, value: impl ToString) -> Self {
    self.push(name, value);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.pairs.is_empty()
  }

  pub fn len(&self) -> usize {
    self.pairs.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// URL-encoded form with pairs sorted by name, then value.
  ///
  /// Two parameter sets holding the same pairs in any insertion order encode
  /// identically.
  pub fn normalized(&self) -> String {
    let mut sorted: Vec<&(String, String)> = self.pairs.iter().collect();
    sorted.sort();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in sorted {
      serializer.append_pair(name, value);
    }
    serializer.finish()
  }
}
