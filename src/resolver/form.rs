use std::collections::BTreeMap;

use serde::Serialize;

/// Per-field errors collected while binding form fields into records.
///
/// Serializes as `{"field": ["message", ...]}`, the shape form posts
/// report back to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BindingErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl BindingErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: BindingErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// First field with its first message.
    pub fn first(&self) -> Option<(&str, &str)> {
        self.errors.iter().find_map(|(field, messages)| {
            messages.first().map(|m| (field.as_str(), m.as_str()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(f, m)| (f.as_str(), m.as_slice()))
    }
}
