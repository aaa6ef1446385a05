//! Declarative input forms
//!
//! Adapters describe the configuration or search parameters they need as a
//! [`Form`]. A front end renders it and returns the answers as a [`Dynamic`]
//! keyed by [`FormField::key`].

use hoard_common::Dynamic;
use serde::{Deserialize, Serialize};

/// Input widget kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Password,
    Number,
    Bool,
    /// Read-only text, e.g. an authorization URL to visit
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FormField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub title: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Keys of the fields that accept input
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.kind != FieldKind::Label)
            .map(|f| f.key.as_str())
    }

    /// The form reduced to required fields that `values` does not answer
    ///
    /// Labels are kept so the reduced form still reads the same way.
    pub fn missing(&self, values: &Dynamic) -> Form {
        Form {
            title: self.title.clone(),
            fields: self
                .fields
                .iter()
                .filter(|f| f.kind == FieldKind::Label || (f.required && !values.contains(&f.key)))
                .cloned()
                .collect(),
        }
    }

    /// Whether every required field is answered by `values`
    pub fn is_satisfied_by(&self, values: &Dynamic) -> bool {
        self.fields
            .iter()
            .filter(|f| f.required && f.kind != FieldKind::Label)
            .all(|f| values.contains(&f.key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn login_form() -> Form {
        Form::new("Login")
            .field(FormField::new("help", "Paste the token from the settings page", FieldKind::Label))
            .field(FormField::new("access_token", "Access token", FieldKind::Password).required())
            .field(FormField::new("refresh_token", "Refresh token", FieldKind::Password).required())
            .field(FormField::new("page_size", "Page size", FieldKind::Number))
    }

    #[test]
    fn test_missing_keeps_unanswered_required_fields() {
        let mut values = Dynamic::new();
        values.set("access_token", "abc").unwrap();

        let missing = login_form().missing(&values);
        let keys: Vec<_> = missing.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["help", "refresh_token"]);
        assert_eq!(missing.title, "Login");
    }

    #[test]
    fn test_satisfied_ignores_optional_and_labels() {
        let mut values = Dynamic::new();
        values.set("access_token", "abc").unwrap();
        values.set("refresh_token", "def").unwrap();

        assert!(login_form().is_satisfied_by(&values));
        assert!(!login_form().is_satisfied_by(&Dynamic::new()));
    }

    #[test]
    fn test_keys_skip_labels() {
        let keys: Vec<_> = login_form().keys().map(str::to_string).collect();
        assert_eq!(keys, vec!["access_token", "refresh_token", "page_size"]);
    }

    #[test]
    fn test_null_answer_counts_as_missing() {
        let values = Dynamic::from_json(r#"{"access_token": null, "refresh_token": "x"}"#).unwrap();
        assert!(!login_form().is_satisfied_by(&values));
    }
}
