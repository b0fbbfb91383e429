//! Field-level validation errors shared by the HTML forms.

use serde::{Deserialize, Serialize};

/// A validation message attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Form field name; empty for errors about the form as a whole.
    pub field: String,
    pub message: String,
}

/// Validation errors collected while checking a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Record an error for the form as a whole.
    pub fn add_form(&mut self, message: impl Into<String>) {
        self.add("", message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a field has at least one error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// First error message for a field.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Errors not tied to a field.
    pub fn form_errors(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(|e| e.field.is_empty())
            .map(|e| e.message.as_str())
    }

    /// All errors in the order they were recorded.
    #[must_use]
    pub fn all(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(value)` if nothing was recorded, otherwise the errors.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            if error.field.is_empty() {
                f.write_str(&error.message)?;
            } else {
                write!(f, "{}: {}", error.field, error.message)?;
            }
        }
        Ok(())
    }
}

/// Trim a text input and treat blank as absent.
#[must_use]
pub fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
