//! Input Validation Module
//!
//! Field-level validation errors shared by reminder input and classifier payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Field '{field}' is not a valid HH:MM time: {value}")]
    InvalidTime { field: String, value: String },

    #[error("Field '{field}' contains a day index out of range 0-6: {day}")]
    DayOutOfRange { field: String, day: i64 },

    #[error("Field '{field}' must be a finite number")]
    NotFinite { field: String },

    #[error("Field '{field}' must not be negative, got {value}")]
    Negative { field: String, value: f64 },

    #[error("Field '{field}' is outside [{min}, {max}]: {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Field '{field}' repeats label '{label}' in a different case")]
    DuplicateLabel { field: String, label: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field } => field.as_str(),
            Self::InvalidTime { field, .. } => field.as_str(),
            Self::DayOutOfRange { field, .. } => field.as_str(),
            Self::NotFinite { field } => field.as_str(),
            Self::Negative { field, .. } => field.as_str(),
            Self::OutOfRange { field, .. } => field.as_str(),
            Self::DuplicateLabel { field, .. } => field.as_str(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }
}

/// Validation result type
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Check that a text field carries something other than whitespace
pub fn require_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

/// Collects violations so every offending field is reported at once
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<ValidationError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check<T>(&mut self, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn the collected violations into an `InvalidInput` error, if any
    pub fn finish(self) -> crate::error::Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(crate::error::AppError::InvalidInput(self.errors))
        }
    }
}
