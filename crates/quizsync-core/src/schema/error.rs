//! Schema validation error types.

use std::fmt;

use thiserror::Error;

/// What is wrong with one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// Required field absent or null
    Missing,
    /// Value has the wrong JSON type
    WrongType {
        expected: String,
        found: &'static str,
    },
    /// String outside the enumerated set
    NotInSet { allowed: Vec<String>, found: String },
    /// Field not declared by a strict contract
    Unexpected,
    /// The record itself is not an object
    NotAnObject { found: &'static str },
    /// Passed the contract but did not decode into the typed shape
    Decode(String),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => f.write_str("missing required field"),
            Problem::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Problem::NotInSet { allowed, found } => {
                write!(f, "'{}' is not one of [{}]", found, allowed.join(", "))
            }
            Problem::Unexpected => f.write_str("field is not allowed"),
            Problem::NotAnObject { found } => write!(f, "expected an object, found {}", found),
            Problem::Decode(msg) => write!(f, "could not decode: {}", msg),
        }
    }
}

/// A single failing field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path, e.g. `difficulty` or `options[2]`; empty for the whole record
    pub field: String,
    pub problem: Problem,
}

impl FieldError {
    pub fn new(field: impl Into<String>, problem: Problem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.problem)
        } else {
            write!(f, "{}: {}", self.field, self.problem)
        }
    }
}

/// A record failed its contract
///
/// Lists every failing field, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub contract: String,
    /// Identity of the offending record, when it has one
    pub record_id: Option<String>,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Names of the failing fields
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// Whether a given field failed
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "record '{}' failed contract '{}': ", id, self.contract)?,
            None => write!(f, "record failed contract '{}': ", self.contract)?,
        }
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors from the schema registry
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Requested contract name was not registered
    #[error("Contract not found: {0}")]
    NotFound(String),

    /// Value did not pass its contract
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
