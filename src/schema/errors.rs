//! Schema error types
//!
//! Two families live here:
//! - `SchemaError`: registry and compilation failures (bad schema, unknown
//!   resource, duplicate registration)
//! - `ValidationError`: every violation a document has against its schema,
//!   aggregated into one comma-joined message

use std::fmt;

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Registry and compilation errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema registered under the name
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    /// A schema is already registered under the name
    #[error("resource '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Schema structure is invalid
    #[error("malformed schema '{name}': {reason}")]
    Malformed { name: String, reason: String },

    /// A `pattern` is not a valid regular expression
    #[error("invalid pattern for `{field}` in schema '{name}': {reason}")]
    InvalidPattern {
        name: String,
        field: String,
        reason: String,
    },

    /// Schema file could not be read
    #[error("failed to read schema file '{path}': {reason}")]
    Io { path: String, reason: String },
}

impl SchemaError {
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Why a field failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Required field is missing
    Required,
    /// Value has the wrong type; carries the expected type name
    TypeMismatch(&'static str),
    /// String does not satisfy the declared format
    FormatMismatch(&'static str),
    /// String does not match the declared pattern
    PatternMismatch(String),
    /// Value is not among the declared `enum` values
    EnumMismatch,
    /// Field is not declared and undeclared fields are rejected
    UnexpectedField,
    /// Write attempted to change the document id
    Immutable,
}

impl Reason {
    /// Short reason code
    pub fn code(&self) -> &'static str {
        match self {
            Reason::Required => "required",
            Reason::TypeMismatch(_) => "type-mismatch",
            Reason::FormatMismatch(_) => "format-mismatch",
            Reason::PatternMismatch(_) => "pattern-mismatch",
            Reason::EnumMismatch => "enum-mismatch",
            Reason::UnexpectedField => "unexpected-field",
            Reason::Immutable => "immutable",
        }
    }

    /// Human phrase following the quoted field path
    pub fn phrase(&self) -> String {
        match self {
            Reason::Required => "is required".into(),
            Reason::TypeMismatch(expected) => format!("must be {}", expected),
            Reason::FormatMismatch(format) => format!("must match format \"{}\"", format),
            Reason::PatternMismatch(pattern) => format!("must match pattern \"{}\"", pattern),
            Reason::EnumMismatch => "must be equal to one of the allowed values".into(),
            Reason::UnexpectedField => "is not an allowed property".into(),
            Reason::Immutable => "is immutable".into(),
        }
    }
}

/// A single field violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted field path (e.g. "address.city", "tags[1]")
    pub field_path: String,
    pub reason: Reason,
}

impl FieldViolation {
    pub fn new(field_path: impl Into<String>, reason: Reason) -> Self {
        Self {
            field_path: field_path.into(),
            reason,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.field_path, self.reason.phrase())
    }
}

/// All violations of one document, in detection order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// A single-violation error
    pub fn single(field_path: impl Into<String>, reason: Reason) -> Self {
        Self::new(vec![FieldViolation::new(field_path, reason)])
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Violations with the given reason code
    pub fn with_reason<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a FieldViolation> {
        self.violations.iter().filter(move |v| v.reason.code() == code)
    }

    /// The aggregated, comma-joined message
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrases() {
        assert_eq!(Reason::Required.phrase(), "is required");
        assert_eq!(Reason::TypeMismatch("string").phrase(), "must be string");
        assert_eq!(
            Reason::FormatMismatch("email").phrase(),
            "must match format \"email\""
        );
        assert_eq!(
            Reason::PatternMismatch("^a+$".into()).phrase(),
            "must match pattern \"^a+$\""
        );
        assert_eq!(
            Reason::UnexpectedField.phrase(),
            "is not an allowed property"
        );
    }

    #[test]
    fn test_messages_are_comma_joined() {
        let err = ValidationError::new(vec![
            FieldViolation::new("email", Reason::Required),
            FieldViolation::new("password", Reason::Required),
        ]);
        assert_eq!(err.to_string(), "`email` is required, `password` is required");
        assert_eq!(err.with_reason("required").count(), 2);
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::UnknownResource("ghost".into());
        assert_eq!(err.to_string(), "unknown resource 'ghost'");
    }
}
