//! Schema compilation and validation error formatting
//!
//! `SchemaCompiler::compile` turns a `Schema` into a `Validator` once:
//! patterns are compiled up front, so validating a document never fails on
//! the schema itself. Raw engine violations are formatted into the field
//! violation vocabulary:
//!
//! - missing required field -> `` `f` is required ``
//! - undeclared field -> `` `f` is not an allowed property ``
//! - type / format / pattern -> `` `f` must ... ``

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use super::engine::{self, CompiledField, CompiledObject, Keyword, Violation};
use super::errors::{FieldViolation, Reason, SchemaError, SchemaResult, ValidationError};
use super::types::{FieldSpec, Schema};

/// Path shown for violations on the document itself
const ROOT_PATH: &str = "$root";

/// Compiles schemas into validators.
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    /// Applied to objects whose schema leaves `additionalProperties` unset
    reject_additional: bool,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether undeclared fields are rejected when a schema does not say.
    pub fn reject_additional_by_default(mut self, reject: bool) -> Self {
        self.reject_additional = reject;
        self
    }

    /// Compiles a schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the schema structure is invalid or a
    /// `pattern` is not a valid regular expression.
    pub fn compile(&self, schema: &Schema) -> SchemaResult<Validator> {
        schema
            .validate_structure()
            .map_err(|reason| SchemaError::malformed(&schema.name, reason))?;

        let root = self.compile_object(
            &schema.name,
            &schema.properties,
            &schema.required,
            schema.additional_properties,
            "",
            true,
        )?;

        Ok(Validator {
            resource: schema.name.clone(),
            root,
        })
    }

    fn compile_object(
        &self,
        name: &str,
        properties: &BTreeMap<String, FieldSpec>,
        required: &[String],
        additional: Option<bool>,
        path: &str,
        is_root: bool,
    ) -> SchemaResult<CompiledObject> {
        let mut compiled = Vec::with_capacity(properties.len());
        for (field, spec) in properties {
            let field_path = engine::make_path(path, field);
            compiled.push((field.clone(), self.compile_field(name, spec, &field_path)?));
        }

        Ok(CompiledObject {
            properties: compiled,
            required: required.to_vec(),
            reject_additional: additional.map_or(self.reject_additional, |allowed| !allowed),
            admits_id: is_root,
        })
    }

    fn compile_field(&self, name: &str, spec: &FieldSpec, path: &str) -> SchemaResult<CompiledField> {
        let pattern = match &spec.pattern {
            Some(source) => {
                let regex = Regex::new(source).map_err(|e| SchemaError::InvalidPattern {
                    name: name.to_string(),
                    field: path.to_string(),
                    reason: e.to_string(),
                })?;
                Some((source.clone(), regex))
            }
            None => None,
        };

        let object = if spec.properties.is_empty() && spec.required.is_empty() {
            match spec.additional_properties {
                Some(false) => Some(self.compile_object(
                    name,
                    &spec.properties,
                    &spec.required,
                    spec.additional_properties,
                    path,
                    false,
                )?),
                _ => None,
            }
        } else {
            Some(self.compile_object(
                name,
                &spec.properties,
                &spec.required,
                spec.additional_properties,
                path,
                false,
            )?)
        };

        let items = match &spec.items {
            Some(items) => Some(Box::new(self.compile_field(name, items, path)?)),
            None => None,
        };

        Ok(CompiledField {
            field_type: spec.field_type,
            format: spec.format,
            pattern,
            allowed: spec.allowed.clone(),
            object,
            items,
        })
    }
}

/// A compiled schema, ready to validate documents.
///
/// Validation is a pure function of the schema and the document.
#[derive(Debug)]
pub struct Validator {
    resource: String,
    root: CompiledObject,
}

impl Validator {
    /// Name of the resource this validator was compiled for
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Validates a document, collecting every violation.
    pub fn validate(&self, document: &Value) -> Result<(), ValidationError> {
        let violations = engine::check_document(&self.root, document);
        if violations.is_empty() {
            return Ok(());
        }

        Err(ValidationError::new(
            violations.into_iter().map(humanize).collect(),
        ))
    }
}

/// Formats a raw engine violation.
fn humanize(violation: Violation) -> FieldViolation {
    let Violation { path, keyword } = violation;

    match keyword {
        Keyword::Required { missing_property } => {
            FieldViolation::new(engine::make_path(&path, &missing_property), Reason::Required)
        }
        Keyword::AdditionalProperties {
            additional_property,
        } => FieldViolation::new(
            engine::make_path(&path, &additional_property),
            Reason::UnexpectedField,
        ),
        Keyword::Type { expected } => {
            FieldViolation::new(display_path(path), Reason::TypeMismatch(expected.type_name()))
        }
        Keyword::Format { format } => {
            FieldViolation::new(display_path(path), Reason::FormatMismatch(format.as_str()))
        }
        Keyword::Pattern { pattern } => {
            FieldViolation::new(display_path(path), Reason::PatternMismatch(pattern))
        }
        Keyword::Enum => FieldViolation::new(display_path(path), Reason::EnumMismatch),
    }
}

fn display_path(path: String) -> String {
    if path.is_empty() {
        ROOT_PATH.to_string()
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Format, UUID_PATTERN};
    use serde_json::json;

    fn thing_schema() -> Schema {
        Schema::new("thing", "things")
            .with_id()
            .with_property("email", FieldSpec::string().with_format(Format::Email))
            .with_property("password", FieldSpec::string())
            .requiring(["email", "password"])
    }

    #[test]
    fn test_valid_document_passes() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let doc = json!({ "email": "nikolay@example.com", "password": "secret" });
        assert!(validator.validate(&doc).is_ok());
    }

    #[test]
    fn test_all_required_fields_reported() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let err = validator.validate(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "`email` is required, `password` is required");
    }

    #[test]
    fn test_format_mismatch() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let err = validator
            .validate(&json!({ "email": "blah!", "password": "blah!" }))
            .unwrap_err();
        assert_eq!(err.to_string(), "`email` must match format \"email\"");
    }

    #[test]
    fn test_pattern_mismatch() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let err = validator
            .validate(&json!({ "id": "hack!", "email": "a@b.co", "password": "x" }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("`id` must match pattern \"{}\"", UUID_PATTERN)
        );
    }

    #[test]
    fn test_null_is_a_type_mismatch() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let err = validator
            .validate(&json!({ "email": "a@b.co", "password": null }))
            .unwrap_err();
        assert_eq!(err.to_string(), "`password` must be string");
    }

    #[test]
    fn test_undeclared_fields_allowed_unless_closed() {
        let open = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let doc = json!({ "email": "a@b.co", "password": "x", "nickname": "n" });
        assert!(open.validate(&doc).is_ok());

        let closed = SchemaCompiler::new()
            .compile(&thing_schema().closed())
            .unwrap();
        let err = closed.validate(&doc).unwrap_err();
        assert_eq!(err.to_string(), "`nickname` is not an allowed property");
    }

    #[test]
    fn test_compiler_default_applies_to_unset_schemas() {
        let validator = SchemaCompiler::new()
            .reject_additional_by_default(true)
            .compile(&thing_schema())
            .unwrap();
        let err = validator
            .validate(&json!({ "id": "1f0c5a7e-9b7d-4a53-8f0e-3c2b1a0d9e8f", "email": "a@b.co", "password": "x", "x": 1 }))
            .unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field_path, "x");
    }

    #[test]
    fn test_nested_paths() {
        let address = FieldSpec::object(BTreeMap::from([
            ("city".to_string(), FieldSpec::string()),
            ("zip".to_string(), FieldSpec::string().with_pattern("^[0-9]{5}$")),
        ]))
        .requiring(["city"]);
        let schema = Schema::new("user", "users")
            .with_property("address", address)
            .with_property("tags", FieldSpec::array(FieldSpec::string()));
        let validator = SchemaCompiler::new().compile(&schema).unwrap();

        let err = validator
            .validate(&json!({ "address": { "zip": "abc" }, "tags": ["a", 2] }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "`address.city` is required, `address.zip` must match pattern \"^[0-9]{5}$\", `tags[1]` must be string"
        );
    }

    #[test]
    fn test_enum() {
        let schema = Schema::new("post", "posts").with_property(
            "status",
            FieldSpec::string().with_enum(vec![json!("draft"), json!("published")]),
        );
        let validator = SchemaCompiler::new().compile(&schema).unwrap();
        assert!(validator.validate(&json!({ "status": "draft" })).is_ok());
        let err = validator.validate(&json!({ "status": "gone" })).unwrap_err();
        assert_eq!(err.violations()[0].reason, Reason::EnumMismatch);
    }

    #[test]
    fn test_root_must_be_object() {
        let validator = SchemaCompiler::new().compile(&thing_schema()).unwrap();
        let err = validator.validate(&json!("nope")).unwrap_err();
        assert_eq!(err.to_string(), "`$root` must be object");
    }

    #[test]
    fn test_invalid_pattern_fails_compilation() {
        let schema = Schema::new("bad", "bads")
            .with_property("code", FieldSpec::string().with_pattern("(unclosed"));
        let err = SchemaCompiler::new().compile(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { ref field, .. } if field == "code"));
    }
}
