//! Validation engine
//!
//! Walks a document against a compiled schema tree and reports every raw
//! violation as `{path, keyword}`. It never stops at the first failure and
//! never formats messages; `SchemaCompiler` owns the human wording.
//!
//! For `required` and `additionalProperties` the reported path is the
//! enclosing object and the keyword carries the offending property name.
//! For every other keyword the path is the offending value itself.

use regex::Regex;
use serde_json::{Map, Value};

use super::formats;
use super::types::{Format, PrimitiveType};

/// Keyword that produced a violation, with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    Required { missing_property: String },
    Type { expected: PrimitiveType },
    Format { format: Format },
    Pattern { pattern: String },
    Enum,
    AdditionalProperties { additional_property: String },
}

/// A raw violation
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted path; empty for the document root
    pub path: String,
    pub keyword: Keyword,
}

/// Compiled object constraints
#[derive(Debug)]
pub struct CompiledObject {
    pub properties: Vec<(String, CompiledField)>,
    pub required: Vec<String>,
    pub reject_additional: bool,
    /// The document root always admits `id`
    pub admits_id: bool,
}

/// Compiled constraints of a single value
#[derive(Debug)]
pub struct CompiledField {
    pub field_type: Option<PrimitiveType>,
    pub format: Option<Format>,
    pub pattern: Option<(String, Regex)>,
    pub allowed: Option<Vec<Value>>,
    pub object: Option<CompiledObject>,
    pub items: Option<Box<CompiledField>>,
}

/// Checks a whole document.
pub fn check_document(root: &CompiledObject, document: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();

    match document.as_object() {
        Some(obj) => check_object(root, obj, "", &mut violations),
        None => violations.push(Violation {
            path: String::new(),
            keyword: Keyword::Type {
                expected: PrimitiveType::Object,
            },
        }),
    }

    violations
}

fn check_object(
    spec: &CompiledObject,
    obj: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    for field in &spec.required {
        if !obj.contains_key(field) {
            out.push(Violation {
                path: path.to_string(),
                keyword: Keyword::Required {
                    missing_property: field.clone(),
                },
            });
        }
    }

    for (name, field) in &spec.properties {
        if let Some(value) = obj.get(name) {
            check_value(field, value, &make_path(path, name), out);
        }
    }

    if spec.reject_additional {
        for key in obj.keys() {
            if spec.admits_id && key == "id" {
                continue;
            }
            if !spec.properties.iter().any(|(name, _)| name == key) {
                out.push(Violation {
                    path: path.to_string(),
                    keyword: Keyword::AdditionalProperties {
                        additional_property: key.clone(),
                    },
                });
            }
        }
    }
}

fn check_value(field: &CompiledField, value: &Value, path: &str, out: &mut Vec<Violation>) {
    let mut type_matches = true;
    if let Some(expected) = field.field_type {
        if !expected.matches(value) {
            out.push(Violation {
                path: path.to_string(),
                keyword: Keyword::Type { expected },
            });
            type_matches = false;
        }
    }

    if let Some(allowed) = &field.allowed {
        if !allowed.contains(value) {
            out.push(Violation {
                path: path.to_string(),
                keyword: Keyword::Enum,
            });
        }
    }

    if !type_matches {
        return;
    }

    match value {
        Value::String(s) => {
            if let Some(format) = field.format {
                if !formats::conforms(format, s) {
                    out.push(Violation {
                        path: path.to_string(),
                        keyword: Keyword::Format { format },
                    });
                }
            }
            if let Some((source, regex)) = &field.pattern {
                if !regex.is_match(s) {
                    out.push(Violation {
                        path: path.to_string(),
                        keyword: Keyword::Pattern {
                            pattern: source.clone(),
                        },
                    });
                }
            }
        }
        Value::Object(obj) => {
            if let Some(nested) = &field.object {
                check_object(nested, obj, path, out);
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &field.items {
                for (i, element) in elements.iter().enumerate() {
                    check_value(items, element, &format!("{}[{}]", path, i), out);
                }
            }
        }
        _ => {}
    }
}

/// Creates a field path from prefix and field name.
pub fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
