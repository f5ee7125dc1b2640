//! Schema type definitions
//!
//! Schemas use the JSON Schema dialect resources are declared in:
//! - `type`: string, number, integer, boolean, object, array, null
//! - `format`: email, date-time, date, uuid, uri, ipv4, hostname
//! - `pattern`, `enum`, nested `properties`/`required`, array `items`
//! - `additionalProperties: false` rejects undeclared fields
//!
//! A top-level schema additionally carries the resource `name` and the
//! `pluralName` its store table is named after.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pattern every document `id` matches.
pub const UUID_PATTERN: &str =
    "^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$";

/// Timestamp field stamped once on create.
pub const CREATED_AT: &str = "createdAt";

/// Timestamp field re-stamped on every write.
pub const UPDATED_AT: &str = "updatedAt";

/// Primitive value types a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl PrimitiveType {
    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
            PrimitiveType::Null => "null",
        }
    }

    /// Checks whether a JSON value is of this type.
    ///
    /// Integers are accepted as numbers, and floats without a fractional
    /// part are accepted as integers.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PrimitiveType::String => value.is_string(),
            PrimitiveType::Number => value.is_number(),
            PrimitiveType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
                }
                _ => false,
            },
            PrimitiveType::Boolean => value.is_boolean(),
            PrimitiveType::Object => value.is_object(),
            PrimitiveType::Array => value.is_array(),
            PrimitiveType::Null => value.is_null(),
        }
    }
}

/// String formats a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Email,
    DateTime,
    Date,
    Uuid,
    Uri,
    Ipv4,
    Hostname,
}

impl Format {
    /// Returns the format name as written in schemas
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Email => "email",
            Format::DateTime => "date-time",
            Format::Date => "date",
            Format::Uuid => "uuid",
            Format::Uri => "uri",
            Format::Ipv4 => "ipv4",
            Format::Hostname => "hostname",
        }
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Declared value type; `None` accepts any type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<PrimitiveType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed set of allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Nested fields of an object value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Element definition of an array value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl FieldSpec {
    fn typed(field_type: PrimitiveType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    /// A string field
    pub fn string() -> Self {
        Self::typed(PrimitiveType::String)
    }

    /// A number field (integers accepted)
    pub fn number() -> Self {
        Self::typed(PrimitiveType::Number)
    }

    /// An integer field
    pub fn integer() -> Self {
        Self::typed(PrimitiveType::Integer)
    }

    /// A boolean field
    pub fn boolean() -> Self {
        Self::typed(PrimitiveType::Boolean)
    }

    /// An object field with nested field definitions
    pub fn object(properties: BTreeMap<String, FieldSpec>) -> Self {
        Self {
            properties,
            ..Self::typed(PrimitiveType::Object)
        }
    }

    /// An array field with a single element definition
    pub fn array(items: FieldSpec) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed(PrimitiveType::Array)
        }
    }

    /// A string field holding a document id
    pub fn uuid() -> Self {
        Self::string().with_pattern(UUID_PATTERN)
    }

    /// A string field holding an RFC 3339 timestamp
    pub fn timestamp() -> Self {
        Self::string().with_format(Format::DateTime)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_enum(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Marks nested fields of an object field as required
    pub fn requiring<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Rejects undeclared keys inside an object field
    pub fn closed(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }
}

/// Complete resource schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Resource name the schema is registered under
    pub name: String,
    /// Plural form; names the store table
    pub plural_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub required: Vec<String>,
    /// `Some(false)` rejects undeclared fields; `None` defers to the compiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl Schema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>, plural_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plural_name: plural_name.into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: None,
        }
    }

    /// Declares a field
    pub fn with_property(mut self, field: impl Into<String>, spec: FieldSpec) -> Self {
        self.properties.insert(field.into(), spec);
        self
    }

    /// Declares the `id` field with the UUID pattern
    pub fn with_id(self) -> Self {
        self.with_property("id", FieldSpec::uuid())
    }

    /// Declares `createdAt` and `updatedAt` timestamp fields
    pub fn with_timestamps(self) -> Self {
        self.with_property(CREATED_AT, FieldSpec::timestamp())
            .with_property(UPDATED_AT, FieldSpec::timestamp())
    }

    /// Marks fields as required
    pub fn requiring<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Rejects undeclared top-level fields
    pub fn closed(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    /// Name of the store table holding this resource
    pub fn table(&self) -> &str {
        &self.plural_name
    }

    /// Checks whether a top-level field is declared
    pub fn declares(&self, field: &str) -> bool {
        self.properties.contains_key(field)
    }

    pub fn declares_created_at(&self) -> bool {
        self.declares(CREATED_AT)
    }

    pub fn declares_updated_at(&self) -> bool {
        self.declares(UPDATED_AT)
    }

    /// Validates the schema structure itself (not a document)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("schema must have a name".into());
        }
        if self.plural_name.trim().is_empty() {
            return Err(format!("schema '{}' must have a pluralName", self.name));
        }
        check_required(&self.properties, &self.required, "")
    }
}

fn check_required(
    properties: &BTreeMap<String, FieldSpec>,
    required: &[String],
    prefix: &str,
) -> Result<(), String> {
    for field in required {
        if !properties.contains_key(field) {
            return Err(format!(
                "required field '{}{}' is not declared",
                prefix, field
            ));
        }
    }

    for (name, spec) in properties {
        let nested = format!("{}{}.", prefix, name);
        check_required(&spec.properties, &spec.required, &nested)?;
        if let Some(items) = &spec.items {
            check_required(&items.properties, &items.required, &nested)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_structure_valid() {
        let schema = Schema::new("thing", "things")
            .with_id()
            .with_property("email", FieldSpec::string().with_format(Format::Email))
            .requiring(["email"]);
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_required_field_must_be_declared() {
        let schema = Schema::new("thing", "things").requiring(["email"]);
        let err = schema.validate_structure().unwrap_err();
        assert!(err.contains("email"));
    }

    #[test]
    fn test_nested_required_must_be_declared() {
        let address = FieldSpec::object(BTreeMap::new()).requiring(["city"]);
        let schema = Schema::new("user", "users").with_property("address", address);
        let err = schema.validate_structure().unwrap_err();
        assert!(err.contains("address.city"));
    }

    #[test]
    fn test_plural_name_required() {
        let schema = Schema::new("thing", " ");
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_deserializes_json_schema_dialect() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "name": "thing",
            "pluralName": "things",
            "properties": {
                "id": { "type": "string", "pattern": UUID_PATTERN },
                "email": { "type": "string", "format": "email" },
                "createdAt": { "type": "string", "format": "date-time" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["email"],
            "additionalProperties": false
        }))
        .unwrap();

        assert_eq!(schema.table(), "things");
        assert_eq!(schema.additional_properties, Some(false));
        assert_eq!(schema.properties["email"].format, Some(Format::Email));
        assert_eq!(schema.properties["createdAt"].format, Some(Format::DateTime));
        assert!(schema.declares_created_at());
        assert!(!schema.declares_updated_at());
        assert_eq!(
            schema.properties["tags"].items.as_ref().unwrap().field_type,
            Some(PrimitiveType::String)
        );
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result: Result<FieldSpec, _> =
            serde_json::from_value(json!({ "type": "string", "format": "phone" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(PrimitiveType::Integer.matches(&json!(3)));
        assert!(PrimitiveType::Integer.matches(&json!(3.0)));
        assert!(!PrimitiveType::Integer.matches(&json!(3.5)));
        assert!(PrimitiveType::Number.matches(&json!(3)));
        assert!(!PrimitiveType::String.matches(&Value::Null));
    }
}
