//! Schema registry
//!
//! Holds one schema per resource. Schemas enter through `register` (or
//! `load_dir`, which registers every `*.json` file of a directory) at
//! startup; afterwards the registry is shared read-only, usually behind an
//! `Arc`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::compiler::SchemaCompiler;
use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;

/// Registered schemas indexed by resource name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema.
    ///
    /// The schema must be structurally valid and every `pattern` must
    /// compile. A name can only be registered once.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<Arc<Schema>> {
        if self.schemas.contains_key(&schema.name) {
            return Err(SchemaError::AlreadyRegistered(schema.name));
        }

        SchemaCompiler::new().compile(&schema)?;

        debug!(
            resource = %schema.name,
            table = %schema.plural_name,
            fields = schema.properties.len(),
            "schema registered"
        );

        let schema = Arc::new(schema);
        self.schemas.insert(schema.name.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Loads every `*.json` file of a directory as a schema.
    ///
    /// Files are registered in file name order. Returns the number of
    /// schemas loaded.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        let entries = fs::read_dir(dir).map_err(|e| SchemaError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::Io {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        info!(dir = %dir.display(), count = paths.len(), "schemas loaded");
        Ok(paths.len())
    }

    /// Loads and registers a single schema file.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<Arc<Schema>> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let schema: Schema = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("invalid JSON: {}", e))
        })?;

        self.register(schema)
    }

    /// Looks up a schema by resource name.
    pub fn get(&self, name: &str) -> SchemaResult<Arc<Schema>> {
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownResource(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered resource names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Dumps every schema as one JSON object keyed by resource name.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut dump = Map::new();
        for (name, schema) in &self.schemas {
            dump.insert(name.clone(), serde_json::to_value(schema.as_ref())?);
        }
        Ok(Value::Object(dump))
    }
}
