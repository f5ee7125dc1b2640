//! Controller lookup by resource name

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::{ResourceController, StandardController};
use crate::config::Config;
use crate::document::{DocumentMutator, ResourceResult};
use crate::schema::{SchemaCompiler, SchemaError, SchemaRegistry, SchemaResult};
use crate::store::DocumentStore;

/// Every resource of an application with its controller
pub struct Resources {
    registry: Arc<SchemaRegistry>,
    controllers: BTreeMap<String, Arc<dyn ResourceController>>,
}

impl Resources {
    /// Creates a standard controller for every registered schema.
    pub fn standard(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn DocumentStore>,
        compiler: &SchemaCompiler,
    ) -> SchemaResult<Self> {
        let mut controllers: BTreeMap<String, Arc<dyn ResourceController>> = BTreeMap::new();

        for name in registry.names() {
            let schema = registry.get(name)?;
            let mutator = DocumentMutator::with_compiler(schema, Arc::clone(&store), compiler)?;
            controllers.insert(name.to_string(), Arc::new(StandardController::new(mutator)));
        }

        Ok(Self {
            registry,
            controllers,
        })
    }

    /// Loads the configured schema directory and creates standard
    /// controllers over `store`.
    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> SchemaResult<Self> {
        let mut registry = SchemaRegistry::new();
        registry.load_dir(&config.schema_dir)?;
        Self::standard(Arc::new(registry), store, &config.compiler())
    }

    /// Installs a custom controller for a registered resource.
    pub fn install(&mut self, name: &str, controller: Arc<dyn ResourceController>) -> SchemaResult<()> {
        if !self.registry.contains(name) {
            return Err(SchemaError::UnknownResource(name.to_string()));
        }
        self.controllers.insert(name.to_string(), controller);
        Ok(())
    }

    /// Controller of a resource
    pub fn controller(&self, name: &str) -> ResourceResult<Arc<dyn ResourceController>> {
        self.controllers
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownResource(name.to_string()).into())
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Every registered schema keyed by resource name
    pub fn schema_dump(&self) -> serde_json::Result<Value> {
        self.registry.to_json()
    }
}
