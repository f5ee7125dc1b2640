//! Document mutator
//!
//! All writes of one resource go through a `DocumentMutator`:
//!
//! - `create`: new id, fresh timestamps, full pipeline, insert
//! - `update`: fetch, merge patch, replace pipeline
//! - `replace`: fetch, keep protected fields, install new fields, replace
//! - `delete`: fetch, remove, no validation
//!
//! `update`, `replace` and `delete` report `NotFound` before anything else.
//! The document is validated on every write and never persisted when
//! validation fails.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{ResourceError, ResourceResult};
use super::hooks::{HookStage, Hooks};
use super::model::{format_timestamp, Clock, Document, SystemClock};
use super::patch::{MergePatch, PatchValue};
use crate::query::{Query, QueryBuilder, RequestParams};
use crate::schema::{
    FieldViolation, Reason, Schema, SchemaCompiler, SchemaResult, ValidationError, Validator,
    CREATED_AT, UPDATED_AT, UUID_PATTERN,
};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Insert,
    Replace,
}

/// Reads and writes the documents of one resource.
pub struct DocumentMutator {
    schema: Arc<Schema>,
    validator: Validator,
    store: Arc<dyn DocumentStore>,
    hooks: Hooks,
    clock: Arc<dyn Clock>,
}

impl DocumentMutator {
    /// Creates a mutator, compiling the schema with default settings.
    pub fn new(schema: Arc<Schema>, store: Arc<dyn DocumentStore>) -> SchemaResult<Self> {
        Self::with_compiler(schema, store, &SchemaCompiler::new())
    }

    /// Creates a mutator, compiling the schema with the given compiler.
    pub fn with_compiler(
        schema: Arc<Schema>,
        store: Arc<dyn DocumentStore>,
        compiler: &SchemaCompiler,
    ) -> SchemaResult<Self> {
        let validator = compiler.compile(&schema)?;
        Ok(Self {
            schema,
            validator,
            store,
            hooks: Hooks::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Builds the query for request parameters.
    pub fn query(&self, params: &RequestParams) -> Query {
        QueryBuilder::build(&self.schema, params)
    }

    /// Documents matching the request parameters
    pub async fn all(&self, params: &RequestParams) -> ResourceResult<Vec<Document>> {
        Ok(self.store.execute(&self.query(params)).await?)
    }

    /// Fetches one document. Ids that are not UUIDs are never found.
    pub async fn find(&self, id: &str) -> ResourceResult<Document> {
        let uuid = parse_id(id).ok_or_else(|| self.not_found(id))?;
        self.store
            .get(self.schema.table(), uuid)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// Creates a document. A caller-supplied `id` is discarded.
    pub async fn create(&self, data: Value) -> ResourceResult<Document> {
        let mut fields = into_fields(data)?;
        fields.remove("id");

        let now = self.now();
        self.stamp(&mut fields, &now, None);

        let doc = Document::new(Uuid::new_v4(), fields);
        self.persist(doc, Vec::new(), WriteMode::Insert).await
    }

    /// Applies a merge patch to a stored document.
    pub async fn update(&self, id: &str, mut patch: MergePatch) -> ResourceResult<Document> {
        let stored = self.find(id).await?;

        let id_violation = match patch.take("id") {
            Some(PatchValue::Set(value)) => check_id(&stored, &value),
            Some(_) => Some(FieldViolation::new("id", Reason::Immutable)),
            None => None,
        };

        let mut fields = stored.fields.clone();
        patch.apply(&mut fields);

        self.rewrite(stored, fields, id_violation).await
    }

    /// Replaces every non-protected field of a stored document.
    pub async fn replace(&self, id: &str, data: Value) -> ResourceResult<Document> {
        let stored = self.find(id).await?;

        let mut fields = into_fields(data)?;
        let id_violation = fields.remove("id").and_then(|value| check_id(&stored, &value));
        keep_timestamps(&stored, &mut fields);

        self.rewrite(stored, fields, id_violation).await
    }

    /// Removes a document, returning its last stored value.
    pub async fn delete(&self, id: &str) -> ResourceResult<Document> {
        let stored = self.find(id).await?;
        let removed = self
            .store
            .delete(self.schema.table(), stored.id)
            .await?
            .unwrap_or(stored);

        info!(resource = %self.schema.name, id = %removed.id, "document deleted");
        Ok(removed)
    }

    async fn rewrite(
        &self,
        stored: Document,
        mut fields: Map<String, Value>,
        id_violation: Option<FieldViolation>,
    ) -> ResourceResult<Document> {
        let now = self.now();
        self.stamp(&mut fields, &now, stored.fields.get(CREATED_AT));

        let doc = Document::new(stored.id, fields);
        self.persist(doc, id_violation.into_iter().collect(), WriteMode::Replace)
            .await
    }

    async fn persist(
        &self,
        mut doc: Document,
        mut violations: Vec<FieldViolation>,
        mode: WriteMode,
    ) -> ResourceResult<Document> {
        self.hooks.run_pre_validate(&mut doc.fields).await?;
        doc.fields.remove("id");

        if let Err(e) = self.validator.validate(&doc.to_value()) {
            violations.extend(e.violations().iter().cloned());
        }
        if !violations.is_empty() {
            let err = ValidationError::new(violations);
            debug!(resource = %self.schema.name, id = %doc.id, error = %err, "document rejected");
            return Err(err.into());
        }

        self.hooks.run_observers(HookStage::PreSave, &doc).await?;

        let table = self.schema.table();
        match mode {
            WriteMode::Insert => self.store.insert(table, doc.clone()).await?,
            WriteMode::Replace => {
                self.store
                    .replace(table, doc.clone())
                    .await
                    .map_err(|e| match e {
                        StoreError::Missing { id, .. } => self.not_found(&id.to_string()),
                        other => other.into(),
                    })?
            }
        }
        info!(resource = %self.schema.name, id = %doc.id, mode = ?mode, "document written");

        self.hooks.run_observers(HookStage::PostSave, &doc).await?;
        Ok(doc)
    }

    /// Sets the declared timestamp fields.
    fn stamp(&self, fields: &mut Map<String, Value>, now: &str, created: Option<&Value>) {
        if self.schema.declares_created_at() {
            let created = created.cloned().unwrap_or_else(|| Value::String(now.to_string()));
            fields.insert(CREATED_AT.to_string(), created);
        }
        if self.schema.declares_updated_at() {
            fields.insert(UPDATED_AT.to_string(), Value::String(now.to_string()));
        }
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    fn not_found(&self, id: &str) -> ResourceError {
        ResourceError::not_found(&self.schema.name, id)
    }
}

/// Parses a hyphenated UUID string.
fn parse_id(id: &str) -> Option<Uuid> {
    if id.len() != 36 {
        return None;
    }
    Uuid::parse_str(id).ok()
}

/// Checks an `id` supplied with a write against the stored id.
fn check_id(stored: &Document, value: &Value) -> Option<FieldViolation> {
    match value {
        Value::String(s) => match parse_id(s) {
            Some(id) if id == stored.id => None,
            Some(_) => Some(FieldViolation::new("id", Reason::Immutable)),
            None => Some(FieldViolation::new(
                "id",
                Reason::PatternMismatch(UUID_PATTERN.to_string()),
            )),
        },
        _ => Some(FieldViolation::new("id", Reason::TypeMismatch("string"))),
    }
}

/// Carries stored timestamps over, declared or not.
fn keep_timestamps(stored: &Document, fields: &mut Map<String, Value>) {
    for key in [CREATED_AT, UPDATED_AT] {
        match stored.fields.get(key) {
            Some(value) => {
                fields.insert(key.to_string(), value.clone());
            }
            None => {
                fields.remove(key);
            }
        }
    }
}

fn into_fields(data: Value) -> ResourceResult<Map<String, Value>> {
    match data {
        Value::Object(fields) => Ok(fields),
        _ => Err(ValidationError::single("$root", Reason::TypeMismatch("object")).into()),
    }
}
