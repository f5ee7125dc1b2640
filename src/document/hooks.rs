//! Lifecycle hooks
//!
//! Hooks run in three named stages around every write:
//!
//! ```text
//! pre_validate -> validate -> pre_save -> write -> post_save
//! ```
//!
//! Within a stage hooks run strictly in registration order and the first
//! failure aborts the rest of the pipeline. Only `pre_validate` hooks may
//! change the candidate fields; later stages observe the document that was
//! validated and is persisted.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::Document;

/// Error type hooks report
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a hook
pub type HookFuture<'a> = BoxFuture<'a, Result<(), BoxError>>;

type PreValidateFn = Arc<dyn for<'a> Fn(&'a mut Map<String, Value>) -> HookFuture<'a> + Send + Sync>;
type ObserveFn = Arc<dyn for<'a> Fn(&'a Document) -> HookFuture<'a> + Send + Sync>;

/// Hook stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreValidate,
    PreSave,
    PostSave,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::PreValidate => "pre_validate",
            HookStage::PreSave => "pre_save",
            HookStage::PostSave => "post_save",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook failed
#[derive(Debug, Error)]
#[error("{stage} hook '{hook}' failed: {message}")]
pub struct HookError {
    pub stage: HookStage,
    pub hook: String,
    pub message: String,
}

/// Registered hooks of one resource
#[derive(Clone, Default)]
pub struct Hooks {
    pre_validate: Vec<(String, PreValidateFn)>,
    pre_save: Vec<(String, ObserveFn)>,
    post_save: Vec<(String, ObserveFn)>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_validate", &names(&self.pre_validate))
            .field("pre_save", &names(&self.pre_save))
            .field("post_save", &names(&self.post_save))
            .finish()
    }
}

fn names<T>(hooks: &[(String, T)]) -> Vec<&str> {
    hooks.iter().map(|(name, _)| name.as_str()).collect()
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook that may modify the candidate fields before validation.
    pub fn pre_validate<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Map<String, Value>) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.pre_validate.push((name.into(), Arc::new(hook)));
        self
    }

    /// Registers a hook that runs after validation, before the write.
    pub fn pre_save<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a Document) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.pre_save.push((name.into(), Arc::new(hook)));
        self
    }

    /// Registers a hook that runs after the write committed.
    pub fn post_save<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a Document) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.post_save.push((name.into(), Arc::new(hook)));
        self
    }

    /// Number of hooks registered for a stage
    pub fn count(&self, stage: HookStage) -> usize {
        match stage {
            HookStage::PreValidate => self.pre_validate.len(),
            HookStage::PreSave => self.pre_save.len(),
            HookStage::PostSave => self.post_save.len(),
        }
    }

    pub(crate) async fn run_pre_validate(&self, fields: &mut Map<String, Value>) -> Result<(), HookError> {
        for (name, hook) in &self.pre_validate {
            hook(&mut *fields)
                .await
                .map_err(|e| failure(HookStage::PreValidate, name, e))?;
        }
        Ok(())
    }

    pub(crate) async fn run_observers(&self, stage: HookStage, doc: &Document) -> Result<(), HookError> {
        let hooks = match stage {
            HookStage::PreValidate => return Ok(()),
            HookStage::PreSave => &self.pre_save,
            HookStage::PostSave => &self.post_save,
        };

        for (name, hook) in hooks {
            hook(doc).await.map_err(|e| failure(stage, name, e))?;
        }
        Ok(())
    }
}

fn failure(stage: HookStage, hook: &str, error: BoxError) -> HookError {
    HookError {
        stage,
        hook: hook.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();

        for n in 1..=2 {
            let log = Arc::clone(&log);
            hooks.pre_validate(format!("h{}", n), move |fields| {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    fields.insert(format!("seen{}", n), json!(true));
                    log.lock().unwrap().push(n);
                    Ok(())
                })
            });
        }

        let mut fields = Map::new();
        hooks.run_pre_validate(&mut fields).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_stage() {
        let calls = Arc::new(Mutex::new(0));
        let mut hooks = Hooks::new();
        hooks.pre_save("deny", |_| Box::pin(async { Err::<(), BoxError>("nope".into()) }));
        {
            let calls = Arc::clone(&calls);
            hooks.pre_save("count", move |_| {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    *calls.lock().unwrap() += 1;
                    Ok(())
                })
            });
        }

        let doc = Document::new(Uuid::new_v4(), Map::new());
        let err = hooks.run_observers(HookStage::PreSave, &doc).await.unwrap_err();

        assert_eq!(err.stage, HookStage::PreSave);
        assert_eq!(err.hook, "deny");
        assert_eq!(err.to_string(), "pre_save hook 'deny' failed: nope");
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(hooks.count(HookStage::PreSave), 2);
    }
}
