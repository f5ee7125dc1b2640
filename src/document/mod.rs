//! Document subsystem
//!
//! Documents are flat JSON objects with a UUID `id`. Writes go through the
//! `DocumentMutator`, which stamps timestamps, runs lifecycle hooks and
//! validates every candidate against the resource schema before it reaches
//! the store.

mod errors;
mod hooks;
mod model;
mod mutator;
mod patch;

pub use errors::{ResourceError, ResourceResult};
pub use hooks::{BoxError, HookError, HookFuture, HookStage, Hooks};
pub use model::{format_timestamp, Clock, Document, DocumentFormatError, FixedClock, SystemClock};
pub use mutator::DocumentMutator;
pub use patch::{MergePatch, PatchValue};
