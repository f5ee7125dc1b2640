//! Schema subsystem
//!
//! Every resource is described by a schema: its fields, which of them are
//! required, their formats and patterns. Documents are validated against
//! their schema on every write.
//!
//! # Design Principles
//!
//! - One schema per resource, registered once at startup
//! - Schemas are compiled once; validation is pure
//! - All violations are reported together, never just the first
//! - Messages are human-readable and quote the offending field path

mod compiler;
mod engine;
mod errors;
mod formats;
mod registry;
mod types;

pub use compiler::{SchemaCompiler, Validator};
pub use errors::{FieldViolation, Reason, SchemaError, SchemaResult, ValidationError};
pub use registry::SchemaRegistry;
pub use types::{FieldSpec, Format, PrimitiveType, Schema, CREATED_AT, UPDATED_AT, UUID_PATTERN};
