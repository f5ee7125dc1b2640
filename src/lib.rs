//! resourcekit - schema-driven document resources
//!
//! Schemas describe resource types. From a schema the crate derives
//! validation, store queries built from request parameters, validated
//! writes with lifecycle hooks, and live change feeds.

pub mod cli;
pub mod config;
pub mod controller;
pub mod document;
pub mod feed;
pub mod migration;
pub mod observability;
pub mod query;
pub mod schema;
pub mod store;
