//! Query subsystem
//!
//! Translates generic request parameters (field filters, array-membership
//! filters, sort field and direction, skip, limit) into a `Query`, and
//! evaluates queries over documents for stores that execute them in
//! process.

mod builder;
mod matcher;
mod params;

pub use builder::{OrderBy, Query, QueryBuilder, SortDirection, LIMIT, ORDER, ORDER_BY, SKIP};
pub use matcher::compare_values;
pub use params::{ParamValue, RequestParams};
