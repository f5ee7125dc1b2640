//! Query construction
//!
//! Turns request parameters into a `Query` against one resource table.
//!
//! Policy:
//! - a parameter naming a declared field becomes a filter: sequences are
//!   membership filters, anything else an equality filter
//! - an empty sequence matches nothing
//! - `orderBy`, `order`, `skip` and `limit` are control keys; a declared
//!   field of the same name is also filtered on
//! - unknown keys and malformed control values are ignored

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::params::{ParamValue, RequestParams};
use crate::schema::Schema;

/// Control key naming the sort field
pub const ORDER_BY: &str = "orderBy";
/// Control key naming the sort direction
pub const ORDER: &str = "order";
/// Control key for the number of documents to skip
pub const SKIP: &str = "skip";
/// Control key for the maximum number of documents
pub const LIMIT: &str = "limit";

const CONTROL_KEYS: [&str; 4] = [ORDER_BY, ORDER, SKIP, LIMIT];

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc`; anything else is ascending.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A store-native query against one table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub table: String,
    pub equality_filters: BTreeMap<String, Value>,
    pub membership_filters: BTreeMap<String, Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Query {
    /// An unfiltered query over a table
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equality_filters.insert(field.into(), value.into());
        self
    }

    pub fn filter_in<I, T>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.membership_filters
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when an empty membership filter makes the query match nothing
    pub fn matches_nothing(&self) -> bool {
        self.membership_filters.values().any(Vec::is_empty)
    }
}

/// Builds queries from request parameters
pub struct QueryBuilder;

impl QueryBuilder {
    /// Builds the query for a resource. Performs no I/O.
    pub fn build(schema: &Schema, params: &RequestParams) -> Query {
        let mut query = Query::table(schema.table());

        for (key, value) in params.iter() {
            if !schema.declares(key) {
                if CONTROL_KEYS.contains(&key) {
                    continue;
                }
                debug!(resource = %schema.name, param = key, "ignoring undeclared query parameter");
                continue;
            }

            match value {
                ParamValue::Sequence(values) => {
                    query.membership_filters.insert(key.to_string(), values.clone());
                }
                ParamValue::Scalar(value) => {
                    query.equality_filters.insert(key.to_string(), value.clone());
                }
            }
        }

        if let Some(field) = params.get(ORDER_BY).and_then(ParamValue::as_str) {
            if schema.declares(field) {
                let direction = SortDirection::parse(params.get(ORDER).and_then(ParamValue::as_str));
                query.order_by = Some(OrderBy {
                    field: field.to_string(),
                    direction,
                });
            }
        }

        query.skip = params.get(SKIP).and_then(ParamValue::as_count);
        query.limit = params.get(LIMIT).and_then(ParamValue::as_count);

        query
    }
}
