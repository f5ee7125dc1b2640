//! Query evaluation over documents
//!
//! Execution order: equality filters, membership filters, a stable sort on
//! the single order field, then skip, then limit.

use std::cmp::Ordering;

use serde_json::Value;

use super::builder::{Query, SortDirection};
use crate::document::Document;

impl Query {
    /// Checks the filters against one document.
    pub fn matches(&self, doc: &Document) -> bool {
        for (field, expected) in &self.equality_filters {
            match doc.get(field) {
                Some(actual) if actual.as_ref() == expected => {}
                _ => return false,
            }
        }

        for (field, allowed) in &self.membership_filters {
            match doc.get(field) {
                Some(actual) if allowed.contains(actual.as_ref()) => {}
                _ => return false,
            }
        }

        true
    }

    /// Filters, sorts and paginates a set of documents.
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        if self.matches_nothing() {
            return Vec::new();
        }

        let mut matched: Vec<Document> = documents.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order_by {
            matched.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.field).as_deref(),
                    b.get(&order.field).as_deref(),
                );
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);

        matched.into_iter().skip(skip).take(limit).collect()
    }
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string < array < object
/// - For same types, natural ordering; arrays compare element-wise
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => compare_present(a_val, b_val),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ordering = compare_present(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => Ordering::Equal,
    }
}
