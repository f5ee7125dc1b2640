//! Request parameters
//!
//! A request carries a flat map of parameters. Each value is either a
//! scalar or a sequence; sequences come from repeated `key[]=value` pairs
//! in a query string or from JSON arrays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Sequence(Vec<Value>),
    Scalar(Value),
}

impl ParamValue {
    /// Returns the scalar as a string slice, if it is a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Reads the value as a non-negative integer.
    ///
    /// Accepts JSON integers and strings made only of digits.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            ParamValue::Scalar(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            ParamValue::Scalar(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                s.parse().ok()
            }
            _ => None,
        }
    }
}

/// Parameters of one request, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams {
    entries: BTreeMap<String, ParamValue>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses raw query-string pairs.
    ///
    /// `key=value` sets a scalar string. `key[]=value` appends to a
    /// sequence; a bare `key[]` with an empty value yields an empty
    /// sequence.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::new();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();

            match key.strip_suffix("[]") {
                Some(name) => {
                    let entry = params
                        .entries
                        .entry(name.to_string())
                        .or_insert_with(|| ParamValue::Sequence(Vec::new()));
                    if let ParamValue::Scalar(previous) = entry {
                        *entry = ParamValue::Sequence(vec![previous.take()]);
                    }
                    if let ParamValue::Sequence(values) = entry {
                        if !value.is_empty() {
                            values.push(Value::String(value.to_string()));
                        }
                    }
                }
                None => {
                    params
                        .entries
                        .insert(key.to_string(), ParamValue::Scalar(Value::String(value.to_string())));
                }
            }
        }

        params
    }

    /// Parses a `k=v&k[]=v` query string.
    pub fn parse_query_string(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((key, value)) => (key, value),
                None => (part, ""),
            });

        Self::from_pairs(pairs)
    }

    /// Builds parameters from a JSON object; arrays become sequences.
    ///
    /// Returns `None` when the value is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let entries = obj
            .iter()
            .map(|(key, value)| {
                let param = match value {
                    Value::Array(values) => ParamValue::Sequence(values.clone()),
                    other => ParamValue::Scalar(other.clone()),
                };
                (key.clone(), param)
            })
            .collect();

        Some(Self { entries })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.entries.insert(key.into(), value);
    }

    /// Sets a scalar parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, ParamValue::Scalar(value.into()));
        self
    }

    /// Sets a sequence parameter
    pub fn with_sequence<I, T>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.insert(
            key,
            ParamValue::Sequence(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_pairs() {
        let params = RequestParams::from_pairs([
            ("name", "bob"),
            ("tags[]", "a"),
            ("tags[]", "b"),
            ("ids[]", ""),
        ]);

        assert_eq!(params.get("name").unwrap().as_str(), Some("bob"));
        assert_eq!(
            params.get("tags"),
            Some(&ParamValue::Sequence(vec![json!("a"), json!("b")]))
        );
        assert_eq!(params.get("ids"), Some(&ParamValue::Sequence(vec![])));
    }

    #[test]
    fn test_parse_query_string() {
        let params = RequestParams::parse_query_string("?orderBy=id&skip=1&limit=2&ids[]");
        assert_eq!(params.get("orderBy").unwrap().as_str(), Some("id"));
        assert_eq!(params.get("skip").unwrap().as_count(), Some(1));
        assert_eq!(params.get("ids"), Some(&ParamValue::Sequence(vec![])));
    }

    #[test]
    fn test_from_json() {
        let params = RequestParams::from_json(&json!({ "tags": ["a"], "limit": 5 })).unwrap();
        assert_eq!(params.get("tags"), Some(&ParamValue::Sequence(vec![json!("a")])));
        assert_eq!(params.get("limit").unwrap().as_count(), Some(5));
        assert!(RequestParams::from_json(&json!([1])).is_none());
    }

    #[test]
    fn test_as_count_rejects_malformed() {
        assert_eq!(ParamValue::Scalar(json!("-1")).as_count(), None);
        assert_eq!(ParamValue::Scalar(json!("1.5")).as_count(), None);
        assert_eq!(ParamValue::Scalar(json!("abc")).as_count(), None);
        assert_eq!(ParamValue::Scalar(json!(-3)).as_count(), None);
        assert_eq!(ParamValue::Scalar(json!(2.0)).as_count(), None);
        assert_eq!(ParamValue::Sequence(vec![json!(1)]).as_count(), None);
        assert_eq!(ParamValue::Scalar(json!(" 7 ")).as_count(), Some(7));
    }
}
