//! Merge patches (RFC 7396)
//!
//! A patch is parsed once from JSON: every `null` object member, at any
//! depth, becomes an explicit deletion marker. Applying a patch merges
//! objects recursively, replaces arrays and scalars wholesale and removes
//! deleted keys. Array contents are taken as-is.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// One member of a merge patch
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// Remove the key
    Delete,
    /// Merge into the existing object
    Merge(BTreeMap<String, PatchValue>),
    /// Replace the value
    Set(Value),
}

impl PatchValue {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Null => PatchValue::Delete,
            Value::Object(obj) => PatchValue::Merge(convert(obj)),
            other => PatchValue::Set(other),
        }
    }

    /// Value this member produces when the key is absent in the target
    fn materialize(&self) -> Option<Value> {
        match self {
            PatchValue::Delete => None,
            PatchValue::Set(value) => Some(value.clone()),
            PatchValue::Merge(members) => {
                let mut obj = Map::new();
                apply_members(members, &mut obj);
                Some(Value::Object(obj))
            }
        }
    }
}

fn convert(obj: Map<String, Value>) -> BTreeMap<String, PatchValue> {
    obj.into_iter()
        .map(|(key, value)| (key, PatchValue::from_value(value)))
        .collect()
}

fn apply_members(members: &BTreeMap<String, PatchValue>, target: &mut Map<String, Value>) {
    for (key, member) in members {
        match member {
            PatchValue::Delete => {
                target.remove(key);
            }
            PatchValue::Set(value) => {
                target.insert(key.clone(), value.clone());
            }
            PatchValue::Merge(nested) => match target.get_mut(key) {
                Some(Value::Object(existing)) => apply_members(nested, existing),
                _ => {
                    if let Some(value) = member.materialize() {
                        target.insert(key.clone(), value);
                    }
                }
            },
        }
    }
}

/// A parsed merge patch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergePatch {
    members: BTreeMap<String, PatchValue>,
}

impl MergePatch {
    /// Parses a patch document.
    ///
    /// Returns `None` when the patch is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Self {
                members: convert(obj),
            }),
            _ => None,
        }
    }

    /// Top-level member for a key
    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.members.get(key)
    }

    /// Removes a top-level member
    pub fn take(&mut self, key: &str) -> Option<PatchValue> {
        self.members.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Applies the patch to a set of fields in place.
    pub fn apply(&self, target: &mut Map<String, Value>) {
        apply_members(&self.members, target);
    }

    /// The fields the patch produces on an empty target.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        self.apply(&mut fields);
        fields
    }
}
