//! grouping of child documents by block type
use crate::value::{Object, Value};
use indexmap::IndexMap;

/// Collects child documents by key and flattens single element groups
///
/// A group with exactly one member is stored as that member, larger groups as an array in insertion order.
/// This does not mean the block is a singleton by schema, only that it was rendered once.
#[derive(Debug, Default)]
pub struct BlockCollector {
    groups: IndexMap<String, Vec<Value>>,
}

impl BlockCollector {
    pub fn add(&mut self, key: impl Into<String>, value: Value) {
        self.groups.entry(key.into()).or_default().push(value);
    }

    pub fn finalize(self) -> Object {
        self.groups
            .into_iter()
            .map(|(key, mut items)| {
                let value = if items.len() == 1 {
                    items.remove(0)
                } else {
                    Value::Array(items)
                };
                (key, value)
            })
            .collect()
    }
}
