//! index of visited blocks by reference
use crate::config::Block;
use crate::value::{Object, Value};
use std::collections::HashMap;

/// Blocks by their module-qualified reference (see [crate::path::path])
///
/// Entries are added as blocks are visited and never removed. A reference only resolves if its block was visited
/// before the referencing block is built, so a forward reference stays unresolved.
#[derive(Debug, Default)]
pub struct ReferenceIndex<'c> {
    blocks: HashMap<String, &'c Block>,
}

impl<'c> ReferenceIndex<'c> {
    pub fn register(&mut self, path: String, block: &'c Block) {
        tracing::trace!(%path, "block registered");
        self.blocks.insert(path, block);
    }

    pub fn resolve(&self, path: &str) -> Option<&'c Block> {
        self.blocks.get(path).copied()
    }

    /// `{id, label, name}` of the referenced block, if known
    pub fn descriptor(&self, path: &str) -> Option<Value> {
        let block = self.resolve(path)?;

        let mut descriptor = Object::new();
        descriptor.insert("id".into(), block.id().unwrap_or_default().into());
        descriptor.insert("label".into(), block.type_label().unwrap_or_default().into());
        descriptor.insert("name".into(), block.name_label().unwrap_or_default().into());
        Some(descriptor.into())
    }
}
