//! hierarchical block paths
//!
//! A block's path is its reference prefixed by the chain of `module` blocks that included its module, for example
//! `module.notify_slack.module.lambda.aws_cloudwatch_log_group.lambda[0]`.
use crate::config::{Block, Config, Module};
use crate::converter::ConvertError;
use std::collections::HashSet;

/// Path of `block` inside a module located at `parent_path`
pub fn path(block: &Block, parent_path: &str) -> String {
    join(parent_path, &block.reference())
}

pub(crate) fn join(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        return name.to_string();
    }

    format!("{parent_path}.{name}")
}

/// Chain of `module` blocks including the module of `block` (`module.a.module.b`), empty at the root
pub fn module_name(config: &Config, block: &Block) -> String {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut next = block.module_block();

    while let Some(id) = next {
        if !seen.insert(id) {
            tracing::warn!(?id, "module inclusion loop");
            break;
        }

        let Some(module_block) = config.block(id) else {
            tracing::debug!(?id, "module block not found");
            break;
        };

        names.push(module_block.reference());
        next = module_block.module_block();
    }

    names.reverse();
    names.join(".")
}

/// Path of a module: the module name all of its root blocks agree on
///
/// Root blocks naming two different modules make paths ambiguous, which is an error.
pub fn module_path(config: &Config, module: &Module) -> Result<String, ConvertError> {
    let mut found: Option<String> = None;

    for block in module.blocks() {
        let name = module_name(config, block);
        if name.is_empty() {
            continue;
        }

        match &found {
            None => found = Some(name),
            Some(existing) if *existing == name => {}
            Some(existing) => {
                return Err(ConvertError::ModulePathConflict {
                    first: existing.clone(),
                    second: name,
                })
            }
        }
    }

    Ok(found.unwrap_or_default())
}
