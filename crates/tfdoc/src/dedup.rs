//! reconciliation of `dynamic` blocks with their expansions
//!
//! The evaluator leaves `dynamic` templates in the child list and adds the blocks they expand to, possibly more than
//! once, with nothing marking which entries are synthesized. [logical_children] recovers the real children with a
//! single pass over the raw list:
//!
//! - a `dynamic` block is never a child, its `for_each` length is added to the number of expected expansions
//! - a block starting at or after the end of everything accepted so far is a regular child
//! - a block overlapping what was accepted before is an expansion: it is kept while expansions are still expected
//!
//! The heuristic is not known to be correct when several templates of the same type interleave.
use crate::config::Block;

pub(crate) const TEMPLATE_BLOCK: &str = "dynamic";

pub fn logical_children(block: &Block) -> Vec<&Block> {
    let mut expected: i64 = 0;
    let mut max_end = 0;
    let mut children = Vec::new();

    for child in block.children() {
        if child.kind() == TEMPLATE_BLOCK {
            expected += expansion_count(child) as i64;
            continue;
        }

        let range = child.range();
        if range.start_line >= max_end {
            max_end = range.end_line;
            children.push(child);
            continue;
        }

        expected -= 1;
        if expected > 0 {
            children.push(child);
        } else {
            tracing::trace!(kind = child.kind(), line = range.start_line, "dropping duplicate block");
        }
    }

    children
}

fn expansion_count(template: &Block) -> usize {
    template
        .attribute("for_each")
        .map(|for_each| for_each.value().collection_len())
        .unwrap_or(0)
}
