//! reference strings of expressions
//!
//! A traversal `aws_s3_bucket.main.arn` references the block `aws_s3_bucket.main`, the same string
//! [crate::config::Block::reference] produces for it.
use crate::visit::VisitTraversals;
use hcl::{Expression, Traversal, TraversalOperator};
use indexmap::IndexSet;

/// Roots that never refer to a block
const IGNORED_ROOTS: &[&str] = &["count", "each", "path", "self", "terraform"];

/// All references in `expr`, in order of appearance
///
/// `ignored` lists additional roots to skip, such as `dynamic` block iterators.
pub fn references(expr: &Expression, ignored: &[String]) -> Vec<String> {
    let mut found = IndexSet::new();
    expr.visit_traversals(&mut |traversal: &Traversal| {
        if let Some(reference) = reference(traversal, ignored) {
            found.insert(reference);
        }
    });
    found.into_iter().collect()
}

fn reference(traversal: &Traversal, ignored: &[String]) -> Option<String> {
    let Expression::Variable(root) = &traversal.expr else {
        return None;
    };
    let root = root.as_str();
    if IGNORED_ROOTS.contains(&root) || ignored.iter().any(|name| name == root) {
        return None;
    }

    // number of attribute names following the root that name the block
    let names = match root {
        "data" => 2,
        _ => 1,
    };

    let mut reference = root.to_string();
    let mut operators = traversal.operators.iter();
    for _ in 0..names {
        let Some(TraversalOperator::GetAttr(name)) = operators.next() else {
            return None;
        };
        reference.push('.');
        reference.push_str(name.as_str());
    }

    // locals and variables are never indexed by instance
    if matches!(root, "var" | "local") {
        return Some(reference);
    }

    match operators.next() {
        Some(TraversalOperator::Index(Expression::Number(index))) => {
            reference.push_str(&format!("[{index}]"));
        }
        Some(TraversalOperator::Index(Expression::String(key))) => {
            reference.push_str(&format!("[{key:?}]"));
        }
        Some(TraversalOperator::LegacyIndex(index)) => {
            reference.push_str(&format!("[{index}]"));
        }
        _ => {}
    }

    Some(reference)
}
