//! turning raw blocks into evaluated [Block]s
use super::eval::{evaluate, Expansion};
use super::references::references;
use super::source::RawBlock;
use super::Loader;
use crate::config::{Attribute, Block};
use crate::dedup::TEMPLATE_BLOCK;
use crate::path;
use crate::typed::TypedValue;
use hcl::eval::{Context, Evaluate};
use hcl::value::Map;
use hcl::{Expression, Value};

impl Loader<'_> {
    /// Root blocks for `raw`, one per instance when `count` or `for_each` are known
    pub(super) fn materialize_root(
        &self,
        raw: &RawBlock,
        ctx: &Context,
        module_path: &str,
    ) -> Vec<Block> {
        let expansion = match raw.kind.as_str() {
            "resource" | "data" => Expansion::of(raw, ctx),
            _ => Expansion::Single,
        };

        expansion
            .instances()
            .into_iter()
            .map(|(key, iteration)| {
                let mut instance_ctx = ctx.child();
                if let Some((variable, value)) = iteration {
                    instance_ctx.declare_var(variable, value);
                }

                let mut block = self.materialize(&raw.kind, &raw.labels, raw, &instance_ctx, &[]);
                if let Some(key) = key {
                    block = block.with_key(key);
                }
                let id = path::path(&block, module_path);
                block.with_id(id)
            })
            .collect()
    }

    /// Evaluate the body of `raw` as a block of kind `kind`
    ///
    /// `ignored` are variables (iterators of enclosing `dynamic` blocks) that do not reference other blocks.
    fn materialize(
        &self,
        kind: &str,
        labels: &[String],
        raw: &RawBlock,
        ctx: &Context,
        ignored: &[String],
    ) -> Block {
        let mut block = Block::new(kind, raw.range.clone()).with_labels(labels.iter().cloned());

        for (name, expr) in &raw.attributes {
            block = block.with_attribute(self.attribute(name, expr, raw, ctx, ignored));
        }

        for child in &raw.children {
            if child.kind == TEMPLATE_BLOCK {
                for expanded in self.expand_template(child, ctx, ignored) {
                    block = block.with_child(expanded);
                }
            } else {
                block = block.with_child(self.materialize(
                    &child.kind,
                    &child.labels,
                    child,
                    ctx,
                    ignored,
                ));
            }
        }

        block
    }

    fn attribute(
        &self,
        name: &str,
        expr: &Expression,
        raw: &RawBlock,
        ctx: &Context,
        ignored: &[String],
    ) -> Attribute {
        let value = evaluate(expr, ctx);
        if let (true, TypedValue::Opaque(reason)) = (self.options.debug, &value) {
            tracing::debug!(
                file = %raw.range.filename,
                line = raw.range.start_line,
                attribute = name,
                %reason,
                "expression not evaluated"
            );
        }

        Attribute::new(name, value, expr.to_string())
            .with_references(references(expr, ignored))
            .with_expr(expr.clone())
    }

    /// The `dynamic` block itself, followed by one block per item of its `for_each`
    ///
    /// Generated blocks have the kind of the `dynamic` block's label and the line range of its `content` block.
    fn expand_template(&self, template: &RawBlock, ctx: &Context, ignored: &[String]) -> Vec<Block> {
        let kind = template.name().unwrap_or_default();
        let iterator = match template.attribute("iterator") {
            Some(Expression::Variable(variable)) => variable.as_str().to_string(),
            _ => kind.to_string(),
        };

        let mut ignored = ignored.to_vec();
        ignored.push(iterator.clone());

        let mut blocks = vec![self.materialize(
            &template.kind,
            &template.labels,
            template,
            ctx,
            &ignored,
        )];

        let Some(content) = template.children.iter().find(|child| child.kind == "content") else {
            tracing::debug!(
                file = %template.range.filename,
                line = template.range.start_line,
                "dynamic block without content"
            );
            return blocks;
        };

        for (key, value) in iterations(template, ctx) {
            let mut iteration = Map::new();
            iteration.insert("key".to_string(), key);
            iteration.insert("value".to_string(), value);

            let mut iteration_ctx = ctx.child();
            iteration_ctx.declare_var(iterator.clone(), Value::Object(iteration));
            blocks.push(self.materialize(kind, &[], content, &iteration_ctx, &ignored));
        }

        blocks
    }
}

/// `(key, value)` of every item a `dynamic` block iterates, nothing when `for_each` is not known
fn iterations(template: &RawBlock, ctx: &Context) -> Vec<(Value, Value)> {
    match template.attribute("for_each").map(|expr| expr.evaluate(ctx)) {
        Some(Ok(Value::Array(items))) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (Value::from(index as u64), item))
            .collect(),
        Some(Ok(Value::Object(object))) => object
            .into_iter()
            .map(|(key, item)| (Value::from(key), item))
            .collect(),
        _ => vec![],
    }
}
