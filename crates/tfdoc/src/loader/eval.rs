//! expression evaluation
//!
//! Each module gets a [Scope] holding what is known about it so far (variables, locals, resources, ...). A scope is
//! turned into an [hcl::eval::Context] for every evaluation round. Anything missing from the scope evaluates to
//! [TypedValue::Unknown].
use super::functions;
use super::source::RawBlock;
use crate::config::InstanceKey;
use crate::typed::TypedValue;
use hcl::eval::{Context, ErrorKind, Evaluate};
use hcl::value::Map;
use hcl::{Expression, ObjectKey, Value};
use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub struct Scope {
    pub vars: Map<String, Value>,
    pub locals: Map<String, Value>,
    /// resource type -> name -> instance(s)
    pub resources: Map<String, Value>,
    /// data source type -> name -> instance(s)
    pub data: Map<String, Value>,
    /// module name -> outputs
    pub modules: Map<String, Value>,
    pub path: Map<String, Value>,
}

impl Scope {
    pub fn context(&self) -> Context<'static> {
        let mut ctx = Context::new();
        functions::declare(&mut ctx);

        for (kind, instances) in &self.resources {
            ctx.declare_var(kind.clone(), instances.clone());
        }

        ctx.declare_var("var", Value::Object(self.vars.clone()));
        ctx.declare_var("local", Value::Object(self.locals.clone()));
        ctx.declare_var("data", Value::Object(self.data.clone()));
        ctx.declare_var("module", Value::Object(self.modules.clone()));
        ctx.declare_var("path", Value::Object(self.path.clone()));
        ctx
    }

    pub fn set_resource(&mut self, kind: &str, name: &str, value: Value) {
        insert_nested(&mut self.resources, kind, name, value);
    }

    pub fn set_data(&mut self, kind: &str, name: &str, value: Value) {
        insert_nested(&mut self.data, kind, name, value);
    }
}

fn insert_nested(map: &mut Map<String, Value>, kind: &str, name: &str, value: Value) {
    let entry = map
        .entry(kind.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(names) = entry {
        names.insert(name.to_string(), value);
    }
}

/// Evaluate `expr`
///
/// Array and object literals are evaluated member by member, so one unknown member does not hide the others.
pub fn evaluate(expr: &Expression, ctx: &Context) -> TypedValue {
    match expr {
        Expression::Array(items) => {
            TypedValue::List(items.iter().map(|item| evaluate(item, ctx)).collect())
        }
        Expression::Object(object) => {
            let mut members = IndexMap::new();
            for (key, value) in object {
                let Some(key) = object_key(key, ctx) else {
                    return evaluate_whole(expr, ctx);
                };
                members.insert(key, evaluate(value, ctx));
            }
            TypedValue::Object(members)
        }
        _ => evaluate_whole(expr, ctx),
    }
}

fn evaluate_whole(expr: &Expression, ctx: &Context) -> TypedValue {
    match expr.evaluate(ctx) {
        Ok(value) => value.into(),
        Err(err) if is_unknown(&err) => TypedValue::Unknown,
        Err(err) => TypedValue::Opaque(err.to_string()),
    }
}

/// Errors caused by values that are not known yet, as opposed to invalid expressions
fn is_unknown(err: &hcl::eval::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::UndefinedVar(_) | ErrorKind::NoSuchKey(_)
    )
}

fn object_key(key: &ObjectKey, ctx: &Context) -> Option<String> {
    match key {
        ObjectKey::Identifier(ident) => Some(ident.to_string()),
        ObjectKey::Expression(expr) => match expr.evaluate(ctx).ok()? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        },
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Object of all attributes of `block` that evaluate in `ctx`
pub fn known_attributes(block: &RawBlock, ctx: &Context) -> Value {
    Value::Object(
        block
            .attributes
            .iter()
            .filter_map(|(name, expr)| Some((name.clone(), expr.evaluate(ctx).ok()?)))
            .collect(),
    )
}

/// How `count` or `for_each` expand a block
#[derive(Debug, PartialEq)]
pub enum Expansion {
    /// No meta argument, or one that is not known
    Single,
    Count(usize),
    ForEach(Vec<(String, Value)>),
}

impl Expansion {
    pub fn of(block: &RawBlock, ctx: &Context) -> Expansion {
        if let Some(count) = block.attribute("count") {
            return match count.evaluate(ctx) {
                Ok(Value::Number(n)) => n
                    .as_u64()
                    .map_or(Expansion::Single, |n| Expansion::Count(n as usize)),
                _ => Expansion::Single,
            };
        }

        if let Some(for_each) = block.attribute("for_each") {
            return match for_each.evaluate(ctx) {
                Ok(Value::Object(object)) => Expansion::ForEach(object.into_iter().collect()),
                Ok(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Some((s.clone(), Value::String(s))),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .map_or_else(
                        || {
                            tracing::debug!(
                                block = %block.kind,
                                "for_each list has non-string elements, keeping one instance"
                            );
                            Expansion::Single
                        },
                        Expansion::ForEach,
                    ),
                _ => Expansion::Single,
            };
        }

        Expansion::Single
    }

    /// Instance keys with the variable (`count` or `each`) to declare for each instance
    pub fn instances(self) -> Vec<(Option<InstanceKey>, Option<(&'static str, Value)>)> {
        match self {
            Expansion::Single => vec![(None, None)],
            Expansion::Count(count) => (0..count)
                .map(|index| {
                    let mut object = Map::new();
                    object.insert("index".to_string(), Value::from(index as u64));
                    (
                        Some(InstanceKey::Index(index)),
                        Some(("count", Value::Object(object))),
                    )
                })
                .collect(),
            Expansion::ForEach(items) => items
                .into_iter()
                .map(|(key, value)| {
                    let mut object = Map::new();
                    object.insert("key".to_string(), Value::from(key.clone()));
                    object.insert("value".to_string(), value);
                    (
                        Some(InstanceKey::Key(key)),
                        Some(("each", Value::Object(object))),
                    )
                })
                .collect(),
        }
    }

    /// Value of the block in the scope: one object, a list for `count`, an object for `for_each`
    pub fn scope_value(instances: Vec<(Option<InstanceKey>, Value)>) -> Value {
        let first_key = instances.first().and_then(|(key, _)| key.clone());
        match first_key {
            None => instances
                .into_iter()
                .next()
                .map_or(Value::Null, |(_, value)| value),
            Some(InstanceKey::Index(_)) => {
                Value::Array(instances.into_iter().map(|(_, value)| value).collect())
            }
            Some(InstanceKey::Key(_)) => Value::Object(
                instances
                    .into_iter()
                    .filter_map(|(key, value)| match key {
                        Some(InstanceKey::Key(key)) => Some((key, value)),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }
}
