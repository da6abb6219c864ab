//! the subset of terraform's functions available during evaluation
//!
//! Calls to anything else fail to evaluate and end up as raw expression text.
use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

type Func = fn(FuncArgs) -> Result<Value, String>;

pub fn declare(ctx: &mut Context) {
    ctx.declare_func("length", single(length));
    ctx.declare_func("lower", single(lower));
    ctx.declare_func("upper", single(upper));
    ctx.declare_func("tolist", single(tolist));
    ctx.declare_func("toset", single(toset));
    ctx.declare_func("tomap", single(tomap));
    ctx.declare_func("keys", single(keys));
    ctx.declare_func("values", single(values));
    ctx.declare_func("jsonencode", single(jsonencode));
    ctx.declare_func("concat", variadic(concat));
    ctx.declare_func("merge", variadic(merge));
}

fn single(func: Func) -> FuncDef {
    FuncDef::builder().param(ParamType::Any).build(func)
}

fn variadic(func: Func) -> FuncDef {
    FuncDef::builder().variadic_param(ParamType::Any).build(func)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn length(args: FuncArgs) -> Result<Value, String> {
    let len = match &args[0] {
        Value::Array(array) => array.len(),
        Value::Object(object) => object.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(format!("length of {} is not defined", kind(other))),
    };
    Ok(Value::from(len as u64))
}

fn lower(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::String(s) => Ok(Value::from(s.to_lowercase())),
        other => Err(format!("expected string, got {}", kind(other))),
    }
}

fn upper(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::String(s) => Ok(Value::from(s.to_uppercase())),
        other => Err(format!("expected string, got {}", kind(other))),
    }
}

fn tolist(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::Array(array) => Ok(Value::Array(array.clone())),
        other => Err(format!("cannot convert {} to list", kind(other))),
    }
}

fn toset(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::Array(array) => {
            let mut set: Vec<Value> = Vec::with_capacity(array.len());
            for item in array {
                if !set.contains(item) {
                    set.push(item.clone());
                }
            }
            Ok(Value::Array(set))
        }
        other => Err(format!("cannot convert {} to set", kind(other))),
    }
}

fn tomap(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::Object(object) => Ok(Value::Object(object.clone())),
        other => Err(format!("cannot convert {} to map", kind(other))),
    }
}

fn keys(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::Object(object) => Ok(Value::Array(
            object.keys().cloned().map(Value::from).collect(),
        )),
        other => Err(format!("expected map, got {}", kind(other))),
    }
}

fn values(args: FuncArgs) -> Result<Value, String> {
    match &args[0] {
        Value::Object(object) => Ok(Value::Array(object.values().cloned().collect())),
        other => Err(format!("expected map, got {}", kind(other))),
    }
}

fn jsonencode(args: FuncArgs) -> Result<Value, String> {
    serde_json::to_string(&args[0])
        .map(Value::from)
        .map_err(|err| err.to_string())
}

fn concat(args: FuncArgs) -> Result<Value, String> {
    let mut result = Vec::new();
    for arg in args.iter() {
        match arg {
            Value::Array(array) => result.extend(array.iter().cloned()),
            other => return Err(format!("expected list, got {}", kind(other))),
        }
    }
    Ok(Value::Array(result))
}

fn merge(args: FuncArgs) -> Result<Value, String> {
    let mut result = hcl::value::Map::new();
    for arg in args.iter() {
        match arg {
            Value::Object(object) => {
                result.extend(object.iter().map(|(k, v)| (k.clone(), v.clone())))
            }
            Value::Null => {}
            other => return Err(format!("expected map, got {}", kind(other))),
        }
    }
    Ok(Value::Object(result))
}

#[cfg(test)]
mod test {
    use super::*;
    use hcl::eval::Evaluate;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> Result<Value, String> {
        let body = hcl::parse(&format!("value = {source}")).expect("valid hcl");
        let expr = body.attributes().next().expect("attribute").expr().clone();

        let mut ctx = Context::new();
        declare(&mut ctx);
        expr.evaluate(&ctx).map_err(|err| err.to_string())
    }

    #[test]
    fn collection_functions() {
        assert_eq!(eval("length([1, 2, 3])"), Ok(Value::from(3u64)));
        assert_eq!(eval("length({ a = 1 })"), Ok(Value::from(1u64)));
        assert_eq!(
            eval("toset([\"a\", \"b\", \"a\"])"),
            Ok(Value::Array(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            eval("concat([1], [2, 3])"),
            Ok(Value::Array(vec![1u64.into(), 2u64.into(), 3u64.into()]))
        );
        assert_eq!(
            eval("keys(merge({ a = 1 }, { b = 2 }))"),
            Ok(Value::Array(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn string_functions() {
        assert_eq!(eval("upper(\"abc\")"), Ok(Value::from("ABC")));
        assert_eq!(eval("lower(\"ABC\")"), Ok(Value::from("abc")));
        assert_eq!(eval("jsonencode({ a = true })"), Ok(Value::from("{\"a\":true}")));
    }

    #[test]
    fn type_errors() {
        assert!(eval("lower(1)").is_err());
        assert!(eval("concat([1], \"a\")").is_err());
        assert!(eval("unknown_function(1)").is_err());
    }
}
