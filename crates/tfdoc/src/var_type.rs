//! variable type declarations
//!
//! The `type` attribute of a `variable` block is a type expression (`list(string)`, `map(number)`, ...), not a value.
//! It is decoded here and rendered with the same friendly names terraform uses in its messages.
use hcl::Expression;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeConstraint {
    String,
    Number,
    Bool,
    /// `any`
    Dynamic,
    List(Box<TypeConstraint>),
    Set(Box<TypeConstraint>),
    Map(Box<TypeConstraint>),
    Object,
    Tuple,
}

impl TypeConstraint {
    /// Decode a type expression
    ///
    /// Accepts the legacy quoted forms (`"string"`, `"list"`, `"map"`) as well.
    pub fn decode(expr: &Expression) -> Option<TypeConstraint> {
        match expr {
            Expression::Variable(var) => Self::keyword(var.as_str()),
            Expression::String(legacy) => match legacy.as_str() {
                "list" => Some(TypeConstraint::List(Box::new(TypeConstraint::Dynamic))),
                "map" => Some(TypeConstraint::Map(Box::new(TypeConstraint::Dynamic))),
                other => Self::keyword(other),
            },
            Expression::Parenthesis(inner) => Self::decode(inner),
            Expression::FuncCall(func) => {
                let name = func.name.to_string();
                let first = func.args.first();
                match name.as_str() {
                    "list" => Some(TypeConstraint::List(Box::new(Self::decode(first?)?))),
                    "set" => Some(TypeConstraint::Set(Box::new(Self::decode(first?)?))),
                    "map" => Some(TypeConstraint::Map(Box::new(Self::decode(first?)?))),
                    "object" => Some(TypeConstraint::Object),
                    "tuple" => Some(TypeConstraint::Tuple),
                    "optional" => Self::decode(first?),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn keyword(name: &str) -> Option<TypeConstraint> {
        match name {
            "string" => Some(TypeConstraint::String),
            "number" => Some(TypeConstraint::Number),
            "bool" => Some(TypeConstraint::Bool),
            "any" => Some(TypeConstraint::Dynamic),
            _ => None,
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeConstraint::String => f.write_str("string"),
            TypeConstraint::Number => f.write_str("number"),
            TypeConstraint::Bool => f.write_str("bool"),
            TypeConstraint::Dynamic => f.write_str("dynamic"),
            TypeConstraint::List(element) => write!(f, "list of {element}"),
            TypeConstraint::Set(element) => write!(f, "set of {element}"),
            TypeConstraint::Map(element) => write!(f, "map of {element}"),
            TypeConstraint::Object => f.write_str("object"),
            TypeConstraint::Tuple => f.write_str("tuple"),
        }
    }
}
