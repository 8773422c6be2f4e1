// Strongly-typed type-expression AST. The parser produces this; the
// compiler consumes it with an exhaustive match, so a new constructor
// cannot be silently ignored.

use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    String,
    Number,
    Bool,
    /// The open type: accepts every JSON kind, including null.
    Any,
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),          // exact arity, positional
    Object(IndexMap<String, FieldSpec>), // declaration order preserved
}

/// One attribute of an `object({...})` type. `optional(...)` wrapping is
/// recorded here structurally, never discarded: the compiler needs it to
/// build the object's `required` list.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub ty: TypeExpr,
    pub optional: bool,
    pub default: Option<Value>,
}

impl TypeExpr {
    /// Short constructor name for diagnostics (`list(...)`, `string`, ...).
    pub fn describe(&self) -> &'static str {
        match self {
            TypeExpr::String => "string",
            TypeExpr::Number => "number",
            TypeExpr::Bool => "bool",
            TypeExpr::Any => "any",
            TypeExpr::List(_) => "list(...)",
            TypeExpr::Set(_) => "set(...)",
            TypeExpr::Map(_) => "map(...)",
            TypeExpr::Tuple(_) => "tuple([...])",
            TypeExpr::Object(_) => "object({...})",
        }
    }
}
