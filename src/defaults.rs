//! Shape-checks declared default literals against their type expression.
//!
//! Mismatches are findings, not failures: the caller reports them and
//! carries the default through unchanged, so one variable's bad default
//! never blocks another variable's conversion.

use serde_json::Value;

use crate::expr::TypeExpr;

/// One point where a default literal does not fit its declared type.
/// `path` is a value path like `default.tags[2]`, readable in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub path: String,
    pub expected: String,
    pub found: String,
}

/// Walk the declared type and the literal in lockstep, collecting every
/// point of disagreement. `null` is accepted anywhere: whether null is an
/// acceptable value is the owning variable's nullability concern, decided
/// by the caller, not a shape question.
pub fn check_default(ty: &TypeExpr, value: &Value) -> Vec<Mismatch> {
    let mut out = Vec::new();
    walk(ty, value, "default", &mut out);
    out
}

fn walk(ty: &TypeExpr, v: &Value, path: &str, out: &mut Vec<Mismatch>) {
    if v.is_null() {
        return;
    }
    match ty {
        TypeExpr::Any => {}
        TypeExpr::String => {
            if !v.is_string() {
                out.push(mismatch(path, "string", v));
            }
        }
        TypeExpr::Number => {
            if !v.is_number() {
                out.push(mismatch(path, "number", v));
            }
        }
        TypeExpr::Bool => {
            if !v.is_boolean() {
                out.push(mismatch(path, "bool", v));
            }
        }
        TypeExpr::List(elem) | TypeExpr::Set(elem) => match v.as_array() {
            None => out.push(mismatch(path, ty.describe(), v)),
            Some(xs) => {
                for (i, x) in xs.iter().enumerate() {
                    walk(elem, x, &format!("{path}[{i}]"), out);
                }
            }
        },
        TypeExpr::Map(elem) => match v.as_object() {
            None => out.push(mismatch(path, "map(...)", v)),
            Some(m) => {
                for (k, x) in m {
                    walk(elem, x, &format!("{path}.{k}"), out);
                }
            }
        },
        TypeExpr::Tuple(elems) => match v.as_array() {
            None => out.push(mismatch(path, "tuple([...])", v)),
            Some(xs) => {
                if xs.len() != elems.len() {
                    out.push(Mismatch {
                        path: path.to_string(),
                        expected: format!("a tuple of {} elements", elems.len()),
                        found: format!("{} elements", xs.len()),
                    });
                }
                for (i, (elem, x)) in elems.iter().zip(xs).enumerate() {
                    walk(elem, x, &format!("{path}[{i}]"), out);
                }
            }
        },
        TypeExpr::Object(fields) => match v.as_object() {
            None => out.push(mismatch(path, "object({...})", v)),
            Some(m) => {
                for (name, field) in fields {
                    match m.get(name) {
                        Some(x) => walk(&field.ty, x, &format!("{path}.{name}"), out),
                        // an attribute with its own declared default fills itself in
                        None => {
                            if !field.optional && field.default.is_none() {
                                out.push(Mismatch {
                                    path: format!("{path}.{name}"),
                                    expected: field.ty.describe().to_string(),
                                    found: "missing attribute".to_string(),
                                });
                            }
                        }
                    }
                }
                for k in m.keys() {
                    if !fields.contains_key(k) {
                        out.push(Mismatch {
                            path: format!("{path}.{k}"),
                            expected: "a declared attribute".to_string(),
                            found: "undeclared attribute".to_string(),
                        });
                    }
                }
            }
        },
    }
}

fn mismatch(path: &str, expected: &str, v: &Value) -> Mismatch {
    Mismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: kind_name(v).to_string(),
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------------------------- Tests ------------------------------------ //
