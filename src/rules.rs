//! Validation-rule hints.
//!
//! Purely syntactic recognition of the handful of condition idioms that
//! translate directly into Draft 7 keywords. Conditions are arbitrary
//! expressions in the declaration language; anything unrecognized is
//! ignored — this never evaluates, and it never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{SchemaNode, SchemaType};
use crate::variable::ValidationRule;

/// `length(var.x) >= 3` / `length(var.x) > 3`
static LEN_MIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"length\([^)]*\)\s*(>=|>)\s*(\d+)").unwrap());

/// `length(var.x) <= 16` / `length(var.x) < 16`
static LEN_MAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"length\([^)]*\)\s*(<=|<)\s*(\d+)").unwrap());

/// `can(regex("^ami-", var.image_id))` — captures the pattern text
static REGEX_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"can\(\s*regex\(\s*"((?:[^"\\]|\\.)*)""#).unwrap());

/// `contains(["a", "b"], var.x)` — captures the bracketed list text
static CONTAINS_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"contains\(\s*\[([^\]]*)\]").unwrap());

/// Merge recognized hints into a variable's top-level node. Only
/// string-typed nodes take hints: lengths, patterns and value lists are
/// string constraints, and nothing here should second-guess a collection
/// or object shape.
pub fn apply_hints(node: &mut SchemaNode, rules: &[ValidationRule]) {
    if !matches!(node.ty, SchemaType::One("string")) {
        return;
    }

    for rule in rules {
        let cond = rule.condition.as_str();

        if let Some(c) = LEN_MIN.captures(cond) {
            if let Ok(n) = c[2].parse::<u64>() {
                let strict = &c[1] == ">";
                node.min_length = Some(if strict { n.saturating_add(1) } else { n });
            }
        }
        if let Some(c) = LEN_MAX.captures(cond) {
            if let Ok(n) = c[2].parse::<u64>() {
                let strict = &c[1] == "<";
                node.max_length = Some(if strict { n.saturating_sub(1) } else { n });
            }
        }
        if let Some(c) = REGEX_CALL.captures(cond) {
            node.pattern = Some(unescape(&c[1]));
        }
        if node.enum_.is_none() {
            if let Some(c) = CONTAINS_LIST.captures(cond) {
                if let Some(values) = string_list(&c[1]) {
                    node.enum_ = Some(values.into_iter().map(serde_json::Value::from).collect());
                }
            }
        }
    }
}

/// Undo source-level escaping inside a captured string literal, so
/// `"\\d+"` in condition text becomes the regex `\d+`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars();
    while let Some(c) = it.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match it.next() {
            Some(e @ ('"' | '\\')) => out.push(e),
            Some(e) => {
                out.push('\\');
                out.push(e);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse `"a", "b", "c"` into its string values. Anything non-literal in
/// the list disqualifies the whole hint (it would need evaluation).
fn string_list(inner: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for piece in inner.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let unquoted = piece.strip_prefix('"')?.strip_suffix('"')?;
        out.push(unescape(unquoted));
    }
    if out.is_empty() { None } else { Some(out) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(condition: &str) -> ValidationRule {
        ValidationRule { condition: condition.to_string(), error_message: String::new() }
    }

    fn string_node() -> SchemaNode {
        SchemaNode::of(SchemaType::One("string"))
    }

    #[test]
    fn length_bounds_map_to_min_max_length() {
        let mut node = string_node();
        apply_hints(
            &mut node,
            &[rule("length(var.name) >= 1 && length(var.name) <= 16")],
        );
        assert_eq!(node.min_length, Some(1));
        assert_eq!(node.max_length, Some(16));
    }

    #[test]
    fn strict_comparisons_tighten_by_one() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule("length(var.id) > 3"), rule("length(var.id) < 10")]);
        assert_eq!(node.min_length, Some(4));
        assert_eq!(node.max_length, Some(9));
    }

    #[test]
    fn regex_condition_carries_its_literal_pattern() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule(r#"can(regex("^ami-[a-z0-9]+$", var.image_id))"#)]);
        assert_eq!(node.pattern.as_deref(), Some("^ami-[a-z0-9]+$"));
    }

    #[test]
    fn regex_pattern_is_source_unescaped() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule(r#"can(regex("^\\d+$", var.count_text))"#)]);
        assert_eq!(node.pattern.as_deref(), Some(r"^\d+$"));
    }

    #[test]
    fn contains_list_becomes_an_enum() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule(r#"contains(["dev", "staging", "prod"], var.env)"#)]);
        assert_eq!(node.enum_, Some(vec![json!("dev"), json!("staging"), json!("prod")]));
    }

    #[test]
    fn non_literal_contains_is_ignored() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule("contains([local.allowed], var.env)")]);
        assert_eq!(node.enum_, None);
    }

    #[test]
    fn hints_never_touch_non_string_nodes() {
        let mut node = SchemaNode::of(SchemaType::One("number"));
        apply_hints(&mut node, &[rule("length(var.xs) >= 1")]);
        assert_eq!(node.min_length, None);

        let mut node = SchemaNode::of(SchemaType::any());
        apply_hints(&mut node, &[rule(r#"can(regex("x", var.v))"#)]);
        assert_eq!(node.pattern, None);
    }

    #[test]
    fn unrecognized_conditions_are_ignored() {
        let mut node = string_node();
        apply_hints(&mut node, &[rule("var.a != var.b"), rule("startswith(var.a, \"x\")")]);
        assert_eq!(node, string_node());
    }
}
