//! Lowers a parsed type expression into a JSON Schema Draft 7 subtree.
//!
//! The structural mapping is an exhaustive match over the AST, so every
//! constructor is handled somewhere visible. Variable-level context
//! (description, default, nullability, sensitivity, validation hints)
//! applies to the variable's top node only; nested nodes carry nothing
//! but structure and field-level defaults.

use crate::assemble::{ConvertOptions, UnknownTypePolicy};
use crate::defaults::{check_default, Mismatch};
use crate::error::{Diagnostic, Error};
use crate::expr::{FieldSpec, TypeExpr};
use crate::parse::ParseCache;
use crate::rules;
use crate::schema::{Items, SchemaNode, SchemaType};
use crate::variable::VariableSpec;
use indexmap::IndexMap;

/// Structural lowering. Field-default mismatches found along the way are
/// pushed onto `warn`; they never stop the lowering.
pub fn lower(ty: &TypeExpr, warn: &mut Vec<Mismatch>) -> SchemaNode {
    match ty {
        TypeExpr::String => SchemaNode::of(SchemaType::One("string")),
        TypeExpr::Number => SchemaNode::of(SchemaType::One("number")),
        TypeExpr::Bool => SchemaNode::of(SchemaType::One("boolean")),
        TypeExpr::Any => SchemaNode::of(SchemaType::any()),
        TypeExpr::List(elem) => {
            let mut node = SchemaNode::of(SchemaType::One("array"));
            node.items = Some(Items::One(Box::new(lower(elem, warn))));
            node
        }
        TypeExpr::Set(elem) => {
            let mut node = SchemaNode::of(SchemaType::One("array"));
            node.items = Some(Items::One(Box::new(lower(elem, warn))));
            node.unique_items = Some(true);
            node
        }
        TypeExpr::Tuple(elems) => {
            let mut node = SchemaNode::of(SchemaType::One("array"));
            node.items =
                Some(Items::Positional(elems.iter().map(|e| lower(e, warn)).collect()));
            node.min_items = Some(elems.len());
            node.max_items = Some(elems.len());
            node
        }
        TypeExpr::Map(elem) => {
            let mut node = SchemaNode::of(SchemaType::One("object"));
            node.additional_properties = Some(Box::new(lower(elem, warn)));
            node
        }
        TypeExpr::Object(fields) => lower_object(fields, warn),
    }
}

fn lower_object(fields: &IndexMap<String, FieldSpec>, warn: &mut Vec<Mismatch>) -> SchemaNode {
    let mut properties = IndexMap::with_capacity(fields.len());
    let mut required = Vec::new();

    for (name, field) in fields {
        let mut node = lower(&field.ty, warn);
        if let Some(d) = &field.default {
            for mut m in check_default(&field.ty, d) {
                m.path = format!("{name}.{}", m.path);
                warn.push(m);
            }
            node.default = Some(d.clone());
        }
        if !field.optional {
            required.push(name.clone());
        }
        properties.insert(name.clone(), node);
    }

    let mut node = SchemaNode::of(SchemaType::One("object"));
    node.properties = Some(properties);
    if !required.is_empty() {
        node.required = Some(required);
    }
    node
}

/// The degraded form: everything about the variable except its shape.
/// Used for unknown constructors under the `any`-fallback policy and for
/// lenient-mode degradation.
pub(crate) fn open_node(var: &VariableSpec) -> SchemaNode {
    let mut node = SchemaNode::of(SchemaType::any());
    if let Some(d) = &var.default {
        node.default = Some(d.clone());
    }
    node
}

/// Compile one variable: parse (through the cache), lower, then apply the
/// variable-level context. Returns the node plus that variable's warnings.
pub fn compile_variable(
    var: &VariableSpec,
    cache: &ParseCache,
    opts: &ConvertOptions,
) -> Result<(SchemaNode, Vec<Diagnostic>), Error> {
    let parsed = cache.parse(&var.raw_type);
    let mut diags = Vec::new();

    let mut node = match parsed.as_ref() {
        Ok(ty) => {
            let mut mismatches = Vec::new();
            let mut node = lower(ty, &mut mismatches);
            if let Some(d) = &var.default {
                if d.is_null() && !var.nullable {
                    mismatches.push(Mismatch {
                        path: "default".to_string(),
                        expected: "a non-null value (variable is not nullable)".to_string(),
                        found: "null".to_string(),
                    });
                } else {
                    mismatches.extend(check_default(ty, d));
                }
                // carried through even when mismatched
                node.default = Some(d.clone());
            }
            diags.extend(mismatches.iter().map(|m| Diagnostic::default_mismatch(&var.name, m)));
            rules::apply_hints(&mut node, &var.validations);
            if var.nullable {
                node.ty.widen_null();
            }
            node
        }
        Err(Error::UnknownTypeConstructor { name, .. })
            if opts.unknown_types == UnknownTypePolicy::FallbackAny =>
        {
            diags.push(Diagnostic::degraded_unknown(&var.name, name));
            open_node(var)
        }
        Err(e) => return Err(e.clone()),
    };

    if let Some(description) = &var.description {
        if !description.is_empty() {
            node.description = Some(description.clone());
        }
    }
    if var.sensitive {
        node.write_only = Some(true);
    }
    // `ephemeral` is a value-lifecycle attribute; the shape is unaffected.

    for d in &diags {
        tracing::warn!(variable = %var.name, "{}", d.message);
    }

    Ok((node, diags))
}

// ------------------------------- Tests ------------------------------------ //
