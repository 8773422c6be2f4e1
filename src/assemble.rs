//! Document assembly: per-variable compile, then a deterministic,
//! order-preserving merge.
//!
//! Each variable's compile is referentially transparent, so the map step
//! can fan out across a rayon pool; the merge always walks the input in
//! declaration order, so `required` and `properties` never depend on
//! completion order.

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::{Diagnostic, Error};
use crate::lower::{compile_variable, open_node};
use crate::parse::ParseCache;
use crate::schema::{Document, SchemaNode, DRAFT7_URI};
use crate::variable::VariableSpec;

pub const DEFAULT_TITLE: &str = "Variables Schema";
pub const DEFAULT_DESCRIPTION: &str = "Generated JSON Schema from variable declarations";

/// Deep enough for any hand-written declaration; shallow enough to stop
/// adversarial nesting long before the stack does.
const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownTypePolicy {
    /// Unknown constructors fail the variable (CI posture).
    Error,
    /// Unknown constructors degrade the variable to the open `any` schema,
    /// with a warning diagnostic.
    FallbackAny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Any variable error aborts the whole document.
    Strict,
    /// Failing variables are omitted; diagnostics still come back.
    LenientSkip,
    /// Failing variables degrade to the open `any` schema.
    LenientAny,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub unknown_types: UnknownTypePolicy,
    pub failure_mode: FailureMode,
    pub max_depth: usize,
    pub title: String,
    pub description: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            unknown_types: UnknownTypePolicy::Error,
            failure_mode: FailureMode::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// A finished conversion: the document plus everything worth telling the
/// user about how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert one module's variable set, compiling serially.
pub fn convert(vars: &[VariableSpec], opts: &ConvertOptions) -> Result<Conversion, Error> {
    let compiled = compile_all(vars, opts, false)?;
    assemble(vars, compiled, opts)
}

/// Same transformation, compiling variables across the rayon pool. Output
/// is identical to [`convert`]: assembly re-serializes on declaration
/// order.
pub fn convert_parallel(vars: &[VariableSpec], opts: &ConvertOptions) -> Result<Conversion, Error> {
    let compiled = compile_all(vars, opts, true)?;
    assemble(vars, compiled, opts)
}

type Compiled = Result<(SchemaNode, Vec<Diagnostic>), Error>;

fn compile_all(vars: &[VariableSpec], opts: &ConvertOptions, parallel: bool) -> Result<Vec<Compiled>, Error> {
    if vars.is_empty() {
        return Err(Error::EmptyVariableSet);
    }
    let cache = ParseCache::new(opts.max_depth);
    let run = |v: &VariableSpec| {
        compile_variable(v, &cache, opts)
            .map_err(|e| Error::Variable { name: v.name.clone(), source: Box::new(e) })
    };
    Ok(if parallel {
        vars.par_iter().map(run).collect()
    } else {
        vars.iter().map(run).collect()
    })
}

fn assemble(vars: &[VariableSpec], compiled: Vec<Compiled>, opts: &ConvertOptions) -> Result<Conversion, Error> {
    let mut properties = IndexMap::with_capacity(vars.len());
    let mut required = Vec::new();
    let mut diagnostics = Vec::new();

    for (var, result) in vars.iter().zip(compiled) {
        let node = match result {
            Ok((node, diags)) => {
                diagnostics.extend(diags);
                node
            }
            Err(err) => match opts.failure_mode {
                FailureMode::Strict => return Err(err),
                FailureMode::LenientSkip => {
                    diagnostics.push(Diagnostic::skipped(&var.name, &err));
                    continue;
                }
                FailureMode::LenientAny => {
                    diagnostics.push(Diagnostic::degraded(&var.name, &err));
                    let mut node = open_node(var);
                    if let Some(d) = &var.description {
                        if !d.is_empty() {
                            node.description = Some(d.clone());
                        }
                    }
                    if var.sensitive {
                        node.write_only = Some(true);
                    }
                    node
                }
            },
        };

        if is_required(var) {
            required.push(var.name.clone());
        }
        properties.insert(var.name.clone(), node);
    }

    Ok(Conversion {
        document: Document {
            schema: DRAFT7_URI.to_string(),
            title: opts.title.clone(),
            description: opts.description.clone(),
            ty: "object",
            properties,
            required,
        },
        diagnostics,
    })
}

/// A variable is required when it has no usable default. A `null` default
/// on a non-nullable variable is unusable: the declaration still demands
/// a caller-supplied value.
fn is_required(var: &VariableSpec) -> bool {
    match &var.default {
        None => var.required,
        Some(d) => d.is_null() && !var.nullable,
    }
}

// ------------------------------- Tests ------------------------------------ //
