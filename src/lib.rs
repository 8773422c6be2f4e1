//! Convert declarative variable declarations into JSON Schema Draft 7.
//!
//! The pipeline: variable records (from an external declaration
//! extractor) → type-expression parse → recursive lowering into a typed
//! schema subtree → one assembled document per variable set.
//!
//! ```
//! use varschema::{convert, ConvertOptions, VariableSpec};
//!
//! let vars = vec![
//!     VariableSpec::new("region", "string").with_description("Deployment region"),
//!     VariableSpec::new("tags", "map(string)").with_default(serde_json::json!({})),
//! ];
//! let out = convert(&vars, &ConvertOptions::default()).unwrap();
//! assert_eq!(out.document.required, vec!["region"]);
//! ```

pub mod assemble;
pub mod defaults;
pub mod error;
pub mod expr;
pub mod lower;
pub mod parse;
pub mod rules;
pub mod schema;
pub mod variable;

pub use assemble::{
    convert, convert_parallel, Conversion, ConvertOptions, FailureMode, UnknownTypePolicy,
};
pub use error::{Diagnostic, Error, Severity};
pub use expr::{FieldSpec, TypeExpr};
pub use parse::{parse_type_expr, ParseCache};
pub use schema::{Document, Items, SchemaNode, SchemaType, DRAFT7_URI};
pub use variable::{ValidationRule, VariableSpec};
