//! Typed JSON Schema Draft 7 model.
//!
//! Sparse by construction: every key except `type` is optional and skipped
//! when unset, so serialized subtrees carry exactly the keys the compiler
//! decided on. `type` is either a scalar name or a widened array, never
//! both at once; the untagged enum makes the other shape unrepresentable.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

pub const DRAFT7_URI: &str = "http://json-schema.org/draft-07/schema#";

/// Every JSON kind, in the order the open `any` type lists them.
const ANY_TYPE_NAMES: [&str; 6] = ["string", "number", "boolean", "object", "array", "null"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaType {
    One(&'static str),
    Many(Vec<&'static str>),
}

impl SchemaType {
    /// The open type: accepts every JSON kind.
    pub fn any() -> Self {
        SchemaType::Many(ANY_TYPE_NAMES.to_vec())
    }

    /// Widen to admit `null`. Already-widened arrays gain it at most once.
    pub fn widen_null(&mut self) {
        match self {
            SchemaType::One(t) => {
                let t = *t;
                *self = SchemaType::Many(vec![t, "null"]);
            }
            SchemaType::Many(ts) => {
                if !ts.contains(&"null") {
                    ts.push("null");
                }
            }
        }
    }
}

/// `items` is a single schema for homogeneous arrays and a positional
/// array of schemas for fixed-arity tuples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Items {
    One(Box<SchemaNode>),
    Positional(Vec<SchemaNode>),
}

/// One compiled subtree. Field order is serialization order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub ty: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl SchemaNode {
    pub fn of(ty: SchemaType) -> Self {
        SchemaNode {
            ty,
            description: None,
            default: None,
            write_only: None,
            enum_: None,
            pattern: None,
            min_length: None,
            max_length: None,
            properties: None,
            required: None,
            additional_properties: None,
            items: None,
            unique_items: None,
            min_items: None,
            max_items: None,
        }
    }
}

/// The complete document for one module's variable set. Top-level
/// `required` is always serialized, even when empty; nested objects omit
/// theirs when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_type_serializes_sparse() {
        let node = SchemaNode::of(SchemaType::One("string"));
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type": "string"}));
    }

    #[test]
    fn widened_type_serializes_as_array() {
        let mut ty = SchemaType::One("number");
        ty.widen_null();
        let node = SchemaNode::of(ty);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": ["number", "null"]})
        );
    }

    #[test]
    fn widening_is_idempotent() {
        let mut ty = SchemaType::any();
        ty.widen_null();
        ty.widen_null();
        assert_eq!(ty, SchemaType::any());
    }

    #[test]
    fn items_forms_are_distinct() {
        let list = SchemaNode {
            items: Some(Items::One(Box::new(SchemaNode::of(SchemaType::One("string"))))),
            ..SchemaNode::of(SchemaType::One("array"))
        };
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"type": "array", "items": {"type": "string"}})
        );

        let tuple = SchemaNode {
            items: Some(Items::Positional(vec![SchemaNode::of(SchemaType::One("boolean"))])),
            ..SchemaNode::of(SchemaType::One("array"))
        };
        assert_eq!(
            serde_json::to_value(&tuple).unwrap(),
            json!({"type": "array", "items": [{"type": "boolean"}]})
        );
    }

    #[test]
    fn document_keys_come_out_in_declaration_order() {
        let doc = Document {
            schema: DRAFT7_URI.to_string(),
            title: "t".into(),
            description: "d".into(),
            ty: "object",
            properties: IndexMap::new(),
            required: Vec::new(),
        };
        let v = serde_json::to_value(&doc).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["$schema", "title", "description", "type", "properties", "required"]
        );
    }
}
