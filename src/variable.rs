//! Variable records handed over by the declaration extractor.
//!
//! Field names mirror the extractor's JSON output (`type` for the raw
//! type text, `validation` for the rule list), so serialized record sets
//! load directly.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declared variable, exactly as extracted. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    /// Raw type expression text, non-normalized (`list(string)`, ...).
    #[serde(rename = "type")]
    pub raw_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    /// Set by the extractor when the declaration carries no default.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sensitive: bool,
    /// Declarations are nullable unless they explicitly opt out.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Value-lifecycle attribute of a different system; carried through
    /// with no structural effect on the schema.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default, rename = "validation")]
    pub validations: Vec<ValidationRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub condition: String,
    #[serde(default)]
    pub error_message: String,
}

fn default_true() -> bool {
    true
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        VariableSpec {
            name: name.into(),
            raw_type: raw_type.into(),
            description: None,
            default: None,
            required: true,
            sensitive: false,
            nullable: true,
            ephemeral: false,
            validations: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declaring a default makes the variable non-required.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }

    /// Load a serialized record list, reporting the JSON path of any
    /// mismatch (`[2].type`, not just a line/column pair).
    pub fn list_from_json(src: &str) -> Result<Vec<VariableSpec>, String> {
        from_str_with_path(src)
    }
}

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_load_with_extractor_field_names() {
        let src = r#"[
            {"name": "region", "type": "string", "description": "where", "required": true},
            {"name": "tags", "type": "map(string)", "default": {}, "required": false,
             "validation": [{"condition": "length(var.tags) > 0", "error_message": "need one"}]}
        ]"#;
        let vars = VariableSpec::list_from_json(src).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].raw_type, "string");
        assert!(vars[0].nullable, "nullable defaults to true when absent");
        assert_eq!(vars[1].default, Some(json!({})));
        assert_eq!(vars[1].validations.len(), 1);
    }

    #[test]
    fn load_errors_carry_the_json_path() {
        let err = VariableSpec::list_from_json(r#"[{"name": "a", "type": 5}]"#).unwrap_err();
        assert!(err.contains("[0].type"), "got: {err}");
    }

    #[test]
    fn explicit_nullable_false_survives_round_trip() {
        let var =
            VariableSpec { nullable: false, ..VariableSpec::new("n", "string") };
        let text = serde_json::to_string(&var).unwrap();
        let back: VariableSpec = serde_json::from_str(&text).unwrap();
        assert!(!back.nullable);
    }
}
