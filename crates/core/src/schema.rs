//! Declared argument schemas for tools.
//!
//! Tools declare a flat mapping of argument name → primitive type plus a
//! required flag. The schema is exported to the model as JSON Schema and
//! used to validate the model's arguments before any adapter runs.

use serde::{Deserialize, Serialize};

/// Primitive argument types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ArgKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    pub required: bool,
    pub description: String,
}

/// Ordered set of argument specifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    args: Vec<ArgSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: ArgKind, description: &str) -> Self {
        self.arg(name, kind, true, description)
    }

    pub fn optional(self, name: &str, kind: ArgKind, description: &str) -> Self {
        self.arg(name, kind, false, description)
    }

    fn arg(mut self, name: &str, kind: ArgKind, required: bool, description: &str) -> Self {
        self.args.push(ArgSpec {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        });
        self
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Export as a JSON Schema object.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for a in &self.args {
            properties.insert(
                a.name.clone(),
                serde_json::json!({
                    "type": a.kind.json_type(),
                    "description": a.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate `arguments` against the schema.
    ///
    /// `null` optional arguments are treated as absent.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), String> {
        let obj = arguments
            .as_object()
            .ok_or_else(|| format!("arguments must be a JSON object, got {arguments}"))?;

        for key in obj.keys() {
            if !self.args.iter().any(|a| &a.name == key) {
                return Err(format!("unexpected argument '{key}'"));
            }
        }

        for spec in &self.args {
            match obj.get(&spec.name) {
                None | Some(serde_json::Value::Null) if spec.required => {
                    return Err(format!("missing required argument '{}'", spec.name));
                }
                None | Some(serde_json::Value::Null) => {}
                Some(v) if !spec.kind.accepts(v) => {
                    return Err(format!(
                        "argument '{}' must be of type {}",
                        spec.name,
                        spec.kind.json_type()
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
