//! Structural input schemas for tools.
//!
//! One declaration drives both runtime validation of the raw payload the
//! model sends and the JSON-Schema-shaped description sent to the model.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of value a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    /// Parse a JSON Schema type name. Unknown names fall back to `String`.
    pub fn parse(name: &str) -> Self {
        match name {
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64() || whole_float(value).is_some(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Models often send integers as `30.0`; store those as real integers.
    fn normalize(&self, value: &Value) -> Value {
        match (self, whole_float(value)) {
            (Self::Integer, Some(n)) => Value::from(n),
            _ => value.clone(),
        }
    }
}

fn whole_float(value: &Value) -> Option<i64> {
    let f = value.as_f64().filter(|_| value.is_f64())?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// One named field of a tool's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

/// An object-shaped input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    pub fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn required(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            description: non_empty(description),
            optional: false,
        });
        self
    }

    /// Add an optional field.
    pub fn optional(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            description: non_empty(description),
            optional: true,
        });
        self
    }

    /// Build a schema from a JSON Schema object description.
    ///
    /// Only `properties`, `type`, `description` and `required` are read.
    /// A property whose type is missing or unrecognised is treated as a string.
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let fields = schema["properties"]
            .as_object()
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| FieldSpec {
                        name: name.clone(),
                        kind: FieldKind::parse(declared_type(prop)),
                        description: prop["description"].as_str().map(String::from),
                        optional: !required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { fields }
    }

    /// Neutral structural description sent to adapters.
    pub fn to_provider_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(field.kind.as_str().into()));
            if let Some(description) = &field.description {
                prop.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
            if !field.optional {
                required.push(Value::String(field.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate a raw payload and narrow it to the declared fields.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedInput, ValidationError> {
        let object = raw.as_object().ok_or(ValidationError::NotAnObject {
            found: json_kind(raw),
        })?;

        let mut narrowed = Map::new();
        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) if field.optional => {}
                None | Some(Value::Null) => {
                    return Err(ValidationError::MissingField {
                        field: field.name.clone(),
                    });
                }
                Some(value) if !field.kind.matches(value) => {
                    return Err(ValidationError::WrongKind {
                        field: field.name.clone(),
                        expected: field.kind.as_str(),
                        found: json_kind(value),
                    });
                }
                Some(value) => {
                    narrowed.insert(field.name.clone(), field.kind.normalize(value));
                }
            }
        }

        Ok(ValidatedInput(narrowed))
    }
}

/// A payload that passed its schema, holding only declared fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedInput(Map<String, Value>);

impl ValidatedInput {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn declared_type(prop: &Value) -> &str {
    match &prop["type"] {
        Value::String(name) => name,
        // ["string", "null"] style unions: take the first non-null entry
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|n| *n != "null")
            .unwrap_or("string"),
        _ => "string",
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}
