//! Minimal parameter-structure validator for actions.

use serde_json::{Map, Value, json};

use crate::error::ActionError;

/// JSON kind a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Bool,
    Object,
    Array,
    Any,
}

impl ParamKind {
    fn matches(self, v: &Value) -> bool {
        match self {
            ParamKind::String => v.is_string(),
            ParamKind::Number => v.is_number(),
            ParamKind::Integer => v.is_i64() || v.is_u64(),
            ParamKind::Bool => v.is_boolean(),
            ParamKind::Object => v.is_object(),
            ParamKind::Array => v.is_array(),
            ParamKind::Any => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Bool => "boolean",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
            ParamKind::Any => "any",
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    kind: ParamKind,
    required: bool,
}

/// Object schema: named fields, each required or optional, each of one kind.
///
/// ```
/// use taskpilot::{ParamKind, ParamSchema};
/// use serde_json::json;
///
/// let schema = ParamSchema::object()
///     .required("url", ParamKind::String)
///     .optional("timeout_ms", ParamKind::Integer);
///
/// assert!(schema.validate(&json!({"url": "https://example.com"})).is_ok());
/// assert!(schema.validate(&json!({"timeout_ms": 5})).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    fields: Vec<Field>,
}

impl ParamSchema {
    /// Empty object schema; accepts any object.
    pub fn object() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Validates `params`; `null` counts as an empty object.
    pub fn validate(&self, params: &Value) -> Result<(), ActionError> {
        let empty = Map::new();
        let obj = match params {
            Value::Object(m) => m,
            Value::Null => &empty,
            _ => return Err(ActionError::NotAnObject),
        };

        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ActionError::Missing(field.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(v) if !field.kind.matches(v) => {
                    return Err(ActionError::WrongType {
                        field: field.name.clone(),
                        expected: field.kind.as_str(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// JSON-Schema rendering, for tool lists handed to the runner.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                let ty = match f.kind {
                    ParamKind::Any => json!({}),
                    k => json!({ "type": k.as_str() }),
                };
                (f.name.clone(), ty)
            })
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        json!({ "type": "object", "properties": properties, "required": required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_problem() {
        let schema = ParamSchema::object()
            .required("selector", ParamKind::String)
            .optional("count", ParamKind::Integer);

        assert_eq!(schema.validate(&json!([1])), Err(ActionError::NotAnObject));
        assert_eq!(
            schema.validate(&json!({"selector": null})),
            Err(ActionError::Missing("selector".into()))
        );
        assert_eq!(
            schema.validate(&json!({"selector": "#go", "count": 1.5})),
            Err(ActionError::WrongType {
                field: "count".into(),
                expected: "integer"
            })
        );
        assert!(schema.validate(&json!({"selector": "#go"})).is_ok());
    }

    #[test]
    fn renders_json_schema() {
        let schema = ParamSchema::object().required("url", ParamKind::String);
        assert_eq!(
            schema.to_json_schema(),
            json!({"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]})
        );
    }
}
