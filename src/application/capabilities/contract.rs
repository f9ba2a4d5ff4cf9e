//! Input contracts
//!
//! Each capability declares a typed contract over named fields. The
//! registry validates raw model input against it before dispatch, and
//! the same declaration renders the JSON schema advertised to model
//! providers.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Integer { min: Option<i64>, max: Option<i64> },
    Bool,
    OneOf { allowed: Vec<&'static str> },
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct InputContract {
    fields: Vec<FieldSpec>,
}

impl InputContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_text(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: FieldKind::Text,
            required: true,
            description,
        });
        self
    }

    pub fn optional_text(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: FieldKind::Text,
            required: false,
            description,
        });
        self
    }

    pub fn optional_integer(
        mut self,
        name: &'static str,
        description: &'static str,
        min: i64,
        max: i64,
    ) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: FieldKind::Integer {
                min: Some(min),
                max: Some(max),
            },
            required: false,
            description,
        });
        self
    }

    pub fn optional_bool(mut self, name: &'static str, description: &'static str) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: FieldKind::Bool,
            required: false,
            description,
        });
        self
    }

    pub fn require_one_of(
        mut self,
        name: &'static str,
        description: &'static str,
        allowed: Vec<&'static str>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind: FieldKind::OneOf { allowed },
            required: true,
            description,
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Check raw input against the contract. Unknown fields pass
    /// through untouched; models routinely attach extras.
    pub fn validate(&self, input: &Value) -> Result<ValidatedInput, Vec<String>> {
        let object = match input {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(vec!["input must be a JSON object".to_string()]),
        };

        let mut violations = Vec::new();
        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        violations.push(format!("missing required field '{}'", field.name));
                    }
                }
                Some(value) => check_field(field, value, &mut violations),
            }
        }

        if violations.is_empty() {
            Ok(ValidatedInput { values: object })
        } else {
            Err(violations)
        }
    }

    /// JSON schema advertised to model providers.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let spec = match &field.kind {
                FieldKind::Text => json!({
                    "type": "string",
                    "description": field.description,
                }),
                FieldKind::Integer { min, max } => {
                    let mut spec = json!({
                        "type": "integer",
                        "description": field.description,
                    });
                    if let Some(min) = min {
                        spec["minimum"] = json!(min);
                    }
                    if let Some(max) = max {
                        spec["maximum"] = json!(max);
                    }
                    spec
                }
                FieldKind::Bool => json!({
                    "type": "boolean",
                    "description": field.description,
                }),
                FieldKind::OneOf { allowed } => json!({
                    "type": "string",
                    "enum": allowed,
                    "description": field.description,
                }),
            };
            properties.insert(field.name.to_string(), spec);
            if field.required {
                required.push(Value::String(field.name.to_string()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn check_field(field: &FieldSpec, value: &Value, violations: &mut Vec<String>) {
    match &field.kind {
        FieldKind::Text => match value.as_str() {
            None => violations.push(format!("field '{}' must be a string", field.name)),
            Some(text) if field.required && text.trim().is_empty() => {
                violations.push(format!("field '{}' must not be empty", field.name));
            }
            Some(_) => {}
        },
        FieldKind::Integer { min, max } => match value.as_i64() {
            None => violations.push(format!("field '{}' must be an integer", field.name)),
            Some(number) => {
                let below = min.is_some_and(|min| number < min);
                let above = max.is_some_and(|max| number > max);
                if below || above {
                    violations.push(format!(
                        "field '{}' must be between {} and {}",
                        field.name,
                        min.map_or("-inf".to_string(), |m| m.to_string()),
                        max.map_or("inf".to_string(), |m| m.to_string()),
                    ));
                }
            }
        },
        FieldKind::Bool => {
            if value.as_bool().is_none() {
                violations.push(format!("field '{}' must be a boolean", field.name));
            }
        }
        FieldKind::OneOf { allowed } => match value.as_str() {
            None => violations.push(format!("field '{}' must be a string", field.name)),
            Some(choice) if !allowed.contains(&choice) => violations.push(format!(
                "field '{}' must be one of: {}",
                field.name,
                allowed.join(", ")
            )),
            Some(_) => {}
        },
    }
}

/// Input that passed contract validation.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    values: Map<String, Value>,
}

impl ValidatedInput {
    /// Required text fields are guaranteed present after validation;
    /// optional ones read as empty.
    pub fn text(&self, name: &str) -> &str {
        self.values.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn integer_or(&self, name: &str, default: i64) -> i64 {
        self.integer(name).unwrap_or(default)
    }

    /// Absent flags read as false.
    pub fn flag(&self, name: &str) -> bool {
        self.values.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> InputContract {
        InputContract::new()
            .require_text("title", "Post title")
            .optional_integer("limit", "How many", 1, 100)
            .optional_bool("draft", "Hold the post back")
            .require_one_of("direction", "Vote direction", vec!["up", "down"])
    }

    #[test]
    fn valid_input_passes_and_reads_back() {
        let input = contract()
            .validate(&json!({"title": "hello", "limit": 10, "draft": true, "direction": "up"}))
            .unwrap();
        assert_eq!(input.text("title"), "hello");
        assert_eq!(input.integer("limit"), Some(10));
        assert_eq!(input.integer_or("missing", 25), 25);
        assert!(input.flag("draft"));
        assert!(!input.flag("missing"));
    }

    #[test]
    fn missing_required_fields_are_each_reported() {
        let violations = contract().validate(&json!({})).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("title"));
        assert!(violations[1].contains("direction"));
    }

    #[test]
    fn type_range_and_enum_violations_are_caught() {
        let violations = contract()
            .validate(&json!({"title": 7, "limit": 500, "draft": "yes", "direction": "sideways"}))
            .unwrap_err();
        assert_eq!(violations.len(), 4);
        assert!(violations[0].contains("must be a string"));
        assert!(violations[1].contains("between 1 and 100"));
        assert!(violations[2].contains("must be a boolean"));
        assert!(violations[3].contains("one of: up, down"));
    }

    #[test]
    fn required_text_must_not_be_blank() {
        let violations = contract()
            .validate(&json!({"title": "   ", "direction": "up"}))
            .unwrap_err();
        assert!(violations[0].contains("must not be empty"));
    }

    #[test]
    fn null_and_missing_optionals_are_fine() {
        let input = contract()
            .validate(&json!({"title": "t", "direction": "down", "limit": null}))
            .unwrap();
        assert_eq!(input.integer("limit"), None);
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(contract().validate(&json!([1, 2])).is_err());
        assert!(contract().validate(&json!("text")).is_err());
    }

    #[test]
    fn empty_contract_accepts_null_input() {
        let contract = InputContract::new();
        assert!(contract.validate(&Value::Null).is_ok());
    }

    #[test]
    fn unknown_fields_pass_through() {
        let input = contract()
            .validate(&json!({"title": "t", "direction": "up", "extra": true}))
            .unwrap();
        assert_eq!(input.text("title"), "t");
    }

    #[test]
    fn schema_lists_properties_and_required_fields() {
        let schema = contract().json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["title"]["type"], "string");
        assert_eq!(schema["properties"]["limit"]["minimum"], 1);
        assert_eq!(schema["properties"]["limit"]["maximum"], 100);
        assert_eq!(schema["properties"]["draft"]["type"], "boolean");
        assert_eq!(schema["properties"]["direction"]["enum"][0], "up");
        assert_eq!(schema["required"], json!(["title", "direction"]));
    }
}
