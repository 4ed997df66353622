use serde_json::{Map, Value};

use crate::types::{FieldKind, SchemaMeta, Tool};

impl SchemaMeta {
    /// Check raw call arguments against the declared fields.
    ///
    /// Returns the arguments restricted to declared fields. Undeclared keys
    /// are dropped, never rejected. `null` arguments count as `{}`.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, String> {
        let empty = Map::new();
        let obj = match args {
            Value::Null => &empty,
            Value::Object(obj) => obj,
            _ => return Err("arguments must be an object".into()),
        };

        let mut validated = Map::new();
        for field in &self.fields {
            let value = match obj.get(&field.name) {
                Some(v) => v,
                None if field.optional => continue,
                None => return Err(format!("missing required field \"{}\"", field.name)),
            };

            match &field.kind {
                FieldKind::Enum(allowed) => {
                    let ok = value.as_str().is_some_and(|s| allowed.iter().any(|a| a == s));
                    if !ok {
                        return Err(format!(
                            "field \"{}\" must be one of: {}",
                            field.name,
                            allowed.join(", ")
                        ));
                    }
                }
                FieldKind::Number => {
                    if !value.as_f64().is_some_and(f64::is_finite) {
                        return Err(format!("field \"{}\" must be a finite number", field.name));
                    }
                }
                FieldKind::String => {
                    if !value.is_string() {
                        return Err(format!("field \"{}\" must be a string", field.name));
                    }
                }
            }

            validated.insert(field.name.clone(), value.clone());
        }

        Ok(validated)
    }
}

impl Tool {
    /// Validate arguments against the tool's input schema metadata.
    pub fn validate_arguments(&self, args: &Value) -> Result<Map<String, Value>, String> {
        self.schema_meta.validate(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_tools;
    use serde_json::json;

    fn make_tool(schema_json: &str) -> Tool {
        let json = format!(
            r#"[{{"name":"test","description":"test","inputSchema":{}}}]"#,
            schema_json
        );
        let tools = parse_tools(json.as_bytes()).unwrap();
        tools.into_iter().next().unwrap()
    }

    fn calc_tool() -> Tool {
        make_tool(
            r#"{"type":"object","properties":{"operation":{"type":"string","enum":["add","subtract","multiply","divide"]},"a":{"type":"number"},"b":{"type":"number"}},"required":["operation","a","b"]}"#,
        )
    }

    #[test]
    fn test_validate_required_present() {
        let tool = make_tool(r#"{"type":"object","properties":{"name":{"type":"string"}},"required":["name"]}"#);
        let args = json!({"name": "hello"});
        assert!(tool.validate_arguments(&args).is_ok());
    }

    #[test]
    fn test_validate_required_missing() {
        let tool = make_tool(r#"{"type":"object","properties":{"name":{"type":"string"}},"required":["name"]}"#);
        let err = tool.validate_arguments(&json!({})).unwrap_err();
        assert!(err.contains("missing required field \"name\""));
    }

    #[test]
    fn test_validate_optional_may_be_absent() {
        let tool = make_tool(r#"{"type":"object","properties":{"name":{"type":"string"}}}"#);
        let validated = tool.validate_arguments(&json!({})).unwrap();
        assert!(validated.is_empty());
    }

    #[test]
    fn test_validate_optional_still_type_checked() {
        let tool = make_tool(r#"{"type":"object","properties":{"name":{"type":"string"}}}"#);
        let err = tool.validate_arguments(&json!({"name": 5})).unwrap_err();
        assert!(err.contains("must be a string"));
    }

    #[test]
    fn test_validate_calc_ok() {
        let tool = calc_tool();
        let validated = tool
            .validate_arguments(&json!({"operation": "multiply", "a": 6, "b": 7}))
            .unwrap();
        assert_eq!(validated["operation"], "multiply");
        assert_eq!(validated["a"], 6);
    }

    #[test]
    fn test_validate_enum_rejects_unknown_literal() {
        let err = calc_tool()
            .validate_arguments(&json!({"operation": "modulo", "a": 1, "b": 2}))
            .unwrap_err();
        assert!(err.contains("must be one of: add, subtract, multiply, divide"));
    }

    #[test]
    fn test_validate_enum_rejects_non_string() {
        let err = calc_tool()
            .validate_arguments(&json!({"operation": 1, "a": 1, "b": 2}))
            .unwrap_err();
        assert!(err.contains("\"operation\""));
    }

    #[test]
    fn test_validate_number_rejects_string() {
        let err = calc_tool()
            .validate_arguments(&json!({"operation": "add", "a": "not-a-number", "b": 1}))
            .unwrap_err();
        assert!(err.contains("field \"a\" must be a finite number"));
    }

    #[test]
    fn test_validate_number_rejects_null() {
        let err = calc_tool()
            .validate_arguments(&json!({"operation": "add", "a": 1, "b": null}))
            .unwrap_err();
        assert!(err.contains("\"b\""));
    }

    #[test]
    fn test_validate_strips_unknown_fields() {
        let validated = calc_tool()
            .validate_arguments(&json!({"operation": "add", "a": 1, "b": 2, "extra": true}))
            .unwrap();
        assert_eq!(validated.len(), 3);
        assert!(!validated.contains_key("extra"));
    }

    #[test]
    fn test_validate_null_args_treated_as_empty() {
        let tool = make_tool(r#"{"type":"object","properties":{}}"#);
        assert!(tool.validate_arguments(&Value::Null).unwrap().is_empty());
        assert!(calc_tool().validate_arguments(&Value::Null).is_err());
    }

    #[test]
    fn test_validate_rejects_non_object_args() {
        let err = calc_tool().validate_arguments(&json!([1, 2])).unwrap_err();
        assert_eq!(err, "arguments must be an object");
    }
}
