use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{FieldKind, FieldSchema, McpError, SchemaMeta, Tool};

/// On-disk shape of one tool definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolDefinition {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default = "empty_object_schema")]
    input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Load tool definitions from a JSON file on disk.
pub fn load_tools(path: impl AsRef<Path>) -> Result<Vec<Tool>, McpError> {
    let data = std::fs::read(path)?;
    parse_tools(&data)
}

/// Parse tool definitions from raw JSON bytes (a JSON array of tools).
pub fn parse_tools(data: &[u8]) -> Result<Vec<Tool>, McpError> {
    let raw: Vec<Value> = serde_json::from_slice(data)?;
    raw.into_iter().map(parse_tool).collect()
}

/// Parse a single tool definition.
pub fn parse_tool(value: Value) -> Result<Tool, McpError> {
    let def: ToolDefinition = serde_json::from_value(value)?;
    if def.name.trim().is_empty() {
        return Err(McpError::Schema("tool name must not be empty".into()));
    }

    let schema_meta = parse_schema_meta(&def.input_schema)
        .map_err(|e| McpError::Schema(format!("tool \"{}\": {}", def.name, e)))?;

    Ok(Tool {
        name: def.name,
        title: def.title,
        description: def.description,
        input_schema: def.input_schema,
        schema_meta,
    })
}

/// Compile a JSON Schema object into validation metadata.
///
/// Only the subset a tool's argument object needs is understood: string
/// enums, numbers, strings, and the `required` list. Anything else is
/// rejected at load time rather than silently accepted at call time.
fn parse_schema_meta(schema: &Value) -> Result<SchemaMeta, String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "inputSchema must be an object".to_string())?;

    if let Some(ty) = obj.get("type") {
        if ty != "object" {
            return Err(format!("inputSchema type must be \"object\", got {}", ty));
        }
    }

    let required: HashSet<&str> = match obj.get("required") {
        None => HashSet::new(),
        Some(Value::Array(arr)) => arr
            .iter()
            .map(|v| v.as_str().ok_or_else(|| "required entries must be strings".to_string()))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err("required must be an array".into()),
    };

    let properties = match obj.get("properties") {
        None => serde_json::Map::new(),
        Some(Value::Object(props)) => props.clone(),
        Some(_) => return Err("properties must be an object".into()),
    };

    for name in &required {
        if !properties.contains_key(*name) {
            return Err(format!("required field \"{}\" is not declared in properties", name));
        }
    }

    let mut fields = Vec::with_capacity(properties.len());
    for (name, prop) in &properties {
        fields.push(FieldSchema {
            name: name.clone(),
            kind: parse_field_kind(name, prop)?,
            optional: !required.contains(name.as_str()),
        });
    }

    Ok(SchemaMeta { fields })
}

fn parse_field_kind(name: &str, prop: &Value) -> Result<FieldKind, String> {
    if let Some(values) = prop.get("enum") {
        let values = values
            .as_array()
            .ok_or_else(|| format!("field \"{}\": enum must be an array", name))?;
        if values.is_empty() {
            return Err(format!("field \"{}\": enum must not be empty", name));
        }
        let literals = values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or_else(|| format!("field \"{}\": enum values must be strings", name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(FieldKind::Enum(literals));
    }

    match prop.get("type").and_then(|t| t.as_str()) {
        Some("number") => Ok(FieldKind::Number),
        Some("string") => Ok(FieldKind::String),
        Some(other) => Err(format!("field \"{}\": unsupported type \"{}\"", name, other)),
        None => Err(format!("field \"{}\": missing type", name)),
    }
}
