use mcp_boilerplate::{
    error_result, structured_result, ServerBuilder, ToolResult, TypedToolHandler,
};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DIVISION_BY_ZERO: &str = "Error: Division by zero is not allowed";

/// Largest magnitude below which every integral f64 is exactly an i64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateArgs {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

pub fn register(srv: &mut ServerBuilder) {
    srv.handle_tool(
        "calculate",
        TypedToolHandler::new(|args: CalculateArgs| async move { Ok(calculate(&args)) }),
    );
}

/// Evaluate one arithmetic operation.
///
/// Division by zero is a tool-level error and, unlike every success,
/// carries no structured content.
pub fn calculate(args: &CalculateArgs) -> ToolResult {
    let CalculateArgs { operation, a, b } = *args;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide => {
            if b == 0.0 {
                return error_result(DIVISION_BY_ZERO);
            }
            a / b
        }
    };

    let text = format!(
        "{} {} {} = {}",
        format_number(a),
        operation.as_str(),
        format_number(b),
        format_number(result)
    );

    let mut structured = Map::new();
    structured.insert("firstNumber".into(), number_value(a));
    structured.insert("secondNumber".into(), number_value(b));
    structured.insert("operation".into(), Value::from(operation.as_str()));
    structured.insert("result".into(), number_value(result));

    structured_result(text, structured)
}

/// Render a number the way JavaScript clients print it: no trailing `.0`,
/// exponent form outside `[1e-6, 1e21)`, `Infinity` and `NaN` spelled out.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }
    if x == 0.0 {
        return "0".into();
    }

    let magnitude = x.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{:e}", x);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exp,
        };
    }
    x.to_string()
}

/// Encode a number for structured content: integral values as JSON
/// integers, non-finite values as `null`.
pub fn number_value(x: f64) -> Value {
    if x.is_finite() && x.fract() == 0.0 && x.abs() <= MAX_SAFE_INTEGER {
        return Value::from(x as i64);
    }
    serde_json::Number::from_f64(x)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
