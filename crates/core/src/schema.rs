//! Typed parameter metadata and argument access for callable tools.
//!
//! Tool schemas are declared, not inferred: each [`Param`] names one
//! property, optionally typed. Untyped parameters fall back to a permissive
//! `string` type, and providers are free to send numbers or booleans for
//! them anyway — the [`ToolArgs`] getters coerce on a best-effort basis.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use crate::error::ToolError;

/// JSON-schema type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
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
}

/// One declared parameter of a callable tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    pub description: Option<String>,
    /// A parameter with a default is optional in the schema and is filled
    /// in before the callable runs.
    pub default: Option<Value>,
}

impl Param {
    /// An untyped parameter (schema type `string`).
    pub fn new(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::String)
    }

    pub fn typed(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::Number)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::Boolean)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::Array)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::typed(name, ParamType::Object)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Build an object schema from declared parameters.
///
/// `required` lists names in declaration order. `properties` is a JSON
/// object keyed by name and carries no order of its own.
pub fn object_schema(params: &[Param]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut property = Map::new();
        property.insert("type".into(), json!(param.kind.as_str()));
        if let Some(description) = &param.description {
            property.insert("description".into(), json!(description));
        }
        if let Some(default) = &param.default {
            property.insert("default".into(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(property));

        if param.is_required() {
            required.push(json!(param.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Fill in defaults for parameters the caller left out.
pub fn apply_defaults(params: &[Param], arguments: &mut Map<String, Value>) {
    for param in params {
        if let Some(default) = &param.default {
            arguments
                .entry(param.name.clone())
                .or_insert_with(|| default.clone());
        }
    }
}

/// Named arguments handed to a callable tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn required(&self, name: &str) -> Result<&Value, ToolError> {
        self.0
            .get(name)
            .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{name}' argument")))
    }

    /// A string argument. Scalars are rendered to text.
    pub fn str(&self, name: &str) -> Result<String, ToolError> {
        match self.required(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ToolError::InvalidArguments(format!(
                "'{name}' must be a string, got {other}"
            ))),
        }
    }

    /// A numeric argument. Numeric strings are accepted.
    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        let value = self.required(name)?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a number, got {value}")))
    }

    /// An integer argument. Integral floats and numeric strings are accepted.
    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        let value = self.required(name)?;
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!("'{name}' must be an integer, got {value}"))
        })
    }

    /// A boolean argument. `"true"`/`"false"` strings are accepted.
    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        let value = self.required(name)?;
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse::<bool>().ok(),
            _ => None,
        }
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a boolean, got {value}")))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => ToolArgs::new(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn schema_marks_defaults_optional() {
        let schema = object_schema(&[
            Param::number("a").describe("left operand"),
            Param::number("b").default(1),
            Param::new("label"),
        ]);

        assert_eq!(schema["properties"]["a"]["type"], "number");
        assert_eq!(schema["properties"]["a"]["description"], "left operand");
        assert_eq!(schema["properties"]["b"]["default"], 1);
        assert_eq!(schema["properties"]["label"]["type"], "string");
        assert_eq!(schema["required"], json!(["a", "label"]));
    }

    #[test]
    fn required_follows_declaration_order() {
        let schema = object_schema(&[Param::string("zeta"), Param::string("alpha")]);

        assert_eq!(schema["required"], json!(["zeta", "alpha"]));
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 2);
        assert!(properties.contains_key("zeta") && properties.contains_key("alpha"));
    }

    #[test]
    fn defaults_fill_only_missing_arguments() {
        let params = [Param::number("a").default(1), Param::number("b").default(2)];
        let mut arguments = Map::new();
        arguments.insert("a".into(), json!(10));
        apply_defaults(&params, &mut arguments);
        assert_eq!(arguments["a"], 10);
        assert_eq!(arguments["b"], 2);
    }

    #[test]
    fn getters_coerce_best_effort() {
        let a = args(json!({"n": "4.5", "i": 3.0, "flag": "true", "s": 7}));
        assert_eq!(a.f64("n").unwrap(), 4.5);
        assert_eq!(a.i64("i").unwrap(), 3);
        assert!(a.bool("flag").unwrap());
        assert_eq!(a.str("s").unwrap(), "7");
    }

    #[test]
    fn getters_report_missing_and_mistyped() {
        let a = args(json!({"n": [1]}));
        assert!(matches!(a.f64("n"), Err(ToolError::InvalidArguments(_))));
        let err = a.str("absent").unwrap_err();
        assert!(err.to_string().contains("missing 'absent'"));
    }
}
