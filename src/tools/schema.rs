//! Tool parameter schemas.
//!
//! A [`ToolDeclaration`] owns one extractor per declared parameter, compiled
//! when the declaration is built. The manual-call parser runs those
//! extractors over the `<parameters>` block; [`ToolDeclaration::validate`]
//! is the single gate both call paths pass before a tool executes.

use crate::error::{ParleyError, Result};
use crate::llm::ToolSpec;
use regex::Regex;
use serde_json::{json, Map, Value};

/// Shape of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Free text, trimmed.
    Text,
    /// Comma-separated in manual calls, a string array once coerced.
    TextList,
    /// Whole number, optionally bounded.
    Integer { min: Option<i64>, max: Option<i64> },
    /// Absolute http(s) URL.
    Url,
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    /// Substituted when the parameter is missing.
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            ParamKind::Text => json!({"type": "string"}),
            ParamKind::Url => json!({"type": "string", "format": "uri"}),
            ParamKind::TextList => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Integer { min, max } => {
                let mut schema = json!({"type": "integer"});
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
        };
        schema["description"] = json!(self.description);
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }

    /// Coerce a raw tagged value. `None` means absent.
    fn coerce(&self, raw: Option<&str>) -> Option<Value> {
        match &self.kind {
            ParamKind::Text | ParamKind::Url => raw.map(|s| Value::String(s.to_string())),
            ParamKind::TextList => Some(Value::Array(
                raw.unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            ParamKind::Integer { .. } => raw.and_then(parse_leading_int).map(Value::from),
        }
    }

    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match &self.kind {
            ParamKind::Text => match value.as_str() {
                Some(s) if self.required && s.trim().is_empty() => {
                    Err(format!("`{}` must not be empty", self.name))
                }
                Some(_) => Ok(()),
                None => Err(format!("`{}` must be a string", self.name)),
            },
            ParamKind::Url => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| format!("`{}` must be a string", self.name))?;
                match url::Url::parse(raw) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
                    Ok(parsed) => Err(format!(
                        "`{}` has unsupported scheme {}",
                        self.name,
                        parsed.scheme()
                    )),
                    Err(e) => Err(format!("`{}` is not a valid URL: {}", self.name, e)),
                }
            }
            ParamKind::TextList => match value.as_array() {
                Some(items) if items.iter().all(Value::is_string) => Ok(()),
                _ => Err(format!("`{}` must be a list of strings", self.name)),
            },
            ParamKind::Integer { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("`{}` must be an integer", self.name))?;
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(format!("`{}` is out of range: {}", self.name, n));
                }
                Ok(())
            }
        }
    }
}

/// Pre-compiled `<name>…</name>` matcher for one parameter.
/// Integer from the leading digits of `raw`, ignoring anything after them
/// (`"8.5"` is 8, `"10 results"` is 10).
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let sign = usize::from(s.starts_with(['+', '-']));
    let end = s[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + sign);
    s[..end].parse().ok()
}

#[derive(Debug, Clone)]
struct Extractor {
    pattern: Regex,
    spec: ParamSpec,
}

/// A tool's name, description and parameter schema.
#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    extractors: Vec<Extractor>,
}

impl ToolDeclaration {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Result<Self> {
        let extractors = params
            .into_iter()
            .map(|spec| {
                let tag = regex::escape(&spec.name);
                let pattern = Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>"))
                    .map_err(|e| ParleyError::Config(format!("parameter `{}`: {}", spec.name, e)))?;
                Ok(Extractor { pattern, spec })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            extractors,
        })
    }

    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.extractors.iter().map(|e| &e.spec)
    }

    /// Pull each declared parameter out of a `<parameters>` body and coerce it.
    pub fn extract(&self, parameters_xml: &str) -> Map<String, Value> {
        let mut params = Map::new();
        for extractor in &self.extractors {
            let raw = extractor
                .pattern
                .captures(parameters_xml)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty());
            if let Some(value) = extractor.spec.coerce(raw) {
                params.insert(extractor.spec.name.clone(), value);
            }
        }
        params
    }

    /// Check `params` against the schema, filling documented defaults.
    ///
    /// Undeclared keys are dropped.
    pub fn validate(&self, params: &Map<String, Value>) -> std::result::Result<Map<String, Value>, String> {
        let mut validated = Map::new();
        for spec in self.params() {
            match params.get(&spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    spec.check(value)?;
                    validated.insert(spec.name.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(format!("missing required parameter `{}`", spec.name));
                }
                None => {
                    if let Some(default) = &spec.default {
                        validated.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }
        Ok(validated)
    }

    /// JSON Schema form for native tool calling.
    pub fn to_spec(&self) -> ToolSpec {
        let properties: Map<String, Value> = self
            .params()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Plain-text description for the manual-call system prompt.
    pub fn describe(&self) -> String {
        let mut out = format!("- {}: {}\n  Parameters:\n", self.name, self.description);
        for spec in self.params() {
            let kind = match &spec.kind {
                ParamKind::Text => "string",
                ParamKind::Url => "url",
                ParamKind::TextList => "comma-separated list",
                ParamKind::Integer { .. } => "integer",
            };
            let marker = if spec.required { "required" } else { "optional" };
            out.push_str(&format!(
                "    - {} ({}, {}): {}\n",
                spec.name, kind, marker, spec.description
            ));
        }
        out
    }
}
