//! Reading the planner's tool list.
//!
//! Planner output ends with a section like
//!
//! ```text
//! ## Tool Calling:
//! [{'name': 'get_city_weather', 'parameters': {'city': '$RESULT(get_current_gps_coordinates.city)'}}]
//! ```
//!
//! which is frequently Python literal syntax rather than JSON. This module
//! extracts that list, converts it to JSON, and classifies each entry as a
//! [`ToolIntent`] for the scheduler.

use serde_json::{Map, Value};
use std::path::Path;

/// Heading that introduces the tool list in model output.
pub const TOOL_CALLING_HEADING: &str = "## Tool Calling:";

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("tool plan is neither JSON nor a Python literal: {0}")]
    Syntax(String),
    #[error("tool plan must be a list, got {0}")]
    NotAList(&'static str),
    #[error("failed to read plan from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a plan entry is not a valid intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedIntent {
    #[error("expected an object, got {0}")]
    NotAnObject(&'static str),
    #[error("missing `name`")]
    MissingName,
    #[error("`name` must be a string, got {0}")]
    NameNotString(&'static str),
    #[error("missing `parameters`")]
    MissingParameters,
}

/// The `parameters` of an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentParameters {
    /// `null`, `"None"`, `""` or `{}`.
    None,
    Map(Map<String, Value>),
    /// Anything else, e.g. a list. Fails resolution for that intent.
    Invalid(Value),
}

impl IntentParameters {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::String(s) if s.is_empty() || s == "None" => Self::None,
            Value::Object(map) if map.is_empty() => Self::None,
            Value::Object(map) => Self::Map(map.clone()),
            other => Self::Invalid(other.clone()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The parameters as written in the plan.
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::Object(Map::new()),
            Self::Map(map) => Value::Object(map.clone()),
            Self::Invalid(value) => value.clone(),
        }
    }
}

/// One planned tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolIntent {
    pub name: String,
    pub parameters: IntentParameters,
}

impl ToolIntent {
    pub fn new(name: impl Into<String>, parameters: &Value) -> Self {
        Self {
            name: name.into(),
            parameters: IntentParameters::from_value(parameters),
        }
    }

    /// Classify a plan entry.
    pub fn from_value(entry: &Value) -> Result<Self, MalformedIntent> {
        let Value::Object(map) = entry else {
            return Err(MalformedIntent::NotAnObject(json_type(entry)));
        };
        let name = match map.get("name") {
            None => return Err(MalformedIntent::MissingName),
            Some(Value::String(name)) => name,
            Some(other) => return Err(MalformedIntent::NameNotString(json_type(other))),
        };
        let parameters = map
            .get("parameters")
            .ok_or(MalformedIntent::MissingParameters)?;
        Ok(Self::new(name.clone(), parameters))
    }

    pub fn is_parameter_free(&self) -> bool {
        self.parameters.is_none()
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Byte index one past the bracket that closes the list opening at `text[0]`.
fn balanced_list_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// The list following `## Tool Calling:` in raw model output.
///
/// Returns `None` when the heading is absent or followed by `None`.
///
/// ```
/// use proact_rs::plan::extract_tool_calling;
///
/// let text = "## Thoughts: rain later\n## Tool Calling: [{'name': 'x', 'parameters': None}]\n";
/// assert_eq!(extract_tool_calling(text), Some("[{'name': 'x', 'parameters': None}]"));
/// assert_eq!(extract_tool_calling("## Tool Calling: None"), None);
/// ```
pub fn extract_tool_calling(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once(TOOL_CALLING_HEADING)?;
    let rest = rest.trim_start();
    if rest.starts_with("None") || !rest.starts_with('[') {
        return None;
    }
    match balanced_list_end(rest) {
        Some(end) => rest.get(..end),
        None => Some(rest.trim_end()),
    }
}

/// Rewrite Python literal syntax as JSON.
///
/// Single-quoted strings become double-quoted, `None`/`True`/`False`
/// become `null`/`true`/`false`, and trailing commas are dropped.
pub fn python_literal_to_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                let quote = c;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(next) => {
                                out.push('\\');
                                out.push(next);
                            }
                            None => out.push_str("\\\\"),
                        },
                        '"' if quote == '\'' => out.push_str("\\\""),
                        c if c == quote => break,
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            ']' | '}' => {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                if out.ends_with(',') {
                    out.pop();
                }
                out.push(c);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            c => out.push(c),
        }
    }
    out
}

/// Parse a plan into its raw entries.
///
/// `None` or blank text is an empty plan. A single object is treated as a
/// one-entry plan.
pub fn parse_plan(text: &str) -> Result<Vec<Value>, PlanError> {
    let text = text.trim();
    if text.is_empty() || text == "None" {
        return Ok(Vec::new());
    }
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(json_err) => serde_json::from_str(&python_literal_to_json(text))
            .map_err(|_| PlanError::Syntax(json_err.to_string()))?,
    };
    match value {
        Value::Array(entries) => Ok(entries),
        Value::Null => Ok(Vec::new()),
        entry @ Value::Object(_) => Ok(vec![entry]),
        other => Err(PlanError::NotAList(json_type(&other))),
    }
}

/// Parse the tool list section of raw model output. No section is an empty plan.
pub fn parse_model_output(text: &str) -> Result<Vec<Value>, PlanError> {
    match extract_tool_calling(text) {
        Some(list) => parse_plan(list),
        None => Ok(Vec::new()),
    }
}

/// Load a plan file, optionally as raw model output.
pub fn load_plan(path: &Path, model_output: bool) -> Result<Vec<Value>, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if model_output {
        parse_model_output(&text)
    } else {
        parse_plan(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn classifies_parameters() {
        for none in [json!(null), json!("None"), json!(""), json!({})] {
            assert!(IntentParameters::from_value(&none).is_none(), "{none}");
        }
        assert!(matches!(
            IntentParameters::from_value(&json!({"a": 1})),
            IntentParameters::Map(_)
        ));
        assert!(matches!(
            IntentParameters::from_value(&json!(["a"])),
            IntentParameters::Invalid(_)
        ));
    }

    #[test]
    fn malformed_entries() {
        assert_eq!(
            ToolIntent::from_value(&json!({"parameters": {}})),
            Err(MalformedIntent::MissingName)
        );
        assert_eq!(
            ToolIntent::from_value(&json!({"name": "x"})),
            Err(MalformedIntent::MissingParameters)
        );
        assert_eq!(
            ToolIntent::from_value(&json!({"name": 3, "parameters": {}})),
            Err(MalformedIntent::NameNotString("number"))
        );
        assert_eq!(
            ToolIntent::from_value(&json!("get_current_datetime")),
            Err(MalformedIntent::NotAnObject("string"))
        );
    }

    #[test]
    fn well_formed_entry() {
        let intent = ToolIntent::from_value(&json!({"name": "x", "parameters": "None"})).unwrap();
        assert_eq!(intent.name, "x");
        assert!(intent.is_parameter_free());
    }

    #[test]
    fn extracts_list_with_brackets_inside_strings() {
        let text = "## Tool Calling: [{'name': 'google_search', 'parameters': {'q': 'a ] b'}}]\ntrailing";
        assert_eq!(
            extract_tool_calling(text),
            Some("[{'name': 'google_search', 'parameters': {'q': 'a ] b'}}]")
        );
    }

    #[test]
    fn missing_section_is_none() {
        assert_eq!(extract_tool_calling("## Thoughts: nothing to do"), None);
        assert_eq!(extract_tool_calling("## Tool Calling:\n  None\n"), None);
    }

    #[test]
    fn converts_python_literals() {
        let text = "[{'name': 'a', 'parameters': None, 'flag': True, 'q': \"it's\", 'x': 'say \"hi\"',}]";
        let plan = parse_plan(text).unwrap();
        assert_eq!(
            plan,
            vec![json!({"name": "a", "parameters": null, "flag": true, "q": "it's", "x": "say \"hi\""})]
        );
    }

    #[test]
    fn keeps_identifier_substrings() {
        assert_eq!(python_literal_to_json("['NoneSuch']"), "[\"NoneSuch\"]");
        assert_eq!(python_literal_to_json("[Nonetheless]"), "[Nonetheless]");
    }

    #[test]
    fn parses_json_and_empty_plans() {
        assert_eq!(parse_plan("None").unwrap(), Vec::<Value>::new());
        assert_eq!(parse_plan("  ").unwrap(), Vec::<Value>::new());
        assert_eq!(parse_plan("[]").unwrap(), Vec::<Value>::new());
        assert_eq!(parse_plan(r#"{"name": "a", "parameters": {}}"#).unwrap().len(), 1);
        assert!(matches!(parse_plan("42"), Err(PlanError::NotAList("number"))));
        assert!(matches!(parse_plan("[{"), Err(PlanError::Syntax(_))));
    }

    #[test]
    fn loads_plan_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "## Proactive score: 4\n## Tool Calling: [{{'name': 'get_current_datetime', 'parameters': {{}}}}]"
        )
        .unwrap();
        let plan = load_plan(file.path(), true).unwrap();
        assert_eq!(plan, vec![json!({"name": "get_current_datetime", "parameters": {}})]);

        let missing = load_plan(Path::new("/nonexistent/plan.json"), false);
        assert!(matches!(missing, Err(PlanError::Io { .. })));
    }
}
