//! Extraction of tool invocations from generator text.
//!
//! The payload is the body of a ```json fence if there is one, else the
//! first fenced block holding a JSON object or array, else the text itself
//! when it starts with `{` or `[`. A payload that fails to decode, or decodes
//! to anything but an object or an array, is a [`ParseError`]. Inside a batch
//! every element is validated on its own and invalid ones are dropped.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::tools::ToolInvocation;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("tool call payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("tool call payload must be an object or an array, got {0}")]
    UnexpectedShape(&'static str),
}

fn json_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // The closing fence is optional so a truncated block still counts.
    RE.get_or_init(|| Regex::new(r"(?s)```json[ \t]*\r?\n?(.*?)(?:```|\z)").ok())
        .as_ref()
}

fn any_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

fn think_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think(?:ing)?>.*?</think(?:ing)?>").ok())
        .as_ref()
}

fn starts_like_json(s: &str) -> bool {
    s.starts_with('{') || s.starts_with('[')
}

/// Remove `<think>…</think>` reasoning. A dangling close tag (the opening
/// one was cut off) drops everything before it.
pub fn strip_reasoning(text: &str) -> String {
    let without_blocks = match think_block() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    let tail = ["</think>", "</thinking>"]
        .iter()
        .filter_map(|tag| without_blocks.rfind(tag).map(|pos| pos + tag.len()))
        .max()
        .map(|end| &without_blocks[end..])
        .unwrap_or(&without_blocks);
    tail.trim().to_string()
}

/// Locate the JSON payload. `None` means the text is prose and carries no
/// tool call attempt.
pub fn extract_payload(text: &str) -> Option<&str> {
    if let Some(caps) = json_fence().and_then(|re| re.captures(text)) {
        return caps.get(1).map(|m| m.as_str().trim());
    }
    if let Some(re) = any_fence() {
        for caps in re.captures_iter(text) {
            if let Some(body) = caps.get(1).map(|m| m.as_str().trim()) {
                if starts_like_json(body) {
                    return Some(body);
                }
            }
        }
    }
    let trimmed = text.trim();
    if starts_like_json(trimmed) {
        return Some(trimmed);
    }
    // A bare object after some prose: "Let me check.\n{"tool": ...}".
    embedded_object_start(trimmed).map(|start| &trimmed[start..])
}

/// Generator text with the tool call payload removed.
pub fn strip_payload(text: &str) -> String {
    let mut out = match json_fence() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    if let Some(re) = any_fence() {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                if starts_like_json(caps[1].trim()) {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    let trimmed = out.trim();
    if starts_like_json(trimmed) {
        return String::new();
    }
    match embedded_object_start(trimmed) {
        Some(start) => trimmed[..start].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

fn embedded_object_start(text: &str) -> Option<usize> {
    text.match_indices('{').map(|(i, _)| i).find(|&i| {
        text[i + 1..]
            .trim_start()
            .starts_with("\"tool\"")
    })
}

/// Decode the first JSON value of `payload`, tolerating trailing prose.
fn decode(payload: &str) -> Result<Value, ParseError> {
    let mut stream = serde_json::Deserializer::from_str(payload).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(ParseError::InvalidJson(e.to_string())),
        None => Err(ParseError::InvalidJson("empty payload".to_string())),
    }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse every valid tool invocation out of generator text.
pub fn parse_tool_calls(text: &str) -> Result<Vec<ToolInvocation>, ParseError> {
    let Some(payload) = extract_payload(text) else {
        return Ok(Vec::new());
    };

    let elements = match decode(payload)? {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => return Err(ParseError::UnexpectedShape(shape(&other))),
    };

    let total = elements.len();
    let invocations: Vec<ToolInvocation> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(i, element)| match serde_json::from_value::<ToolInvocation>(element) {
            Ok(invocation) => Some(invocation),
            Err(e) => {
                tracing::warn!("Dropping tool call {} of {}: {}", i + 1, total, e);
                None
            }
        })
        .collect();
    Ok(invocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ChemistryAction, SpectrumAction};

    const BARE: &str =
        r#"{"tool":"chemistry_tool","action":"calculate_properties","molecule":"OC(=O)c1ccccc1"}"#;

    #[test]
    fn fenced_and_bare_objects_parse_the_same() {
        let fenced = format!("Let me look that up.\n```json\n{}\n```\n", BARE);
        let a = parse_tool_calls(BARE).unwrap();
        let b = parse_tool_calls(&fenced).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            vec![ToolInvocation::Chemistry(ChemistryAction::CalculateProperties {
                molecule: "OC(=O)c1ccccc1".to_string()
            })]
        );
    }

    #[test]
    fn unterminated_object_is_a_parse_error() {
        let text = r#"{"tool":"chemistry_tool","action":"calculate_properties","molecule":"CCO""#;
        assert!(matches!(
            parse_tool_calls(text),
            Err(ParseError::InvalidJson(_))
        ));
        let fenced = "```json\n{\"tool\": \"chemistry_tool\", \"action\":";
        assert!(parse_tool_calls(fenced).is_err());
    }

    #[test]
    fn invalid_elements_are_dropped() {
        let text = r#"[
            {"tool":"chemistry_tool","action":"calculate_properties","molecule":"CCO"},
            {"tool":"chemistry_tool","action":"teleport","molecule":"CCO"},
            {"tool":"spectrum_tool","action":"analyze_peaks"},
            {"tool":"spectrum_tool","action":"analyze_peaks","peaks":[170.5, 128.9],"hint":"acid"},
            42
        ]"#;
        let calls = parse_tool_calls(text).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].action(), "calculate_properties");
        assert!(matches!(
            &calls[1],
            ToolInvocation::Spectrum(SpectrumAction::AnalyzePeaks { peaks, .. }) if peaks.len() == 2
        ));
    }

    #[test]
    fn only_unknown_elements_give_an_empty_list() {
        let text = r#"[{"tool":"web_tool","action":"search","query":"x"}]"#;
        assert_eq!(parse_tool_calls(text).unwrap(), vec![]);
    }

    #[test]
    fn prose_is_not_a_tool_call() {
        assert_eq!(
            parse_tool_calls("Benzoic acid has a molecular weight of 122.12 g/mol.").unwrap(),
            vec![]
        );
        let with_code = "The SMILES is:\n```\nOC(=O)c1ccccc1\n```";
        assert_eq!(parse_tool_calls(with_code).unwrap(), vec![]);
    }

    #[test]
    fn non_container_json_is_rejected() {
        assert_eq!(
            parse_tool_calls("```json\n\"hello\"\n```"),
            Err(ParseError::UnexpectedShape("a string"))
        );
    }

    #[test]
    fn object_after_prose_is_found() {
        let text = format!("I will compute the properties.\n{}\nThen I will answer.", BARE);
        assert_eq!(parse_tool_calls(&text).unwrap().len(), 1);
    }

    #[test]
    fn payload_is_removed_from_prose() {
        let fenced = format!("Let me look that up.\n```json\n{}\n```\n", BARE);
        assert_eq!(strip_payload(&fenced), "Let me look that up.");
        assert_eq!(strip_payload(BARE), "");
        let code = "SMILES:\n```\nCCO\n```";
        assert_eq!(strip_payload(code), code);
        assert_eq!(strip_payload(&format!("Checking.\n{}", BARE)), "Checking.");
    }

    #[test]
    fn reasoning_is_stripped() {
        assert_eq!(
            strip_reasoning("<think>\nuse the tool {\"tool\"}\n</think>\n\nFinal answer."),
            "Final answer."
        );
        assert_eq!(strip_reasoning("partial reasoning</think>Answer"), "Answer");
        assert_eq!(strip_reasoning("No reasoning here."), "No reasoning here.");
    }
}
