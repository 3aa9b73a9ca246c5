//! Lenient parsing of model replies.
//!
//! Models wrap JSON in code fences, prefix it with a `json` tag or mix up
//! their escaping. [`normalize_reply`] repairs the common cases before the
//! text is parsed, then each `parse_*` function checks the reply against the
//! shape it expects. A reply that cannot be used is a [`ParseFailure`],
//! which carries the raw text for logging.

use std::fmt;

use papermeta_core::{AuthorsResult, SummaryResult, TitleResult};
use serde_json::{Map, Value};
use thiserror::Error;

/// Which extraction a reply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Title,
    Authors,
    Summary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Title => "title",
            Stage::Authors => "authors",
            Stage::Summary => "summary",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} reply rejected: {reason}")]
pub struct ParseFailure {
    pub stage: Stage,
    pub reason: String,
    /// The reply exactly as the model sent it.
    pub raw: String,
}

impl ParseFailure {
    fn new(stage: Stage, reason: impl Into<String>, raw: &str) -> Self {
        Self {
            stage,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Clean up a raw reply so that it has a chance of parsing as JSON.
///
/// In order: trim whitespace, strip backtick fences at either end, drop a
/// leading `json` tag, replace `\"` with `'`, then double every backslash.
pub fn normalize_reply(raw: &str) -> String {
    let text = raw.trim().trim_matches('`');
    let text = text.strip_prefix("json").unwrap_or(text).trim();
    text.replace("\\\"", "'").replace('\\', "\\\\")
}

/// Normalize and parse a reply into a JSON object.
///
/// When the whole text is not valid JSON, the span from the first `{` to
/// the last `}` is tried, which recovers replies with a sentence of prose
/// around the object.
fn parse_object(stage: Stage, raw: &str) -> Result<Map<String, Value>, ParseFailure> {
    let text = normalize_reply(raw);
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(err) => embedded_object(&text)
            .and_then(|inner| serde_json::from_str::<Value>(inner).ok())
            .ok_or_else(|| ParseFailure::new(stage, format!("not valid JSON: {err}"), raw))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseFailure::new(
            stage,
            format!("expected a JSON object, got {}", kind(&other)),
            raw,
        )),
    }
}

fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

/// `line_number` as either a JSON number or a numeric string; `0` otherwise.
fn line_number(map: &Map<String, Value>) -> u32 {
    match map.get("line_number") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_title(raw: &str) -> Result<TitleResult, ParseFailure> {
    let map = parse_object(Stage::Title, raw)?;
    let title = string_field(&map, &["title"])
        .ok_or_else(|| ParseFailure::new(Stage::Title, "missing string field `title`", raw))?;
    Ok(TitleResult {
        title: title.split_whitespace().collect::<Vec<_>>().join(" "),
        line_number: line_number(&map),
    })
}

/// Accepts `authors` as an array of names (or of objects with a `name`) or
/// as a single string, which is split on commas and the word "and".
pub fn parse_authors(raw: &str) -> Result<AuthorsResult, ParseFailure> {
    let map = parse_object(Stage::Authors, raw)?;
    let authors_list: Vec<String> = match map.get("authors") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => split_names(s),
        Some(other) => {
            return Err(ParseFailure::new(
                Stage::Authors,
                format!("`authors` must be a list or a string, got {}", kind(other)),
                raw,
            ));
        }
        None => {
            return Err(ParseFailure::new(Stage::Authors, "missing field `authors`", raw));
        }
    };

    let authors_display = string_field(&map, &["authors_display", "line"])
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| authors_list.join(", "));

    Ok(AuthorsResult {
        authors_display,
        authors_list,
        line_number: line_number(&map),
    })
}

fn split_names(s: &str) -> Vec<String> {
    s.split(',')
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts `summary` or `abstract`, as a string or a list of paragraphs.
pub fn parse_summary(raw: &str) -> Result<SummaryResult, ParseFailure> {
    let map = parse_object(Stage::Summary, raw)?;
    let value = map
        .get("summary")
        .or_else(|| map.get("abstract"))
        .ok_or_else(|| ParseFailure::new(Stage::Summary, "missing field `summary` or `abstract`", raw))?;
    let summary = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n\n"),
        other => {
            return Err(ParseFailure::new(
                Stage::Summary,
                format!("summary must be text, got {}", kind(other)),
                raw,
            ));
        }
    };
    Ok(SummaryResult { summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fenced_json() {
        assert_eq!(normalize_reply("```json\n{\"title\": \"X\"}\n```"), "{\"title\": \"X\"}");
    }

    #[test]
    fn test_normalize_plain_fence_and_whitespace() {
        assert_eq!(normalize_reply("  ```{\"title\": \"Test\"}```  "), "{\"title\": \"Test\"}");
        assert_eq!(normalize_reply("json{\"title\": \"Test\"}"), "{\"title\": \"Test\"}");
    }

    #[test]
    fn test_normalize_escaped_quotes_and_backslashes() {
        assert_eq!(
            normalize_reply(r#"{"title": "Test \"quoted\" text"}"#),
            r#"{"title": "Test 'quoted' text"}"#
        );
        assert_eq!(normalize_reply(r"{\alpha}"), r"{\\alpha}");
    }

    #[test]
    fn test_fenced_title_parses() {
        let title = parse_title("```json\n{\"title\": \"X\"}\n```").unwrap();
        assert_eq!(title.title, "X");
        assert_eq!(title.line_number, 0);
    }

    #[test]
    fn test_escaped_quotes_become_single_quotes() {
        let title = parse_title(r#"{"title": "Test \"quoted\" text", "line_number": 2}"#).unwrap();
        assert_eq!(title.title, "Test 'quoted' text");
        assert_eq!(title.line_number, 2);
    }

    #[test]
    fn test_latex_backslash_survives() {
        // A lone `\a` is not a valid JSON escape; doubling makes it literal.
        let title = parse_title(r#"{"title": "On \alpha-Stable Laws"}"#).unwrap();
        assert_eq!(title.title, r"On \alpha-Stable Laws");
    }

    #[test]
    fn test_title_line_number_as_string() {
        let title = parse_title(r#"{"line_number": "3", "title": "  Deep  Learning "}"#).unwrap();
        assert_eq!(title.line_number, 3);
        assert_eq!(title.title, "Deep Learning");
    }

    #[test]
    fn test_title_with_surrounding_prose() {
        let raw = "Here is the result:\n{\"title\": \"Attention Is All You Need\", \"line_number\": 1}\nHope this helps!";
        assert_eq!(parse_title(raw).unwrap().title, "Attention Is All You Need");
    }

    #[test]
    fn test_malformed_reply_is_failure() {
        let err = parse_title("{not json").unwrap_err();
        assert_eq!(err.stage, Stage::Title);
        assert_eq!(err.raw, "{not json");
        assert!(err.reason.contains("not valid JSON"));
    }

    #[test]
    fn test_wrong_shape_is_failure() {
        assert!(parse_title(r#"["A Title"]"#).unwrap_err().reason.contains("an array"));
        assert!(parse_title(r#"{"name": "A Title"}"#).unwrap_err().reason.contains("title"));
        assert!(parse_title(r#"{"title": 42}"#).is_err());
    }

    #[test]
    fn test_authors_array() {
        let authors = parse_authors(
            r#"{"line_number": 2, "line": "Ashish Vaswani, Noam Shazeer", "authors": ["Ashish Vaswani", "Noam Shazeer"]}"#,
        )
        .unwrap();
        assert_eq!(authors.authors_list, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(authors.authors_display, "Ashish Vaswani, Noam Shazeer");
        assert_eq!(authors.line_number, 2);
    }

    #[test]
    fn test_authors_display_falls_back_to_joined_list() {
        let authors = parse_authors(r#"{"authors": ["Jane Doe", {"name": "John Roe"}, 7, ""]}"#).unwrap();
        assert_eq!(authors.authors_list, vec!["Jane Doe", "John Roe"]);
        assert_eq!(authors.authors_display, "Jane Doe, John Roe");
    }

    #[test]
    fn test_authors_as_string() {
        let authors = parse_authors(r#"{"authors": "Jane Doe, John Roe and Ada Lovelace"}"#).unwrap();
        assert_eq!(authors.authors_list, vec!["Jane Doe", "John Roe", "Ada Lovelace"]);
    }

    #[test]
    fn test_authors_missing_or_wrong_type() {
        assert!(parse_authors(r#"{"line": "Jane Doe"}"#).is_err());
        let err = parse_authors(r#"{"authors": 3}"#).unwrap_err();
        assert_eq!(err.stage, Stage::Authors);
    }

    #[test]
    fn test_summary_from_abstract_key() {
        let summary = parse_summary(r#"{"abstract": "This paper studies things."}"#).unwrap();
        assert_eq!(summary.summary, "This paper studies things.");
    }

    #[test]
    fn test_summary_paragraph_list() {
        let summary = parse_summary(r#"{"summary": ["First paragraph.", "Second paragraph."]}"#).unwrap();
        assert_eq!(summary.summary, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_summary_failures() {
        assert!(parse_summary(r#"{"text": "nope"}"#).is_err());
        assert!(parse_summary(r#"{"summary": {"p1": "x"}}"#).is_err());
        assert!(parse_summary("").is_err());
    }
}
