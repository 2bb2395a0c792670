//! Collaborator response parsing into typed payloads.
//!
//! The model returns raw text that should contain JSON. Recovery strategies
//! are tried in order until one yields the expected shape:
//! 1. Direct `serde_json` deserialization
//! 2. Extract JSON from a markdown code block
//! 3. Strip trailing commas and retry
//! 4. Code block with trailing commas stripped
//! 5. Slice from the first opening bracket to the last closing one
//!
//! If all strategies fail the caller gets [`CollaboratorError::Malformed`]
//! and must leave its state untouched.

use seahaven_market::RawBetProposal;
use seahaven_types::{BetId, BetResolution, WorldChanges};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::CollaboratorError;

/// A staged world event proposed by the World AI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldEventProposal {
    /// Human-readable description of what happens.
    pub event: String,
    /// World fields to change.
    #[serde(default)]
    pub changes: WorldChanges,
}

/// Parse `raw` as JSON of type `T` using every recovery strategy.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, CollaboratorError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse
    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    // Strategy 2: extract from markdown code block
    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    // Strategy 3: strip trailing commas and retry
    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    // Strategy 4: extract from code block then strip commas
    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(json_str))
    {
        return Ok(parsed);
    }

    // Strategy 5: outermost bracket slice, objects then arrays
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(slice) = bracket_slice(trimmed, open, close)
            && let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(slice))
        {
            return Ok(parsed);
        }
    }

    Err(CollaboratorError::Malformed(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Parse a world-event response.
pub fn parse_world_event(raw: &str) -> Result<WorldEventProposal, CollaboratorError> {
    let proposal: WorldEventProposal = parse_json(raw)?;
    if proposal.event.trim().is_empty() {
        return Err(CollaboratorError::Malformed(
            "world event has an empty description".to_owned(),
        ));
    }
    Ok(proposal)
}

/// Parse a bet-generation response.
///
/// Some models wrap the bet as `{"bet": {...}}`; both shapes are accepted.
pub fn parse_bet_proposal(raw: &str) -> Result<RawBetProposal, CollaboratorError> {
    let value: serde_json::Value = parse_json(raw)?;
    let inner = value.get("bet").cloned().unwrap_or(value);
    if !inner.is_object() {
        return Err(CollaboratorError::Malformed(
            "bet proposal is not a JSON object".to_owned(),
        ));
    }
    serde_json::from_value(inner)
        .map_err(|e| CollaboratorError::Malformed(format!("bet proposal has the wrong shape: {e}")))
}

/// One entry of a resolution response before validation.
#[derive(Debug, Deserialize)]
struct RawResolution {
    id: serde_json::Value,
    success: serde_json::Value,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a bet-resolution response: an array of `{id, success, message}`.
///
/// A bare array or one wrapped as `{"results": [...]}` is accepted. Any
/// entry with a missing id or a non-boolean `success` rejects the whole
/// response, so a half-understood answer never resolves anything.
pub fn parse_resolutions(raw: &str) -> Result<Vec<BetResolution>, CollaboratorError> {
    let value: serde_json::Value = parse_json(raw)?;
    let array = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("results").or_else(|| obj.remove("bets")) {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(CollaboratorError::Malformed(
                    "resolution response is not an array".to_owned(),
                ));
            }
        },
        _ => {
            return Err(CollaboratorError::Malformed(
                "resolution response is not an array".to_owned(),
            ));
        }
    };

    array
        .into_iter()
        .map(|item| {
            let raw: RawResolution = serde_json::from_value(item).map_err(|e| {
                CollaboratorError::Malformed(format!("resolution entry has the wrong shape: {e}"))
            })?;
            let id = match raw.id {
                serde_json::Value::String(s) if !s.trim().is_empty() => BetId(s.trim().to_owned()),
                serde_json::Value::Number(n) => BetId(n.to_string()),
                other => {
                    return Err(CollaboratorError::Malformed(format!(
                        "resolution has an invalid id: {other}"
                    )));
                }
            };
            let success = match raw.success {
                serde_json::Value::Bool(b) => b,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("true") => true,
                serde_json::Value::String(s) if s.eq_ignore_ascii_case("false") => false,
                other => {
                    return Err(CollaboratorError::Malformed(format!(
                        "resolution for {id} has an invalid success flag: {other}"
                    )));
                }
            };
            Ok(BetResolution {
                id,
                success,
                message: raw.message.unwrap_or_default(),
            })
        })
        .collect()
}

/// Clean a free-text response: trim whitespace and surrounding quotes.
pub fn clean_text(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_owned()
}

/// Extract JSON content from a markdown code block.
///
/// Handles both `` ```json `` and plain `` ``` `` fences.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];
    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let content_start = start.checked_add(marker.len())?;
            let rest = text.get(content_start..)?;
            if let Some(end) = rest.find("```") {
                return rest.get(..end).map(str::trim);
            }
        }
    }
    None
}

/// The substring from the first `open` to the last `close`, inclusive.
fn bracket_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut pending_comma = false;
    let mut whitespace = String::new();

    for ch in json.chars() {
        if pending_comma {
            if ch.is_whitespace() {
                whitespace.push(ch);
                continue;
            }
            if ch != '}' && ch != ']' {
                result.push(',');
            }
            result.push_str(&whitespace);
            whitespace.clear();
            pending_comma = false;
        }
        if ch == ',' {
            pending_comma = true;
        } else {
            result.push(ch);
        }
    }
    if pending_comma {
        result.push(',');
    }
    result.push_str(&whitespace);
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn world_event_direct() {
        let raw = r#"{"event": "A sudden storm", "changes": {"weather": "Stormy"}}"#;
        let proposal = parse_world_event(raw).unwrap();
        assert_eq!(proposal.event, "A sudden storm");
        assert_eq!(proposal.changes.weather.as_deref(), Some("Stormy"));
        assert!(proposal.changes.time_of_day.is_none());
    }

    #[test]
    fn world_event_from_codeblock_with_trailing_comma() {
        let raw = "Here you go:\n```json\n{\"event\": \"Parade\", \"changes\": {\"currentEvent\": \"Parade\",},}\n```";
        let proposal = parse_world_event(raw).unwrap();
        assert_eq!(proposal.changes.current_event.as_deref(), Some("Parade"));
    }

    #[test]
    fn world_event_without_changes_defaults() {
        let proposal = parse_world_event(r#"{"event": "Birds sing"}"#).unwrap();
        assert_eq!(proposal.changes, WorldChanges::default());
    }

    #[test]
    fn world_event_garbage_is_malformed() {
        assert!(matches!(
            parse_world_event("the sky turns purple"),
            Err(CollaboratorError::Malformed(_))
        ));
        assert!(parse_world_event(r#"{"event": "  "}"#).is_err());
    }

    #[test]
    fn resolutions_with_prose_around_array() {
        let raw = "Sure! [{\"id\": \"b1\", \"success\": true, \"message\": \"He noticed\"}, {\"id\": 7, \"success\": \"false\", \"message\": \"Stayed\"}] Hope that helps.";
        let results = parse_resolutions(raw).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, BetId::from("b1"));
        assert!(results[0].success);
        assert_eq!(results[1].id, BetId::from("7"));
        assert!(!results[1].success);
    }

    #[test]
    fn resolutions_wrapped_in_object() {
        let raw = r#"{"results": [{"id": "b1", "success": false, "message": "No"}]}"#;
        assert_eq!(parse_resolutions(raw).unwrap().len(), 1);
    }

    #[test]
    fn resolutions_reject_whole_response_on_bad_entry() {
        let raw = r#"[{"id": "b1", "success": true, "message": "ok"}, {"id": "b2", "success": "maybe"}]"#;
        assert!(matches!(
            parse_resolutions(raw),
            Err(CollaboratorError::Malformed(_))
        ));
        assert!(parse_resolutions(r#"{"id": "b1"}"#).is_err());
    }

    #[test]
    fn bet_proposal_plain_and_wrapped() {
        let plain = r#"{"question": "Q?", "options": ["Yes", "No"], "endTime": "1 hour"}"#;
        assert_eq!(parse_bet_proposal(plain).unwrap().question.as_deref(), Some("Q?"));
        let wrapped = r#"{"bet": {"question": "W?", "options": ["A", "B"]}}"#;
        assert_eq!(parse_bet_proposal(wrapped).unwrap().question.as_deref(), Some("W?"));
        assert!(parse_bet_proposal("[1, 2]").is_err());
    }

    #[test]
    fn strip_trailing_commas_preserves_inner_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, "b": [1, 2,],}"#), r#"{"a": 1, "b": [1, 2]}"#);
    }

    #[test]
    fn clean_text_strips_quotes() {
        assert_eq!(clean_text("  \"Hey Truman!\"\n"), "Hey Truman!");
    }
}
