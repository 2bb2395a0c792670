//! Conversion of collaborator bet payloads into validated proposals.
//!
//! Generated bets are loosely typed: `endTime` may be an RFC 3339 timestamp
//! or a phrase such as `"30 minutes"`, and `pool`/`odds` may be numbers or
//! strings carrying a unit (`"1000 USDC"`, `"3.5x"`). [`RawBetProposal`]
//! accepts all of these and [`RawBetProposal::into_proposal`] turns them
//! into a [`BetProposal`] with concrete types.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use seahaven_types::BetId;

use crate::InvalidBetError;

/// A bet as the collaborator sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBetProposal {
    /// Proposed id; replaced if missing or already taken.
    #[serde(default)]
    pub id: Option<Value>,
    /// The question.
    #[serde(default)]
    pub question: Option<String>,
    /// Outcome labels.
    #[serde(default)]
    pub options: Vec<String>,
    /// Timestamp or duration phrase.
    #[serde(default)]
    pub end_time: Option<Value>,
    /// Opening pool.
    #[serde(default)]
    pub pool: Option<Value>,
    /// Opening odds per option.
    #[serde(default)]
    pub odds: Option<BTreeMap<String, Value>>,
}

/// A typed bet proposal, not yet validated against the market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetProposal {
    /// Proposed id.
    pub id: Option<BetId>,
    /// The question.
    pub question: String,
    /// Outcome labels.
    pub options: Vec<String>,
    /// When staking closes.
    pub end_time: DateTime<Utc>,
    /// Opening pool.
    pub pool: Decimal,
    /// Opening odds; `None` means an even split.
    pub odds: Option<BTreeMap<String, Decimal>>,
}

impl RawBetProposal {
    /// Resolve loose fields against `now`.
    ///
    /// A missing `endTime` becomes `now + default_duration`; a missing pool
    /// becomes zero. An unparseable value in either field, or any odds
    /// value, is an error.
    pub fn into_proposal(
        self,
        now: DateTime<Utc>,
        default_duration: TimeDelta,
    ) -> Result<BetProposal, InvalidBetError> {
        let question = self
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or(InvalidBetError::EmptyQuestion)?;

        let id = match self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(BetId(s.trim().to_owned())),
            Some(Value::Number(n)) => Some(BetId(n.to_string())),
            _ => None,
        };

        let end_time = match self.end_time {
            None | Some(Value::Null) => now
                .checked_add_signed(default_duration)
                .ok_or_else(|| InvalidBetError::Malformed("end time out of range".to_owned()))?,
            Some(value) => parse_end_time(&value, now).ok_or_else(|| {
                InvalidBetError::Malformed(format!("unrecognised end time: {value}"))
            })?,
        };

        let pool = match self.pool {
            None | Some(Value::Null) => Decimal::ZERO,
            Some(value) => parse_amount(&value)
                .ok_or_else(|| InvalidBetError::Malformed(format!("unrecognised pool: {value}")))?,
        };

        let odds = match self.odds {
            None => None,
            Some(raw) => {
                let mut parsed = BTreeMap::new();
                for (option, value) in raw {
                    let amount = parse_amount(&value).ok_or_else(|| {
                        InvalidBetError::Malformed(format!("unrecognised odds for {option}: {value}"))
                    })?;
                    parsed.insert(option, amount);
                }
                Some(parsed)
            }
        };

        Ok(BetProposal {
            id,
            question: question.trim().to_owned(),
            options: self.options.into_iter().map(|o| o.trim().to_owned()).collect(),
            end_time,
            pool,
            odds,
        })
    }
}

/// Parse a decimal from a JSON number or a string with an optional unit.
///
/// `"1000 USDC"`, `"3.5x"`, `"1,000"` and `2.5` all parse; a string with no
/// leading number does not.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => {
            let numeric: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | ','))
                .filter(|c| *c != ',')
                .collect();
            if numeric.is_empty() {
                return None;
            }
            Decimal::from_str(&numeric).ok()
        }
        _ => None,
    }
}

/// Parse an end time from an RFC 3339 string or a duration phrase relative
/// to `now` (`"30 minutes"`, `"1 hour"`, `"24 hours"`, `"2 days"`, `"45s"`).
pub fn parse_end_time(value: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let Value::String(text) = value else {
        return None;
    };
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    let duration = parse_duration_phrase(text)?;
    now.checked_add_signed(duration)
}

/// Parse `"<count> <unit>"` or `"<count><unit>"` into a duration.
fn parse_duration_phrase(text: &str) -> Option<TimeDelta> {
    let lower = text.to_lowercase();
    let digits_end = lower
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(lower.len(), |(i, _)| i);
    let (count, unit) = lower.split_at_checked(digits_end)?;
    let count: i64 = count.parse().ok()?;
    let unit = unit.trim();

    let seconds_per_unit: i64 = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        _ => return None,
    };
    TimeDelta::try_seconds(count.checked_mul(seconds_per_unit)?)
}
