//! Normalizing raw model output into typed results
//!
//! A parse failure never escapes as an error: each parser returns a degraded
//! stub and a `parse_error` flag instead.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::prompts::DEFAULT_STARTER;
use crate::types::{ClientProfile, ObjectiveProgress, PerformanceReview};

/// A parsed value plus whether it is a stand-in for unparseable output
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub parse_error: bool,
}

impl<T> Parsed<T> {
    fn ok(value: T) -> Self {
        Self {
            value,
            parse_error: false,
        }
    }

    fn degraded(value: T) -> Self {
        Self {
            value,
            parse_error: true,
        }
    }
}

/// Remove a surrounding ```json / ``` fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a JSON object out of model output. Falls back to the outermost
/// `{...}` span when the object is wrapped in prose.
pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Option<T> {
    parse_json_object_where(raw, |_| true)
}

/// Like [`parse_json_object`], but only objects accepted by `usable` count
fn parse_json_object_where<T, F>(raw: &str, usable: F) -> Option<T>
where
    T: DeserializeOwned,
    F: Fn(&Map<String, Value>) -> bool,
{
    let cleaned = strip_code_fences(raw);

    let candidates = [
        Some(cleaned),
        match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&cleaned[start..=end]),
            _ => None,
        },
    ];

    candidates.into_iter().flatten().find_map(|text| {
        let value: Value = serde_json::from_str(text).ok()?;
        if !value.as_object().is_some_and(&usable) {
            return None;
        }
        serde_json::from_value(value).ok()
    })
}

/// A profile must at least name the client
fn is_profile(obj: &Map<String, Value>) -> bool {
    obj.get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty())
}

fn is_review(obj: &Map<String, Value>) -> bool {
    obj.get("overallScore").is_some_and(Value::is_number)
}

/// At least one of the four objective percentages must be present
fn is_objective_progress(obj: &Map<String, Value>) -> bool {
    ["rapport", "needs", "objections", "recommendations"]
        .iter()
        .any(|key| obj.get(*key).is_some_and(Value::is_number))
}

pub fn parse_profile(raw: &str) -> Parsed<ClientProfile> {
    match parse_json_object_where::<ClientProfile, _>(raw, is_profile) {
        Some(profile) => Parsed::ok(profile),
        None => {
            warn!("Failed to parse generated profile, using placeholder");
            Parsed::degraded(ClientProfile::placeholder(raw.trim()))
        }
    }
}

pub fn parse_review(raw: &str) -> Parsed<PerformanceReview> {
    match parse_json_object_where::<PerformanceReview, _>(raw, is_review) {
        Some(review) => Parsed::ok(review),
        None => {
            warn!("Failed to parse review, using placeholder");
            Parsed::degraded(PerformanceReview::placeholder(raw.trim()))
        }
    }
}

/// Objective progress from text, falling back to arguments the agent reported
/// through the progress-tracking tool
pub fn parse_objectives(raw: &str, reported: Option<&str>) -> Parsed<ObjectiveProgress> {
    let parsed = parse_json_object_where::<ObjectiveProgress, _>(raw, is_objective_progress).or_else(|| {
        reported.and_then(|args| parse_json_object_where(args, is_objective_progress))
    });

    match parsed {
        Some(progress) => Parsed::ok(progress.clamped()),
        None => {
            warn!("Could not parse objective progress from response");
            Parsed::degraded(ObjectiveProgress {
                explanation: "Unable to evaluate objective progress from the response".to_string(),
                ..Default::default()
            })
        }
    }
}

/// Trim quotes from a generated opener, substituting the default when empty
pub fn clean_starter(raw: &str) -> String {
    let cleaned = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if cleaned.is_empty() {
        DEFAULT_STARTER.to_string()
    } else {
        cleaned.to_string()
    }
}
