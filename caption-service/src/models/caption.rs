//! Request and response shapes for `POST /api/generate`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Largest integer an f64 holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Expression label to score, e.g. `{"happy": 0.9, "sad": 0.1}`.
///
/// Scores must be JSON numbers. Labels keep the order the caller sent them
/// in, and integral floats such as `1.0` are rendered as `1`. The set is
/// read-only once parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExpressionScoreSet(Map<String, Value>);

impl<'de> Deserialize<'de> for ExpressionScoreSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut scores = Map::with_capacity(raw.len());
        for (label, value) in raw {
            let Value::Number(score) = value else {
                return Err(D::Error::custom(format!(
                    "score for '{}' must be a number",
                    label
                )));
            };
            scores.insert(label, Value::Number(normalize_score(score)));
        }
        Ok(Self(scores))
    }
}

fn normalize_score(score: Number) -> Number {
    match score.as_f64() {
        Some(f) if score.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            Number::from(f as i64)
        }
        _ => score,
    }
}

impl ExpressionScoreSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).and_then(Value::as_f64)
    }

    /// Label with the highest score. Ties resolve to the label sent first.
    pub fn dominant(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .filter_map(|(label, score)| score.as_f64().map(|s| (label.as_str(), s)))
            .fold(None, |best, (label, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((label, score)),
            })
    }
}

#[derive(Debug, Error)]
pub enum RequestBodyError {
    #[error("Malformed JSON body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Request body must be a JSON object")]
    NotAnObject,
}

/// Body of a caption generation request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CaptionRequest {
    /// Missing or `null` becomes an empty set.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expressions: ExpressionScoreSet,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<ExpressionScoreSet, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ExpressionScoreSet>::deserialize(deserializer)?.unwrap_or_default())
}

impl CaptionRequest {
    /// Parse a raw request body, rejecting anything that is not a JSON object
    /// or whose `expressions` is not an object of numbers.
    pub fn from_body(body: &[u8]) -> Result<Self, RequestBodyError> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(RequestBodyError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Payload sent to the model as the user message.
#[derive(Debug, Serialize)]
pub struct PromptPayload<'a> {
    pub expressions: &'a ExpressionScoreSet,
}

/// Successful generation result. A missing upstream content is passed
/// through as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caption {
    pub phrase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expressions() {
        let req = CaptionRequest::from_body(br#"{"expressions":{"happy":0.9,"sad":0.1}}"#).unwrap();
        assert_eq!(req.expressions.len(), 2);
        assert_eq!(req.expressions.get("happy"), Some(0.9));
    }

    #[test]
    fn missing_expressions_defaults_to_empty() {
        let req = CaptionRequest::from_body(b"{}").unwrap();
        assert!(req.expressions.is_empty());
    }

    #[test]
    fn null_expressions_defaults_to_empty() {
        let req = CaptionRequest::from_body(br#"{"expressions":null}"#).unwrap();
        assert!(req.expressions.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req = CaptionRequest::from_body(br#"{"expressions":{"angry":1},"extra":true}"#).unwrap();
        assert_eq!(req.expressions.get("angry"), Some(1.0));
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            CaptionRequest::from_body(br#"[{"expressions":{}}]"#),
            Err(RequestBodyError::NotAnObject)
        ));
        assert!(matches!(
            CaptionRequest::from_body(b"42"),
            Err(RequestBodyError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_malformed_json_and_empty_body() {
        assert!(matches!(
            CaptionRequest::from_body(b"{not json"),
            Err(RequestBodyError::Malformed(_))
        ));
        assert!(matches!(
            CaptionRequest::from_body(b""),
            Err(RequestBodyError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_scores() {
        assert!(CaptionRequest::from_body(br#"{"expressions":{"happy":"high"}}"#).is_err());
        assert!(CaptionRequest::from_body(br#"{"expressions":[0.5]}"#).is_err());
    }

    #[test]
    fn empty_payload_serializes_to_empty_object() {
        let expressions = ExpressionScoreSet::default();
        let json = serde_json::to_string(&PromptPayload {
            expressions: &expressions,
        })
        .unwrap();
        assert_eq!(json, r#"{"expressions":{}}"#);
    }

    #[test]
    fn payload_keeps_score_formatting() {
        let req = CaptionRequest::from_body(br#"{"expressions":{"sad":0.1,"happy":0.9}}"#).unwrap();
        let json = serde_json::to_string(&PromptPayload {
            expressions: &req.expressions,
        })
        .unwrap();
        assert_eq!(json, r#"{"expressions":{"sad":0.1,"happy":0.9}}"#);
    }

    #[test]
    fn integral_scores_render_without_fraction() {
        let req =
            CaptionRequest::from_body(br#"{"expressions":{"happy":1.0,"sad":0,"calm":2.50}}"#)
                .unwrap();
        let json = serde_json::to_string(&PromptPayload {
            expressions: &req.expressions,
        })
        .unwrap();
        assert_eq!(json, r#"{"expressions":{"happy":1,"sad":0,"calm":2.5}}"#);
    }

    #[test]
    fn dominant_tie_keeps_first_label() {
        let req = CaptionRequest::from_body(br#"{"expressions":{"sad":0.5,"happy":0.5}}"#).unwrap();
        assert_eq!(req.expressions.dominant(), Some(("sad", 0.5)));
    }

    #[test]
    fn dominant_picks_highest_score() {
        let req =
            CaptionRequest::from_body(br#"{"expressions":{"happy":0.2,"surprised":0.7,"sad":0.1}}"#)
                .unwrap();
        assert_eq!(req.expressions.dominant(), Some(("surprised", 0.7)));
        assert_eq!(ExpressionScoreSet::default().dominant(), None);
    }

    #[test]
    fn null_phrase_serializes_as_null() {
        let json = serde_json::to_string(&Caption { phrase: None }).unwrap();
        assert_eq!(json, r#"{"phrase":null}"#);
    }
}
