//! JSON parsing helpers for AI backend responses
//!
//! Models wrap their JSON in prose, code fences, or both. `extract_json` finds
//! the payload without ever failing loudly; the `parse_*` functions then
//! shape-check it and turn anything unexpected into `Error::InvalidData`.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Verdict;

use super::types::{
    CoachResponse, JsonShape, ReflectionQuestions, ResponseKind, VerdictAssessment,
};

/// Truncate long responses for error messages
fn truncate(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Locate and parse the first JSON value of the requested shape in `text`
///
/// Scans from the first opening bracket to the first closing bracket after
/// it. Nested brackets of the same kind defeat that scan, so the widest span
/// (first opening to last closing bracket) is tried next. Returns None when
/// neither span parses.
pub fn extract_json(text: &str, shape: JsonShape) -> Option<Value> {
    let (open, close) = shape.delimiters();

    let start = text.find(open)?;
    let first_close = start + text[start..].find(close)?;

    let narrow = &text[start..=first_close];
    if let Ok(value) = serde_json::from_str::<Value>(narrow) {
        return Some(value);
    }

    let last_close = text.rfind(close)?;
    if last_close > first_close {
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..=last_close]) {
            return Some(value);
        }
    }

    None
}

/// Parse exactly three reflection questions from a raw response
pub fn parse_questions(response: &str) -> Result<ReflectionQuestions> {
    let value = extract_json(response, JsonShape::Array).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON array found in AI response | Raw: {}",
            truncate(response)
        ))
    })?;

    let items = match value {
        Value::Array(items) => items,
        _ => return Err(Error::InvalidData("Expected a JSON array of questions".into())),
    };

    if items.len() != 3 {
        return Err(Error::InvalidData(format!(
            "Expected exactly 3 questions, got {}",
            items.len()
        )));
    }

    let mut questions: Vec<String> = Vec::with_capacity(3);
    for item in items {
        match item {
            Value::String(q) if !q.trim().is_empty() => questions.push(q.trim().to_string()),
            Value::String(_) => {
                return Err(Error::InvalidData("AI returned an empty question".into()))
            }
            other => {
                return Err(Error::InvalidData(format!(
                    "Questions must be strings, got {}",
                    truncate(&other.to_string())
                )))
            }
        }
    }

    let questions: [String; 3] = questions
        .try_into()
        .map_err(|_| Error::InvalidData("Expected exactly 3 questions".into()))?;
    debug!("Parsed reflection questions: {:?}", questions);
    Ok(ReflectionQuestions(questions))
}

/// Parse a verdict object from a raw response
///
/// `verdict` must be exactly `positive`, `neutral` or `negative`; case and
/// whitespace variants are rejected. A missing or non-string `suggestion` is
/// tolerated.
pub fn parse_verdict(response: &str) -> Result<VerdictAssessment> {
    let value = extract_json(response, JsonShape::Object).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON object found in AI response | Raw: {}",
            truncate(response)
        ))
    })?;

    let token = value
        .get("verdict")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidData("AI response has no verdict".into()))?;

    let verdict = match token {
        "positive" => Verdict::Positive,
        "neutral" => Verdict::Neutral,
        "negative" => Verdict::Negative,
        other => {
            return Err(Error::InvalidData(format!(
                "Unexpected verdict '{}' (expected positive, neutral or negative)",
                truncate(other)
            )))
        }
    };

    let suggestion = value
        .get("suggestion")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(VerdictAssessment {
        verdict,
        suggestion,
    })
}

/// Parse and validate a response of the given kind into its tagged form
pub fn parse_response(response: &str, kind: ResponseKind) -> Result<CoachResponse> {
    match kind {
        ResponseKind::Questions => Ok(CoachResponse::Questions {
            questions: parse_questions(response)?,
        }),
        ResponseKind::Verdict => parse_verdict(response).map(CoachResponse::Verdict),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_array_from_prose() {
        let text =
            "Sure! Here are some questions:\n```json\n[\"a\", \"b\", \"c\"]\n```\nGood luck.";
        assert_eq!(
            extract_json(text, JsonShape::Array),
            Some(json!(["a", "b", "c"]))
        );
    }

    #[test]
    fn test_extract_object_from_prose() {
        let text = r#"My analysis: {"verdict": "negative", "suggestion": "Skip it."} Hope that helps"#;
        assert_eq!(
            extract_json(text, JsonShape::Object),
            Some(json!({"verdict": "negative", "suggestion": "Skip it."}))
        );
    }

    #[test]
    fn test_extract_returns_none_without_brackets() {
        assert_eq!(extract_json("no json here", JsonShape::Array), None);
        assert_eq!(extract_json("no json here", JsonShape::Object), None);
        assert_eq!(extract_json("", JsonShape::Array), None);
        // Wrong shape present
        assert_eq!(extract_json("{\"a\": 1}", JsonShape::Array), None);
        assert_eq!(extract_json("[1, 2]", JsonShape::Object), None);
    }

    #[test]
    fn test_extract_returns_none_on_bad_json() {
        assert_eq!(extract_json("[not, json]", JsonShape::Array), None);
        assert_eq!(extract_json("} backwards {", JsonShape::Object), None);
        assert_eq!(extract_json("[ unterminated", JsonShape::Array), None);
    }

    #[test]
    fn test_extract_nested_object_uses_wider_span() {
        let text = r#"{"verdict": "positive", "meta": {"score": 1}}"#;
        let value = extract_json(text, JsonShape::Object).unwrap();
        assert_eq!(value["verdict"], "positive");
    }

    #[test]
    fn test_extract_handles_multibyte_text() {
        let text = "Voilà, résumé: [\"é\", \"ü\", \"ß\"] ✓";
        assert_eq!(
            extract_json(text, JsonShape::Array),
            Some(json!(["é", "ü", "ß"]))
        );
    }

    #[test]
    fn test_parse_questions_valid() {
        let q = parse_questions(r#"["Why?", " Need it? ", "Alternatives?"]"#).unwrap();
        assert_eq!(q.as_slice(), &["Why?", "Need it?", "Alternatives?"]);
    }

    #[test]
    fn test_parse_questions_rejects_numbers() {
        let err = parse_questions("here you go: [1,2,3]").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_parse_questions_rejects_wrong_count() {
        assert!(parse_questions(r#"["a", "b"]"#).is_err());
        assert!(parse_questions(r#"["a", "b", "c", "d"]"#).is_err());
        assert!(parse_questions("I can't help with that.").is_err());
    }

    #[test]
    fn test_parse_questions_rejects_blank_question() {
        let err = parse_questions(r#"["a", "  ", "c"]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_parse_verdict_valid() {
        let v = parse_verdict(r#"{"verdict":"positive","suggestion":"Go for it."}"#).unwrap();
        assert_eq!(v.verdict, Verdict::Positive);
        assert_eq!(v.suggestion.as_deref(), Some("Go for it."));
    }

    #[test]
    fn test_parse_verdict_without_suggestion() {
        let v = parse_verdict(r#"{"verdict":"neutral"}"#).unwrap();
        assert_eq!(v.verdict, Verdict::Neutral);
        assert!(v.suggestion.is_none());
    }

    #[test]
    fn test_parse_verdict_rejects_unknown_token() {
        let err = parse_verdict(r#"{"verdict":"maybe","suggestion":"..."}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(parse_verdict(r#"{"suggestion":"no verdict"}"#).is_err());
        assert!(parse_verdict(r#"{"verdict": 1}"#).is_err());
    }

    #[test]
    fn test_parse_verdict_requires_exact_token() {
        for raw in [
            r#"{"verdict":"Positive"}"#,
            r#"{"verdict":" neutral "}"#,
            r#"{"verdict":"NEGATIVE"}"#,
        ] {
            let err = parse_verdict(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidData(_)), "{} was accepted", raw);
        }
    }

    #[test]
    fn test_parse_response_tags() {
        let q = parse_response(r#"["a","b","c"]"#, ResponseKind::Questions).unwrap();
        assert!(matches!(q, CoachResponse::Questions { .. }));

        let v = parse_response(r#"{"verdict":"negative"}"#, ResponseKind::Verdict).unwrap();
        assert!(matches!(
            v,
            CoachResponse::Verdict(VerdictAssessment {
                verdict: Verdict::Negative,
                ..
            })
        ));

        assert!(parse_response(r#"{"verdict":"negative"}"#, ResponseKind::Questions).is_err());
    }
}
