use chrono::{DateTime, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

/// Time format used in prompts and expected back from the model.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The JSON object the generation endpoint is asked to return.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DraftResponse {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub source: String,
    pub author: String,
    pub related_links: Vec<String>,
    pub confidence: Option<f64>,
}

impl DraftResponse {
    /// A response without a title cannot become an event on its own.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Parses model output into a [`DraftResponse`].
///
/// The text is first parsed as-is; if that fails, the span from the first `{`
/// to the last `}` is tried, which recovers JSON wrapped in prose or code fences.
pub fn parse_draft_response(raw: &str) -> Option<DraftResponse> {
    if let Ok(response) = serde_json::from_str::<DraftResponse>(raw.trim()) {
        return Some(response);
    }

    let candidate = extract_json_object(raw)?;
    serde_json::from_str::<DraftResponse>(candidate).ok()
}

/// The substring between the first `{` and the last `}`, inclusive.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parses a model supplied time, accepting `YYYY-MM-DD HH:MM:SS` (as UTC) or RFC 3339.
pub fn parse_event_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(value, EVENT_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_clean_json() {
        let raw = r#"{"title": "人工智能大会", "tags": ["AI"], "confidence": 0.9}"#;
        let response = parse_draft_response(raw).unwrap();
        assert_eq!(response.title, "人工智能大会");
        assert_eq!(response.tags, vec!["AI"]);
        assert_eq!(response.confidence, Some(0.9));
        assert!(response.location.is_empty());
    }

    #[test]
    fn test_recovers_json_wrapped_in_prose() {
        let raw = "好的，以下是结果：\n```json\n{\"title\": \"芯片发布\", \"confidence\": 0.7}\n```\n希望有帮助";
        let response = parse_draft_response(raw).unwrap();
        assert_eq!(response.title, "芯片发布");
    }

    #[test]
    fn test_rejects_unparseable_output() {
        assert!(parse_draft_response("this is not json").is_none());
        assert!(parse_draft_response("} backwards {").is_none());
        assert!(parse_draft_response("{\"title\": ").is_none());
    }

    #[test]
    fn test_confidence_only_response_is_not_usable() {
        let response = parse_draft_response(r#"{"confidence": 0}"#).unwrap();
        assert!(!response.is_usable());
    }

    #[test]
    fn test_parse_event_time() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_event_time("2025-03-01 08:00:00"), Some(expected));
        assert_eq!(parse_event_time("2025-03-01T08:00:00Z"), Some(expected));
        assert_eq!(parse_event_time("next week"), None);
        assert_eq!(parse_event_time(""), None);
    }
}
