use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ingested article as read from the `news` table.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub source: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub belonged_event_id: Option<i64>,
}

impl NewsItem {
    /// Tags joined the way they are matched against topic keywords.
    pub fn tags_text(&self) -> String {
        self.tags.join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Ongoing,
    Ended,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Ongoing => "ongoing",
            EventStatus::Ended => "ended",
        }
    }

    /// Anything not explicitly ended is treated as still running.
    pub fn from_db(value: &str) -> Self {
        match value {
            "ended" | "已结束" => EventStatus::Ended,
            _ => EventStatus::Ongoing,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event row. Only the columns the pipeline reads or writes are mapped;
/// hotness and view counters belong to other services.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub location: String,
    pub source: String,
    pub author: String,
    pub related_links: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub hotness_score: f64,
    pub view_count: i64,
}

/// A synthesized event that has not been committed yet.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EventDraft {
    pub member_news_ids: Vec<i64>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub location: String,
    pub source: String,
    pub author: String,
    pub related_links: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub confidence: f64,
}

/// Counters for one pipeline run.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct RunStats {
    pub considered: usize,
    pub linked: usize,
    pub generated: usize,
    pub structured: usize,
    pub heuristic: usize,
    pub rejected: usize,
    pub skipped_groups: usize,
    pub errors: usize,
    pub cancelled: bool,
}

/// Catalog-wide counters reported by `storyline stats`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct GenerationStatistics {
    pub total_events: i64,
    pub ai_generated_events: i64,
    pub unlinked_news: i64,
    pub linked_news: i64,
    pub recent_active_events: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_news_item_json_keeps_publish_time() {
        let news = NewsItem {
            id: 7,
            title: "人工智能大会开幕".to_string(),
            tags: vec!["AI".to_string()],
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
            belonged_event_id: Some(3),
            ..NewsItem::default()
        };

        let json = serde_json::to_value(&news).unwrap();
        assert_eq!(json["published_at"], "2025-03-01T08:30:00Z");

        let decoded: NewsItem = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, news);
    }

    #[test]
    fn test_event_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(EventStatus::Ended).unwrap(), "ended");
        assert_eq!(EventStatus::from_db("已结束"), EventStatus::Ended);
        assert_eq!(EventStatus::from_db("进行中"), EventStatus::Ongoing);
    }
}
