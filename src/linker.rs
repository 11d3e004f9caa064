use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::db::Database;
use crate::models::{Event, NewsItem};
use crate::similarity::{categories_compatible, news_event_similarity};

/// Outcome of trying to attach unlinked news to existing events.
#[derive(Debug, Default)]
pub struct LinkOutcome {
    pub remaining: Vec<NewsItem>,
    pub linked: Vec<(i64, i64)>,
}

impl LinkOutcome {
    fn pass_through(news: Vec<NewsItem>) -> Self {
        Self {
            remaining: news,
            linked: Vec::new(),
        }
    }

    pub fn linked_count(&self) -> usize {
        self.linked.len()
    }
}

/// Finds the highest scoring category-compatible event for a news item.
///
/// Events in a different category are skipped before scoring. Ties keep the
/// earlier event, and a zero score never counts as a match.
pub fn find_best_event_match<'a>(news: &NewsItem, events: &'a [Event]) -> Option<(&'a Event, f64)> {
    let mut best: Option<(&Event, f64)> = None;

    for event in events {
        if !categories_compatible(&news.category, &event.category) {
            continue;
        }

        let similarity = news_event_similarity(news, event);
        let best_so_far = best.map_or(0.0, |(_, score)| score);
        if similarity > best_so_far {
            best = Some((event, similarity));
        }
    }

    best
}

/// Plans links for a snapshot of news and candidate events without touching the
/// database. Returns `(news_id, event_id, score)` for every item at or above the
/// threshold.
pub fn plan_links(news: &[NewsItem], events: &[Event], threshold: f64) -> Vec<(i64, i64, f64)> {
    news.iter()
        .filter_map(|item| {
            find_best_event_match(item, events)
                .filter(|(_, score)| *score >= threshold)
                .map(|(event, score)| (item.id, event.id, score))
        })
        .collect()
}

/// Links each news item to its best recent event when the score clears
/// `linking_threshold`. Items that do not link, or whose link write fails, are
/// returned for event synthesis.
///
/// A failure to load candidate events links nothing and passes every item on.
pub async fn link_to_existing_events(
    db: &Database,
    news: Vec<NewsItem>,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> LinkOutcome {
    let since = now - Duration::days(config.event_lookback_days);
    let events = match db
        .fetch_candidate_events(since, config.max_candidate_events)
        .await
    {
        Ok(events) => events,
        Err(e) => {
            warn!("Failed to load recent events, skipping linking: {}", e);
            return LinkOutcome::pass_through(news);
        }
    };

    if events.is_empty() {
        info!("No recent active events; all news goes to event synthesis");
        return LinkOutcome::pass_through(news);
    }

    info!(
        "Matching {} news items against {} recent events",
        news.len(),
        events.len()
    );

    let mut outcome = LinkOutcome::default();

    for item in news {
        let best = find_best_event_match(&item, &events)
            .filter(|(_, score)| *score >= config.linking_threshold)
            .map(|(event, score)| (event.id, event.title.clone(), score));

        let Some((event_id, event_title, score)) = best else {
            debug!("News {} has no event above threshold", item.id);
            outcome.remaining.push(item);
            continue;
        };

        match db.link_news_to_event(item.id, event_id).await {
            Ok(true) => {
                info!(
                    "Linked news '{}' to event '{}' (similarity: {:.2})",
                    item.title, event_title, score
                );
                outcome.linked.push((item.id, event_id));
            }
            Ok(false) => {
                // Another run linked it first.
                debug!("News {} was already linked, skipping", item.id);
            }
            Err(e) => {
                warn!("Failed to link news {} to event {}: {}", item.id, event_id, e);
                outcome.remaining.push(item);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;

    fn event(id: i64, title: &str, category: &str, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            title: title.to_string(),
            description: String::new(),
            content: String::new(),
            category: category.to_string(),
            tags: vec![],
            location: String::new(),
            source: String::new(),
            author: String::new(),
            related_links: vec![],
            start_time: created_at,
            end_time: created_at,
            status: EventStatus::Ongoing,
            created_at,
            hotness_score: 0.0,
            view_count: 0,
        }
    }

    fn news(id: i64, title: &str, category: &str, published_at: DateTime<Utc>) -> NewsItem {
        NewsItem {
            id,
            title: title.to_string(),
            category: category.to_string(),
            published_at,
            ..NewsItem::default()
        }
    }

    #[test]
    fn test_category_mismatch_is_never_selected() {
        let now = Utc::now();
        let events = vec![
            event(1, "某队夺冠", "科技", now),
            event(2, "天气晴朗", "体育", now - Duration::days(6)),
        ];
        let item = news(10, "某队夺冠", "体育", now);

        let (best, _) = find_best_event_match(&item, &events).unwrap();
        assert_eq!(best.id, 2);

        let categories = ["体育", "科技", "财经", ""];
        for news_category in categories {
            for (i, event_category) in categories.iter().enumerate() {
                let events = vec![event(i as i64, "某队夺冠", event_category, now)];
                let item = news(1, "某队夺冠", news_category, now);
                if let Some((best, _)) = find_best_event_match(&item, &events) {
                    assert!(categories_compatible(&item.category, &best.category));
                }
            }
        }
    }

    #[test]
    fn test_plan_links_is_idempotent() {
        let now = Utc::now();
        let events = vec![
            event(1, "某队夺冠", "体育", now - Duration::days(2)),
            event(2, "芯片发布会", "科技", now - Duration::days(1)),
        ];
        let items = vec![
            news(10, "某队夺冠后续报道", "体育", now),
            news(11, "新款芯片发布", "科技", now),
            news(12, "股市收盘", "财经", now),
        ];

        let first = plan_links(&items, &events, 0.1);
        let second = plan_links(&items, &events, 0.1);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|(news_id, _, _)| *news_id != 12));
    }

    #[test]
    fn test_zero_score_is_not_a_match() {
        let now = Utc::now();
        let events = vec![event(1, "芯片", "体育", now - Duration::days(30))];
        let item = news(1, "某队夺冠", "体育", now);
        assert!(find_best_event_match(&item, &events).is_none());
    }
}
