use tracing::debug;

use crate::models::NewsItem;
use crate::topics::{predefined_topics, TopicDefinition, OTHER_TOPIC};

/// Minimum topic score needed to leave the catch-all bucket.
pub const MIN_TOPIC_SCORE: f64 = 0.2;

const TITLE_HIT_WEIGHT: f64 = 2.0;
const SUMMARY_HIT_WEIGHT: f64 = 1.5;
const TAGS_HIT_WEIGHT: f64 = 1.8;
const BODY_HIT_WEIGHT: f64 = 1.0;

/// News items assigned to one topic, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicBucket {
    pub topic: &'static str,
    pub news: Vec<NewsItem>,
}

/// Weighted keyword score of a news item against one topic.
///
/// Each keyword found anywhere in title, content, summary, tags or description
/// counts once, weighted by the most prominent field it appears in (title, then
/// summary, then tags, then anywhere else). The sum is divided by the topic's
/// keyword count.
pub fn calculate_topic_match_score(news: &NewsItem, topic: &TopicDefinition) -> f64 {
    if topic.keywords.is_empty() {
        return 0.0;
    }

    let tags = news.tags_text();
    let mut text = format!("{} {}", news.title, news.content);
    for extra in [news.summary.as_str(), tags.as_str(), news.description.as_str()] {
        if !extra.is_empty() {
            text.push(' ');
            text.push_str(extra);
        }
    }
    let text = text.to_lowercase();
    let title = news.title.to_lowercase();
    let summary = news.summary.to_lowercase();
    let tags = tags.to_lowercase();

    let weighted: f64 = topic
        .keywords
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .filter(|keyword| text.contains(keyword.as_str()))
        .map(|keyword| {
            if title.contains(&keyword) {
                TITLE_HIT_WEIGHT
            } else if summary.contains(&keyword) {
                SUMMARY_HIT_WEIGHT
            } else if tags.contains(&keyword) {
                TAGS_HIT_WEIGHT
            } else {
                BODY_HIT_WEIGHT
            }
        })
        .sum();

    weighted / topic.keywords.len() as f64
}

/// Picks the best topic for a news item, or `None` when no topic clears
/// [`MIN_TOPIC_SCORE`]. The first topic in catalog order wins a tie.
pub fn best_topic<'a>(
    news: &NewsItem,
    topics: &'a [TopicDefinition],
) -> Option<(&'a TopicDefinition, f64)> {
    let mut best: Option<(&TopicDefinition, f64)> = None;

    for topic in topics {
        let score = calculate_topic_match_score(news, topic);
        if score > MIN_TOPIC_SCORE && score > best.map_or(0.0, |(_, s)| s) {
            best = Some((topic, score));
        }
    }

    best
}

/// Buckets news by topic. Buckets come back in catalog order with the catch-all
/// bucket last; empty buckets are omitted.
pub fn classify_by_topic(news: Vec<NewsItem>) -> Vec<TopicBucket> {
    classify_with_topics(news, predefined_topics())
}

pub fn classify_with_topics(news: Vec<NewsItem>, topics: &'static [TopicDefinition]) -> Vec<TopicBucket> {
    let mut buckets: Vec<TopicBucket> = topics
        .iter()
        .map(|topic| TopicBucket {
            topic: topic.name,
            news: Vec::new(),
        })
        .collect();
    let mut other = Vec::new();

    for item in news {
        match best_topic(&item, topics) {
            Some((topic, score)) => {
                debug!("News '{}' classified as {} ({:.3})", item.title, topic.name, score);
                if let Some(bucket) = buckets.iter_mut().find(|b| b.topic == topic.name) {
                    bucket.news.push(item);
                }
            }
            None => {
                debug!("News '{}' classified as {}", item.title, OTHER_TOPIC);
                other.push(item);
            }
        }
    }

    buckets.push(TopicBucket {
        topic: OTHER_TOPIC,
        news: other,
    });
    buckets.retain(|bucket| !bucket.news.is_empty());
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            ..NewsItem::default()
        }
    }

    fn tech() -> &'static TopicDefinition {
        predefined_topics()
            .iter()
            .find(|t| t.name == "科技发展")
            .unwrap()
    }

    #[test]
    fn test_title_hits_outweigh_body_hits() {
        let in_title = news("人工智能芯片技术突破");
        let in_body = NewsItem {
            content: "人工智能芯片技术突破".to_string(),
            ..news("一则消息")
        };

        let topic = tech();
        let title_score = calculate_topic_match_score(&in_title, topic);
        let body_score = calculate_topic_match_score(&in_body, topic);
        assert!((title_score - 8.0 / 17.0).abs() < 1e-9);
        assert!((body_score - 4.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_and_tag_weights() {
        let topic = tech();
        let summary_hit = NewsItem {
            summary: "芯片".to_string(),
            ..news("一则消息")
        };
        let tag_hit = NewsItem {
            tags: vec!["芯片".to_string()],
            ..news("一则消息")
        };
        assert!((calculate_topic_match_score(&summary_hit, topic) - 1.5 / 17.0).abs() < 1e-9);
        assert!((calculate_topic_match_score(&tag_hit, topic) - 1.8 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_matching_ignores_case() {
        let topic = tech();
        let lower = calculate_topic_match_score(&news("ai 与 5g"), topic);
        let upper = calculate_topic_match_score(&news("AI 与 5G"), topic);
        assert_eq!(lower, upper);
        assert!(lower > 0.0);
    }

    #[test]
    fn test_score_is_pure() {
        let item = news("人工智能芯片技术突破");
        let first = calculate_topic_match_score(&item, tech());
        let second = calculate_topic_match_score(&item.clone(), tech());
        assert_eq!(first, second);
    }

    #[test]
    fn test_weak_matches_fall_into_other() {
        let buckets = classify_by_topic(vec![news("一则消息"), news("人工智能芯片技术突破")]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].topic, "科技发展");
        assert_eq!(buckets[1].topic, OTHER_TOPIC);
        assert_eq!(buckets[1].news[0].title, "一则消息");
    }

    #[test]
    fn test_ties_resolve_to_catalog_order() {
        // "安全" and "战略" belong to both 军事新闻 and 国际局势, both 15 keywords
        let item = news("安全战略军事");
        let (topic, _) = best_topic(&item, predefined_topics()).unwrap();
        assert_eq!(topic.name, "军事新闻");
    }
}
