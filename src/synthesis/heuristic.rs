use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{EventDraft, NewsItem};
use crate::similarity::{group_cohesion, title_keywords};

use super::parse::EVENT_TIME_FORMAT;

pub const HEURISTIC_AUTHOR: &str = "AI智能生成";
pub const DEFAULT_SOURCE: &str = "综合报道";
pub const DEFAULT_LOCATION: &str = "多地";
pub const TAG_AI_GENERATED: &str = "AI-generated";
pub const TAG_TOPIC_CLUSTER: &str = "topic-cluster";

/// Base confidence of a heuristic draft before the cohesion bonus.
pub const BASE_CONFIDENCE: f64 = 0.7;

const MAX_KEYWORD_TAGS: usize = 5;

const GAZETTEER: [&str; 10] = [
    "北京", "上海", "深圳", "广州", "中国", "美国", "欧洲", "日本", "俄罗斯", "乌克兰",
];

/// Builds a complete draft from the group alone, without any external call.
pub fn heuristic_draft(group: &[NewsItem], category: &str, topic: &str) -> EventDraft {
    let keywords = ranked_keywords(group);

    let start_time = group
        .iter()
        .map(|n| n.published_at)
        .min()
        .unwrap_or_default();
    let end_time = group
        .iter()
        .map(|n| n.published_at)
        .max()
        .unwrap_or_default()
        + Duration::hours(24);

    EventDraft {
        member_news_ids: group.iter().map(|n| n.id).collect(),
        title: event_title(group.len(), category, &keywords),
        description: event_description(group, category),
        content: event_content(group),
        category: category.to_string(),
        tags: event_tags(category, topic, &keywords),
        location: infer_location(group),
        source: major_source(group),
        author: HEURISTIC_AUTHOR.to_string(),
        related_links: Vec::new(),
        start_time,
        end_time,
        confidence: heuristic_confidence(group),
    }
}

pub fn heuristic_confidence(group: &[NewsItem]) -> f64 {
    (BASE_CONFIDENCE + (1.0 - BASE_CONFIDENCE) * group_cohesion(group)).clamp(0.0, 1.0)
}

/// Title keywords summed over all members, most frequent first. Ties prefer the
/// longer keyword, then the lexicographically smaller one.
fn ranked_keywords(group: &[NewsItem]) -> Vec<(String, usize)> {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for news in group {
        for (keyword, count) in title_keywords(&news.title) {
            *frequencies.entry(keyword).or_insert(0) += count;
        }
    }

    let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
    ranked.sort_by(|(a, fa), (b, fb)| {
        fb.cmp(fa)
            .then_with(|| b.chars().count().cmp(&a.chars().count()))
            .then_with(|| a.cmp(b))
    });
    ranked
}

fn event_title(member_count: usize, category: &str, keywords: &[(String, usize)]) -> String {
    match keywords.first() {
        Some((keyword, frequency)) if *frequency > 1 => format!("{}：{}相关动态", category, keyword),
        _ if member_count > 1 => format!("{}：近期重要发展", category),
        _ => format!("{}相关事件", category),
    }
}

fn event_description(group: &[NewsItem], category: &str) -> String {
    if group.is_empty() {
        return format!("基于新闻聚类生成的{}事件", category);
    }

    let mut description = format!("基于{}条新闻聚类分析生成的{}主题事件", group.len(), category);

    if let Some(span) = time_span_label(group) {
        description.push_str(&format!("，时间跨度：{}", span));
    }

    let sources = main_sources(group);
    match sources.len() {
        1 => description.push_str(&format!("，主要来源：{}", sources[0])),
        2 | 3 => description.push_str(&format!("，主要来源：{}等", sources[..2].join("、"))),
        _ => {}
    }

    description
}

/// Sources worth naming in a description: all of them when there are at most
/// three distinct ones, otherwise only those seen more than once.
fn main_sources(group: &[NewsItem]) -> Vec<String> {
    let counts = source_counts(group);
    let distinct = counts.len();

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1 || distinct <= 3)
        .map(|(source, _)| source)
        .collect()
}

/// Non-empty sources with their counts, most frequent first, then by name.
fn source_counts(group: &[NewsItem]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for news in group {
        if !news.source.is_empty() {
            *counts.entry(news.source.as_str()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(source, count)| (source.to_string(), count))
        .collect();
    counts.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)));
    counts
}

/// Human readable span between the earliest and latest member; `None` for a
/// single member.
pub fn time_span_label(group: &[NewsItem]) -> Option<String> {
    if group.len() <= 1 {
        return None;
    }

    let earliest = group.iter().map(|n| n.published_at).min()?;
    let latest = group.iter().map(|n| n.published_at).max()?;
    let hours = (latest - earliest).num_seconds() as f64 / 3600.0;

    let label = if hours < 1.0 {
        "1小时内".to_string()
    } else if hours <= 24.0 {
        format!("{:.0}小时", hours)
    } else if hours / 24.0 <= 7.0 {
        format!("{:.0}天", hours / 24.0)
    } else {
        format!("{:.1}周", hours / 24.0 / 7.0)
    };

    Some(label)
}

fn format_time(value: DateTime<Utc>) -> String {
    value.format(EVENT_TIME_FORMAT).to_string()
}

fn event_content(group: &[NewsItem]) -> String {
    let mut content = String::from("# 事件总结\n\n## 相关新闻\n\n");

    for (i, news) in group.iter().enumerate() {
        content.push_str(&format!("### {}. {}\n", i + 1, news.title));
        content.push_str(&format!(
            "**来源**: {} | **发布时间**: {}\n\n",
            news.source,
            format_time(news.published_at)
        ));

        if !news.summary.is_empty() {
            content.push_str(&format!("**摘要**: {}\n\n", news.summary));
        } else if !news.description.is_empty() {
            content.push_str(&format!("**描述**: {}\n\n", news.description));
        }

        content.push_str("---\n\n");
    }

    content.push_str("## 事件分析\n\n");
    content.push_str("本事件由系统AI自动分析多条相关新闻生成，汇总了相关的新闻报道和信息。\n\n");
    content
}

fn event_tags(category: &str, topic: &str, keywords: &[(String, usize)]) -> Vec<String> {
    let mut tags = vec![
        category.to_string(),
        TAG_AI_GENERATED.to_string(),
        TAG_TOPIC_CLUSTER.to_string(),
        topic.to_string(),
    ];

    tags.extend(
        keywords
            .iter()
            .filter(|(_, frequency)| *frequency > 1)
            .take(MAX_KEYWORD_TAGS)
            .map(|(keyword, _)| keyword.clone()),
    );

    dedup_tags(tags)
}

/// Drops empty and repeated tags, keeping first occurrences in order.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// First gazetteer place found, scanning members in order.
fn infer_location(group: &[NewsItem]) -> String {
    for news in group {
        let text = format!("{} {} {}", news.title, news.content, news.summary);
        if let Some(place) = GAZETTEER.iter().find(|place| text.contains(*place)) {
            return place.to_string();
        }
    }
    DEFAULT_LOCATION.to_string()
}

/// Most frequent source, suffixed with "等" when it covers more than one member.
fn major_source(group: &[NewsItem]) -> String {
    match source_counts(group).into_iter().next() {
        Some((source, count)) if count > 1 => format!("{}等", source),
        Some((source, _)) => source,
        None => DEFAULT_SOURCE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn news(id: i64, title: &str, source: &str, hour: u32) -> NewsItem {
        NewsItem {
            id,
            title: title.to_string(),
            source: source.to_string(),
            category: "科技".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            ..NewsItem::default()
        }
    }

    fn ai_group() -> Vec<NewsItem> {
        vec![
            news(1, "人工智能大会在北京开幕", "新华网", 8),
            news(2, "人工智能芯片发布", "新华网", 9),
            news(3, "人工智能监管新规", "人民网", 10),
        ]
    }

    #[test]
    fn test_heuristic_draft_shape() {
        let group = ai_group();
        let draft = heuristic_draft(&group, "科技", "科技创新");

        assert_eq!(draft.member_news_ids, vec![1, 2, 3]);
        assert_eq!(draft.title, "科技：人工智能相关动态");
        assert_eq!(draft.category, "科技");
        assert_eq!(draft.location, "北京");
        assert_eq!(draft.source, "新华网等");
        assert_eq!(draft.author, HEURISTIC_AUTHOR);
        assert!(draft.related_links.is_empty());
        assert_eq!(draft.start_time, group[0].published_at);
        assert_eq!(draft.end_time, group[2].published_at + Duration::hours(24));
        assert!(draft.confidence >= BASE_CONFIDENCE && draft.confidence <= 1.0);
    }

    #[test]
    fn test_tags_start_with_fixed_labels() {
        let draft = heuristic_draft(&ai_group(), "科技", "科技创新");
        assert_eq!(
            &draft.tags[..4],
            &["科技", TAG_AI_GENERATED, TAG_TOPIC_CLUSTER, "科技创新"]
        );
        assert!(draft.tags.contains(&"人工智能".to_string()));
        assert!(draft.tags.len() <= 4 + MAX_KEYWORD_TAGS);
    }

    #[test]
    fn test_topic_tag_not_repeated() {
        let draft = heuristic_draft(&ai_group(), "其他", "其他");
        assert_eq!(draft.tags.iter().filter(|t| t.as_str() == "其他").count(), 1);
    }

    #[test]
    fn test_title_without_dominant_keyword() {
        let group = vec![news(1, "火星探测", "a", 1), news(2, "量子计算", "b", 2)];
        assert_eq!(heuristic_draft(&group, "科技", "科技").title, "科技：近期重要发展");

        let single = vec![news(1, "火星探测", "a", 1)];
        assert_eq!(heuristic_draft(&single, "科技", "科技").title, "科技相关事件");
    }

    #[test]
    fn test_description_mentions_span_and_sources() {
        let description = event_description(&ai_group(), "科技");
        assert_eq!(
            description,
            "基于3条新闻聚类分析生成的科技主题事件，时间跨度：2小时，主要来源：新华网、人民网等"
        );
    }

    #[test]
    fn test_time_span_buckets() {
        let at = |hours: i64| NewsItem {
            published_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hours),
            ..NewsItem::default()
        };

        assert_eq!(time_span_label(&[at(0)]), None);
        assert_eq!(time_span_label(&[at(0), at(0)]).unwrap(), "1小时内");
        assert_eq!(time_span_label(&[at(0), at(5)]).unwrap(), "5小时");
        assert_eq!(time_span_label(&[at(0), at(72)]).unwrap(), "3天");
        assert_eq!(time_span_label(&[at(0), at(24 * 21)]).unwrap(), "3.0周");
    }

    #[test]
    fn test_location_and_source_defaults() {
        let group = vec![news(1, "火星探测", "", 1), news(2, "量子计算", "", 2)];
        assert_eq!(infer_location(&group), DEFAULT_LOCATION);
        assert_eq!(major_source(&group), DEFAULT_SOURCE);
    }

    #[test]
    fn test_content_lists_members() {
        let mut group = ai_group();
        group[0].summary = "大会摘要".to_string();
        group[1].description = "芯片描述".to_string();

        let content = event_content(&group);
        assert!(content.starts_with("# 事件总结\n\n## 相关新闻\n\n### 1. 人工智能大会在北京开幕\n"));
        assert!(content.contains("**来源**: 新华网 | **发布时间**: 2025-03-01 08:00:00"));
        assert!(content.contains("**摘要**: 大会摘要"));
        assert!(content.contains("**描述**: 芯片描述"));
        assert!(content.contains("## 事件分析"));
    }
}
