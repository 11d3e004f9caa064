use chrono::Duration;

use crate::models::NewsItem;

/// Partitions news into chronological groups bounded by `window`.
///
/// Items are sorted by publication time (stable, so equal timestamps keep their
/// input order). A group is anchored at its earliest member and closes as soon as
/// an item falls more than `window` after that anchor. The window does not slide
/// forward with each new member, so a steady stream of items is cut into
/// consecutive `window`-wide slices instead of being chained into one group.
pub fn group_by_time_window(mut news: Vec<NewsItem>, window: Duration) -> Vec<Vec<NewsItem>> {
    if news.is_empty() {
        return Vec::new();
    }

    news.sort_by_key(|item| item.published_at);

    let mut groups = Vec::new();
    let mut current: Vec<NewsItem> = Vec::new();
    let mut window_start = news[0].published_at;

    for item in news {
        if current.is_empty() {
            window_start = item.published_at;
            current.push(item);
        } else if item.published_at - window_start <= window {
            current.push(item);
        } else {
            groups.push(std::mem::take(&mut current));
            window_start = item.published_at;
            current.push(item);
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn item(id: i64, hour: i64) -> NewsItem {
        NewsItem {
            id,
            published_at: at(hour),
            ..NewsItem::default()
        }
    }

    fn ids(groups: &[Vec<NewsItem>]) -> Vec<Vec<i64>> {
        groups
            .iter()
            .map(|g| g.iter().map(|n| n.id).collect())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_time_window(Vec::new(), Duration::hours(24)).is_empty());
    }

    #[test]
    fn test_sorts_before_grouping() {
        let news = vec![item(3, 30), item(1, 0), item(2, 10)];
        let groups = group_by_time_window(news, Duration::hours(24));
        assert_eq!(ids(&groups), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let news = vec![item(1, 0), item(2, 24), item(3, 25)];
        let groups = group_by_time_window(news, Duration::hours(24));
        assert_eq!(ids(&groups), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_window_is_anchored_not_sliding() {
        // A sliding window would chain all four items together.
        let news = vec![item(1, 0), item(2, 20), item(3, 40), item(4, 60)];
        let groups = group_by_time_window(news, Duration::hours(24));
        assert_eq!(ids(&groups), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_every_member_within_window_of_anchor() {
        let hours = [0, 3, 5, 23, 24, 26, 49, 50, 51, 90, 200, 201];
        let news: Vec<NewsItem> = hours.iter().enumerate().map(|(i, h)| item(i as i64, *h)).collect();
        let window = Duration::hours(24);

        let groups = group_by_time_window(news, window);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), hours.len());
        for group in &groups {
            let anchor = group[0].published_at;
            assert!(group.iter().all(|n| n.published_at - anchor <= window));
        }
    }
}
