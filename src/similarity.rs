//! Token-overlap similarity between news items and events.
//!
//! Ideographic scripts are tokenized one character per token, other scripts one
//! lowercased word per token. Titles additionally produce 2 to 4 character
//! n-grams over ideographic runs, which is what lets short headlines such as
//! "某队夺冠" and "某队夺冠后续报道" score as near-duplicates.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Event, NewsItem};

pub const TITLE_WEIGHT: f64 = 0.4;
pub const CONTENT_WEIGHT: f64 = 0.3;
pub const DESCRIPTION_WEIGHT: f64 = 0.2;
pub const TEMPORAL_WEIGHT: f64 = 0.1;

/// Publication/creation gap (in hours) at which temporal proximity drops to zero.
pub const TEMPORAL_HORIZON_HOURS: f64 = 24.0 * 7.0;

const MIN_NGRAM: usize = 2;
const MAX_NGRAM: usize = 4;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上",
        "也", "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
        "那", "里", "就是", "还是", "但是", "因为", "所以", "如果", "虽然", "然后", "现在",
        "已经", "可以", "应该", "需要", "可能", "或者", "今天", "昨天", "明天", "今年", "去年",
        "今日", "近日", "日前", "近期", "目前",
    ]
    .into_iter()
    .collect();
}

/// CJK ideographs plus kana and hangul syllables.
pub fn is_ideographic(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2FFFF)
}

/// Splits text into its set of meaningful tokens.
pub fn tokenize(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();

    for word in text.unicode_words() {
        if word.chars().any(is_ideographic) {
            for grapheme in word.graphemes(true) {
                if grapheme.chars().any(is_ideographic) {
                    tokens.insert(grapheme.to_string());
                }
            }
        } else if word.chars().count() > 1 || word.chars().all(|c| c.is_numeric()) {
            tokens.insert(word.to_lowercase());
        }
    }

    tokens
}

/// Whether a candidate n-gram is worth keeping as a keyword.
pub fn is_valid_keyword(word: &str) -> bool {
    word.chars().count() >= MIN_NGRAM && !STOP_WORDS.contains(word)
}

/// Extracts 2, 3 and 4 character n-grams from the ideographic runs of a title,
/// counting how often each occurs.
pub fn title_keywords(title: &str) -> HashMap<String, usize> {
    let mut keywords = HashMap::new();

    for run in ideographic_runs(title) {
        for n in MIN_NGRAM..=MAX_NGRAM {
            if run.len() < n {
                break;
            }
            for window in run.windows(n) {
                let word: String = window.iter().collect();
                if is_valid_keyword(&word) {
                    *keywords.entry(word).or_insert(0) += 1;
                }
            }
        }
    }

    keywords
}

fn ideographic_runs(text: &str) -> Vec<Vec<char>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for c in text.chars() {
        if is_ideographic(c) {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    intersection as f64 / union as f64
}

/// Jaccard index of the token sets of two texts; 0 when either side has no tokens.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

fn title_tokens(title: &str) -> HashSet<String> {
    let mut tokens = tokenize(title);
    tokens.extend(title_keywords(title).into_keys());
    tokens
}

/// Like [`text_similarity`] but with the title n-grams added to both token sets.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&title_tokens(a), &title_tokens(b))
}

/// 1.0 when published at the moment the event was created, falling linearly to
/// 0.0 at a one-week gap.
pub fn temporal_proximity(published_at: DateTime<Utc>, event_created_at: DateTime<Utc>) -> f64 {
    let gap_hours = (published_at - event_created_at).num_seconds().abs() as f64 / 3600.0;
    (1.0 - gap_hours / TEMPORAL_HORIZON_HOURS).max(0.0)
}

/// Category gate used before scoring. Mismatched non-empty categories never match;
/// an uncategorized side is compatible with anything.
pub fn categories_compatible(news_category: &str, event_category: &str) -> bool {
    news_category.is_empty() || event_category.is_empty() || news_category == event_category
}

/// Weighted match score in [0, 1] between a news item and an existing event.
///
/// This does not apply the category gate; callers check
/// [`categories_compatible`] first.
pub fn news_event_similarity(news: &NewsItem, event: &Event) -> f64 {
    let score = title_similarity(&news.title, &event.title) * TITLE_WEIGHT
        + text_similarity(&news.content, &event.content) * CONTENT_WEIGHT
        + text_similarity(&news.description, &event.description) * DESCRIPTION_WEIGHT
        + temporal_proximity(news.published_at, event.created_at) * TEMPORAL_WEIGHT;

    score.clamp(0.0, 1.0)
}

/// Share of title keywords that appear in more than one member, plus 0.2 when all
/// members share a category. Capped at 1.0; 0.0 for fewer than two members.
pub fn group_cohesion(items: &[NewsItem]) -> f64 {
    if items.len() < 2 {
        return 0.0;
    }

    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for item in items {
        for keyword in title_keywords(&item.title).into_keys() {
            *occurrences.entry(keyword).or_insert(0) += 1;
        }
    }

    if occurrences.is_empty() {
        return 0.0;
    }

    let shared = occurrences.values().filter(|&&count| count > 1).count();
    let mut cohesion = shared as f64 / occurrences.len() as f64;

    let first_category = &items[0].category;
    if items[1..].iter().all(|item| &item.category == first_category) {
        cohesion += 0.2;
    }

    cohesion.min(1.0)
}
