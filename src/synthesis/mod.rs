//! Turns a group of related news into an event draft.
//!
//! With a [`TextGenerator`] configured, the group is sent to the endpoint and the
//! returned JSON becomes a [`GenerationResult::Structured`] draft. Without one, or
//! when the endpoint fails or answers with something unusable, the deterministic
//! heuristic generator produces a [`GenerationResult::Heuristic`] draft instead.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::llm::TextGenerator;
use crate::models::{EventDraft, NewsItem};
use crate::TARGET_LLM_REQUEST;

pub mod heuristic;
pub mod parse;
pub mod prompt;

pub use heuristic::heuristic_draft;
pub use parse::{parse_draft_response, DraftResponse};

use heuristic::dedup_tags;
use parse::parse_event_time;

/// Outcome of synthesizing one group.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationResult {
    /// Draft built from a parsed endpoint response.
    Structured(EventDraft),
    /// Draft built without the endpoint.
    Heuristic(EventDraft),
    /// No event should be created for this group.
    Failed { reason: String, confidence: f64 },
}

impl GenerationResult {
    pub fn draft(&self) -> Option<&EventDraft> {
        match self {
            GenerationResult::Structured(draft) | GenerationResult::Heuristic(draft) => Some(draft),
            GenerationResult::Failed { .. } => None,
        }
    }

    pub fn into_draft(self) -> Option<EventDraft> {
        match self {
            GenerationResult::Structured(draft) | GenerationResult::Heuristic(draft) => Some(draft),
            GenerationResult::Failed { .. } => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            GenerationResult::Structured(_) => "structured",
            GenerationResult::Heuristic(_) => "heuristic",
            GenerationResult::Failed { .. } => "failed",
        }
    }
}

/// Most common non-empty member category, ties broken by name; `fallback` when
/// no member is categorized.
pub fn dominant_category(group: &[NewsItem], fallback: &str) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for news in group {
        if !news.category.is_empty() {
            *counts.entry(news.category.as_str()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(category, _)| category.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

pub struct Synthesizer {
    config: PipelineConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    last_call: Mutex<Option<Instant>>,
}

impl Synthesizer {
    pub fn new(config: &PipelineConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            config: config.clone(),
            generator,
            last_call: Mutex::new(None),
        }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Synthesizes a draft for `group`, which was classified under `topic`.
    ///
    /// Returns `None` when the group is smaller than `min_news_count`. Endpoint
    /// errors never escape; they downgrade the result to the heuristic path.
    pub async fn synthesize(&self, group: &[NewsItem], topic: &str) -> Option<GenerationResult> {
        if group.is_empty() || group.len() < self.config.min_news_count {
            return None;
        }

        let category = dominant_category(group, topic);
        let fallback = heuristic_draft(group, &category, topic);

        let result = match &self.generator {
            Some(generator) => {
                self.delegate(generator.as_ref(), group, &category, topic, fallback)
                    .await
            }
            None => GenerationResult::Heuristic(fallback),
        };

        let result = self.apply_confidence_gate(result);
        info!(
            "Synthesized {} news under '{}' via {} path",
            group.len(),
            topic,
            result.path()
        );
        Some(result)
    }

    async fn delegate(
        &self,
        generator: &dyn TextGenerator,
        group: &[NewsItem],
        category: &str,
        topic: &str,
        fallback: EventDraft,
    ) -> GenerationResult {
        self.wait_for_call_slot().await;

        let request = prompt::build_request(group, category);
        let raw = match generator.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    target: TARGET_LLM_REQUEST,
                    "Generation via {} failed, using heuristic draft: {}",
                    generator.describe(),
                    e
                );
                return GenerationResult::Heuristic(fallback);
            }
        };

        match parse_draft_response(&raw) {
            Some(response) if response.is_usable() => {
                GenerationResult::Structured(merge_response(response, fallback, category, topic))
            }
            Some(_) => {
                warn!(target: TARGET_LLM_REQUEST, "Response has no title, using heuristic draft");
                GenerationResult::Heuristic(fallback)
            }
            None => {
                warn!(target: TARGET_LLM_REQUEST, "Response is not valid JSON, using heuristic draft");
                debug!(target: TARGET_LLM_REQUEST, "Unparseable response: {}", raw);
                GenerationResult::Heuristic(fallback)
            }
        }
    }

    /// Sleeps until `inter_call_delay` has passed since the previous endpoint call.
    async fn wait_for_call_slot(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.config.inter_call_delay {
                sleep(self.config.inter_call_delay - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    fn apply_confidence_gate(&self, result: GenerationResult) -> GenerationResult {
        if !self.config.require_confidence_gate {
            return result;
        }

        let confidence = match result.draft() {
            Some(draft) => draft.confidence,
            None => return result,
        };

        if confidence < self.config.confidence_threshold {
            GenerationResult::Failed {
                reason: format!(
                    "confidence {:.2} below threshold {:.2}",
                    confidence, self.config.confidence_threshold
                ),
                confidence,
            }
        } else {
            result
        }
    }
}

fn non_empty_or(value: String, default: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed.to_string()
    }
}

/// Fills a draft from an endpoint response. Blank fields and unparseable times
/// come from the heuristic draft; category is always the group's own.
fn merge_response(
    response: DraftResponse,
    fallback: EventDraft,
    category: &str,
    topic: &str,
) -> EventDraft {
    let start_time = parse_event_time(&response.start_time).unwrap_or(fallback.start_time);
    let end_time = parse_event_time(&response.end_time)
        .filter(|end| *end >= start_time)
        .unwrap_or_else(|| fallback.end_time.max(start_time));

    let tags = if response.tags.iter().all(|tag| tag.trim().is_empty()) {
        fallback.tags
    } else {
        let mut tags = vec![category.to_string()];
        tags.extend(response.tags);
        tags.push(topic.to_string());
        dedup_tags(tags)
    };

    let related_links = response
        .related_links
        .into_iter()
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect();

    let confidence = response
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(fallback.confidence);

    EventDraft {
        member_news_ids: fallback.member_news_ids,
        title: non_empty_or(response.title, fallback.title),
        description: non_empty_or(response.description, fallback.description),
        content: non_empty_or(response.content, fallback.content),
        category: category.to_string(),
        tags,
        location: non_empty_or(response.location, fallback.location),
        source: non_empty_or(response.source, fallback.source),
        author: non_empty_or(response.author, fallback.author),
        related_links,
        start_time,
        end_time,
        confidence,
    }
}
