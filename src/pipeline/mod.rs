//! End-to-end event generation run.
//!
//! One run fetches unlinked news, attaches what it can to recent events, sorts
//! the rest into topics and time windows, synthesizes a draft per group and
//! commits each draft together with its member links.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::classifier::classify_by_topic;
use crate::config::PipelineConfig;
use crate::db::{Database, DbLockErrorExt};
use crate::grouping::group_by_time_window;
use crate::linker::link_to_existing_events;
use crate::llm::TextGenerator;
use crate::models::{NewsItem, RunStats};
use crate::synthesis::{GenerationResult, Synthesizer};


#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Fetching,
    Linking,
    Classifying,
    Grouping,
    Synthesizing,
    Committing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Fetching => "fetching",
            PipelineStage::Linking => "linking",
            PipelineStage::Classifying => "classifying",
            PipelineStage::Grouping => "grouping",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Committing => "committing",
        };
        f.write_str(name)
    }
}

pub struct Pipeline {
    db: Database,
    config: PipelineConfig,
    synthesizer: Synthesizer,
    run_lock: Mutex<()>,
    stage_tx: watch::Sender<PipelineStage>,
}

impl Pipeline {
    pub fn new(
        db: Database,
        config: PipelineConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let synthesizer = Synthesizer::new(&config, generator);
        let (stage_tx, _) = watch::channel(PipelineStage::Idle);

        Self {
            db,
            config,
            synthesizer,
            run_lock: Mutex::new(()),
            stage_tx,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Watches the stage of the current run; `Idle` between runs.
    pub fn subscribe_stage(&self) -> watch::Receiver<PipelineStage> {
        self.stage_tx.subscribe()
    }

    fn set_stage(&self, stage: PipelineStage) {
        debug!("Pipeline stage: {}", stage);
        self.stage_tx.send_replace(stage);
    }

    /// Runs the pipeline once against the current time.
    pub async fn run(&self, cancel: &watch::Receiver<bool>) -> Result<RunStats> {
        self.run_at(Utc::now(), cancel).await
    }

    /// Runs the pipeline once, treating `now` as the current time.
    ///
    /// Does nothing when generation is disabled. Fails immediately if another
    /// run of this pipeline is in progress. Per-group failures are logged and
    /// counted in [`RunStats::errors`] without stopping the run; only a failure
    /// to read unlinked news aborts it. Cancellation is honoured between groups.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        cancel: &watch::Receiver<bool>,
    ) -> Result<RunStats> {
        if !self.config.enabled {
            info!("Event generation is disabled, nothing to do");
            return Ok(RunStats::default());
        }

        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| anyhow!("An event generation run is already in progress"))?;

        info!(
            "Starting event generation run ({} synthesis)",
            if self.synthesizer.has_generator() { "delegated" } else { "heuristic" }
        );

        let result = self.execute(now, cancel).await;
        self.set_stage(PipelineStage::Idle);

        match &result {
            Ok(stats) => info!(
                "Event generation finished: {} considered, {} linked to existing events, \
                 {} events created ({} structured, {} heuristic), {} rejected, \
                 {} groups skipped, {} errors{}",
                stats.considered,
                stats.linked,
                stats.generated,
                stats.structured,
                stats.heuristic,
                stats.rejected,
                stats.skipped_groups,
                stats.errors,
                if stats.cancelled { ", cancelled" } else { "" }
            ),
            Err(e) => error!("Event generation run failed: {:#}", e),
        }

        result
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        cancel: &watch::Receiver<bool>,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();

        self.set_stage(PipelineStage::Fetching);
        if self.config.max_news_limit > 0 {
            info!("Processing at most {} unlinked news", self.config.max_news_limit);
        }
        let news = self
            .db
            .fetch_unlinked_news(self.config.max_news_limit)
            .await
            .context("Failed to fetch unlinked news")?;

        stats.considered = news.len();
        if news.is_empty() {
            info!("No unlinked news to process");
            return Ok(stats);
        }
        info!("Found {} unlinked news", news.len());

        self.set_stage(PipelineStage::Linking);
        let outcome = link_to_existing_events(&self.db, news, &self.config, now).await;
        stats.linked = outcome.linked_count();
        if stats.linked > 0 {
            info!("Linked {} news to existing events", stats.linked);
        }

        let remaining = outcome.remaining;
        if remaining.is_empty() {
            info!("Every news item joined an existing event; no new events needed");
            return Ok(stats);
        }
        info!("{} news left for new events", remaining.len());

        self.set_stage(PipelineStage::Classifying);
        let buckets = classify_by_topic(remaining);

        'topics: for bucket in buckets {
            info!("Topic '{}': {} news", bucket.topic, bucket.news.len());

            self.set_stage(PipelineStage::Grouping);
            let groups = group_by_time_window(bucket.news, self.config.time_window());

            for (index, group) in groups.into_iter().enumerate() {
                if *cancel.borrow() {
                    warn!("Cancellation requested, stopping before the next group");
                    stats.cancelled = true;
                    break 'topics;
                }

                if group.len() < self.config.min_news_count {
                    info!(
                        "Topic '{}' group {} has too few news ({} < {}), skipping",
                        bucket.topic,
                        index,
                        group.len(),
                        self.config.min_news_count
                    );
                    stats.skipped_groups += 1;
                    continue;
                }

                self.process_group(&group, bucket.topic, index, now, &mut stats)
                    .await;
            }
        }

        Ok(stats)
    }

    async fn process_group(
        &self,
        group: &[NewsItem],
        topic: &str,
        index: usize,
        now: DateTime<Utc>,
        stats: &mut RunStats,
    ) {
        self.set_stage(PipelineStage::Synthesizing);
        let Some(result) = self.synthesizer.synthesize(group, topic).await else {
            stats.skipped_groups += 1;
            return;
        };

        let structured = matches!(result, GenerationResult::Structured(_));
        let draft = match result {
            GenerationResult::Failed { reason, .. } => {
                info!("Topic '{}' group {} rejected: {}", topic, index, reason);
                stats.rejected += 1;
                return;
            }
            other => match other.into_draft() {
                Some(draft) => draft,
                None => return,
            },
        };

        self.set_stage(PipelineStage::Committing);
        match self.db.create_event_and_link_news(&draft, now).await {
            Ok(event_id) => {
                info!(
                    "Created event {} '{}' from {} news (confidence {:.2})",
                    event_id,
                    draft.title,
                    draft.member_news_ids.len(),
                    draft.confidence
                );
                stats.generated += 1;
                if structured {
                    stats.structured += 1;
                } else {
                    stats.heuristic += 1;
                }
            }
            Err(e) => {
                stats.errors += 1;
                let locked = e
                    .downcast_ref::<sqlx::Error>()
                    .map_or(false, |e| e.is_database_lock_error());
                if locked {
                    warn!("Database busy, event '{}' not created: {}", draft.title, e);
                } else {
                    error!("Failed to create event '{}': {:#}", draft.title, e);
                }
            }
        }
    }
}
