use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use tracing::{debug, info, instrument};

use super::core::{decode_rows, decode_string_list, encode_string_list, parse_db_timestamp, to_db_timestamp, Database};
use crate::models::{Event, EventDraft, EventStatus, GenerationStatistics};
use crate::TARGET_DB;

/// User id recorded as the creator of every synthesized event.
pub const SYSTEM_USER_ID: i64 = 1;

const EVENT_COLUMNS: &str = "id, title, description, content, category, tags, location, source, \
                             author, related_links, start_time, end_time, status, created_at, \
                             hotness_score, view_count";

fn event_from_row(row: &SqliteRow) -> Result<Event, sqlx::Error> {
    let tags: String = row.try_get("tags")?;
    let related_links: String = row.try_get("related_links")?;
    let start_time: String = row.try_get("start_time")?;
    let end_time: String = row.try_get("end_time")?;
    let created_at: String = row.try_get("created_at")?;
    let status: String = row.try_get("status")?;

    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        tags: decode_string_list(&tags),
        location: row.try_get("location")?,
        source: row.try_get("source")?,
        author: row.try_get("author")?,
        related_links: decode_string_list(&related_links),
        start_time: parse_db_timestamp(&start_time)?,
        end_time: parse_db_timestamp(&end_time)?,
        status: EventStatus::from_db(&status),
        created_at: parse_db_timestamp(&created_at)?,
        hotness_score: row.try_get("hotness_score")?,
        view_count: row.try_get("view_count")?,
    })
}

impl Database {
    /// Events created after `since` that have not ended, newest first, capped at `limit`.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn fetch_candidate_events(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM events
            WHERE datetime(created_at) > datetime(?) AND status NOT IN ('ended', '已结束')
            ORDER BY datetime(created_at) DESC, id DESC
            LIMIT ?
            "#,
            EVENT_COLUMNS
        ))
        .bind(to_db_timestamp(since))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(decode_rows(&rows, "events", event_from_row))
    }

    pub async fn fetch_event(&self, event_id: i64) -> Result<Option<Event>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
            .bind(event_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    /// Ids of the news rows linked to an event.
    pub async fn fetch_event_news_ids(&self, event_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM news WHERE belonged_event_id = ? ORDER BY id")
            .bind(event_id)
            .fetch_all(self.pool())
            .await
    }

    /// Creates an event from a draft and links every member news item to it, in
    /// one transaction.
    ///
    /// The event is inserted as ongoing and attributed to [`SYSTEM_USER_ID`].
    /// Only unlinked news rows are updated; if any member is missing or already
    /// linked, the whole transaction rolls back and no event is left behind.
    #[instrument(target = "db", level = "info", skip(self, draft), fields(title = %draft.title))]
    pub async fn create_event_and_link_news(
        &self,
        draft: &EventDraft,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let mut member_ids = draft.member_news_ids.clone();
        member_ids.sort_unstable();
        member_ids.dedup();

        if member_ids.is_empty() {
            bail!("Refusing to create event '{}' without member news", draft.title);
        }

        let now = to_db_timestamp(now);
        let mut transaction = self.pool().begin().await?;

        let event_id = sqlx::query(
            r#"
            INSERT INTO events
            (title, description, content, category, tags, location, source, author, related_links,
             start_time, end_time, status, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.content)
        .bind(&draft.category)
        .bind(encode_string_list(&draft.tags))
        .bind(&draft.location)
        .bind(&draft.source)
        .bind(&draft.author)
        .bind(encode_string_list(&draft.related_links))
        .bind(to_db_timestamp(draft.start_time))
        .bind(to_db_timestamp(draft.end_time))
        .bind(EventStatus::Ongoing.as_str())
        .bind(SYSTEM_USER_ID)
        .bind(&now)
        .bind(&now)
        .execute(&mut *transaction)
        .await?
        .last_insert_rowid();

        debug!(target: TARGET_DB, "Inserted event {} ('{}')", event_id, draft.title);

        let placeholders = vec!["?"; member_ids.len()].join(", ");
        let sql = format!(
            "UPDATE news SET belonged_event_id = ? WHERE belonged_event_id IS NULL AND id IN ({})",
            placeholders
        );
        let mut update = sqlx::query(&sql).bind(event_id);
        for id in &member_ids {
            update = update.bind(*id);
        }
        let linked = update.execute(&mut *transaction).await?.rows_affected();

        if linked != member_ids.len() as u64 {
            transaction.rollback().await?;
            bail!(
                "Only {} of {} member news could be linked to '{}'; rolled back",
                linked,
                member_ids.len(),
                draft.title
            );
        }

        transaction.commit().await?;

        info!(target: TARGET_DB, "Created event {} and linked {} news", event_id, linked);
        Ok(event_id)
    }

    /// Catalog-wide counters. "AI generated" means the author starts with "AI".
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn generation_statistics(
        &self,
        now: DateTime<Utc>,
        lookback_days: i64,
    ) -> Result<GenerationStatistics, sqlx::Error> {
        let count = |sql: &'static str| sqlx::query_scalar::<Sqlite, i64>(sql);

        let total_events = count("SELECT COUNT(*) FROM events")
            .fetch_one(self.pool())
            .await?;
        let ai_generated_events = count("SELECT COUNT(*) FROM events WHERE author LIKE 'AI%'")
            .fetch_one(self.pool())
            .await?;
        let unlinked_news = count("SELECT COUNT(*) FROM news WHERE belonged_event_id IS NULL")
            .fetch_one(self.pool())
            .await?;
        let linked_news = count("SELECT COUNT(*) FROM news WHERE belonged_event_id IS NOT NULL")
            .fetch_one(self.pool())
            .await?;
        let recent_active_events = count(
            "SELECT COUNT(*) FROM events \
             WHERE datetime(created_at) > datetime(?) AND status NOT IN ('ended', '已结束')",
        )
        .bind(to_db_timestamp(now - Duration::days(lookback_days)))
        .fetch_one(self.pool())
        .await?;

        Ok(GenerationStatistics {
            total_events,
            ai_generated_events,
            unlinked_news,
            linked_news,
            recent_active_events,
        })
    }
}
