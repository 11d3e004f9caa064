use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, instrument};

use super::core::{decode_rows, decode_string_list, encode_string_list, parse_db_timestamp, to_db_timestamp, Database};
use crate::models::NewsItem;
use crate::TARGET_DB;

const NEWS_COLUMNS: &str = "id, title, content, summary, description, category, tags, source, \
                            author, published_at, belonged_event_id";

pub(crate) fn news_from_row(row: &SqliteRow) -> Result<NewsItem, sqlx::Error> {
    let published_at: String = row.try_get("published_at")?;
    let tags: String = row.try_get("tags")?;

    Ok(NewsItem {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        summary: row.try_get("summary")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        tags: decode_string_list(&tags),
        source: row.try_get("source")?,
        author: row.try_get("author")?,
        published_at: parse_db_timestamp(&published_at)?,
        belonged_event_id: row.try_get("belonged_event_id")?,
    })
}

impl Database {
    /// Fetches news that does not belong to any event yet, newest first.
    /// A `limit` of 0 returns every unlinked item.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn fetch_unlinked_news(&self, limit: usize) -> Result<Vec<NewsItem>, sqlx::Error> {
        let mut sql = format!(
            "SELECT {} FROM news WHERE belonged_event_id IS NULL \
             ORDER BY datetime(published_at) DESC, id DESC",
            NEWS_COLUMNS
        );
        if limit > 0 {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if limit > 0 {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(self.pool()).await?;
        let news = decode_rows(&rows, "news", news_from_row);

        debug!(target: TARGET_DB, "Fetched {} unlinked news items", news.len());
        Ok(news)
    }

    /// Links one news item to an event. Only unlinked rows are touched; returns
    /// `false` when the item was already linked (or does not exist).
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn link_news_to_event(&self, news_id: i64, event_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE news
            SET belonged_event_id = ?
            WHERE id = ? AND belonged_event_id IS NULL
            "#,
        )
        .bind(event_id)
        .bind(news_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn fetch_news(&self, news_id: i64) -> Result<Option<NewsItem>, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT {} FROM news WHERE id = ?", NEWS_COLUMNS))
            .bind(news_id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(news_from_row).transpose()
    }

    /// Inserts a news row and returns its id. The `id` field of `news` is ignored.
    #[instrument(target = "db", level = "info", skip(self, news), fields(title = %news.title))]
    pub async fn insert_news(&self, news: &NewsItem) -> Result<i64, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO news
            (title, content, summary, description, category, tags, source, author, published_at, belonged_event_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&news.title)
        .bind(&news.content)
        .bind(&news.summary)
        .bind(&news.description)
        .bind(&news.category)
        .bind(encode_string_list(&news.tags))
        .bind(&news.source)
        .bind(&news.author)
        .bind(to_db_timestamp(news.published_at))
        .bind(news.belonged_event_id)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        Ok(id)
    }
}
