use anyhow::Result;
use chrono::{Months, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::rows::{get_optional_datetime, get_uuid};
use super::Database;
use crate::errors::AppError;
use crate::models::{Cover, NumberOfItemByDate, Podcast, StatsPodcastType, Tag};

/// Timestamp column the statistics queries bucket on. Closed set so only
/// whitelisted column names ever reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    CreationDate,
    PubDate,
    DownloadDate,
}

impl StatField {
    fn column(&self) -> &'static str {
        match self {
            StatField::CreationDate => "i.creation_date",
            StatField::PubDate => "i.pub_date",
            StatField::DownloadDate => "i.download_date",
        }
    }
}

fn map_podcast(row: &SqliteRow, tags: Vec<Tag>) -> Result<Podcast> {
    let id = get_uuid(row, "id")?;

    // The cover join is an inner invariant: a podcast row without a cover
    // row means the store is corrupt, not that the cover is optional.
    let cover_id: Option<String> = row.try_get("cover_id")?;
    let Some(cover_id) = cover_id else {
        return Err(AppError::data_integrity(format!("podcast {} has no cover", id)).into());
    };

    Ok(Podcast {
        id,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        podcast_type: row.try_get("type")?,
        has_to_be_deleted: row.try_get("has_to_be_deleted")?,
        last_update: get_optional_datetime(row, "last_update")?,
        cover: Cover {
            id: Uuid::parse_str(&cover_id)?,
            url: row.try_get("cover_url")?,
            width: row.try_get("cover_width")?,
            height: row.try_get("cover_height")?,
        },
        tags,
    })
}

impl Database {
    /// Fetch one podcast with its cover and full tag set. A missing id is
    /// an empty result, never an error.
    pub async fn find_podcast_by_id(&self, id: Uuid) -> Result<Option<Podcast>> {
        let (row, tags) = futures::try_join!(
            async {
                sqlx::query(
                    "SELECT p.id, p.title, p.url, p.description, p.type,
                            p.has_to_be_deleted, p.last_update,
                            c.id AS cover_id, c.url AS cover_url,
                            c.width AS cover_width, c.height AS cover_height
                     FROM podcasts p
                     LEFT JOIN covers c ON p.cover_id = c.id
                     WHERE p.id = ?",
                )
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(anyhow::Error::from)
            },
            self.find_tags_by_podcast_id(id),
        )?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(map_podcast(&row, tags)?))
    }

    /// All podcasts with covers and tags, ordered by title.
    pub async fn find_all_podcasts(&self) -> Result<Vec<Podcast>> {
        let rows = sqlx::query(
            "SELECT p.id, p.title, p.url, p.description, p.type,
                    p.has_to_be_deleted, p.last_update,
                    c.id AS cover_id, c.url AS cover_url,
                    c.width AS cover_width, c.height AS cover_height
             FROM podcasts p
             LEFT JOIN covers c ON p.cover_id = c.id
             ORDER BY p.title",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut podcasts = Vec::with_capacity(rows.len());
        for row in rows {
            let id = get_uuid(&row, "id")?;
            let tags = self.find_tags_by_podcast_id(id).await?;
            podcasts.push(map_podcast(&row, tags)?);
        }

        Ok(podcasts)
    }

    /// Tag set associated to a podcast through the join table. Unordered;
    /// deduplication is a write-path concern and is not applied here.
    pub async fn find_tags_by_podcast_id(&self, id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name
             FROM tags t
             INNER JOIN podcast_tags pt ON t.id = pt.tag_id
             WHERE pt.podcast_id = ?",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut tags = Vec::with_capacity(rows.len());
        for row in rows {
            tags.push(Tag {
                id: get_uuid(&row, "id")?,
                name: row.try_get("name")?,
            });
        }

        Ok(tags)
    }

    /// Per-day item counts for one podcast over the trailing window of
    /// `months` months, bucketed on `field`, newest day first. Buckets
    /// with no matching items are absent. An unknown podcast id yields
    /// an empty series.
    pub async fn stats_by_podcast_and_field(
        &self,
        podcast_id: Uuid,
        months: u32,
        field: StatField,
    ) -> Result<Vec<NumberOfItemByDate>> {
        let column = field.column();
        let cutoff = stats_cutoff(months)?;

        debug!(
            "Computing stats for podcast {} on {} since {}",
            podcast_id, column, cutoff
        );

        let sql = format!(
            "SELECT date({column}) AS day, COUNT(*) AS number_of_items
             FROM items i
             WHERE i.podcast_id = ?
               AND {column} IS NOT NULL
               AND datetime({column}) >= datetime(?)
             GROUP BY day
             ORDER BY day DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(podcast_id.to_string())
            .bind(&cutoff)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_bucket).collect()
    }

    /// Global per-day item counts over the trailing window, one series per
    /// podcast type. The grouping key is strictly the `podcasts.type`
    /// column. Types without any matching item are absent.
    pub async fn stats_by_type_and_field(
        &self,
        months: u32,
        field: StatField,
    ) -> Result<Vec<StatsPodcastType>> {
        let column = field.column();
        let cutoff = stats_cutoff(months)?;

        debug!("Computing global stats on {} since {}", column, cutoff);

        let sql = format!(
            "SELECT p.type AS podcast_type, date({column}) AS day, COUNT(*) AS number_of_items
             FROM items i
             INNER JOIN podcasts p ON i.podcast_id = p.id
             WHERE {column} IS NOT NULL
               AND datetime({column}) >= datetime(?)
             GROUP BY p.type, day
             ORDER BY day DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(&cutoff)
            .fetch_all(&self.pool)
            .await?;

        // One pass over the day-ordered rows, grouping by type in
        // encounter order; each series keeps its day-descending order.
        let mut stats: Vec<StatsPodcastType> = Vec::new();
        for row in &rows {
            let podcast_type: String = row.try_get("podcast_type")?;
            let bucket = map_bucket(row)?;

            match stats.iter_mut().find(|s| s.podcast_type == podcast_type) {
                Some(series) => series.values.push(bucket),
                None => stats.push(StatsPodcastType {
                    podcast_type,
                    values: vec![bucket],
                }),
            }
        }

        Ok(stats)
    }
}

fn map_bucket(row: &SqliteRow) -> Result<NumberOfItemByDate> {
    let day: String = row.try_get("day")?;
    Ok(NumberOfItemByDate {
        date: NaiveDate::parse_from_str(&day, "%Y-%m-%d")?,
        number_of_items: row.try_get("number_of_items")?,
    })
}

/// Start of the trailing window, `months` calendar months before now.
fn stats_cutoff(months: u32) -> Result<String> {
    let cutoff = Utc::now()
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| anyhow::anyhow!("Month window out of range: {}", months))?;
    Ok(cutoff.to_rfc3339())
}
