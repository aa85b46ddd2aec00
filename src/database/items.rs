use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::rows::{get_optional_datetime, get_status, get_uuid};
use super::Database;
use crate::errors::AppError;
use crate::models::{Cover, Item, ItemPageRequest, ItemSearchCriteria, Page, PodcastForItem};

const ITEM_SELECT: &str = "SELECT i.id, i.title, i.url, i.description, i.mime_type, i.length,
        i.file_name, i.status, i.pub_date, i.creation_date, i.download_date,
        p.id AS podcast_id, p.title AS podcast_title, p.url AS podcast_url,
        c.id AS cover_id, c.url AS cover_url, c.width AS cover_width, c.height AS cover_height
 FROM items i
 INNER JOIN podcasts p ON i.podcast_id = p.id
 LEFT JOIN covers c ON i.cover_id = c.id";

fn map_item(row: &SqliteRow) -> Result<Item> {
    let id = get_uuid(row, "id")?;

    let cover_id: Option<String> = row.try_get("cover_id")?;
    let Some(cover_id) = cover_id else {
        return Err(AppError::data_integrity(format!("item {} has no cover", id)).into());
    };

    Ok(Item {
        id,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        mime_type: row.try_get("mime_type")?,
        length: row.try_get("length")?,
        file_name: row.try_get("file_name")?,
        status: get_status(row, "status")?,
        pub_date: get_optional_datetime(row, "pub_date")?,
        creation_date: get_optional_datetime(row, "creation_date")?,
        download_date: get_optional_datetime(row, "download_date")?,
        podcast: PodcastForItem {
            id: get_uuid(row, "podcast_id")?,
            title: row.try_get("podcast_title")?,
            url: row.try_get("podcast_url")?,
        },
        cover: Cover {
            id: Uuid::parse_str(&cover_id)?,
            url: row.try_get("cover_url")?,
            width: row.try_get("cover_width")?,
            height: row.try_get("cover_height")?,
        },
    })
}

/// WHERE fragment plus its bind values, shared between the page query and
/// the COUNT query so both see identical predicates.
fn build_predicates(criteria: &ItemSearchCriteria) -> (String, Vec<String>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(podcast_id) = criteria.podcast_id {
        clauses.push("i.podcast_id = ?".to_string());
        binds.push(podcast_id.to_string());
    }

    if !criteria.statuses.is_empty() {
        let placeholders = vec!["?"; criteria.statuses.len()].join(", ");
        clauses.push(format!("i.status IN ({placeholders})"));
        binds.extend(criteria.statuses.iter().map(|s| s.as_str().to_string()));
    }

    // One EXISTS per requested tag: an item matches only when its podcast
    // carries every tag in the list.
    for tag in &criteria.tags {
        clauses.push(
            "EXISTS (SELECT 1 FROM podcast_tags pt
                     INNER JOIN tags t ON pt.tag_id = t.id
                     WHERE pt.podcast_id = i.podcast_id AND t.name = ?)"
                .to_string(),
        );
        binds.push(tag.clone());
    }

    if let Some(q) = criteria.query.as_deref().filter(|q| !q.is_empty()) {
        clauses.push("i.title LIKE ?".to_string());
        binds.push(format!("%{q}%"));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    (where_sql, binds)
}

/// ORDER BY fragment. Rows missing a nullable sort field order after rows
/// having it, in either direction; id breaks the remaining ties so the
/// ordering is deterministic.
fn build_order_by(page: &ItemPageRequest) -> String {
    let column = page.sort.field.column();
    let direction = page.sort.direction.sql();

    if page.sort.field.nullable() {
        format!(
            " ORDER BY CASE WHEN {column} IS NULL THEN 1 ELSE 0 END, {column} {direction}, i.id ASC"
        )
    } else {
        format!(" ORDER BY {column} {direction}, i.id ASC")
    }
}

impl Database {
    /// Paginated, sorted, filterable item search. Filters are ANDed; empty
    /// status/tag lists mean no constraint. A `size` of `None` returns the
    /// whole result set as a single consistent snapshot.
    pub async fn search_items(
        &self,
        criteria: &ItemSearchCriteria,
        page: &ItemPageRequest,
    ) -> Result<Page<Item>> {
        let (where_sql, binds) = build_predicates(criteria);
        let order_sql = build_order_by(page);

        let mut sql = format!("{ITEM_SELECT}{where_sql}{order_sql}");
        if page.size.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
        }

        debug!("Item search: {} binds, page {:?}", binds.len(), page);

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        if let Some(size) = page.size {
            query = query
                .bind(size as i64)
                .bind(page.page as i64 * size as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(map_item(row)?);
        }

        let count_sql = format!("SELECT COUNT(*) FROM items i{where_sql}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &binds {
            count_query = count_query.bind(bind);
        }
        let total_elements = count_query.fetch_one(&self.pool).await?;

        Ok(Page::of(items, total_elements, page))
    }

    /// Fetch one item with its owning podcast and cover. A missing id is
    /// an empty result, never an error.
    pub async fn find_item_by_id(&self, id: Uuid) -> Result<Option<Item>> {
        let sql = format!("{ITEM_SELECT} WHERE i.id = ?");

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(map_item(&row)?))
    }
}
