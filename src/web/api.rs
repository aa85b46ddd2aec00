use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use url::Url;
use uuid::Uuid;

use super::AppState;
use crate::database::podcasts::StatField;
use crate::errors::AppError;
use crate::feed::FeedGenerator;
use crate::models::{
    Direction, Item, ItemPageRequest, ItemSearchCriteria, ItemSort, NumberOfItemByDate, Page,
    Podcast, PodcastForItem, SortField, StatsPodcastType, Status, Tag,
};

/// List payloads are wrapped in a `content` envelope.
#[derive(Debug, Serialize)]
pub struct ContentResponse<T> {
    pub content: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct CoverResponse {
    pub id: Uuid,
    /// Server-relative cover route; the route itself decides between the
    /// locally cached file and the original external URL.
    pub url: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastResponse {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub podcast_type: String,
    pub has_to_be_deleted: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub cover: CoverResponse,
    pub tags: Vec<Tag>,
}

impl PodcastResponse {
    fn from_domain(podcast: Podcast, feeds: &FeedGenerator) -> Self {
        let cover_url = feeds.podcast_cover_path(&podcast);
        Self {
            id: podcast.id,
            title: podcast.title,
            url: podcast.url,
            description: podcast.description,
            podcast_type: podcast.podcast_type,
            has_to_be_deleted: podcast.has_to_be_deleted,
            last_update: podcast.last_update,
            cover: CoverResponse {
                id: podcast.cover.id,
                url: cover_url,
                width: podcast.cover.width,
                height: podcast.cover.height,
            },
            tags: podcast.tags,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub mime_type: String,
    pub length: Option<i64>,
    pub file_name: Option<String>,
    pub status: Status,
    pub pub_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
    pub download_date: Option<DateTime<Utc>>,
    pub podcast: PodcastForItem,
    pub cover: CoverResponse,
}

impl ItemResponse {
    fn from_domain(item: Item, feeds: &FeedGenerator) -> Self {
        let cover_url = feeds.item_cover_path(&item);
        Self {
            id: item.id,
            title: item.title,
            url: item.url,
            description: item.description,
            mime_type: item.mime_type,
            length: item.length,
            file_name: item.file_name,
            status: item.status,
            pub_date: item.pub_date,
            creation_date: item.creation_date,
            download_date: item.download_date,
            podcast: item.podcast,
            cover: CoverResponse {
                id: item.cover.id,
                url: cover_url,
                width: item.cover.width,
                height: item.cover.height,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    #[serde(rename = "numberOfMonths")]
    pub number_of_months: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RssParams {
    pub limit: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// "field,DIRECTION", e.g. "pubDate,DESC"
    pub sort: Option<String>,
    /// Comma-separated status list
    pub status: Option<String>,
    /// Comma-separated tag names
    pub tags: Option<String>,
    pub q: Option<String>,
}

fn status_code_for(e: &AppError) -> StatusCode {
    match e {
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(e: AppError) -> StatusCode {
    error!("{}", e);
    status_code_for(&e)
}

/// Month count validation, rejected before any query executes.
fn parse_months(params: &StatsParams) -> Result<u32, StatusCode> {
    let months = params.number_of_months.unwrap_or(1);
    if !(0..=i64::from(u32::MAX)).contains(&months) {
        return Err(reject(AppError::validation(format!(
            "numberOfMonths must be a non-negative integer, got {months}"
        ))));
    }
    Ok(months as u32)
}

fn parse_sort(raw: Option<&str>) -> Result<ItemSort, StatusCode> {
    let Some(raw) = raw else {
        return Ok(ItemSort::default());
    };

    let (field, direction) = raw.split_once(',').unwrap_or((raw, "DESC"));
    let field = SortField::parse(field.trim()).ok_or_else(|| {
        reject(AppError::validation(format!("Unknown sort field: {field}")))
    })?;
    let direction = Direction::parse(direction.trim()).ok_or_else(|| {
        reject(AppError::validation(format!(
            "Unknown sort direction: {direction}"
        )))
    })?;

    Ok(ItemSort { field, direction })
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<Status>, StatusCode> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Status::from_str(s)
                .ok_or_else(|| reject(AppError::validation(format!("Unknown status: {s}"))))
        })
        .collect()
}

fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn search_inputs(
    params: &SearchParams,
    podcast_id: Option<Uuid>,
) -> Result<(ItemSearchCriteria, ItemPageRequest), StatusCode> {
    let criteria = ItemSearchCriteria {
        query: params.q.clone(),
        tags: parse_tags(params.tags.as_deref()),
        statuses: parse_statuses(params.status.as_deref())?,
        podcast_id,
    };
    let page = ItemPageRequest {
        page: params.page.unwrap_or(0),
        size: Some(params.size.unwrap_or(12)),
        sort: parse_sort(params.sort.as_deref())?,
    };
    Ok((criteria, page))
}

/// Absolute URL under /data for a locally stored file, with path
/// segments percent-encoded (podcast titles routinely contain spaces).
fn local_data_url(base_url: &str, podcast_title: &str, file_name: &str) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .push("data")
        .push(podcast_title)
        .push(file_name);
    Some(url.to_string())
}

// Health

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// Podcasts

pub async fn list_podcasts(
    State(state): State<AppState>,
) -> Result<Json<ContentResponse<PodcastResponse>>, StatusCode> {
    match state.database.find_all_podcasts().await {
        Ok(podcasts) => Ok(Json(ContentResponse {
            content: podcasts
                .into_iter()
                .map(|p| PodcastResponse::from_domain(p, &state.feeds))
                .collect(),
        })),
        Err(e) => {
            error!("Failed to list podcasts: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_podcast(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PodcastResponse>, StatusCode> {
    match state.database.find_podcast_by_id(id).await {
        Ok(Some(podcast)) => Ok(Json(PodcastResponse::from_domain(podcast, &state.feeds))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get podcast ({}): {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Statistics

async fn global_stats(
    state: AppState,
    params: StatsParams,
    field: StatField,
) -> Result<Json<ContentResponse<StatsPodcastType>>, StatusCode> {
    let months = parse_months(&params)?;

    match state.database.stats_by_type_and_field(months, field).await {
        Ok(stats) => Ok(Json(ContentResponse { content: stats })),
        Err(e) => {
            error!("Failed to compute global stats on {:?}: {}", field, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn stats_by_creation_date(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ContentResponse<StatsPodcastType>>, StatusCode> {
    global_stats(state, params, StatField::CreationDate).await
}

pub async fn stats_by_pub_date(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ContentResponse<StatsPodcastType>>, StatusCode> {
    global_stats(state, params, StatField::PubDate).await
}

pub async fn stats_by_download_date(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ContentResponse<StatsPodcastType>>, StatusCode> {
    global_stats(state, params, StatField::DownloadDate).await
}

async fn podcast_stats(
    state: AppState,
    id: Uuid,
    params: StatsParams,
    field: StatField,
) -> Result<Json<Vec<NumberOfItemByDate>>, StatusCode> {
    let months = parse_months(&params)?;

    match state
        .database
        .stats_by_podcast_and_field(id, months, field)
        .await
    {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            error!("Failed to compute stats for podcast ({}): {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn podcast_stats_by_creation_date(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<Vec<NumberOfItemByDate>>, StatusCode> {
    podcast_stats(state, id, params, StatField::CreationDate).await
}

pub async fn podcast_stats_by_pub_date(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<Vec<NumberOfItemByDate>>, StatusCode> {
    podcast_stats(state, id, params, StatField::PubDate).await
}

pub async fn podcast_stats_by_download_date(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<Vec<NumberOfItemByDate>>, StatusCode> {
    podcast_stats(state, id, params, StatField::DownloadDate).await
}

// Feeds

pub async fn opml(State(state): State<AppState>) -> Result<Response, StatusCode> {
    match state.database.find_all_podcasts().await {
        Ok(podcasts) => {
            let document = state.feeds.opml(&podcasts);
            Ok((
                [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
                document,
            )
                .into_response())
        }
        Err(e) => {
            error!("Failed to generate OPML: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn rss(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<RssParams>,
) -> Result<Response, StatusCode> {
    let podcast = match state.database.find_podcast_by_id(id).await {
        Ok(Some(podcast)) => podcast,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get podcast ({}) for RSS: {}", id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // limit=false renders the whole feed in one snapshot.
    let size = match params.limit {
        Some(false) => None,
        _ => Some(state.config.storage.rss_default_size),
    };

    let criteria = ItemSearchCriteria {
        podcast_id: Some(id),
        ..Default::default()
    };
    let page = ItemPageRequest {
        page: 0,
        size,
        sort: ItemSort::default(),
    };

    match state.database.search_items(&criteria, &page).await {
        Ok(result) => {
            let document = state.feeds.rss(&podcast, &result.content);
            Ok((
                [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
                document,
            )
                .into_response())
        }
        Err(e) => {
            error!("Failed to generate RSS for podcast ({}): {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Items

async fn run_search(
    state: AppState,
    criteria: ItemSearchCriteria,
    page: ItemPageRequest,
) -> Result<Json<Page<ItemResponse>>, StatusCode> {
    match state.database.search_items(&criteria, &page).await {
        Ok(result) => {
            let Page {
                content,
                number,
                size,
                total_elements,
                total_pages,
            } = result;
            Ok(Json(Page {
                content: content
                    .into_iter()
                    .map(|i| ItemResponse::from_domain(i, &state.feeds))
                    .collect(),
                number,
                size,
                total_elements,
                total_pages,
            }))
        }
        Err(e) => {
            error!("Item search failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn search_podcast_items(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<ItemResponse>>, StatusCode> {
    let (criteria, page) = search_inputs(&params, Some(id))?;
    run_search(state, criteria, page).await
}

pub async fn search_items(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<ItemResponse>>, StatusCode> {
    let (criteria, page) = search_inputs(&params, None)?;
    run_search(state, criteria, page).await
}

pub async fn get_item(
    Path((podcast_id, item_id)): Path<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<ItemResponse>, StatusCode> {
    match state.database.find_item_by_id(item_id).await {
        Ok(Some(item)) if item.podcast.id == podcast_id => {
            Ok(Json(ItemResponse::from_domain(item, &state.feeds)))
        }
        Ok(_) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get item ({}): {}", item_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Cover and media redirects

pub async fn podcast_cover(
    Path((id, cover_file)): Path<(Uuid, String)>,
    State(state): State<AppState>,
) -> Result<Redirect, StatusCode> {
    if !cover_file.starts_with("cover.") {
        return Err(StatusCode::NOT_FOUND);
    }

    let podcast = match state.database.find_podcast_by_id(id).await {
        Ok(Some(podcast)) => podcast,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get podcast ({}) for cover: {}", id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match state.covers.podcast_cover(&podcast).await {
        Some(local_file) => {
            let url = local_data_url(state.feeds.base_url(), &podcast.title, &local_file)
                .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(Redirect::to(&url))
        }
        None => Ok(Redirect::to(&podcast.cover.url)),
    }
}

pub async fn item_file(
    Path((podcast_id, item_id, file)): Path<(Uuid, Uuid, String)>,
    State(state): State<AppState>,
) -> Result<Redirect, StatusCode> {
    let item = match state.database.find_item_by_id(item_id).await {
        Ok(Some(item)) if item.podcast.id == podcast_id => item,
        Ok(_) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to get item ({}): {}", item_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if file.starts_with("cover.") {
        return match state.covers.item_cover(&item).await {
            Some(local_file) => {
                let url = local_data_url(state.feeds.base_url(), &item.podcast.title, &local_file)
                    .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
                Ok(Redirect::to(&url))
            }
            None => Ok(Redirect::to(&item.cover.url)),
        };
    }

    // Downloaded media: only the recorded file name is served.
    match &item.file_name {
        Some(file_name) if *file_name == file => {
            if state.covers.media_exists(&item.podcast.title, file_name).await {
                let url = local_data_url(state.feeds.base_url(), &item.podcast.title, file_name)
                    .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
                Ok(Redirect::to(&url))
            } else if let Some(external) = &item.url {
                Ok(Redirect::to(external))
            } else {
                Err(StatusCode::NOT_FOUND)
            }
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}
