use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cover {
    pub id: Uuid,
    pub url: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// A podcast with its cover and tag set, as returned by the joined lookup.
///
/// Every podcast owns exactly one cover; a row without one is a
/// data-integrity fault, not a missing optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub podcast_type: String,
    pub has_to_be_deleted: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub cover: Cover,
    pub tags: Vec<Tag>,
}

/// Back-reference to the owning podcast carried by an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastForItem {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub mime_type: String,
    pub length: Option<i64>,
    /// Set once the download completed; also the marker that a local
    /// copy of the media exists.
    pub file_name: Option<String>,
    pub status: Status,
    pub pub_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
    pub download_date: Option<DateTime<Utc>>,
    pub podcast: PodcastForItem,
    pub cover: Cover,
}

/// Download lifecycle status of an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotDownloaded,
    Started,
    Paused,
    Finish,
    Stopped,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotDownloaded => "NOT_DOWNLOADED",
            Status::Started => "STARTED",
            Status::Paused => "PAUSED",
            Status::Finish => "FINISH",
            Status::Stopped => "STOPPED",
            Status::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Status> {
        match s {
            "NOT_DOWNLOADED" => Some(Status::NotDownloaded),
            "STARTED" => Some(Status::Started),
            "PAUSED" => Some(Status::Paused),
            "FINISH" => Some(Status::Finish),
            "STOPPED" => Some(Status::Stopped),
            "FAILED" => Some(Status::Failed),
            _ => None,
        }
    }
}

/// Sortable item columns. Closed set so the repository only ever
/// interpolates whitelisted column names into ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PubDate,
    DownloadDate,
    CreationDate,
    Title,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::PubDate => "i.pub_date",
            SortField::DownloadDate => "i.download_date",
            SortField::CreationDate => "i.creation_date",
            SortField::Title => "i.title",
        }
    }

    pub fn parse(s: &str) -> Option<SortField> {
        match s {
            "pubDate" => Some(SortField::PubDate),
            "downloadDate" => Some(SortField::DownloadDate),
            "creationDate" => Some(SortField::CreationDate),
            "title" => Some(SortField::Title),
            _ => None,
        }
    }

    /// Whether the column is nullable and needs NULLS-last handling.
    pub fn nullable(&self) -> bool {
        !matches!(self, SortField::Title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSort {
    pub field: SortField,
    pub direction: Direction,
}

impl Default for ItemSort {
    fn default() -> Self {
        Self {
            field: SortField::PubDate,
            direction: Direction::Desc,
        }
    }
}

/// Offset-based page request. `size: None` means unbounded: the whole
/// result set in one consistent, ordered snapshot (unlimited RSS feed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPageRequest {
    pub page: u32,
    pub size: Option<u32>,
    pub sort: ItemSort,
}

/// Search filters, ANDed together. Empty lists mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ItemSearchCriteria {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub statuses: Vec<Status>,
    pub podcast_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn of(content: Vec<T>, total_elements: i64, request: &ItemPageRequest) -> Self {
        match request.size {
            Some(size) => {
                let total_pages = if size == 0 {
                    0
                } else {
                    ((total_elements as u64).div_ceil(size as u64)) as u32
                };
                Self {
                    number: request.page,
                    size,
                    content,
                    total_elements,
                    total_pages,
                }
            }
            None => Self {
                number: 0,
                size: content.len() as u32,
                total_pages: if total_elements > 0 { 1 } else { 0 },
                content,
                total_elements,
            },
        }
    }
}

/// One (date, count) aggregation bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NumberOfItemByDate {
    pub date: NaiveDate,
    pub number_of_items: i64,
}

/// One statistics series per podcast type, global view only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPodcastType {
    #[serde(rename = "type")]
    pub podcast_type: String,
    pub values: Vec<NumberOfItemByDate>,
}
