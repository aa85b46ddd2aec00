//! Row-mapping helpers shared by the repositories.
//!
//! Timestamps are persisted as RFC3339 text in UTC, but rows written by
//! older tooling may carry the bare SQLite datetime format; both parse
//! to a normalized `DateTime<Utc>`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::models::Status;

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    Err(anyhow::anyhow!("Failed to parse datetime: {}", s))
}

pub fn get_datetime(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    parse_datetime(&raw)
}

pub fn get_optional_datetime(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.as_deref().map(parse_datetime).transpose()
}

pub fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Ok(Uuid::parse_str(&raw)?)
}

pub fn get_status(row: &SqliteRow, column: &str) -> Result<Status> {
    let raw: String = row.try_get(column)?;
    Status::from_str(&raw).ok_or_else(|| anyhow::anyhow!("Unknown item status: {}", raw))
}
