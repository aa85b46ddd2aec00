//! Shared test fixtures: an in-memory database plus plain-SQL seeding,
//! the same way the out-of-scope ingestion layer writes rows.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use podcast_server::config::DatabaseConfig;
use podcast_server::database::Database;
use podcast_server::models::Status;
use uuid::Uuid;

/// One connection so every query in a test sees the same in-memory
/// database.
pub async fn test_database() -> Database {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    };
    let database = Database::new(&config).await.expect("connect");
    database.migrate().await.expect("migrate");
    database
}

pub async fn insert_cover(db: &Database, id: Uuid, url: &str) {
    sqlx::query("INSERT INTO covers (id, url, width, height) VALUES (?, ?, 200, 200)")
        .bind(id.to_string())
        .bind(url)
        .execute(&db.pool())
        .await
        .expect("insert cover");
}

pub async fn insert_podcast(db: &Database, id: Uuid, title: &str, podcast_type: &str) -> Uuid {
    let cover_id = Uuid::new_v4();
    insert_cover(db, cover_id, "https://external.domain.tld/cover.png").await;

    sqlx::query(
        "INSERT INTO podcasts (id, title, url, description, type, has_to_be_deleted, last_update, cover_id)
         VALUES (?, ?, ?, 'desc', ?, 1, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(format!("https://foo.bar.com/app/{title}.rss"))
    .bind(podcast_type)
    .bind(Utc::now().to_rfc3339())
    .bind(cover_id.to_string())
    .execute(&db.pool())
    .await
    .expect("insert podcast");

    cover_id
}

pub async fn insert_tag(db: &Database, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO tags (id, name) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(name)
        .execute(&db.pool())
        .await
        .expect("insert tag");
    id
}

pub async fn tag_podcast(db: &Database, podcast_id: Uuid, tag_id: Uuid) {
    sqlx::query("INSERT INTO podcast_tags (podcast_id, tag_id) VALUES (?, ?)")
        .bind(podcast_id.to_string())
        .bind(tag_id.to_string())
        .execute(&db.pool())
        .await
        .expect("tag podcast");
}

pub struct ItemSeed {
    pub id: Uuid,
    pub title: String,
    pub podcast_id: Uuid,
    pub status: Status,
    pub file_name: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
    pub download_date: Option<DateTime<Utc>>,
}

impl ItemSeed {
    pub fn new(podcast_id: Uuid, title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            podcast_id,
            status: Status::NotDownloaded,
            file_name: None,
            pub_date: None,
            creation_date: None,
            download_date: None,
        }
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn file_name(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }

    pub fn pub_date(mut self, at: DateTime<Utc>) -> Self {
        self.pub_date = Some(at);
        self
    }

    pub fn creation_date(mut self, at: DateTime<Utc>) -> Self {
        self.creation_date = Some(at);
        self
    }

    pub fn download_date(mut self, at: DateTime<Utc>) -> Self {
        self.download_date = Some(at);
        self
    }

    pub async fn insert(self, db: &Database) -> Uuid {
        let cover_id = Uuid::new_v4();
        insert_cover(db, cover_id, "https://external.domain.tld/item-cover.png").await;

        sqlx::query(
            "INSERT INTO items (id, title, url, description, mime_type, length, file_name,
                                status, pub_date, creation_date, download_date, podcast_id, cover_id)
             VALUES (?, ?, ?, 'desc', 'video/mp4', 100, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(&self.title)
        .bind(format!("https://external.domain.tld/{}.mp4", self.title))
        .bind(&self.file_name)
        .bind(self.status.as_str())
        .bind(self.pub_date.map(|d| d.to_rfc3339()))
        .bind(self.creation_date.map(|d| d.to_rfc3339()))
        .bind(self.download_date.map(|d| d.to_rfc3339()))
        .bind(self.podcast_id.to_string())
        .bind(cover_id.to_string())
        .execute(&db.pool())
        .await
        .expect("insert item");

        self.id
    }
}
