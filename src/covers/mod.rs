//! Local cover and media file lookup.
//!
//! The download area is laid out as one directory per podcast title,
//! holding downloaded media and cached covers. Redirect handlers ask
//! this collaborator whether a local copy exists; when it does not, they
//! fall back to the original external URL.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::models::{Item, Podcast};
use crate::utils::extension_from_url;

/// File-existence collaborator for covers and downloaded media.
#[async_trait]
pub trait CoverLocator: Send + Sync {
    /// File name of the locally cached podcast cover, if present on disk.
    async fn podcast_cover(&self, podcast: &Podcast) -> Option<String>;

    /// File name of the locally cached item cover, if present on disk.
    async fn item_cover(&self, item: &Item) -> Option<String>;

    /// Whether a downloaded media file exists for the given podcast dir.
    async fn media_exists(&self, podcast_title: &str, file_name: &str) -> bool;
}

#[derive(Clone)]
pub struct CoverStorage {
    data_dir: PathBuf,
    cover_default_name: String,
}

impl CoverStorage {
    pub fn new(data_dir: PathBuf, cover_default_name: String) -> Self {
        Self {
            data_dir,
            cover_default_name,
        }
    }

    fn podcast_dir(&self, title: &str) -> PathBuf {
        self.data_dir.join(title)
    }

    async fn exists(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}

#[async_trait]
impl CoverLocator for CoverStorage {
    async fn podcast_cover(&self, podcast: &Podcast) -> Option<String> {
        let file_name = format!(
            "{}.{}",
            self.cover_default_name,
            extension_from_url(&podcast.cover.url)
        );
        let path = self.podcast_dir(&podcast.title).join(&file_name);

        Self::exists(&path).await.then_some(file_name)
    }

    async fn item_cover(&self, item: &Item) -> Option<String> {
        let file_name = format!("{}.{}", item.id, extension_from_url(&item.cover.url));
        let path = self.podcast_dir(&item.podcast.title).join(&file_name);

        Self::exists(&path).await.then_some(file_name)
    }

    async fn media_exists(&self, podcast_title: &str, file_name: &str) -> bool {
        // Reject separators so a crafted file name cannot escape the
        // podcast directory.
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return false;
        }
        Self::exists(&self.podcast_dir(podcast_title).join(file_name)).await
    }
}
