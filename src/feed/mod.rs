//! RSS and OPML document generation.
//!
//! Documents are assembled as escaped text in document order; item order
//! in the RSS output is exactly the order of the page handed in.

use anyhow::Result;
use quick_xml::escape::escape;
use url::Url;

use crate::models::{Item, Podcast};
use crate::utils::extension_from_url;

pub struct FeedGenerator {
    base_url: String,
}

impl FeedGenerator {
    pub fn new(base_url: &str) -> Result<Self> {
        // Parse up front so a malformed configured base URL fails at
        // startup instead of inside every feed render.
        Url::parse(base_url)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Server-relative cover route for a podcast.
    pub fn podcast_cover_path(&self, podcast: &Podcast) -> String {
        format!(
            "/api/v1/podcasts/{}/cover.{}",
            podcast.id,
            extension_from_url(&podcast.cover.url)
        )
    }

    /// Server-relative cover route for an item.
    pub fn item_cover_path(&self, item: &Item) -> String {
        format!(
            "/api/v1/podcasts/{}/items/{}/cover.{}",
            item.podcast.id,
            item.id,
            extension_from_url(&item.cover.url)
        )
    }

    /// Enclosure URL for an item: the local proxy path once the item has
    /// been downloaded, the original external URL otherwise.
    fn enclosure_url(&self, item: &Item) -> Option<String> {
        match (&item.file_name, &item.url) {
            (Some(file_name), _) => Some(format!(
                "{}/api/v1/podcasts/{}/items/{}/{}",
                self.base_url, item.podcast.id, item.id, file_name
            )),
            (None, Some(url)) => Some(url.clone()),
            (None, None) => None,
        }
    }

    /// Render a podcast and one page of its items as an RSS 2.0 document.
    pub fn rss(&self, podcast: &Podcast, items: &[Item]) -> String {
        let mut out = String::with_capacity(1024 + items.len() * 512);

        let cover_url = format!("{}{}", self.base_url, self.podcast_cover_path(podcast));

        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(
            "<rss version=\"2.0\" xmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\">\n",
        );
        out.push_str("  <channel>\n");
        out.push_str(&format!(
            "    <title>{}</title>\n",
            escape(&podcast.title)
        ));
        out.push_str(&format!(
            "    <link>{}/podcasts/{}</link>\n",
            self.base_url, podcast.id
        ));
        if let Some(description) = &podcast.description {
            out.push_str(&format!(
                "    <description>{}</description>\n",
                escape(description)
            ));
        }
        out.push_str(&format!(
            "    <itunes:image href=\"{}\"/>\n",
            escape(&cover_url)
        ));
        out.push_str("    <image>\n");
        out.push_str(&format!("      <url>{}</url>\n", escape(&cover_url)));
        out.push_str(&format!(
            "      <width>{}</width>\n",
            podcast.cover.width
        ));
        out.push_str(&format!(
            "      <height>{}</height>\n",
            podcast.cover.height
        ));
        out.push_str("    </image>\n");

        for item in items {
            self.push_rss_item(&mut out, item);
        }

        out.push_str("  </channel>\n");
        out.push_str("</rss>\n");

        out
    }

    fn push_rss_item(&self, out: &mut String, item: &Item) {
        out.push_str("    <item>\n");
        out.push_str(&format!(
            "      <title>{}</title>\n",
            escape(&item.title)
        ));
        if let Some(description) = &item.description {
            out.push_str(&format!(
                "      <description>{}</description>\n",
                escape(description)
            ));
        }
        if let Some(pub_date) = &item.pub_date {
            out.push_str(&format!(
                "      <pubDate>{}</pubDate>\n",
                pub_date.to_rfc2822()
            ));
        }
        out.push_str(&format!(
            "      <guid isPermaLink=\"false\">{}</guid>\n",
            item.id
        ));
        if let Some(enclosure_url) = self.enclosure_url(item) {
            out.push_str(&format!(
                "      <enclosure url=\"{}\" length=\"{}\" type=\"{}\"/>\n",
                escape(&enclosure_url),
                item.length.unwrap_or(0),
                escape(&item.mime_type)
            ));
        }
        out.push_str(&format!(
            "      <itunes:image href=\"{}{}\"/>\n",
            self.base_url,
            escape(&self.item_cover_path(item))
        ));
        out.push_str("    </item>\n");
    }

    /// Render the podcast list as an OPML 2.0 outline document, one
    /// outline per podcast in source order. Zero podcasts yields an
    /// empty body element.
    pub fn opml(&self, podcasts: &[Podcast]) -> String {
        let mut out = String::with_capacity(256 + podcasts.len() * 256);

        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<opml version=\"2.0\">\n");
        out.push_str("  <head>\n");
        out.push_str("    <title>Podcast Server</title>\n");
        out.push_str("  </head>\n");

        if podcasts.is_empty() {
            out.push_str("  <body/>\n");
        } else {
            out.push_str("  <body>\n");
            for podcast in podcasts {
                let description = podcast.description.as_deref().unwrap_or("");
                out.push_str(&format!(
                    "    <outline text=\"{text}\" description=\"{description}\" \
                     htmlUrl=\"{base}/podcasts/{id}\" title=\"{text}\" type=\"rss\" \
                     version=\"RSS2\" xmlUrl=\"{base}/api/v1/podcasts/{id}/rss\"/>\n",
                    text = escape(&podcast.title),
                    description = escape(description),
                    base = self.base_url,
                    id = podcast.id,
                ));
            }
            out.push_str("  </body>\n");
        }

        out.push_str("</opml>\n");

        out
    }
}
