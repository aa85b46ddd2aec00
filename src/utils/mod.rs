//! Small shared helpers.

/// File extension of the last path segment of a URL, ignoring query and
/// fragment parts. Falls back to "jpg" when the URL carries none, which
/// matches what remote podcast covers overwhelmingly are.
pub fn extension_from_url(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or(url);

    match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "jpg".to_string(),
    }
}
