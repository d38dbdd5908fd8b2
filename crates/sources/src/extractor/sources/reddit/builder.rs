use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::models::PostData;
use crate::extractor::error::SourceError;
use crate::extractor::source_extractor::{Extractor, SourceExtractor};
use crate::extractor::utils::{capture_group_1, capture_group_1_or_unsupported};
use crate::media::{MediaDescriptor, StreamKind, StreamRef, sanitize_title};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|old\.|new\.)?reddit\.com/r/[^/]+/comments/([a-z0-9]+)")
        .unwrap()
});

// The post page embeds its bootstrap state as `window.___r = {...};` inside
// a script tag with id "data".
static SCRIPT_DATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<script id="data">window\.___r = (.*?);</script>"#).unwrap());

/// Marker separating the shared DASH object prefix from the per-track suffix
/// inside `dashUrl`.
const DASH_MARKER: &str = "DASH";

#[derive(Debug)]
pub struct Reddit {
    extractor: Extractor,
}

impl Reddit {
    pub fn new(url: String, client: Client) -> Self {
        let extractor = Extractor::new("Reddit", url, client);
        Self { extractor }
    }

    /// Fullname of the post, e.g. `t3_abc123`, the key of the post entry in
    /// the page's bootstrap data.
    fn post_id(&self) -> Result<String, SourceError> {
        capture_group_1_or_unsupported(&URL_REGEX, &self.extractor.url)
            .map(|id| format!("t3_{id}"))
    }

    fn descriptor_from_page(&self, body: &str, post_id: &str) -> Result<MediaDescriptor, SourceError> {
        let url = self.extractor.url.as_str();

        let payload = extract_script_data(body, url)?;
        let data: PostData = serde_json::from_str(payload)?;

        let post = data.posts.models.get(post_id).ok_or_else(|| {
            SourceError::malformed(url, format!("post `{post_id}` missing from page data"))
        })?;

        let media = post
            .media
            .as_ref()
            .ok_or_else(|| SourceError::malformed(url, "post carries no media"))?;
        let dash_url = media
            .dash_url
            .as_deref()
            .ok_or_else(|| SourceError::malformed(url, "post media lacks dashUrl"))?;
        let height = media
            .height
            .ok_or_else(|| SourceError::malformed(url, "post media lacks height"))?;

        let (video_url, audio_url) = derive_stream_urls(dash_url, height, url)?;
        debug!(height, "derived split stream urls");

        let title = sanitize_title(&post.title.replace(' ', "_"));

        Ok(MediaDescriptor::builder(url, title)
            .stream(StreamRef::new(StreamKind::Video, video_url))
            .stream(StreamRef::new(StreamKind::Audio, audio_url))
            .headers(self.extractor.headers_map())
            .build())
    }
}

/// Pulls the JSON payload out of the post page's data script tag.
pub(crate) fn extract_script_data<'a>(body: &'a str, url: &str) -> Result<&'a str, SourceError> {
    capture_group_1(&SCRIPT_DATA_REGEX, body)
        .ok_or_else(|| SourceError::malformed(url, "post page lacks the data script block"))
}

/// Truncates `dashUrl` to the shared object prefix and derives the
/// per-track URLs: `{base}_{height}.mp4` for video, `{base}_audio.mp4` for
/// audio.
pub(crate) fn derive_stream_urls(
    dash_url: &str,
    height: u32,
    url: &str,
) -> Result<(String, String), SourceError> {
    let marker = dash_url
        .find(DASH_MARKER)
        .ok_or_else(|| SourceError::malformed(url, "expected media-URL marker not found"))?;
    let base = &dash_url[..marker + DASH_MARKER.len()];

    Ok((format!("{base}_{height}.mp4"), format!("{base}_audio.mp4")))
}

#[async_trait]
impl SourceExtractor for Reddit {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn resolve(&self) -> Result<MediaDescriptor, SourceError> {
        let post_id = self.post_id()?;
        debug!(post_id = %post_id, "fetching post page");

        let response = self.extractor.get(&self.extractor.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http_status(status, self.extractor.url.as_str()));
        }
        let body = response.text().await?;

        self.descriptor_from_page(&body, &post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_PAGE_FIXTURE: &str = r#"<!DOCTYPE html><html><head><title>reddit</title></head><body><div id="root"></div><script id="data">window.___r = {"posts":{"models":{"t3_abc123":{"title":"A cat does a flip: part 2","media":{"obfuscated":null,"height":720,"width":404,"dashUrl":"https://v.redd.it/xyz987/DASHPlaylist.mpd?a=1698&v=1","type":"video"},"permalink":"/r/videos/comments/abc123/a_cat_does_a_flip_part_2/"}}},"subreddits":{"models":{}}};</script><script src="https://www.redditstatic.com/app.js"></script></body></html>"#;

    #[test]
    fn test_url_regex() {
        assert!(URL_REGEX.is_match(
            "https://www.reddit.com/r/videos/comments/abc123/a_cat_does_a_flip_part_2/"
        ));
        assert!(URL_REGEX.is_match("https://old.reddit.com/r/videos/comments/abc123"));
        assert!(URL_REGEX.is_match("reddit.com/r/aww/comments/zz9999/title"));

        assert!(!URL_REGEX.is_match("https://www.reddit.com/r/videos/"));
        assert!(!URL_REGEX.is_match("https://www.reddit.com/user/someone/"));
        assert!(!URL_REGEX.is_match("https://v.redd.it/xyz987"));
    }

    #[test]
    fn extracts_post_fullname_from_url() {
        let reddit = Reddit::new(
            "https://www.reddit.com/r/videos/comments/abc123/a_cat_does_a_flip_part_2/".to_string(),
            crate::test_client(),
        );
        assert_eq!(reddit.post_id().unwrap(), "t3_abc123");
    }

    #[test]
    fn extracts_script_data_payload() {
        let payload = extract_script_data(POST_PAGE_FIXTURE, "https://www.reddit.com/x").unwrap();
        assert!(payload.starts_with('{'));
        assert!(payload.ends_with('}'));
        assert!(payload.contains("\"t3_abc123\""));
    }

    #[test]
    fn missing_script_block_is_malformed() {
        let err = extract_script_data(
            "<html><body>no bootstrap here</body></html>",
            "https://www.reddit.com/x",
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn derives_split_stream_urls() {
        let (video, audio) = derive_stream_urls(
            "https://v.redd.it/xyz987/DASHPlaylist.mpd?a=1698",
            720,
            "https://www.reddit.com/x",
        )
        .unwrap();
        assert_eq!(video, "https://v.redd.it/xyz987/DASH_720.mp4");
        assert_eq!(audio, "https://v.redd.it/xyz987/DASH_audio.mp4");
    }

    #[test]
    fn dash_url_without_marker_is_malformed() {
        let err = derive_stream_urls(
            "https://v.redd.it/xyz987/Playlist.mpd",
            720,
            "https://www.reddit.com/x",
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn builds_split_descriptor_from_page() {
        let reddit = Reddit::new(
            "https://www.reddit.com/r/videos/comments/abc123/a_cat_does_a_flip_part_2/".to_string(),
            crate::test_client(),
        );
        let descriptor = reddit
            .descriptor_from_page(POST_PAGE_FIXTURE, "t3_abc123")
            .unwrap();

        // Spaces become underscores, then the colon is stripped.
        assert_eq!(descriptor.title, "A_cat_does_a_flip_part_2");
        assert!(descriptor.is_split());
        assert_eq!(
            descriptor.stream(StreamKind::Video).map(|s| s.url.as_str()),
            Some("https://v.redd.it/xyz987/DASH_720.mp4")
        );
        assert_eq!(
            descriptor.stream(StreamKind::Audio).map(|s| s.url.as_str()),
            Some("https://v.redd.it/xyz987/DASH_audio.mp4")
        );
        assert!(descriptor.request_headers.contains_key("user-agent"));
    }

    #[test]
    fn post_without_media_is_malformed() {
        let page = r#"<script id="data">window.___r = {"posts":{"models":{"t3_abc123":{"title":"text only"}}}};</script>"#;
        let reddit = Reddit::new(
            "https://www.reddit.com/r/videos/comments/abc123/x/".to_string(),
            crate::test_client(),
        );
        let err = reddit.descriptor_from_page(page, "t3_abc123").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    #[ignore]
    async fn test_resolve() {
        let reddit = Reddit::new(
            "https://www.reddit.com/r/aww/comments/17q4zt3/just_a_cat_video/".to_string(),
            crate::test_client(),
        );
        let descriptor = reddit.resolve().await.unwrap();
        println!("{descriptor:#?}");
        assert!(descriptor.is_split());
    }
}
