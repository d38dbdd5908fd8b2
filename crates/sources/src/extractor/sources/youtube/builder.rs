use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::models::{Format, PlayerResponse};
use crate::extractor::error::SourceError;
use crate::extractor::source_extractor::{Extractor, SourceExtractor};
use crate::extractor::utils::capture_group_1_or_unsupported;
use crate::media::{MediaDescriptor, StreamKind, StreamRef, sanitize_title};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

// Innertube client identity. The Android client receives direct media URLs,
// so no signature cipher has to be solved.
const ANDROID_CLIENT_NAME: &str = "ANDROID";
const ANDROID_CLIENT_VERSION: &str = "19.09.37";
const ANDROID_SDK_VERSION: u32 = 30;
const ANDROID_UA: &str = "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip";

#[derive(Debug)]
pub struct YouTube {
    extractor: Extractor,
}

impl YouTube {
    pub fn new(url: String, client: Client) -> Self {
        let mut extractor = Extractor::new("YouTube", url, client);
        extractor.add_header_typed(reqwest::header::USER_AGENT, ANDROID_UA);
        Self { extractor }
    }

    fn video_id(&self) -> Result<&str, SourceError> {
        capture_group_1_or_unsupported(&URL_REGEX, &self.extractor.url)
    }

    fn player_request_body(video_id: &str) -> serde_json::Value {
        json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": ANDROID_CLIENT_NAME,
                    "clientVersion": ANDROID_CLIENT_VERSION,
                    "androidSdkVersion": ANDROID_SDK_VERSION,
                    "userAgent": ANDROID_UA,
                    "hl": "en",
                    "timeZone": "UTC",
                    "utcOffsetMinutes": 0
                }
            },
            "contentCheckOk": true,
            "racyCheckOk": true
        })
    }

    async fn fetch_player(&self, video_id: &str) -> Result<PlayerResponse, SourceError> {
        let response = self
            .extractor
            .post(PLAYER_URL)
            .query(&[("prettyPrint", "false")])
            .json(&Self::player_request_body(video_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http_status(status, PLAYER_URL));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn descriptor_from_player(&self, player: PlayerResponse) -> Result<MediaDescriptor, SourceError> {
        let url = self.extractor.url.as_str();

        if let Some(playability) = &player.playability_status
            && playability.status != "OK"
        {
            let reason = playability
                .reason
                .as_deref()
                .unwrap_or(&playability.status);
            return Err(SourceError::malformed(
                url,
                format!("video not playable: {reason}"),
            ));
        }

        let details = player
            .video_details
            .as_ref()
            .ok_or_else(|| SourceError::malformed(url, "player response lacks videoDetails"))?;

        let streaming = player
            .streaming_data
            .as_ref()
            .ok_or_else(|| SourceError::malformed(url, "player response lacks streamingData"))?;

        let (format, stream_url) = first_progressive(&streaming.formats)
            .ok_or_else(|| SourceError::malformed(url, "no progressive mp4 format available"))?;

        debug!(
            itag = format.itag,
            quality = ?format.quality_label,
            "selected progressive format"
        );

        let title = sanitize_title(&details.title);

        Ok(MediaDescriptor::builder(url, title)
            .stream(StreamRef::new(StreamKind::Combined, stream_url))
            .headers(self.extractor.headers_map())
            .build())
    }
}

/// First muxed mp4 format that carries a direct URL, in server order.
fn first_progressive(formats: &[Format]) -> Option<(&Format, &str)> {
    formats.iter().find_map(|f| {
        if !f.mime_type.starts_with("video/mp4") {
            return None;
        }
        f.url.as_deref().map(|url| (f, url))
    })
}

#[async_trait]
impl SourceExtractor for YouTube {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn resolve(&self) -> Result<MediaDescriptor, SourceError> {
        let video_id = self.video_id()?;
        debug!(video_id, "querying player endpoint");

        let player = self.fetch_player(video_id).await?;
        self.descriptor_from_player(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_FIXTURE: &str = r#"{
        "playabilityStatus": { "status": "OK" },
        "videoDetails": { "videoId": "jNQXAC9IVRw", "title": "Me at the zoo?" },
        "streamingData": {
            "formats": [
                {
                    "itag": 22,
                    "mimeType": "video/mp4; codecs=\"avc1.64001F, mp4a.40.2\"",
                    "qualityLabel": "720p",
                    "signatureCipher": "s=abc&url=hidden"
                },
                {
                    "itag": 18,
                    "url": "https://rr1---sn-example.googlevideo.com/videoplayback?id=18",
                    "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                    "qualityLabel": "360p"
                }
            ],
            "adaptiveFormats": [
                {
                    "itag": 137,
                    "url": "https://rr1---sn-example.googlevideo.com/videoplayback?id=137",
                    "mimeType": "video/mp4; codecs=\"avc1.640028\"",
                    "qualityLabel": "1080p"
                }
            ]
        }
    }"#;

    #[test]
    fn test_url_regex() {
        assert!(URL_REGEX.is_match("https://www.youtube.com/watch?v=jNQXAC9IVRw"));
        assert!(URL_REGEX.is_match("https://youtube.com/watch?feature=shared&v=jNQXAC9IVRw"));
        assert!(URL_REGEX.is_match("https://m.youtube.com/watch?v=jNQXAC9IVRw"));
        assert!(URL_REGEX.is_match("https://youtu.be/jNQXAC9IVRw"));
        assert!(URL_REGEX.is_match("https://www.youtube.com/shorts/jNQXAC9IVRw"));
        assert!(URL_REGEX.is_match("youtube.com/watch?v=jNQXAC9IVRw"));

        assert!(!URL_REGEX.is_match("https://www.youtube.com/feed/subscriptions"));
        assert!(!URL_REGEX.is_match("https://vimeo.com/123456"));
        assert!(!URL_REGEX.is_match("https://www.youtube.com/watch?v=tooshort"));
    }

    #[test]
    fn extracts_video_id() {
        let youtube = YouTube::new(
            "https://youtu.be/jNQXAC9IVRw?t=10".to_string(),
            crate::test_client(),
        );
        assert_eq!(youtube.video_id().unwrap(), "jNQXAC9IVRw");
    }

    #[test]
    fn player_request_carries_android_client() {
        let body = YouTube::player_request_body("jNQXAC9IVRw");
        assert_eq!(body["videoId"], "jNQXAC9IVRw");
        assert_eq!(body["context"]["client"]["clientName"], "ANDROID");
        assert_eq!(body["context"]["client"]["clientVersion"], ANDROID_CLIENT_VERSION);
    }

    #[test]
    fn picks_first_progressive_format_with_direct_url() {
        let youtube = YouTube::new(
            "https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string(),
            crate::test_client(),
        );
        let player: PlayerResponse = serde_json::from_str(PLAYER_FIXTURE).unwrap();
        let descriptor = youtube.descriptor_from_player(player).unwrap();

        assert_eq!(descriptor.title, "Me at the zoo");
        assert_eq!(descriptor.streams.len(), 1);
        let stream = &descriptor.streams[0];
        assert_eq!(stream.kind, StreamKind::Combined);
        // itag 22 lacks a direct url, so itag 18 must win.
        assert!(stream.url.contains("id=18"));
    }

    #[test]
    fn unplayable_video_is_malformed() {
        let youtube = YouTube::new(
            "https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string(),
            crate::test_client(),
        );
        let player: PlayerResponse = serde_json::from_str(
            r#"{ "playabilityStatus": { "status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age" } }"#,
        )
        .unwrap();

        let err = youtube.descriptor_from_player(player).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn adaptive_only_response_is_malformed() {
        let youtube = YouTube::new(
            "https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string(),
            crate::test_client(),
        );
        let player: PlayerResponse = serde_json::from_str(
            r#"{
                "playabilityStatus": { "status": "OK" },
                "videoDetails": { "title": "t" },
                "streamingData": { "formats": [] }
            }"#,
        )
        .unwrap();

        let err = youtube.descriptor_from_player(player).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    #[ignore]
    async fn test_resolve() {
        let youtube = YouTube::new(
            "https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string(),
            crate::test_client(),
        );
        let descriptor = youtube.resolve().await.unwrap();
        println!("{descriptor:#?}");
        assert_eq!(descriptor.streams.len(), 1);
        assert!(!descriptor.title.is_empty());
    }
}
