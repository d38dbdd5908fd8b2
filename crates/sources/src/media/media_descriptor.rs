use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::stream_ref::{StreamKind, StreamRef};

/// Resolved description of one downloadable media item.
///
/// Produced by a source extractor, consumed by the download/transcode
/// pipeline. `streams` holds either a single [`StreamKind::Combined`] entry
/// or a `Video`/`Audio` pair that must be muxed before transcoding.
///
/// # Fields
///
/// * `source_url` - The page URL the descriptor was resolved from
/// * `title` - Filesystem-safe title used to name every artifact of a run
/// * `streams` - The downloadable objects, ordered video before audio
/// * `request_headers` - Headers a downloader must replay when fetching
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MediaDescriptor {
    pub source_url: String,
    pub title: String,
    pub streams: Vec<StreamRef>,
    pub request_headers: FxHashMap<String, String>,
}

impl MediaDescriptor {
    pub fn builder(
        source_url: impl Into<String>,
        title: impl Into<String>,
    ) -> MediaDescriptorBuilder {
        MediaDescriptorBuilder::new(source_url, title)
    }

    /// True when audio and video arrive as separate objects.
    pub fn is_split(&self) -> bool {
        self.streams.len() == 2
    }

    pub fn stream(&self, kind: StreamKind) -> Option<&StreamRef> {
        self.streams.iter().find(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub struct MediaDescriptorBuilder {
    source_url: String,
    title: String,
    streams: Vec<StreamRef>,
    request_headers: FxHashMap<String, String>,
}

impl MediaDescriptorBuilder {
    pub fn new(source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            streams: Vec::new(),
            request_headers: FxHashMap::default(),
        }
    }

    pub fn stream(mut self, stream: StreamRef) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn streams(mut self, streams: Vec<StreamRef>) -> Self {
        self.streams = streams;
        self
    }

    pub fn headers(mut self, headers: FxHashMap<String, String>) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn build(self) -> MediaDescriptor {
        MediaDescriptor {
            source_url: self.source_url,
            title: self.title,
            streams: self.streams,
            request_headers: self.request_headers,
        }
    }
}
