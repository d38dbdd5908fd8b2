use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The role a stream plays in the final output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Audio and video muxed into a single object.
    Combined,
    /// Video-only track of a split post.
    Video,
    /// Audio-only track of a split post.
    Audio,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Combined => "combined",
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single downloadable media object.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StreamRef {
    // Direct URL of the media object
    pub url: String,
    pub kind: StreamKind,
    /// Set exactly once by the downloader after the bytes land on disk.
    pub local_path: Option<PathBuf>,
}

impl StreamRef {
    pub fn new(kind: StreamKind, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            local_path: None,
        }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind, self.url)
    }
}
