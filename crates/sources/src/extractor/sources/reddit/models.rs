use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Subset of the `window.___r` bootstrap blob we actually consume.
#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    pub posts: Posts,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Posts {
    /// Keyed by fullname, e.g. `t3_abc123`.
    pub models: FxHashMap<String, Post>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Post {
    pub title: String,
    pub media: Option<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Media {
    pub dash_url: Option<String>,
    pub height: Option<u32>,
}
