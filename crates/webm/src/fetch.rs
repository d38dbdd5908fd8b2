use std::path::{Path, PathBuf};
use std::str::FromStr;

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use sources_parser::media::StreamRef;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::FetchError;

/// Container extension assumed when the remote URL does not reveal one.
const DEFAULT_EXTENSION: &str = "mp4";

/// Streams media objects to disk.
pub struct StreamFetcher {
    client: Client,
}

impl StreamFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads one stream into `dest_dir` as `<title>_<kind>.<ext>`,
    /// records the location in `stream.local_path`, and returns it. Fails
    /// fast on a non-success status; honors cancellation before and during
    /// the transfer.
    #[instrument(skip(self, headers, token), level = "debug")]
    pub async fn fetch(
        &self,
        stream: &mut StreamRef,
        title: &str,
        dest_dir: &Path,
        headers: &FxHashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        let file_name = format!(
            "{}_{}.{}",
            title,
            stream.kind.as_str(),
            extension_from_url(&stream.url)
        );
        let path = dest_dir.join(file_name);

        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        debug!(url = %stream.url, path = %path.display(), "requesting stream");

        let request = self.client.get(&stream.url).headers(header_map(headers));
        let response = tokio::select! {
            _ = token.cancelled() => return Err(FetchError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(status, stream.url.as_str()));
        }

        let mut file = File::create(&path).await?;
        let mut body = response.bytes_stream();
        let mut total_bytes = 0u64;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(path = %path.display(), "download cancelled mid-transfer");
                    return Err(FetchError::Cancelled);
                }
                chunk = body.next() => {
                    match chunk {
                        Some(chunk) => {
                            let chunk = chunk?;
                            total_bytes += chunk.len() as u64;
                            file.write_all(&chunk).await?;
                        }
                        None => break,
                    }
                }
            }
        }

        file.flush().await?;
        info!(
            kind = %stream.kind,
            bytes = total_bytes,
            path = %path.display(),
            "stream downloaded"
        );

        stream.local_path = Some(path.clone());
        Ok(path)
    }
}

fn header_map(headers: &FxHashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        match (HeaderName::from_str(key), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => {
                debug!(header = %key, "invalid replay header; skipping");
            }
        }
    }
    map
}

/// File extension of the remote object, query string and fragment excluded.
fn extension_from_url(raw: &str) -> &str {
    let path = raw.split(['?', '#']).next().unwrap_or(raw);
    match path.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 4
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => DEFAULT_EXTENSION,
    }
}
