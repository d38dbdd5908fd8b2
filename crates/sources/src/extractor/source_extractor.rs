use crate::extractor::default::DEFAULT_UA;

use super::error::SourceError;
use crate::media::MediaDescriptor;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use tracing::debug;

/// State shared by every source extractor: the page URL being resolved, the
/// HTTP client, and the header set the source wants on its requests.
///
/// The header set doubles as the request profile handed to downloaders
/// through [`MediaDescriptor::request_headers`]: whatever a site required to
/// serve its metadata is replayed against its media CDN as well.
#[derive(Debug, Clone)]
pub struct Extractor {
    // url to resolve, e.g. "https://www.youtube.com/watch?v=jNQXAC9IVRw"
    pub url: String,
    // name of the source, e.g. "YouTube", "Reddit"
    pub source_name: String,
    // The reqwest client
    pub client: Client,
    headers: HeaderMap,
}

impl Extractor {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        source_name: S1,
        source_url: S2,
        client: Client,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        // Do not set `Accept-Encoding` here.
        // Reqwest auto-adds it (and auto-decompresses) when the corresponding
        // crate features are enabled, as long as we don't override the header.

        Self {
            source_name: source_name.into(),
            url: source_url.into(),
            client,
            headers,
        }
    }

    /// Insert an arbitrary header.
    ///
    /// Prefer `add_header_typed` / `add_header_owned` for better type safety.
    pub fn add_header_str<K: AsRef<str>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderName::from_str(key.as_ref()) {
            Ok(name) => match HeaderValue::from_str(value.as_ref()) {
                Ok(value) => {
                    self.headers.insert(name, value);
                }
                Err(e) => {
                    debug!(error = %e, "Invalid header value; skipping");
                }
            },
            Err(e) => {
                debug!(error = %e, "Invalid header name; skipping");
            }
        }
    }

    pub fn add_header_owned<K: Into<HeaderName>, V: Into<HeaderValue>>(
        &mut self,
        key: K,
        value: V,
    ) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn add_header_typed<K: Into<HeaderName>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(key.into(), value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid header value; skipping");
            }
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Create an HTTP request with the source headers pre-applied.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(self.headers.clone())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Owned copy of the headers for handing off to a downloader.
    pub fn headers_map(&self) -> FxHashMap<String, String> {
        // MediaDescriptor stores owned Strings, so we must allocate.
        let mut headers_map =
            FxHashMap::with_capacity_and_hasher(self.headers.len(), Default::default());

        for (key, value) in &self.headers {
            if let Ok(value) = value.to_str() {
                headers_map.insert(key.as_str().to_owned(), value.to_owned());
            }
        }

        headers_map
    }
}

#[async_trait]
pub trait SourceExtractor: Send + Sync + std::fmt::Debug {
    fn get_extractor(&self) -> &Extractor;

    fn source_name(&self) -> &str {
        &self.get_extractor().source_name
    }

    /// Resolves the page URL into a descriptor of downloadable streams.
    async fn resolve(&self) -> Result<MediaDescriptor, SourceError>;
}
