//! Resolution of video page URLs into direct, downloadable media streams.
//!
//! Each supported site gets its own extractor. An extractor takes the page
//! URL a user would paste into a browser and resolves it into a
//! [`media::MediaDescriptor`]: a sanitized title plus one combined stream or
//! a split video/audio pair, together with the HTTP headers a downloader
//! must replay to fetch them.

pub mod extractor;
pub mod media;

/// Plain client for test fixtures. `reqwest::Client::new()` needs a
/// process-wide rustls provider, which production avoids by preconfiguring
/// TLS in [`extractor::default_client`].
#[cfg(test)]
pub(crate) fn test_client() -> reqwest::Client {
    // Err means another test already installed it; that's fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    reqwest::Client::new()
}
