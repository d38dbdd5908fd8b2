use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced while resolving a page URL into downloadable streams.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No registered source recognizes the URL.
    #[error("no supported source matches `{url}`")]
    Unsupported { url: String },

    /// The metadata request could not be completed at the transport level.
    #[error("metadata request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// The site answered, but not with a usable response.
    #[error("metadata request for {url} returned HTTP {status}")]
    HttpStatus { status: StatusCode, url: String },

    /// The page or API payload lacks something the extractor expected.
    #[error("malformed metadata from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// The payload was not the JSON shape we expect.
    #[error("JSON decode error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl SourceError {
    pub fn unsupported(url: impl Into<String>) -> Self {
        Self::Unsupported { url: url.into() }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// True when retrying the same URL later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source } => source.is_timeout() || source.is_connect(),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            SourceError::http_status(StatusCode::SERVICE_UNAVAILABLE, "https://a.example")
                .is_retryable()
        );
        assert!(
            SourceError::http_status(StatusCode::TOO_MANY_REQUESTS, "https://a.example")
                .is_retryable()
        );
        assert!(
            !SourceError::http_status(StatusCode::NOT_FOUND, "https://a.example").is_retryable()
        );
        assert!(!SourceError::unsupported("ftp://a.example").is_retryable());
        assert!(!SourceError::malformed("https://a.example", "missing title").is_retryable());
    }
}
