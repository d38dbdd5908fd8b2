use std::sync::LazyLock;

use super::error::SourceError;
use super::source_extractor::SourceExtractor;
use crate::extractor::sources::{self, reddit::Reddit, youtube::YouTube};
use regex::Regex;
use reqwest::Client;

// A type alias for a thread-safe constructor function.
type ExtractorConstructor = fn(String, Client) -> Box<dyn SourceExtractor>;

struct SourceEntry {
    regex: &'static LazyLock<Regex>,
    constructor: ExtractorConstructor,
}

macro_rules! source_registry {
    ( $( $regex:path => $builder:path ),+ $(,)? ) => {
        &[
            $(
                SourceEntry {
                    regex: &$regex,
                    constructor: |url, client| {
                        Box::new($builder(url, client)) as Box<dyn SourceExtractor>
                    },
                },
            )+
        ]
    };
}

// Static source registry.
static SOURCES: &[SourceEntry] = source_registry![
    sources::youtube::URL_REGEX => YouTube::new,
    sources::reddit::URL_REGEX => Reddit::new,
];

/// A factory for creating source-specific extractors.
pub struct ExtractorFactory {
    client: Client,
}

impl ExtractorFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn create_extractor(&self, url: &str) -> Result<Box<dyn SourceExtractor>, SourceError> {
        for source in SOURCES {
            if source.regex.is_match(url) {
                return Ok((source.constructor)(url.to_string(), self.client.clone()));
            }
        }

        Err(SourceError::unsupported(url))
    }
}
