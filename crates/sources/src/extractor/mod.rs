pub mod error;
pub mod factory;
pub mod source_extractor;
pub mod sources;
pub mod utils;
mod default;

pub use default::{default_client, default_factory};
pub use error::SourceError;
pub use factory::ExtractorFactory;
pub use source_extractor::{Extractor, SourceExtractor};
