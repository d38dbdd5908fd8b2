mod builder;
pub(crate) mod models;

pub use builder::URL_REGEX;
pub use builder::YouTube;
