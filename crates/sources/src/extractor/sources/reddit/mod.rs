mod builder;
pub(crate) mod models;

pub use builder::Reddit;
pub use builder::URL_REGEX;
