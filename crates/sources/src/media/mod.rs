pub mod media_descriptor;
pub mod stream_ref;
pub mod title;

pub use media_descriptor::MediaDescriptor;
pub use stream_ref::{StreamKind, StreamRef};
pub use title::sanitize_title;
