pub mod http;
pub mod path_processing;
pub mod text_processing;

pub use http::*;
pub use path_processing::expand_tilde;
pub use text_processing::{redact_sensitive, truncate_chars};
