pub mod config;
pub mod error;
pub mod types;
pub mod util;

pub use config::CuratorConfig;
pub use error::CuratorError;
pub use types::*;
pub use util::{normalize_key, sanitize_url};
