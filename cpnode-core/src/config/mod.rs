//! Configuration types
//!
//! Node configuration, its text form, and its postcard binary form.

pub mod parse;
#[cfg(feature = "serde")]
pub mod store;
pub mod types;

pub use parse::{parse_config, ParseError};
#[cfg(feature = "serde")]
pub use store::{ConfigError, MAX_CONFIG_SIZE};
pub use types::*;
