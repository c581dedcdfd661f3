//! Versioning configuration for revisor
//!
//! A [`VersioningConfig`] is built once at startup by [`ConfigLoader`] from an
//! optional TOML file and the process environment, validated, and then passed
//! by value (usually behind an `Arc`) to every component that needs it.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{ControlFields, VersioningConfig};
