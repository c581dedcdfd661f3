//! revisor command-line driver
//!
//! Replays a JSON-lines log of document writes against a JSON snapshot of an
//! in-memory store, running the versioning handler after every write, and
//! offers small helpers for inspecting configuration and history paths.

pub mod commands;
pub mod error;
pub mod logging;
pub mod router;

pub use error::{CliError, CliResult};
pub use router::{Cli, CommandRouter, Commands};
