//! Flag-driven document versioning
//!
//! Documents request history operations by carrying control fields
//! (`restore`, `goto`, `undo`, `redo`) and record where they stand in their
//! history with a version pointer field. The [`VersionDispatcher`] is invoked
//! once per write with the before/after snapshots, classifies the write, and
//! drives the [`VersionNavigator`], which keeps one ordered log and one backup
//! slot per document under a configurable history root.

pub mod adapter;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod fields;
pub mod flags;
pub mod lock;
pub mod navigator;
pub mod paths;
pub mod worker;

pub use adapter::HistoryLog;
pub use dispatcher::{Dispatch, SkipReason, VersionDispatcher};
pub use entry::{HistoryEntry, VersionId};
pub use error::{HistoryError, Result};
pub use fields::{flatten, nest, FieldFilter};
pub use flags::{ControlFields, FlagProtocol, HistoryCommand, Pointer};
pub use lock::{DocumentGuard, DocumentLocks};
pub use navigator::{Transition, VersionNavigator};
pub use paths::{HistoryPaths, WatchPattern};
pub use worker::{deliver, drain_feed, run_feed, FeedSummary, RetryPolicy};
