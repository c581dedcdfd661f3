#![warn(missing_docs)]

//! Document store layer for revisor
//!
//! Defines the value model documents are made of, the narrow store contract the
//! versioning core consumes (get/set/update/delete/query plus a field-delete
//! sentinel), and an in-memory store that emits one [`ChangeEvent`] per write so
//! the trigger loop can be exercised without an external database.
//!
//! ```text
//! ┌──────────────────────────┐        ┌────────────────────────┐
//! │ revisor-history          │ uses   │ DocumentStore (trait)  │
//! │ dispatcher / navigator   │ ─────▶ │ get set update delete  │
//! └──────────────────────────┘        │ query                  │
//!              ▲                      └────────────────────────┘
//!              │ ChangeEvent                     ▲ implements
//!              │                                 │
//!        ┌─────┴─────────────────────────────────┴──┐
//!        │ InMemoryStore (+ change feed)            │
//!        └──────────────────────────────────────────┘
//! ```

pub mod error;
pub mod event;
pub mod memory;
pub mod patch;
pub mod path;
pub mod query;
pub mod store;
pub mod value;

pub use error::{StoreError, StoreResult};
pub use event::{ChangeEvent, ChangeType};
pub use memory::InMemoryStore;
pub use patch::{FieldValue, Patch, SetOptions};
pub use query::{Comparator, Direction, Filter, Query, StoredDocument};
pub use store::DocumentStore;
pub use value::{Fields, Value};
