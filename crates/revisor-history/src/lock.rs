//! Per-document mutual exclusion
//!
//! Invocations for the same document path run one at a time; different paths
//! proceed in parallel. Slots are created on demand and dropped once the last
//! holder or waiter goes away.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Keyed async locks
#[derive(Debug, Clone, Default)]
pub struct DocumentLocks {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Held lock on one document path (RAII release)
#[derive(Debug)]
pub struct DocumentGuard {
    path: String,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
    locks: DocumentLocks,
}

impl DocumentGuard {
    /// Locked path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.release(&self.path, &self.slot);
    }
}

impl DocumentLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a path
    pub async fn acquire(&self, path: &str) -> DocumentGuard {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(path.to_string()).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        DocumentGuard {
            path: path.to_string(),
            slot,
            guard: Some(guard),
            locks: self.clone(),
        }
    }

    /// Number of paths currently held or awaited
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no path is held or awaited
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    fn release(&self, path: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        // one reference in the table, one in the releasing guard
        if Arc::strong_count(slot) <= 2 {
            slots.remove(path);
        }
    }
}
