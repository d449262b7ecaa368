//! Per-kind connection error state.
//!
//! Holds the most recent error message (if any) for every
//! [`ConnectionKind`]. Entries exist for all kinds from construction on and
//! are only ever overwritten, never removed.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::ConnectionKind;

/// Process-wide error table, shared by reference between the manager
/// (writer) and UI readers.
#[derive(Debug)]
pub struct ConnectionErrorStore {
    errors: RwLock<HashMap<ConnectionKind, Option<String>>>,
}

impl ConnectionErrorStore {
    /// Create a store with a `None` entry for every kind.
    pub fn new() -> Self {
        let errors: HashMap<_, _> = ConnectionKind::ALL.iter().map(|kind| (*kind, None)).collect();
        Self {
            errors: RwLock::new(errors),
        }
    }

    /// Overwrite the error entry for `kind`.
    pub fn set_error(&self, kind: ConnectionKind, error: Option<String>) {
        let mut errors = self.errors.write().unwrap_or_else(PoisonError::into_inner);
        errors.insert(kind, error);
    }

    /// Most recent error for `kind`.
    pub fn get_error(&self, kind: ConnectionKind) -> Option<String> {
        let errors = self.errors.read().unwrap_or_else(PoisonError::into_inner);
        errors.get(&kind).cloned().flatten()
    }

    /// All entries, in kind priority order.
    pub fn snapshot(&self) -> Vec<(ConnectionKind, Option<String>)> {
        let errors = self.errors.read().unwrap_or_else(PoisonError::into_inner);
        ConnectionKind::ALL
            .iter()
            .map(|kind| (*kind, errors.get(kind).cloned().flatten()))
            .collect()
    }
}

impl Default for ConnectionErrorStore {
    fn default() -> Self {
        Self::new()
    }
}
