//! Selected-wallet preference: remembers which connection kind the user
//! last connected with, so the front-end can reconnect eagerly.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionKind;

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt preference file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persistent "selected wallet" preference.
pub trait SelectedWalletStore: Send + Sync {
    fn select(&self, kind: ConnectionKind) -> Result<(), PreferenceError>;

    fn clear(&self) -> Result<(), PreferenceError>;

    fn selected(&self) -> Result<Option<ConnectionKind>, PreferenceError>;
}

/// In-process preference that is forgotten on exit.
#[derive(Debug, Default)]
pub struct MemoryPreference {
    selected: Mutex<Option<ConnectionKind>>,
}

impl MemoryPreference {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectedWalletStore for MemoryPreference {
    fn select(&self, kind: ConnectionKind) -> Result<(), PreferenceError> {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = Some(kind);
        Ok(())
    }

    fn clear(&self) -> Result<(), PreferenceError> {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn selected(&self) -> Result<Option<ConnectionKind>, PreferenceError> {
        Ok(*self.selected.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// On-disk layout of the preference file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    selected_wallet: Option<ConnectionKind>,
}

/// Preference stored as a small JSON document.
///
/// A missing file reads as "nothing selected".
#[derive(Debug)]
pub struct FilePreference {
    path: PathBuf,
}

impl FilePreference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, selected_wallet: Option<ConnectionKind>) -> Result<(), PreferenceError> {
        let body = serde_json::to_vec_pretty(&PreferenceFile { selected_wallet }).map_err(
            |source| PreferenceError::Corrupt {
                path: self.path.clone(),
                source,
            },
        )?;
        std::fs::write(&self.path, body).map_err(|source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SelectedWalletStore for FilePreference {
    fn select(&self, kind: ConnectionKind) -> Result<(), PreferenceError> {
        self.write(Some(kind))
    }

    fn clear(&self) -> Result<(), PreferenceError> {
        self.write(None)
    }

    fn selected(&self) -> Result<Option<ConnectionKind>, PreferenceError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let file: PreferenceFile =
            serde_json::from_slice(&raw).map_err(|source| PreferenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(file.selected_wallet)
    }
}
