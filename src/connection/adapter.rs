//! ConnectorAdapter trait: the capability set every wallet back-end exposes.
//!
//! Adapters are opaque: the connection layer only activates, deactivates,
//! and resets them, and listens for errors they raise out of band.

use std::sync::Arc;

use futures::future::BoxFuture;

/// Errors raised by a connector adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The user dismissed the wallet's approval prompt.
    #[error("user rejected the request")]
    UserRejected,
    /// The back-end is not reachable or not installed.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The wallet ended an established session on its own.
    #[error("{0}")]
    SessionEnded(String),
    #[error("{0}")]
    Provider(String),
}

impl AdapterError {
    /// Whether the adapter no longer holds a session after this error.
    pub fn ends_session(&self) -> bool {
        matches!(self, AdapterError::SessionEnded(_))
    }
}

/// Callback invoked when an adapter reports an error outside of a
/// manager-driven activation (session dropped, chain switched away, ...).
///
/// Shared so adapters can clone it out of their lock before invoking it.
pub type ErrorCallback = Arc<dyn Fn(AdapterError) + Send + Sync>;

/// One wallet-connection back-end.
///
/// `Send + Sync` is required because activation runs on a spawned task
/// while the UI side may hold the same adapter reference.
///
/// Adapters are not assumed to be reentrant: the manager never runs two
/// activations of the same adapter concurrently.
pub trait ConnectorAdapter: Send + Sync {
    /// Establish a wallet session. May suspend on user interaction.
    fn activate(&self) -> BoxFuture<'_, Result<(), AdapterError>>;

    /// Tear down the wallet session, if the back-end supports it.
    ///
    /// Returns `None` when the adapter has no deactivation capability.
    fn deactivate(&self) -> Option<BoxFuture<'_, Result<(), AdapterError>>> {
        None
    }

    /// Drop any locally cached session state (accounts, chain id).
    fn reset_state(&self);

    /// Register the out-of-band error listener. Replaces any previous one.
    ///
    /// Errors that [end the session](AdapterError::ends_session) tell the
    /// listener the wallet is no longer connected.
    fn on_error(&self, callback: ErrorCallback);
}
