//! Wallet connection layer: connector registry, capability policy,
//! lifecycle manager, and per-kind error state.
//!
//! Control flow for a connect request: the [`manager::ConnectionManager`]
//! asks the [`policy`] whether activation is intercepted (install link);
//! if not, it drives the registered adapter's activation and records the
//! outcome in the [`error_store::ConnectionErrorStore`]. Callers read the
//! offerable connection list and error state back out of the manager.

pub mod adapter;
pub mod error_store;
pub mod manager;
pub mod policy;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use adapter::ConnectorAdapter;

/// The closed set of wallet connection back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    Injected,
    #[serde(rename = "WALLET_CONNECT")]
    WalletConnectV1,
    #[serde(rename = "WALLET_CONNECT_V2")]
    WalletConnectV2,
    #[serde(rename = "NETWORK")]
    NetworkFallback,
}

impl ConnectionKind {
    /// All kinds in priority order: injected first, network fallback last.
    pub const ALL: [ConnectionKind; 4] = [
        ConnectionKind::Injected,
        ConnectionKind::WalletConnectV1,
        ConnectionKind::WalletConnectV2,
        ConnectionKind::NetworkFallback,
    ];

    /// Stable machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Injected => "INJECTED",
            ConnectionKind::WalletConnectV1 => "WALLET_CONNECT",
            ConnectionKind::WalletConnectV2 => "WALLET_CONNECT_V2",
            ConnectionKind::NetworkFallback => "NETWORK",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ConnectionKind {
    type Err = String;

    /// Accepts the machine-readable names and short CLI aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "injected" => Ok(ConnectionKind::Injected),
            "wallet_connect" | "walletconnect" | "wc" | "wc1" => {
                Ok(ConnectionKind::WalletConnectV1)
            }
            "wallet_connect_v2" | "walletconnect_v2" | "wc2" => Ok(ConnectionKind::WalletConnectV2),
            "network" => Ok(ConnectionKind::NetworkFallback),
            other => Err(format!(
                "unknown connection kind: {other} (expected: injected, walletconnect, wc2, network)"
            )),
        }
    }
}

/// Connection descriptor: a kind bound to its adapter instance.
///
/// Display name, icon and offerability are not stored here; they are pure
/// functions of the [`crate::environment::Environment`] and live in
/// [`policy`].
#[derive(Clone)]
pub struct Connection {
    pub kind: ConnectionKind,
    pub connector: Arc<dyn ConnectorAdapter>,
}

impl Connection {
    pub fn new(kind: ConnectionKind, connector: Arc<dyn ConnectorAdapter>) -> Self {
        Self { kind, connector }
    }

    /// Identity comparison against a live adapter reference.
    pub fn has_connector(&self, connector: &Arc<dyn ConnectorAdapter>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.connector), Arc::as_ptr(connector))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Connection-layer errors.
///
/// Underlying adapter errors never cross this boundary raw; they are
/// flattened into `ActivationFailed` messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Kind or adapter has no registered connection. Integration bug.
    #[error("unsupported connection: {0}")]
    UnsupportedConnection(String),
    #[error("{0} is already connecting")]
    ActivationInProgress(ConnectionKind),
    #[error("activation failed: {0}")]
    ActivationFailed(String),
    /// Deactivation error during teardown. Logged, never returned.
    #[error("deactivation of {kind} ignored: {reason}")]
    DeactivationIgnored { kind: ConnectionKind, reason: String },
}

/// Successful result of [`manager::ConnectionManager::try_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Connected,
    /// The policy handled activation (e.g. opened an install page);
    /// no session was established.
    HandledExternally,
}

/// UI-facing connect outcome. Every `connect` call yields exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ConnectOutcome {
    Connected,
    HandledExternally,
    Failed(String),
    Rejected(String),
}

impl From<Result<Activation, ConnectionError>> for ConnectOutcome {
    fn from(result: Result<Activation, ConnectionError>) -> Self {
        match result {
            Ok(Activation::Connected) => ConnectOutcome::Connected,
            Ok(Activation::HandledExternally) => ConnectOutcome::HandledExternally,
            Err(ConnectionError::ActivationFailed(message)) => ConnectOutcome::Failed(message),
            Err(e) => ConnectOutcome::Rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip_through_from_str() {
        for kind in ConnectionKind::ALL {
            assert_eq!(kind.as_str().parse::<ConnectionKind>(), Ok(kind));
        }
    }

    #[test]
    fn cli_aliases_parse() {
        assert_eq!("wc".parse(), Ok(ConnectionKind::WalletConnectV1));
        assert_eq!("wallet-connect-v2".parse(), Ok(ConnectionKind::WalletConnectV2));
        assert_eq!("Network".parse(), Ok(ConnectionKind::NetworkFallback));
        assert!("ledger".parse::<ConnectionKind>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        for kind in ConnectionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn priority_order_starts_injected_ends_network() {
        assert_eq!(ConnectionKind::ALL[0], ConnectionKind::Injected);
        assert_eq!(ConnectionKind::ALL[3], ConnectionKind::NetworkFallback);
    }

    #[test]
    fn outcome_mapping() {
        assert_eq!(
            ConnectOutcome::from(Ok(Activation::Connected)),
            ConnectOutcome::Connected
        );
        assert_eq!(
            ConnectOutcome::from(Err(ConnectionError::ActivationFailed("denied".into()))),
            ConnectOutcome::Failed("denied".into())
        );
        assert_eq!(
            ConnectOutcome::from(Err(ConnectionError::ActivationInProgress(
                ConnectionKind::Injected
            ))),
            ConnectOutcome::Rejected("INJECTED is already connecting".into())
        );
    }
}
