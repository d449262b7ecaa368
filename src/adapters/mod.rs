//! Concrete connector adapters and the standard registry wiring.

pub mod network;
pub mod scripted;

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::ConnectionKind;
use crate::connection::registry::ConnectorRegistry;

pub use network::NetworkAdapter;
pub use scripted::Script;
use scripted::ScriptedAdapter;

/// Register one adapter per kind: scripted stand-ins for the browser
/// connectors and `network` as the read-only fallback.
///
/// Kinds missing from `scripts` get a script that always succeeds.
pub fn standard_registry(
    scripts: &HashMap<ConnectionKind, Script>,
    network: Arc<NetworkAdapter>,
) -> ConnectorRegistry {
    let scripted = |kind: ConnectionKind, name: &'static str| {
        let script = scripts.get(&kind).cloned().unwrap_or_default();
        ScriptedAdapter::new(name, script)
    };

    ConnectorRegistry::builder()
        .register(
            ConnectionKind::Injected,
            scripted(ConnectionKind::Injected, "injected"),
        )
        .register(
            ConnectionKind::WalletConnectV1,
            scripted(ConnectionKind::WalletConnectV1, "WalletConnect"),
        )
        .register(
            ConnectionKind::WalletConnectV2,
            scripted(ConnectionKind::WalletConnectV2, "WalletConnectV2"),
        )
        .register(ConnectionKind::NetworkFallback, network)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::adapter::ConnectorAdapter;

    #[test]
    fn registers_every_kind() {
        let network = NetworkAdapter::new(HashMap::new());
        let registry = standard_registry(&HashMap::new(), network.clone());

        for kind in ConnectionKind::ALL {
            assert_eq!(registry.get(kind).kind, kind);
        }
        let network: Arc<dyn ConnectorAdapter> = network;
        assert_eq!(
            registry.find_by_adapter(&network).unwrap().kind,
            ConnectionKind::NetworkFallback
        );
    }

    #[tokio::test]
    async fn scripts_apply_per_kind() {
        let scripts = HashMap::from([(
            ConnectionKind::WalletConnectV1,
            Script {
                fail_with: Some("QR code expired".into()),
                ..Script::default()
            },
        )]);
        let registry = standard_registry(&scripts, NetworkAdapter::new(HashMap::new()));

        let wc = registry.get(ConnectionKind::WalletConnectV1);
        assert!(wc.connector.activate().await.is_err());
        let injected = registry.get(ConnectionKind::Injected);
        assert!(injected.connector.activate().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_session_can_be_reconnected() {
        use std::time::Duration;

        use crate::connection::ConnectOutcome;
        use crate::connection::manager::{ConnectionManager, LifecycleState};

        let scripts = HashMap::from([(
            ConnectionKind::WalletConnectV1,
            Script {
                drop_after: Some(Duration::from_millis(50)),
                ..Script::default()
            },
        )]);
        let registry = standard_registry(&scripts, NetworkAdapter::new(HashMap::new()));
        let manager = ConnectionManager::builder(registry).build();
        let kind = ConnectionKind::WalletConnectV1;

        assert_eq!(manager.connect(kind).await, ConnectOutcome::Connected);
        tokio::time::timeout(Duration::from_secs(2), async {
            while manager.state(kind) != LifecycleState::Idle {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(manager.selected(), None);
        assert_eq!(
            manager.error_for(kind).as_deref(),
            Some("WalletConnect session disconnected by the wallet")
        );

        assert_eq!(manager.connect(kind).await, ConnectOutcome::Connected);
        assert_eq!(manager.state(kind), LifecycleState::Active);
        assert_eq!(manager.error_for(kind), None);
    }
}
