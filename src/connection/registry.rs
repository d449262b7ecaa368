//! Connector registry: one adapter per connection kind.
//!
//! Built once at startup and read-only afterwards. Lookups by kind and
//! reverse lookups by adapter identity; no policy lives here.

use std::collections::HashMap;
use std::sync::Arc;

use super::adapter::ConnectorAdapter;
use super::{Connection, ConnectionKind};

/// Registered connections, kept in kind priority order.
#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    connections: Vec<Connection>,
}

impl ConnectorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Descriptor for `kind`.
    ///
    /// # Panics
    ///
    /// Panics if no adapter is registered for `kind`. Every kind the caller
    /// can name must have been registered at startup.
    pub fn get(&self, kind: ConnectionKind) -> &Connection {
        self.lookup(kind)
            .unwrap_or_else(|| panic!("no connector registered for {kind}"))
    }

    /// Descriptor for `kind`, or `None` if it was never registered.
    pub fn lookup(&self, kind: ConnectionKind) -> Option<&Connection> {
        self.connections.iter().find(|c| c.kind == kind)
    }

    /// All registered connections: injected first, network fallback last.
    pub fn list(&self) -> &[Connection] {
        &self.connections
    }

    /// Reverse lookup by adapter identity.
    pub fn find_by_adapter(&self, adapter: &Arc<dyn ConnectorAdapter>) -> Option<&Connection> {
        self.connections.iter().find(|c| c.has_connector(adapter))
    }
}

/// Collects adapters before freezing them into a [`ConnectorRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    adapters: HashMap<ConnectionKind, Arc<dyn ConnectorAdapter>>,
}

impl RegistryBuilder {
    /// Register the adapter for `kind`. A second registration for the
    /// same kind replaces the first.
    pub fn register(mut self, kind: ConnectionKind, adapter: Arc<dyn ConnectorAdapter>) -> Self {
        if self.adapters.insert(kind, adapter).is_some() {
            tracing::warn!(%kind, "connector registered twice, keeping the latest");
        }
        self
    }

    pub fn build(mut self) -> ConnectorRegistry {
        let connections = ConnectionKind::ALL
            .iter()
            .filter_map(|kind| {
                self.adapters
                    .remove(kind)
                    .map(|adapter| Connection::new(*kind, adapter))
            })
            .collect();
        ConnectorRegistry { connections }
    }
}
