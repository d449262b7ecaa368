//! Connection manager: connect/disconnect lifecycle per connection kind.
//!
//! Per kind: `Idle → Activating → {Active, Idle}` and
//! `Active → Deactivating → Idle`. A failed activation records its message
//! in the error store and drops straight back to `Idle` so the caller may
//! retry immediately.
//!
//! Only one lifecycle transition per kind is in flight at a time; a second
//! intent for a busy kind is rejected rather than queued. Different kinds
//! never contend: the state table lock is held only for the transition
//! itself, never across an adapter call.
//!
//! Activation and teardown run on spawned tasks. If the caller stops
//! listening, the task still runs to completion and records its outcome.
//!
//! An adapter that reports its session [ended](AdapterError::ends_session)
//! out of band moves an `Active` kind back to `Idle`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::FutureExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::environment::Environment;
use crate::launcher::{LinkOpener, SystemLinkOpener};
use crate::preference::{MemoryPreference, SelectedWalletStore};

use super::adapter::{AdapterError, ConnectorAdapter};
use super::error_store::ConnectionErrorStore;
use super::policy::{self, ActivationOverride, ConnectionOption};
use super::registry::ConnectorRegistry;
use super::{Activation, ConnectOutcome, Connection, ConnectionError, ConnectionKind};

/// Lifecycle state of one connection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Activating,
    Active,
    Deactivating,
}

/// What to resolve a [`Connection`] from.
#[derive(Clone, Copy)]
pub enum ConnectorRef<'a> {
    Kind(ConnectionKind),
    Adapter(&'a Arc<dyn ConnectorAdapter>),
}

impl From<ConnectionKind> for ConnectorRef<'_> {
    fn from(kind: ConnectionKind) -> Self {
        ConnectorRef::Kind(kind)
    }
}

impl<'a> From<&'a Arc<dyn ConnectorAdapter>> for ConnectorRef<'a> {
    fn from(adapter: &'a Arc<dyn ConnectorAdapter>) -> Self {
        ConnectorRef::Adapter(adapter)
    }
}

/// Orchestrates wallet connections. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ConnectorRegistry,
    errors: Arc<ConnectionErrorStore>,
    environment: RwLock<Environment>,
    opener: Arc<dyn LinkOpener>,
    preference: Arc<dyn SelectedWalletStore>,
    states: Mutex<HashMap<ConnectionKind, LifecycleState>>,
    selected: Mutex<Option<ConnectionKind>>,
}

impl ConnectionManager {
    pub fn builder(registry: ConnectorRegistry) -> ManagerBuilder {
        ManagerBuilder {
            registry,
            errors: None,
            environment: Environment::default(),
            opener: None,
            preference: None,
        }
    }

    /// Current environment snapshot.
    pub fn environment(&self) -> Environment {
        *self
            .inner
            .environment
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the environment snapshot (wallet installed, chain switched).
    pub fn set_environment(&self, environment: Environment) {
        *self
            .inner
            .environment
            .write()
            .unwrap_or_else(PoisonError::into_inner) = environment;
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.inner.registry
    }

    pub fn state(&self, kind: ConnectionKind) -> LifecycleState {
        self.inner.state(kind)
    }

    /// Kind of the most recent successful connection, until disconnected.
    pub fn selected(&self) -> Option<ConnectionKind> {
        *self.inner.selected()
    }

    /// Most recent error for `kind`.
    pub fn error_for(&self, kind: ConnectionKind) -> Option<String> {
        self.inner.errors.get_error(kind)
    }

    /// Error entries for all kinds, in priority order.
    pub fn errors(&self) -> Vec<(ConnectionKind, Option<String>)> {
        self.inner.errors.snapshot()
    }

    /// Connections the user may pick in the current environment.
    pub fn list_offerable(&self, dark_mode: bool) -> Vec<ConnectionOption> {
        let env = self.environment();
        policy::offerable_options(
            self.inner.registry.list().iter().map(|c| c.kind),
            &env,
            dark_mode,
        )
    }

    /// Resolve a descriptor from a kind or a live adapter reference.
    pub fn resolve<'a>(
        &self,
        target: impl Into<ConnectorRef<'a>>,
    ) -> Result<&Connection, ConnectionError> {
        match target.into() {
            ConnectorRef::Kind(kind) => self
                .inner
                .registry
                .lookup(kind)
                .ok_or_else(|| ConnectionError::UnsupportedConnection(kind.to_string())),
            ConnectorRef::Adapter(adapter) => self
                .inner
                .registry
                .find_by_adapter(adapter)
                .ok_or_else(|| ConnectionError::UnsupportedConnection("unknown connector".into())),
        }
    }

    /// Connect and map the result onto the UI-facing outcome.
    pub async fn connect(&self, kind: ConnectionKind) -> ConnectOutcome {
        self.try_connect(kind).await.into()
    }

    /// Activate `kind`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedConnection` if no adapter is registered for `kind`.
    /// - `ActivationInProgress` if `kind` is already mid-transition.
    /// - `ActivationFailed` with the adapter's message; the message is
    ///   also written to the error store.
    pub async fn try_connect(&self, kind: ConnectionKind) -> Result<Activation, ConnectionError> {
        let connection = self.resolve(kind)?.clone();

        let env = self.environment();
        if let Some(action) = policy::activation_override(kind, &env) {
            self.inner.run_override(kind, &action);
            return Ok(Activation::HandledExternally);
        }

        if !self.inner.begin_activation(kind)? {
            tracing::debug!(%kind, "already active");
            return Ok(Activation::Connected);
        }

        let attempt = Uuid::new_v4();
        let span = tracing::info_span!("activation", %kind, %attempt);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.activate(connection).await }.instrument(span));

        match task.await {
            Ok(result) => result,
            Err(e) => {
                // Adapter panicked mid-activation.
                let message = format!("activation task aborted: {e}");
                self.inner.fail_activation(kind, message.clone());
                Err(ConnectionError::ActivationFailed(message))
            }
        }
    }

    /// Tear down an active connection.
    ///
    /// Best-effort: deactivation errors and panics are logged and
    /// swallowed, adapter state is always reset, and the remembered wallet
    /// is cleared. A kind that is not `Active` is left alone.
    pub async fn disconnect(&self, kind: ConnectionKind) {
        let Some(connection) = self.inner.registry.lookup(kind).cloned() else {
            tracing::warn!(%kind, "disconnect for unregistered connection");
            return;
        };
        if !self.inner.begin_deactivation(kind) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move { inner.teardown(connection).await }
                .instrument(tracing::info_span!("teardown", %kind)),
        );
        if let Err(e) = task.await {
            tracing::warn!(%kind, error = %e, "teardown task aborted");
            self.inner.release(kind);
        }
    }
}

impl Inner {
    fn states(&self) -> MutexGuard<'_, HashMap<ConnectionKind, LifecycleState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn selected(&self) -> MutexGuard<'_, Option<ConnectionKind>> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self, kind: ConnectionKind) -> LifecycleState {
        self.states()
            .get(&kind)
            .copied()
            .unwrap_or(LifecycleState::Idle)
    }

    fn set_state(&self, kind: ConnectionKind, state: LifecycleState) {
        self.states().insert(kind, state);
    }

    /// Claim `kind` for activation.
    ///
    /// Returns `Ok(false)` if it is already active (nothing to do).
    fn begin_activation(&self, kind: ConnectionKind) -> Result<bool, ConnectionError> {
        let mut states = self.states();
        let state = states.entry(kind).or_insert(LifecycleState::Idle);
        match *state {
            LifecycleState::Idle => {
                *state = LifecycleState::Activating;
                Ok(true)
            }
            LifecycleState::Active => Ok(false),
            LifecycleState::Activating | LifecycleState::Deactivating => {
                Err(ConnectionError::ActivationInProgress(kind))
            }
        }
    }

    /// Claim `kind` for teardown. Only an `Active` kind can be torn down.
    fn begin_deactivation(&self, kind: ConnectionKind) -> bool {
        let mut states = self.states();
        let state = states.entry(kind).or_insert(LifecycleState::Idle);
        if *state == LifecycleState::Active {
            *state = LifecycleState::Deactivating;
            true
        } else {
            tracing::debug!(%kind, state = ?*state, "disconnect ignored, not active");
            false
        }
    }

    fn run_override(&self, kind: ConnectionKind, action: &ActivationOverride) {
        match action {
            ActivationOverride::OpenInstallPage { url, target } => {
                tracing::info!(%kind, url, "no wallet installed, opening install page");
                if let Err(e) = self.opener.open(url, target) {
                    tracing::warn!(%kind, error = %e, "failed to open install page");
                }
            }
        }
    }

    async fn activate(&self, connection: Connection) -> Result<Activation, ConnectionError> {
        let kind = connection.kind;
        tracing::debug!("activating");

        match connection.connector.activate().await {
            Ok(()) => {
                self.errors.set_error(kind, None);
                self.set_state(kind, LifecycleState::Active);
                *self.selected() = Some(kind);
                if let Err(e) = self.preference.select(kind) {
                    tracing::warn!(error = %e, "failed to remember selected wallet");
                }
                tracing::info!("connected");
                Ok(Activation::Connected)
            }
            Err(e) => {
                let message = failure_message(kind, &e);
                self.fail_activation(kind, message.clone());
                Err(ConnectionError::ActivationFailed(message))
            }
        }
    }

    fn fail_activation(&self, kind: ConnectionKind, message: String) {
        tracing::warn!(%kind, error = %message, "activation failed");
        self.errors.set_error(kind, Some(message));
        self.set_state(kind, LifecycleState::Idle);
    }

    async fn teardown(&self, connection: Connection) {
        let kind = connection.kind;

        if let Some(deactivation) = connection.connector.deactivate() {
            let reason = match AssertUnwindSafe(deactivation).catch_unwind().await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(panic) => Some(format!("deactivation panicked: {}", panic_message(&*panic))),
            };
            if let Some(reason) = reason {
                let ignored = ConnectionError::DeactivationIgnored { kind, reason };
                tracing::warn!(error = %ignored, "deactivation failed");
            }
        }
        connection.connector.reset_state();

        self.release(kind);
        tracing::info!("disconnected");
    }

    /// Forget the remembered wallet and return `kind` to `Idle`.
    fn release(&self, kind: ConnectionKind) {
        *self.selected() = None;
        if let Err(e) = self.preference.clear() {
            tracing::warn!(error = %e, "failed to clear selected wallet");
        }
        self.set_state(kind, LifecycleState::Idle);
    }

    /// The wallet ended the session of `kind` on its own.
    fn end_session(&self, kind: ConnectionKind) {
        {
            let mut states = self.states();
            if states.get(&kind) != Some(&LifecycleState::Active) {
                return;
            }
            states.insert(kind, LifecycleState::Idle);
        }
        tracing::info!(%kind, "wallet ended the session");

        if let Some(connection) = self.registry.lookup(kind) {
            connection.connector.reset_state();
        }
        let mut selected = self.selected();
        if *selected == Some(kind) {
            *selected = None;
            drop(selected);
            if let Err(e) = self.preference.clear() {
                tracing::warn!(error = %e, "failed to clear selected wallet");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

/// Non-empty, user-presentable message for an adapter failure.
fn failure_message(kind: ConnectionKind, error: &AdapterError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        format!("failed to activate {kind}")
    } else {
        message
    }
}

/// Assembles a [`ConnectionManager`].
pub struct ManagerBuilder {
    registry: ConnectorRegistry,
    errors: Option<Arc<ConnectionErrorStore>>,
    environment: Environment,
    opener: Option<Arc<dyn LinkOpener>>,
    preference: Option<Arc<dyn SelectedWalletStore>>,
}

impl ManagerBuilder {
    /// Share an existing error store with other readers.
    pub fn error_store(mut self, errors: Arc<ConnectionErrorStore>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn link_opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn preference(mut self, preference: Arc<dyn SelectedWalletStore>) -> Self {
        self.preference = Some(preference);
        self
    }

    /// Build the manager and subscribe to every adapter's error events.
    pub fn build(self) -> ConnectionManager {
        let states: HashMap<_, _> = ConnectionKind::ALL
            .iter()
            .map(|kind| (*kind, LifecycleState::Idle))
            .collect();

        let inner = Arc::new(Inner {
            registry: self.registry,
            errors: self.errors.unwrap_or_default(),
            environment: RwLock::new(self.environment),
            opener: self.opener.unwrap_or_else(|| Arc::new(SystemLinkOpener)),
            preference: self
                .preference
                .unwrap_or_else(|| Arc::new(MemoryPreference::new())),
            states: Mutex::new(states),
            selected: Mutex::new(None),
        });

        for connection in inner.registry.list() {
            let kind = connection.kind;
            let errors = Arc::clone(&inner.errors);
            // Weak: the adapter's listener must not keep the manager alive.
            let manager = Arc::downgrade(&inner);
            connection.connector.on_error(Arc::new(move |e| {
                tracing::debug!(%kind, error = %e, "connector error");
                errors.set_error(kind, Some(failure_message(kind, &e)));
                if e.ends_session() {
                    if let Some(inner) = manager.upgrade() {
                        inner.end_session(kind);
                    }
                }
            }));
        }

        ConnectionManager { inner }
    }
}
