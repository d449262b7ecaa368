//! Test doubles for the connection layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Notify;

use super::adapter::{AdapterError, ConnectorAdapter, ErrorCallback};

/// What `deactivate` does.
#[derive(Debug, Clone)]
pub enum Deactivation {
    Unsupported,
    Succeed,
    Fail(AdapterError),
    /// The deactivation future panics.
    Panic,
}

/// Adapter with scripted outcomes and call counters.
pub struct MockAdapter {
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    resets: AtomicUsize,
    next_result: Mutex<Result<(), AdapterError>>,
    deactivation: Mutex<Deactivation>,
    /// When set, activation waits for a permit before completing.
    gate: Option<Arc<Notify>>,
    /// When set, deactivation waits for a permit before completing.
    deactivation_gate: Mutex<Option<Arc<Notify>>>,
    error_callback: Mutex<Option<ErrorCallback>>,
}

impl MockAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Adapter whose activation blocks until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self::build(Some(gate)))
    }

    fn build(gate: Option<Arc<Notify>>) -> Self {
        Self {
            activations: AtomicUsize::new(0),
            deactivations: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            next_result: Mutex::new(Ok(())),
            deactivation: Mutex::new(Deactivation::Succeed),
            gate,
            deactivation_gate: Mutex::new(None),
            error_callback: Mutex::new(None),
        }
    }

    pub fn into_dyn(self: Arc<Self>) -> Arc<dyn ConnectorAdapter> {
        self
    }

    pub fn fail_with(&self, error: AdapterError) {
        *self.next_result.lock().unwrap() = Err(error);
    }

    pub fn succeed(&self) {
        *self.next_result.lock().unwrap() = Ok(());
    }

    pub fn set_deactivation(&self, deactivation: Deactivation) {
        *self.deactivation.lock().unwrap() = deactivation;
    }

    pub fn gate_deactivation(&self, gate: Arc<Notify>) {
        *self.deactivation_gate.lock().unwrap() = Some(gate);
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Fire the registered out-of-band error listener.
    pub fn emit_error(&self, error: AdapterError) {
        let callback = self.error_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

impl ConnectorAdapter for MockAdapter {
    fn activate(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        async move {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.next_result.lock().unwrap();
            next.clone()
        }
        .boxed()
    }

    fn deactivate(&self) -> Option<BoxFuture<'_, Result<(), AdapterError>>> {
        let behavior = self.deactivation.lock().unwrap().clone();
        let (result, panics) = match behavior {
            Deactivation::Unsupported => return None,
            Deactivation::Succeed => (Ok(()), false),
            Deactivation::Fail(e) => (Err(e), false),
            Deactivation::Panic => (Ok(()), true),
        };
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        let gate = self.deactivation_gate.lock().unwrap().clone();
        Some(
            async move {
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                if panics {
                    panic!("extension crashed");
                }
                result
            }
            .boxed(),
        )
    }

    fn reset_state(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, callback: ErrorCallback) {
        *self.error_callback.lock().unwrap() = Some(callback);
    }
}
