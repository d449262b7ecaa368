//! Scripted connector: stands in for browser-only back-ends (injected
//! extensions, WalletConnect popups) when no browser is available.
//!
//! The outcome of every activation is fixed up front, which makes the
//! connection layer's behavior reproducible from the command line.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::connection::adapter::{AdapterError, ConnectorAdapter, ErrorCallback};

/// How a scripted connector behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Failure message for activation; `None` means activation succeeds.
    pub fail_with: Option<String>,
    /// How long the simulated approval prompt stays open.
    pub latency: Duration,
    /// Drop the session this long after a successful activation.
    pub drop_after: Option<Duration>,
}

pub struct ScriptedAdapter {
    name: &'static str,
    script: Script,
    session: Arc<AtomicBool>,
    /// Bumped whenever a session starts or ends; a pending drop only
    /// applies to the session it was scheduled for.
    generation: Arc<AtomicU64>,
    error_callback: Arc<Mutex<Option<ErrorCallback>>>,
}

impl ScriptedAdapter {
    pub fn new(name: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name,
            script,
            session: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            error_callback: Arc::new(Mutex::new(None)),
        })
    }

    pub fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }

    fn end_session(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.session.store(false, Ordering::SeqCst);
    }

    /// Spawn the task that drops session `generation` after `delay`.
    fn schedule_drop(&self, delay: Duration, generation: u64) {
        let session = Arc::clone(&self.session);
        let current = Arc::clone(&self.generation);
        let callback = Arc::clone(&self.error_callback);
        let name = self.name;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current
                .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            session.store(false, Ordering::SeqCst);
            tracing::debug!(connector = name, "scripted session dropped");
            let callback = callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(callback) = callback {
                callback(AdapterError::SessionEnded(format!(
                    "{name} session disconnected by the wallet"
                )));
            }
        });
    }
}

impl ConnectorAdapter for ScriptedAdapter {
    fn activate(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
        async move {
            if !self.script.latency.is_zero() {
                tokio::time::sleep(self.script.latency).await;
            }
            if let Some(message) = &self.script.fail_with {
                return Err(AdapterError::Provider(message.clone()));
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.session.store(true, Ordering::SeqCst);
            if let Some(delay) = self.script.drop_after {
                self.schedule_drop(delay, generation);
            }
            Ok(())
        }
        .boxed()
    }

    fn deactivate(&self) -> Option<BoxFuture<'_, Result<(), AdapterError>>> {
        Some(
            async move {
                self.end_session();
                Ok(())
            }
            .boxed(),
        )
    }

    fn reset_state(&self) {
        self.end_session();
    }

    fn on_error(&self, callback: ErrorCallback) {
        *self
            .error_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn succeeding_script_opens_session() {
        let adapter = ScriptedAdapter::new("test", Script::default());
        adapter.activate().await.unwrap();
        assert!(adapter.has_session());

        adapter.deactivate().unwrap().await.unwrap();
        assert!(!adapter.has_session());
    }

    #[tokio::test]
    async fn failing_script_returns_message() {
        let adapter = ScriptedAdapter::new(
            "test",
            Script {
                fail_with: Some("user closed the modal".into()),
                ..Script::default()
            },
        );
        let err = adapter.activate().await.unwrap_err();
        assert_eq!(err, AdapterError::Provider("user closed the modal".into()));
        assert!(!adapter.has_session());
    }

    #[tokio::test]
    async fn dropped_session_reports_error() {
        let adapter = ScriptedAdapter::new(
            "WalletConnect",
            Script {
                drop_after: Some(Duration::from_millis(10)),
                ..Script::default()
            },
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        adapter.on_error(Arc::new(move |e| {
            let _ = tx.send(e);
        }));

        adapter.activate().await.unwrap();
        let err = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            err,
            AdapterError::SessionEnded("WalletConnect session disconnected by the wallet".into())
        );
        assert!(!adapter.has_session());
    }

    #[tokio::test]
    async fn reset_before_drop_suppresses_error() {
        let adapter = ScriptedAdapter::new(
            "test",
            Script {
                drop_after: Some(Duration::from_millis(10)),
                ..Script::default()
            },
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AdapterError>();
        adapter.on_error(Arc::new(move |e| {
            let _ = tx.send(e);
        }));

        adapter.activate().await.unwrap();
        adapter.reset_state();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_drop_does_not_end_next_session() {
        let adapter = ScriptedAdapter::new(
            "test",
            Script {
                drop_after: Some(Duration::from_millis(300)),
                ..Script::default()
            },
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AdapterError>();
        adapter.on_error(Arc::new(move |e| {
            let _ = tx.send(e);
        }));

        adapter.activate().await.unwrap();
        adapter.deactivate().unwrap().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        adapter.activate().await.unwrap();

        // The first session's timer fires here; the second one's has not.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(adapter.has_session());
        assert!(rx.try_recv().is_err());

        let err = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(err.ends_session());
        assert!(!adapter.has_session());
    }

    #[tokio::test]
    async fn listener_may_replace_itself_on_drop() {
        let adapter = ScriptedAdapter::new(
            "test",
            Script {
                drop_after: Some(Duration::from_millis(10)),
                ..Script::default()
            },
        );
        let weak = Arc::downgrade(&adapter);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AdapterError>();
        adapter.on_error(Arc::new(move |e| {
            if let Some(adapter) = weak.upgrade() {
                adapter.on_error(Arc::new(|_| {}));
            }
            let _ = tx.send(e);
        }));

        adapter.activate().await.unwrap();
        let err = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(err.ends_session());
    }
}
