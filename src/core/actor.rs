//! # The shared actor (browser session) slot.
//!
//! The engine owns at most one live actor at a time. It is started lazily by
//! the first task that needs it and closed by
//! [`Engine::close_agent`](crate::Engine::close_agent).
//!
//! ## Epoch gating
//! ```text
//! acquire():  e0 = epoch ─► provider.start() ─► lock slot
//!                                               ├─ epoch == e0 ─► publish handle
//!                                               └─ epoch != e0 ─► provider.close(handle), Err
//! close:      epoch.advance() ─► lock slot ─► take handle ─► provider.close(handle)
//! ```
//! The epoch check and the publish happen under the slot lock, and shutdown
//! advances the epoch before taking the handle. A start that raced a shutdown
//! is therefore either taken by that shutdown or torn down by itself; it is
//! never left published.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::fabric::{Epoch, diag};

/// Opaque handle to the actor; runners and actions downcast it.
pub type ActorHandle = Arc<dyn Any + Send + Sync>;

/// Supplies the shared actor.
#[async_trait]
pub trait ActorProvider: Send + Sync + 'static {
    async fn start(&self) -> anyhow::Result<ActorHandle>;

    async fn close(&self, handle: ActorHandle) -> anyhow::Result<()>;
}

pub(crate) struct ActorSlot {
    provider: Option<Arc<dyn ActorProvider>>,
    current: Mutex<Option<ActorHandle>>,
    init: tokio::sync::Mutex<()>,
    max_diag: usize,
}

impl ActorSlot {
    pub(crate) fn new(provider: Option<Arc<dyn ActorProvider>>, max_diag: usize) -> Self {
        Self {
            provider,
            current: Mutex::new(None),
            init: tokio::sync::Mutex::new(()),
            max_diag,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActorHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self) -> bool {
        self.slot().is_some()
    }

    /// Returns the live actor, starting one if needed.
    pub(crate) async fn acquire(&self, epoch: &Epoch) -> Result<ActorHandle, EngineError> {
        if let Some(h) = self.slot().clone() {
            return Ok(h);
        }
        let Some(provider) = self.provider.as_ref() else {
            return Err(EngineError::ActorUnavailable {
                reason: "no actor provider configured".into(),
            });
        };

        // One start at a time keeps a single live instance.
        let _init = self.init.lock().await;
        if let Some(h) = self.slot().clone() {
            return Ok(h);
        }

        let started_at = epoch.current();
        let handle = provider.start().await.map_err(|e| EngineError::ActorUnavailable {
            reason: diag::sanitize(&format!("{e:#}"), self.max_diag),
        })?;

        let published = {
            let mut slot = self.slot();
            if epoch.is_stale(started_at) {
                false
            } else {
                *slot = Some(Arc::clone(&handle));
                true
            }
        };

        if published {
            tracing::debug!("actor started");
            return Ok(handle);
        }

        tracing::info!("actor start raced engine close; tearing it down");
        if let Err(e) = provider.close(handle).await {
            tracing::warn!(error = %diag::sanitize(&format!("{e:#}"), self.max_diag), "stale actor close failed");
        }
        Err(EngineError::ActorUnavailable {
            reason: "engine was closed while the actor was starting".into(),
        })
    }

    /// Takes and closes the live actor, if any. Call after advancing the epoch.
    pub(crate) async fn close(&self) {
        let Some(handle) = self.slot().take() else {
            return;
        };
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        if let Err(e) = provider.close(handle).await {
            tracing::warn!(error = %diag::sanitize(&format!("{e:#}"), self.max_diag), "actor close failed");
        }
    }
}
