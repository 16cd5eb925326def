//! Confirmation gate — suspends a dangerous tool call until the user decides.
//!
//! The agent opens a request and awaits it; the front-end, holding a cloned
//! [`ConfirmationGate`], answers with [`ConfirmationGate::resolve`] when it
//! renders the `Confirm` event.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

type Slot = Option<oneshot::Sender<bool>>;

/// Shared single-slot approve/deny channel.
#[derive(Clone, Debug, Default)]
pub struct ConfirmationGate {
    pending: Arc<Mutex<Slot>>,
}

/// The receiving half of an open confirmation request.
#[derive(Debug)]
pub struct PendingConfirmation {
    rx: oneshot::Receiver<bool>,
}

impl PendingConfirmation {
    /// Wait for the decision. A cancelled request counts as denied.
    pub async fn wait(self) -> bool {
        self.rx.await.unwrap_or(false)
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a new request, dropping any stale one.
    pub fn request(&self) -> PendingConfirmation {
        let (tx, rx) = oneshot::channel();
        if self.slot().replace(tx).is_some() {
            debug!("replaced stale confirmation request");
        }
        PendingConfirmation { rx }
    }

    /// Deliver a decision. Returns `false` if nothing was pending.
    pub fn resolve(&self, approved: bool) -> bool {
        match self.slot().take() {
            Some(tx) => tx.send(approved).is_ok(),
            None => false,
        }
    }

    /// Drop any pending request; its waiter sees a denial.
    pub fn cancel(&self) {
        self.slot().take();
    }

    /// Whether a request is still waiting for an answer.
    ///
    /// A request whose waiter has gone away (turn dropped mid-confirmation)
    /// is cleared here rather than reported as pending.
    pub fn is_pending(&self) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|tx| tx.is_closed()) {
            slot.take();
            debug!("cleared abandoned confirmation request");
        }
        slot.is_some()
    }
}
