use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::quiz::controller::AdvanceToken;

/// Delivers advance tokens after a fixed delay. At most one delivery is
/// pending; scheduling again or calling `cancel` drops the previous one.
#[derive(Debug)]
pub struct AdvanceScheduler {
    delay: Duration,
    tx: mpsc::Sender<AdvanceToken>,
    pending: Option<CancellationToken>,
}

impl AdvanceScheduler {
    pub fn new(delay: Duration, tx: mpsc::Sender<AdvanceToken>) -> Self {
        Self { delay, tx, pending: None }
    }

    pub fn schedule(&mut self, token: AdvanceToken) {
        self.cancel();

        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {
                    trace!(question_index = token.question_index(), "Deferred advance cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    // Receiver gone means the UI is shutting down
                    let _ = tx.send(token).await;
                }
            }
        });

        debug!(question_index = token.question_index(), delay_ms = delay.as_millis() as u64, "Deferred advance scheduled");
        self.pending = Some(cancel);
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

impl Drop for AdvanceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
