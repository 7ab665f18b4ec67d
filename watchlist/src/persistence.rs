//! Ordered, fire-and-forget persistence of watchlist mutations.

use std::sync::Arc;

use ratewatch_fx::{CurrencyRepository, SelectedCurrency};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::{WatchlistError, WatchlistResult};

enum PersistenceCommand {
    SaveSelection(Vec<SelectedCurrency>),
    Flush(oneshot::Sender<()>),
}

/// Sender side of the persistence writer.
///
/// Commands are applied by one writer task in the order they were sent, so
/// the stored selection always reflects some prefix of the in-memory
/// mutations.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::UnboundedSender<PersistenceCommand>,
}

impl PersistenceHandle {
    /// Spawn the writer task for a repository.
    pub fn spawn(repository: Arc<dyn CurrencyRepository>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(repository, rx));
        (Self { tx }, task)
    }

    /// Queue a selection snapshot for storage.
    pub fn save_selection(&self, selection: Vec<SelectedCurrency>) {
        if self.tx.send(PersistenceCommand::SaveSelection(selection)).is_err() {
            warn!("Persistence writer stopped, dropping selection update");
        }
    }

    /// Wait until every previously queued command has been applied.
    pub async fn flush(&self) -> WatchlistResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(PersistenceCommand::Flush(done_tx))
            .map_err(|_| WatchlistError::Persistence("writer stopped".to_string()))?;
        done_rx
            .await
            .map_err(|_| WatchlistError::Persistence("writer stopped".to_string()))
    }
}

#[instrument(skip_all)]
async fn run_writer(repository: Arc<dyn CurrencyRepository>, mut rx: mpsc::UnboundedReceiver<PersistenceCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            PersistenceCommand::SaveSelection(selection) => {
                debug!(count = selection.len(), "Persisting selection");
                if let Err(e) = repository.save_selection(selection).await {
                    warn!(error = %e, "Failed to persist selection");
                }
            }
            PersistenceCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Persistence writer stopped");
}
