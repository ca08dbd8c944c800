use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};

use super::{fs::FileSystem, stats::AnalyticsHistory};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub fn encode_history(history: &AnalyticsHistory) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(history).context("failed to encode analytics history")
}

pub fn decode_history(bytes: &[u8]) -> Result<AnalyticsHistory, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Reads the history at `path`. A missing, unreadable or corrupt file yields
/// an empty history; the failure is logged and never propagated.
pub fn load_history(fs: &dyn FileSystem, path: &Path) -> AnalyticsHistory {
    if !fs.exists(path) {
        return AnalyticsHistory::new();
    }

    let bytes = match fs.read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log_warn!("Failed to read analytics history {}: {err}", path.display());
            return AnalyticsHistory::new();
        }
    };

    match decode_history(&bytes) {
        Ok(history) => history,
        Err(err) => {
            log_warn!(
                "Analytics history {} is corrupt, starting empty: {err}",
                path.display()
            );
            AnalyticsHistory::new()
        }
    }
}

/// Result of one background write, reported back to the store's owner.
#[derive(Debug)]
pub struct SaveOutcome {
    pub generation: u64,
    pub result: std::result::Result<(), String>,
}

enum WriterCommand {
    Write {
        generation: u64,
        snapshot: Arc<AnalyticsHistory>,
    },
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Dedicated thread that serializes history snapshots to disk.
///
/// The writer only ever sees immutable snapshots; it never touches the live
/// mapping owned by the store.
pub struct HistoryWriter {
    sender: mpsc::Sender<WriterCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HistoryWriter {
    pub fn spawn(
        path: PathBuf,
        fs: Arc<dyn FileSystem>,
        outcomes: mpsc::Sender<SaveOutcome>,
    ) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<WriterCommand>();

        let worker = thread::Builder::new()
            .name("dorso-history-writer".into())
            .spawn(move || {
                while let Ok(command) = command_rx.recv() {
                    match command {
                        WriterCommand::Write {
                            generation,
                            snapshot,
                        } => {
                            let result = write_snapshot(fs.as_ref(), &path, &snapshot)
                                .map_err(|err| format!("{err:#}"));
                            match &result {
                                Ok(()) => log_debug!(
                                    "History generation {generation} written ({} days)",
                                    snapshot.len()
                                ),
                                Err(err) => log_error!(
                                    "Failed to write history generation {generation}: {err}"
                                ),
                            }
                            if outcomes.send(SaveOutcome { generation, result }).is_err() {
                                log_warn!("History store dropped before save outcome delivered");
                            }
                        }
                        WriterCommand::Flush(ack) => {
                            let _ = ack.send(());
                        }
                        WriterCommand::Shutdown => break,
                    }
                }

                log_info!("History writer thread shutting down");
            })
            .context("failed to spawn history writer thread")?;

        Ok(Self {
            sender: command_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn submit(&self, generation: u64, snapshot: Arc<AnalyticsHistory>) -> Result<()> {
        self.sender
            .send(WriterCommand::Write {
                generation,
                snapshot,
            })
            .map_err(|_| anyhow::anyhow!("history writer thread is not running"))
    }

    /// Blocks until every write queued before this call has finished.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.sender
            .send(WriterCommand::Flush(ack_tx))
            .map_err(|_| anyhow::anyhow!("history writer thread is not running"))?;
        ack_rx
            .recv()
            .context("history writer exited before acknowledging flush")
    }
}

impl Drop for HistoryWriter {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(WriterCommand::Shutdown) {
                log_error!("Failed to send shutdown to history writer: {err}");
            }
            if let Err(join_err) = handle.join() {
                log_error!("Failed to join history writer: {join_err:?}");
            }
        }
    }
}

fn write_snapshot(fs: &dyn FileSystem, path: &Path, snapshot: &AnalyticsHistory) -> Result<()> {
    let bytes = encode_history(snapshot)?;
    fs.write_atomic(path, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))
}
