use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::analytics::{AnalyticsStore, DailyStats};

use super::{
    events::PostureEvent,
    machine::{LedgerUpdate, MachineOptions, PostureMachine, PostureSnapshot},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub machine: MachineOptions,
    pub save_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            machine: MachineOptions::default(),
            save_interval: Duration::from_secs(60),
        }
    }
}

enum ControllerCommand {
    Event(PostureEvent),
    TodayStats(oneshot::Sender<DailyStats>),
    Last7Days(oneshot::Sender<Vec<DailyStats>>),
}

/// Owner task for the posture state and the analytics store.
///
/// All mutation happens inside the spawned task; callers talk to it through
/// [`PostureHandle`].
pub struct PostureController;

impl PostureController {
    pub fn spawn(store: AnalyticsStore, options: ControllerOptions) -> PostureHandle {
        let machine = PostureMachine::new(options.machine);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let cancel_token = CancellationToken::new();

        let task = tokio::spawn(controller_loop(
            machine,
            store,
            command_rx,
            snapshot_tx,
            cancel_token.clone(),
            options.save_interval,
        ));

        PostureHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            cancel_token,
            task,
        }
    }
}

pub struct PostureHandle {
    commands: mpsc::UnboundedSender<ControllerCommand>,
    snapshots: watch::Receiver<PostureSnapshot>,
    cancel_token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl PostureHandle {
    pub fn send(&self, event: PostureEvent) -> Result<()> {
        self.commands
            .send(ControllerCommand::Event(event))
            .map_err(|_| anyhow!("posture controller is not running"))
    }

    pub async fn today_stats(&self) -> Result<DailyStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ControllerCommand::TodayStats(reply_tx))
            .map_err(|_| anyhow!("posture controller is not running"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("posture controller terminated unexpectedly"))
    }

    pub async fn last_7_days(&self) -> Result<Vec<DailyStats>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ControllerCommand::Last7Days(reply_tx))
            .map_err(|_| anyhow!("posture controller is not running"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("posture controller terminated unexpectedly"))
    }

    pub fn snapshot(&self) -> PostureSnapshot {
        *self.snapshots.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PostureSnapshot> {
        self.snapshots.clone()
    }

    /// Stops the controller after it has drained already-queued events, then
    /// waits for the final save to reach disk.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel_token.cancel();
        self.task
            .await
            .context("posture controller task failed to join")?
    }
}

async fn controller_loop(
    mut machine: PostureMachine,
    mut store: AnalyticsStore,
    mut commands: mpsc::UnboundedReceiver<ControllerCommand>,
    snapshots: watch::Sender<PostureSnapshot>,
    cancel_token: CancellationToken,
    save_interval: Duration,
) -> Result<()> {
    let mut ticker = time::interval(save_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else {
                    log_info!("All posture handles dropped, stopping controller");
                    break;
                };
                match command {
                    ControllerCommand::Event(event) => {
                        match machine.apply(event) {
                            Some(LedgerUpdate::Time { interval, is_slouching }) => {
                                store.track_time(interval, is_slouching);
                            }
                            Some(LedgerUpdate::SlouchEvent) => store.record_slouch_event(),
                            None => {}
                        }
                        let next = machine.snapshot();
                        snapshots.send_if_modified(|current| {
                            if *current == next {
                                false
                            } else {
                                *current = next;
                                true
                            }
                        });
                    }
                    ControllerCommand::TodayStats(reply) => {
                        if reply.send(store.today_stats()).is_err() {
                            log_warn!("today_stats caller dropped before reply");
                        }
                    }
                    ControllerCommand::Last7Days(reply) => {
                        if reply.send(store.last_7_days()).is_err() {
                            log_warn!("last_7_days caller dropped before reply");
                        }
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("Posture controller shutting down");
                break;
            }
            _ = ticker.tick() => {
                store.save_history_if_needed();
            }
        }
    }

    tokio::task::spawn_blocking(move || {
        store.save_history_if_needed();
        store.flush()
    })
    .await
    .context("final history save worker join failed")?
    .map_err(|err| {
        log_error!("Final history save failed: {err:#}");
        err
    })
}
