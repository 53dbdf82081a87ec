//! Upload-and-poll workflow
//!
//! The controller drives one video at a time through
//! `Idle -> Uploading -> Polling -> Ready | Failed`, with `Interrupted` when
//! polling had to stop because the relay could not be reached. Observers
//! follow along through a `watch` channel of [`Snapshot`]s.
//!
//! The poll timer is a task owned by the controller. It is aborted whenever
//! a new upload starts, on `reset` and on drop. Every snapshot carries the
//! generation of the upload it belongs to, and a poll result is applied only
//! if its generation is still current, so a response that was already in
//! flight when the upload was superseded is dropped.
//!
//! A poll task that panics moves its workflow to `Interrupted`, so observers
//! never wait on a dead timer.

use std::{sync::Arc, time::Duration};

use common::{UploadResult, display::status_message};
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::client::{VideoApi, VideoFile};

/// Interval between two status requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest interval accepted by [`UploadController::with_interval`]
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where the controller is in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Polling,
    Ready,
    Failed,
    /// Polling stopped on a relay or transport error
    Interrupted,
}

impl Phase {
    /// Whether the controller will not change state on its own anymore
    pub fn is_settled(self) -> bool {
        !matches!(self, Phase::Uploading | Phase::Polling)
    }

    fn for_result(result: &UploadResult) -> Self {
        if result.is_ready() {
            Phase::Ready
        } else if result.status.is_failed() {
            Phase::Failed
        } else {
            Phase::Polling
        }
    }
}

/// Display state published to observers
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub phase: Phase,
    /// Latest video record, replaced wholesale on every poll
    pub result: Option<UploadResult>,
    /// Upload error shown to the user
    pub error: Option<String>,
}

impl Snapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            phase: Phase::Idle,
            result: None,
            error: None,
        }
    }

    /// Line to show for this snapshot, if any
    pub fn message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }

        match self.phase {
            Phase::Uploading => Some("Uploading video...".to_string()),
            _ => self
                .result
                .as_ref()
                .map(|result| status_message(&result.status)),
        }
    }
}

/// Drives an upload and the status polling that follows it
pub struct UploadController {
    api: Arc<dyn VideoApi>,
    interval: Duration,
    state: Arc<watch::Sender<Snapshot>>,
    poller: Option<Poller>,
}

impl UploadController {
    pub fn new(api: Arc<dyn VideoApi>) -> Self {
        let (state, _) = watch::channel(Snapshot::idle(0));
        Self {
            api,
            interval: DEFAULT_POLL_INTERVAL,
            state: Arc::new(state),
            poller: None,
        }
    }

    /// Set the poll interval, raised to [`MIN_POLL_INTERVAL`] if shorter
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} is too short, using {:?}",
                interval, MIN_POLL_INTERVAL
            );
        }
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Upload `file` and arm polling for the returned identifier
    ///
    /// Does nothing when no file is selected. Any previous result, error and
    /// poll timer are discarded before the upload starts.
    pub async fn start_upload(&mut self, file: Option<VideoFile>) -> Snapshot {
        let Some(file) = file else {
            return self.snapshot();
        };

        self.cancel_polling();
        let generation = self.state.borrow().generation + 1;
        self.state.send_replace(Snapshot {
            phase: Phase::Uploading,
            ..Snapshot::idle(generation)
        });

        info!("Uploading {}", file.file_name);
        match self.api.upload(file).await {
            Ok(result) => {
                let uid = result.uid.clone();
                let phase = Phase::for_result(&result);
                info!("Upload accepted as {} ({})", uid, result.status.state);

                self.state.send_if_modified(|snapshot| {
                    if snapshot.generation != generation {
                        return false;
                    }
                    snapshot.phase = phase;
                    snapshot.result = Some(result);
                    true
                });

                if phase == Phase::Polling {
                    self.poller = Some(Poller::spawn(
                        self.api.clone(),
                        self.state.clone(),
                        uid,
                        generation,
                        self.interval,
                    ));
                }
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.state.send_if_modified(|snapshot| {
                    if snapshot.generation != generation {
                        return false;
                    }
                    snapshot.phase = Phase::Idle;
                    snapshot.error = Some(format!("Upload failed: {}", e));
                    true
                });
            }
        }

        self.snapshot()
    }

    /// Stop polling and clear the display
    pub fn reset(&mut self) {
        self.cancel_polling();
        let generation = self.state.borrow().generation + 1;
        self.state.send_replace(Snapshot::idle(generation));
    }

    /// Wait until the current workflow reaches a settled phase
    pub async fn wait_until_settled(&self) -> Snapshot {
        let mut updates = self.subscribe();
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.phase.is_settled() {
                return snapshot;
            }
            if updates.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn cancel_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

impl Drop for UploadController {
    fn drop(&mut self) {
        self.cancel_polling();
    }
}

/// A running poll task and the task watching it
struct Poller {
    task: AbortHandle,
    supervisor: JoinHandle<()>,
}

impl Poller {
    /// Spawn `poll_status`, moving the workflow to `Interrupted` if it panics
    fn spawn(
        api: Arc<dyn VideoApi>,
        state: Arc<watch::Sender<Snapshot>>,
        uid: String,
        generation: u64,
        interval: Duration,
    ) -> Self {
        let task = tokio::spawn(poll_status(api, state.clone(), uid, generation, interval));
        let handle = task.abort_handle();

        let supervisor = tokio::spawn(async move {
            let Err(e) = task.await else {
                return;
            };
            if !e.is_panic() {
                return;
            }
            warn!("Status polling crashed: {}", e);
            state.send_if_modified(|snapshot| {
                if snapshot.generation != generation || snapshot.phase.is_settled() {
                    return false;
                }
                snapshot.phase = Phase::Interrupted;
                true
            });
        });

        Self {
            task: handle,
            supervisor,
        }
    }

    fn abort(self) {
        self.task.abort();
        self.supervisor.abort();
    }
}

async fn poll_status(
    api: Arc<dyn VideoApi>,
    state: Arc<watch::Sender<Snapshot>>,
    uid: String,
    generation: u64,
    interval: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let outcome = api.status(&uid).await;

        let mut keep_polling = false;
        state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            match &outcome {
                Ok(result) => {
                    let phase = Phase::for_result(result);
                    keep_polling = phase == Phase::Polling;

                    let changed =
                        snapshot.phase != phase || snapshot.result.as_ref() != Some(result);
                    snapshot.phase = phase;
                    snapshot.result = Some(result.clone());
                    changed
                }
                Err(_) => {
                    snapshot.phase = Phase::Interrupted;
                    true
                }
            }
        });

        match &outcome {
            Ok(result) if !keep_polling => {
                info!("Stopped polling {} in state {}", uid, result.status.state)
            }
            Err(e) => warn!("Stopped polling {}: {}", uid, e),
            Ok(_) => {}
        }

        if !keep_polling {
            break;
        }
    }
}
