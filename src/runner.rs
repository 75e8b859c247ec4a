//! Cooperative task runner
//!
//! Executes a [`TaskQueue`] strictly in order, one task at a time. Between two
//! tasks the runner yields back to the Tokio scheduler so the host (UI, event
//! consumers) can process its own work; inside a task there is no suspension
//! from the runner's point of view.
//!
//! State machine: `Idle -> Running -> {Completed, Failed}`.
//! - progress is reset to 0 when a run starts and set to
//!   `completed / total * 100` after every successful task
//! - the first failing task stops the run: no later task executes, progress
//!   keeps its last value and nothing is rolled back
//! - the finish callback runs exactly once, and only on completion

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result, RunError};
use crate::task::{Task, TaskQueue};
use crate::types::{Event, RunId, RunState};

/// Capacity of the per-runner event channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Shared progress value in `[0, 100]`
///
/// The runner is the only writer; hosts read it through [`ProgressSink::subscribe`]
/// or [`ProgressSink::get`].
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: Arc<watch::Sender<f64>>,
}

impl ProgressSink {
    /// Create a sink starting at 0
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self { tx: Arc::new(tx) }
    }

    /// Watch progress updates
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }

    /// Current progress
    pub fn get(&self) -> f64 {
        *self.tx.borrow()
    }

    fn set(&self, percent: f64) {
        self.tx.send_replace(percent.clamp(0.0, 100.0));
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a started run
#[must_use = "a run's failure is only reported through its handle"]
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    handle: JoinHandle<Result<()>>,
}

impl RunHandle {
    /// The run's ID
    pub fn id(&self) -> RunId {
        self.run
    }

    /// Wait for the run to reach Completed or Failed
    ///
    /// Returns the failing task's error wrapped in [`Error::Task`].
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(RunError::Aborted {
                run: self.run.get(),
                reason: e.to_string(),
            }
            .into()),
        }
    }
}

/// Sequential export task runner
pub struct Runner {
    /// Directory created before every run for transient artifacts
    transient_dir: PathBuf,
    /// Optional per-task time limit
    task_timeout: Option<Duration>,
    /// Current state, observable by the host
    state_tx: Arc<watch::Sender<RunState>>,
    /// Event channel for emitting run events
    event_tx: broadcast::Sender<Event>,
    /// Last issued run ID
    last_run: AtomicU64,
}

impl Runner {
    /// Create an idle runner that prepares `transient_dir` before each run
    pub fn new(transient_dir: impl Into<PathBuf>) -> Self {
        let (state_tx, _state_rx) = watch::channel(RunState::Idle);
        let (event_tx, _event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transient_dir: transient_dir.into(),
            task_timeout: None,
            state_tx: Arc::new(state_tx),
            event_tx,
            last_run: AtomicU64::new(0),
        }
    }

    /// Create a runner using the configured export folder and task timeout
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.export_root()).with_task_timeout(config.export.task_timeout)
    }

    /// Abort a run when a single task exceeds `timeout`
    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current state
    pub fn state(&self) -> RunState {
        self.state_tx.borrow().clone()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.state_tx.borrow().is_running()
    }

    /// Start executing `queue`; returns as soon as the run is scheduled
    ///
    /// See [`Runner::start_in`].
    pub fn start<F>(&self, queue: TaskQueue, progress: ProgressSink, on_finished: F) -> Result<RunHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let dir = self.transient_dir.clone();
        self.start_in(&dir, queue, progress, on_finished)
    }

    /// Start executing `queue` with `transient_dir` as the artifact directory
    ///
    /// Fails synchronously, before any task runs, when a run is already in
    /// progress on this runner or when the directory cannot be created. Must be
    /// called from within a Tokio runtime.
    pub fn start_in<F>(
        &self,
        transient_dir: &Path,
        queue: TaskQueue,
        progress: ProgressSink,
        on_finished: F,
    ) -> Result<RunHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NotSupported(format!("runner needs a Tokio runtime: {}", e)))?;

        let total = queue.len();
        let (run, previous) = self.claim(total)?;

        if let Err(e) = std::fs::create_dir_all(transient_dir) {
            error!(run = run.get(), ?transient_dir, error = %e, "cannot prepare transient directory");
            // The claim is exclusive, so no other start issued an ID meanwhile
            self.last_run.fetch_sub(1, Ordering::SeqCst);
            self.state_tx.send_replace(previous);
            return Err(RunError::Precondition {
                path: transient_dir.to_path_buf(),
                reason: e.to_string(),
            }
            .into());
        }

        progress.set(0.0);
        info!(run = run.get(), total, ?transient_dir, "starting export run");
        self.event_tx.send(Event::RunStarted { run, total }).ok();

        let ctx = RunContext {
            run,
            task_timeout: self.task_timeout,
            state_tx: self.state_tx.clone(),
            event_tx: self.event_tx.clone(),
            progress,
        };
        let handle = runtime.spawn(ctx.drive(queue, on_finished));

        Ok(RunHandle { run, handle })
    }

    /// Start `queue` and wait for it to finish
    pub async fn run<F>(&self, queue: TaskQueue, progress: ProgressSink, on_finished: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.start(queue, progress, on_finished)?.wait().await
    }

    /// Move to Running unless a run is already in flight
    ///
    /// The run ID is issued only once the start is accepted. Returns it along
    /// with the replaced state.
    fn claim(&self, total: usize) -> Result<(RunId, RunState)> {
        let mut outcome = Err(RunState::Idle);
        self.state_tx.send_if_modified(|state| {
            if let RunState::Running { run: active, .. } = state {
                outcome = Err(RunState::Running {
                    run: *active,
                    cursor: 0,
                    total: 0,
                });
                return false;
            }
            let run = RunId(self.last_run.fetch_add(1, Ordering::SeqCst) + 1);
            let running = RunState::Running {
                run,
                cursor: 0,
                total,
            };
            outcome = Ok((run, std::mem::replace(state, running)));
            true
        });

        outcome.map_err(|active| {
            let active = active.run().map(|id| id.get()).unwrap_or_default();
            debug!(active, "rejecting start while a run is in progress");
            RunError::AlreadyRunning { run: active }.into()
        })
    }
}

/// Everything a spawned run needs
struct RunContext {
    run: RunId,
    task_timeout: Option<Duration>,
    state_tx: Arc<watch::Sender<RunState>>,
    event_tx: broadcast::Sender<Event>,
    progress: ProgressSink,
}

impl RunContext {
    async fn drive<F>(self, queue: TaskQueue, on_finished: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = AbortGuard {
            state_tx: self.state_tx.clone(),
            run: self.run,
            armed: true,
        };
        let total = queue.len();

        for task in queue.iter() {
            // step boundary: let the host process its own work
            tokio::task::yield_now().await;

            let index = task.ordinal();
            debug!(run = self.run.get(), index, task = task.name(), "running task");
            self.event_tx
                .send(Event::TaskStarted {
                    run: self.run,
                    index,
                    name: task.name().to_string(),
                })
                .ok();

            if let Err(e) = self.execute(task).await {
                error!(
                    run = self.run.get(),
                    index,
                    task = task.name(),
                    error = %e,
                    "task failed, stopping run"
                );
                self.state_tx.send_replace(RunState::Failed {
                    run: self.run,
                    cursor: index,
                    task: task.name().to_string(),
                });
                guard.armed = false;
                self.event_tx
                    .send(Event::RunFailed {
                        run: self.run,
                        index,
                        name: task.name().to_string(),
                        error: e.to_string(),
                    })
                    .ok();
                return Err(Error::task(index, task.name(), e));
            }

            let cursor = index + 1;
            let percent = cursor as f64 / total as f64 * 100.0;
            self.progress.set(percent);
            self.state_tx.send_replace(RunState::Running {
                run: self.run,
                cursor,
                total,
            });
            self.event_tx
                .send(Event::TaskComplete {
                    run: self.run,
                    index,
                    name: task.name().to_string(),
                })
                .ok();
            self.event_tx
                .send(Event::Progress {
                    run: self.run,
                    percent,
                })
                .ok();
            info!(run = self.run.get(), index, task = task.name(), percent, "task complete");
        }

        self.state_tx
            .send_replace(RunState::Completed { run: self.run });
        guard.armed = false;
        self.event_tx.send(Event::RunComplete { run: self.run }).ok();
        info!(run = self.run.get(), total, "export run completed");

        on_finished();
        Ok(())
    }

    async fn execute(&self, task: &Task) -> Result<()> {
        match self.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, task.run()).await {
                Ok(result) => result,
                Err(_) => Err(RunError::TaskTimeout {
                    name: task.name().to_string(),
                    seconds: limit.as_secs_f64(),
                }
                .into()),
            },
            None => task.run().await,
        }
    }
}

/// Marks the run Failed if the driving future is dropped mid-run (panic, runtime shutdown)
struct AbortGuard {
    state_tx: Arc<watch::Sender<RunState>>,
    run: RunId,
    armed: bool,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let run = self.run;
        self.state_tx.send_if_modified(|state| {
            let cursor = match state {
                RunState::Running { run: active, cursor, .. } if *active == run => *cursor,
                _ => return false,
            };
            *state = RunState::Failed {
                run,
                cursor,
                task: String::new(),
            };
            true
        });
    }
}
