//! Process supervisor
//!
//! Owns one [`ProcessBackend`] per entity, drives each through the
//! [`ProcessState`] machine and runs a monitor task for every running
//! process. State observations are sent to whoever holds the receiver
//! returned by [`Supervisor::new`]; the supervisor itself never touches the
//! registries.
//!
//! Operations on one entity are serialized by a per-entity lock shared with
//! its monitor, so a restart never interleaves with a caller's stop. Caller
//! operations run on their own task: a caller that stops waiting (for
//! example on a timeout) does not cut an operation off halfway.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use audiopi_state::EntityId;

use crate::backend::{Health, ProcessBackend};
use crate::error::{Result, SupervisorError};
use crate::policy::RestartPolicy;
use crate::state::ProcessState;

/// Observed state change of a managed process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorEvent {
    pub entity: EntityId,
    pub state: ProcessState,
    pub error: Option<String>,
}

/// Returned by a successful start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub entity: EntityId,
    /// Incremented on every caller-initiated start
    pub generation: u64,
    pub description: String,
}

/// Cancellation handle of a monitor task
struct Monitor {
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Monitor {
    fn cancel(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

struct Entry {
    entity: EntityId,
    backend: Arc<dyn ProcessBackend>,
    state: parking_lot::Mutex<ProcessState>,
    op_lock: tokio::sync::Mutex<()>,
    monitor: parking_lot::Mutex<Option<Monitor>>,
    generation: AtomicU64,
}

impl Entry {
    fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    fn handle(&self) -> ProcessHandle {
        ProcessHandle {
            entity: self.entity.clone(),
            generation: self.generation.load(Ordering::SeqCst),
            description: self.backend.describe(),
        }
    }

    /// Checked transition, reported on `events`
    fn set_state(
        &self,
        next: ProcessState,
        error: Option<String>,
        events: &mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            *state = previous.transition(next, &self.entity)?;
            previous
        };
        tracing::debug!(entity = %self.entity, from = %previous, to = %next, "process state changed");
        // Receiver gone means the daemon is shutting down
        let _ = events.send(SupervisorEvent {
            entity: self.entity.clone(),
            state: next,
            error,
        });
        Ok(())
    }

    fn cancel_monitor(&self) {
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.cancel();
        }
    }
}

struct Inner {
    entries: DashMap<EntityId, Arc<Entry>>,
    policy: RestartPolicy,
    events: mpsc::UnboundedSender<SupervisorEvent>,
}

impl Inner {
    async fn start_entry(&self, entry: Arc<Entry>) -> Result<ProcessHandle> {
        let _op = entry.op_lock.lock().await;

        // The running process keeps its monitor
        if entry.state() == ProcessState::Running {
            if entry.monitor.lock().is_none() {
                self.spawn_monitor(&entry);
            }
            return Ok(entry.handle());
        }
        entry.cancel_monitor();

        entry.set_state(ProcessState::Starting, None, &self.events)?;
        entry.generation.fetch_add(1, Ordering::SeqCst);

        match entry.backend.start().await {
            Ok(()) => {
                entry.set_state(ProcessState::Running, None, &self.events)?;
                self.spawn_monitor(&entry);
                tracing::info!(entity = %entry.entity, backend = %entry.backend.describe(), "process started");
                Ok(entry.handle())
            }
            Err(source) => {
                entry.set_state(ProcessState::Failed, Some(source.to_string()), &self.events)?;
                tracing::warn!(entity = %entry.entity, error = %source, "process failed to start");
                Err(SupervisorError::StartFailed {
                    entity: entry.entity.clone(),
                    source,
                })
            }
        }
    }

    async fn stop_entry(&self, entry: Arc<Entry>) -> Result<()> {
        // Cancel first so a monitor sleeping in backoff lets go of the entity
        entry.cancel_monitor();
        let _op = entry.op_lock.lock().await;

        if entry.state() == ProcessState::Stopped {
            return Ok(());
        }

        entry.set_state(ProcessState::Stopping, None, &self.events)?;
        match entry.backend.stop().await {
            Ok(()) => {
                entry.set_state(ProcessState::Stopped, None, &self.events)?;
                tracing::info!(entity = %entry.entity, "process stopped");
                Ok(())
            }
            Err(source) => {
                entry.set_state(ProcessState::Failed, Some(source.to_string()), &self.events)?;
                tracing::warn!(entity = %entry.entity, error = %source, "process failed to stop");
                Err(SupervisorError::StopFailed {
                    entity: entry.entity.clone(),
                    source,
                })
            }
        }
    }

    fn spawn_monitor(&self, entry: &Arc<Entry>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        tokio::spawn(run_monitor(
            Arc::clone(entry),
            self.policy.clone(),
            self.events.clone(),
            Arc::clone(&shutdown),
            Arc::clone(&wake),
        ));

        *entry.monitor.lock() = Some(Monitor { shutdown, wake });
    }
}

/// Sleep unless cancelled first. Returns true when cancelled.
async fn sleep_or_cancel(duration: std::time::Duration, shutdown: &AtomicBool, wake: &Notify) -> bool {
    if shutdown.load(Ordering::SeqCst) {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = wake.notified() => {}
    }
    shutdown.load(Ordering::SeqCst)
}

/// Health polling and restart loop for one running process
async fn run_monitor(
    entry: Arc<Entry>,
    policy: RestartPolicy,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
) {
    let entity = entry.entity.clone();
    let mut crashes: u32 = 0;
    let mut running_since = Instant::now();

    tracing::debug!(entity = %entity, interval = ?policy.health_interval, "monitor started");

    loop {
        if sleep_or_cancel(policy.health_interval, &shutdown, &wake).await {
            break;
        }

        let mut reason = match entry.backend.health_check().await {
            Health::Healthy => {
                if crashes > 0 && running_since.elapsed() >= policy.reset_after {
                    tracing::debug!(entity = %entity, crashes, "crash count reset");
                    crashes = 0;
                }
                continue;
            }
            Health::Unhealthy(reason) => reason,
        };

        // Crash, back off, restart; a restart that fails is another crash
        loop {
            crashes += 1;
            {
                let _op = entry.op_lock.lock().await;
                if shutdown.load(Ordering::SeqCst) {
                    return;
                }
                if entry
                    .set_state(ProcessState::Crashed, Some(reason.clone()), &events)
                    .is_err()
                {
                    return;
                }
                tracing::warn!(entity = %entity, crashes, reason = %reason, "process crashed");

                if crashes > policy.max_restarts {
                    let error = format!(
                        "gave up after {} restarts: {}",
                        policy.max_restarts, reason
                    );
                    tracing::error!(entity = %entity, error = %error, "process failed");
                    let _ = entry.set_state(ProcessState::Failed, Some(error), &events);
                    return;
                }
            }

            if sleep_or_cancel(policy.backoff(crashes), &shutdown, &wake).await {
                return;
            }

            let _op = entry.op_lock.lock().await;
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            if entry.set_state(ProcessState::Starting, None, &events).is_err() {
                return;
            }
            match entry.backend.start().await {
                Ok(()) => {
                    let _ = entry.set_state(ProcessState::Running, None, &events);
                    running_since = Instant::now();
                    tracing::info!(entity = %entity, attempt = crashes, "process restarted");
                    break;
                }
                Err(err) => {
                    reason = err.to_string();
                }
            }
        }
    }

    tracing::debug!(entity = %entity, "monitor stopped");
}

/// Supervises the processes behind sources and zones. Cheap to clone.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Create a supervisor and the receiving end of its observations
    pub fn new(policy: RestartPolicy) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let supervisor = Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                policy,
                events,
            }),
        };
        (supervisor, receiver)
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.inner.policy
    }

    /// Manage `entity` through `backend`, initially Stopped
    pub fn register(&self, entity: EntityId, backend: Arc<dyn ProcessBackend>) {
        tracing::debug!(entity = %entity, backend = %backend.describe(), "registered");
        let entry = Arc::new(Entry {
            entity: entity.clone(),
            backend,
            state: parking_lot::Mutex::new(ProcessState::Stopped),
            op_lock: tokio::sync::Mutex::new(()),
            monitor: parking_lot::Mutex::new(None),
            generation: AtomicU64::new(0),
        });
        if let Some(previous) = self.inner.entries.insert(entity.clone(), entry) {
            tracing::warn!(entity = %entity, "replaced existing registration");
            previous.cancel_monitor();
        }
    }

    pub fn is_registered(&self, entity: &EntityId) -> bool {
        self.inner.entries.contains_key(entity)
    }

    /// Every registered entity
    pub fn entities(&self) -> Vec<EntityId> {
        self.inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Start the process; succeeds immediately when already Running
    pub async fn start(&self, entity: &EntityId) -> Result<ProcessHandle> {
        let entry = self.entry(entity)?;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.start_entry(entry).await })
            .await
            .map_err(|err| SupervisorError::TaskFailed(err.to_string()))?
    }

    /// Stop the process and its monitor; succeeds immediately when Stopped
    pub async fn stop(&self, entity: &EntityId) -> Result<()> {
        let entry = self.entry(entity)?;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.stop_entry(entry).await })
            .await
            .map_err(|err| SupervisorError::TaskFailed(err.to_string()))?
    }

    /// Probe the process now
    pub async fn health_check(&self, entity: &EntityId) -> Result<Health> {
        let entry = self.entry(entity)?;
        Ok(entry.backend.health_check().await)
    }

    pub fn state(&self, entity: &EntityId) -> Result<ProcessState> {
        Ok(self.entry(entity)?.state())
    }

    pub fn describe(&self, entity: &EntityId) -> Result<String> {
        Ok(self.entry(entity)?.backend.describe())
    }

    /// Stop everything that is not already Stopped
    pub async fn shutdown(&self) {
        for entity in self.entities() {
            match self.state(&entity) {
                Ok(ProcessState::Stopped) | Err(_) => continue,
                Ok(_) => {}
            }
            if let Err(err) = self.stop(&entity).await {
                tracing::warn!(entity = %entity, error = %err, "stop during shutdown failed");
            }
        }
    }

    fn entry(&self, entity: &EntityId) -> Result<Arc<Entry>> {
        self.inner
            .entries
            .get(entity)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SupervisorError::NotRegistered(entity.clone()))
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("entities", &self.inner.entries.len())
            .field("policy", &self.inner.policy)
            .finish()
    }
}
