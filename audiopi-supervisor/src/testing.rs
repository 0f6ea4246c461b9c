//! Scriptable [`ProcessBackend`] for tests

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Health, ProcessBackend};
use crate::error::BackendError;

/// In-memory process whose behaviour tests flip at runtime
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    name: String,
    running: AtomicBool,
    crash_loop: AtomicBool,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    start_delay: Mutex<Duration>,
    stop_delay: Mutex<Duration>,
    starts: AtomicU32,
    stops: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every health check after a start reports a crash
    pub fn crash_loop(&self, enabled: bool) {
        self.crash_loop.store(enabled, Ordering::SeqCst);
    }

    /// Simulate the process dying
    pub fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn fail_start(&self, enabled: bool) {
        self.fail_start.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, enabled: bool) {
        self.fail_stop.store(enabled, Ordering::SeqCst);
    }

    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    pub fn set_stop_delay(&self, delay: Duration) {
        *self.stop_delay.lock().unwrap() = delay;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of `start` calls, including failed ones
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessBackend for ScriptedBackend {
    async fn start(&self) -> Result<(), BackendError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(BackendError::Other(format!("{} refused to start", self.name)));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let delay = *self.stop_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(BackendError::Other(format!("{} refused to stop", self.name)));
        }
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Health {
        if !self.is_running() {
            Health::Unhealthy(format!("{} is not running", self.name))
        } else if self.crash_loop.load(Ordering::SeqCst) {
            Health::Unhealthy(format!("{} crashed", self.name))
        } else {
            Health::Healthy
        }
    }

    fn describe(&self) -> String {
        format!("scripted {}", self.name)
    }
}
