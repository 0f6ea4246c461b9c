//! Engine configuration

use std::time::Duration;

use crate::error::{OrchestrationError, Result};

/// Tuning for the orchestration engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Intents buffered before submitters wait for room
    pub queue_capacity: usize,
    /// Bound on starting a source's process
    pub activation_timeout: Duration,
    /// Bound on stopping a source's process
    pub deactivation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            activation_timeout: Duration::from_secs(15),
            deactivation_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(OrchestrationError::Configuration(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if self.activation_timeout.is_zero() || self.deactivation_timeout.is_zero() {
            return Err(OrchestrationError::Configuration(
                "timeouts must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_activation_timeout(mut self, timeout: Duration) -> Self {
        self.activation_timeout = timeout;
        self
    }

    pub fn with_deactivation_timeout(mut self, timeout: Duration) -> Self {
        self.deactivation_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(EngineConfig::default().with_queue_capacity(0).validate().is_err());
        assert!(EngineConfig::default()
            .with_deactivation_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
