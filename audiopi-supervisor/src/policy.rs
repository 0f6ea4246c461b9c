//! Restart policy

use std::time::Duration;

use crate::error::{Result, SupervisorError};

/// How crashed processes are brought back. Immutable once the supervisor runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Restarts attempted before a process is declared Failed
    pub max_restarts: u32,
    /// Delay before the first restart
    pub backoff_base: Duration,
    /// Upper bound for the delay
    pub backoff_cap: Duration,
    /// Interval between health checks of a running process
    pub health_interval: Duration,
    /// Healthy running time after which the crash count starts over
    pub reset_after: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
            health_interval: Duration::from_secs(2),
            reset_after: Duration::from_secs(60),
        }
    }
}

impl RestartPolicy {
    /// Delay before restart number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backoff_base.is_zero() {
            return Err(SupervisorError::InvalidPolicy(
                "backoff_base must be greater than zero".into(),
            ));
        }
        if self.backoff_cap < self.backoff_base {
            return Err(SupervisorError::InvalidPolicy(
                "backoff_cap must not be below backoff_base".into(),
            ));
        }
        if self.health_interval.is_zero() {
            return Err(SupervisorError::InvalidPolicy(
                "health_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    pub fn with_reset_after(mut self, reset_after: Duration) -> Self {
        self.reset_after = reset_after;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 4)]
    #[case(5, 16)]
    #[case(6, 30)]
    #[case(40, 30)]
    fn test_default_backoff(#[case] attempt: u32, #[case] secs: u64) {
        assert_eq!(RestartPolicy::default().backoff(attempt), Duration::from_secs(secs));
    }

    #[test]
    fn test_attempt_zero_uses_base() {
        assert_eq!(RestartPolicy::default().backoff(0), Duration::from_secs(1));
    }

    #[test]
    fn test_validate() {
        assert!(RestartPolicy::default().validate().is_ok());
        assert!(RestartPolicy::default()
            .with_backoff(Duration::from_secs(5), Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(RestartPolicy::default()
            .with_health_interval(Duration::ZERO)
            .validate()
            .is_err());
    }
}
