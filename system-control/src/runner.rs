//! Command execution seam

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ControlError;

/// A single program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path or name of the program
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Whether the call needs root (run through `sudo` when enabled)
    pub privileged: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Turn a non-zero exit into [`ControlError::CommandFailed`]
    pub fn check(self, invocation: &Invocation) -> Result<Self, ControlError> {
        if self.success() {
            Ok(self)
        } else {
            let stderr = if self.stderr.trim().is_empty() {
                self.stdout.trim().to_string()
            } else {
                self.stderr.trim().to_string()
            };
            Err(ControlError::CommandFailed {
                command: invocation.to_string(),
                code: self.code,
                stderr,
            })
        }
    }
}

/// Runs programs on behalf of the control clients
#[async_trait]
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run the invocation to completion and capture its output.
    ///
    /// A non-zero exit is *not* an error at this level; callers decide with
    /// [`CommandOutput::check`].
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ControlError>;
}

/// Runs programs with `tokio::process`
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    sudo: bool,
    timeout: Duration,
}

impl TokioCommandRunner {
    /// Create a runner; privileged invocations are prefixed with `sudo` when
    /// `sudo` is true (the daemon user has a sudoers allowlist).
    pub fn new(sudo: bool) -> Self {
        Self {
            sudo,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ControlError> {
        let mut command = if invocation.privileged && self.sudo {
            let mut command = tokio::process::Command::new("sudo");
            command.arg("-n").arg(&invocation.program);
            command
        } else {
            tokio::process::Command::new(&invocation.program)
        };
        command.args(&invocation.args).kill_on_drop(true);

        tracing::debug!(command = %invocation, "running");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ControlError::Timeout {
                command: invocation.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|source| ControlError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
