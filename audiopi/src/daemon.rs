//! Wiring of the running daemon
//!
//! One [`EventBus`] feeds both registries. Every configured entity with a
//! process gets a backend in the supervisor, the local zone gets the ALSA
//! mixer as its output, and the control API is served on top of the engine.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use audiopi_orchestrator::{Engine, EngineHandle, OutputError, ZoneOutput, ZoneOutputs};
use audiopi_state::{EntityId, EventBus, SourceRegistry, ZoneId, ZoneRegistry};
use audiopi_supervisor::{
    BluetoothBackend, CommandBackend, ProcessBackend, Supervisor, SystemdUnitBackend,
};
use control_server::{ApiContext, ControlServer, SettingsStore};
use system_control::{Amixer, CommandRunner, SystemControl, TokioCommandRunner};

use crate::config::{DaemonConfig, ProcessSpec};

/// The local ALSA mixer as a zone's volume output
#[derive(Debug, Clone)]
pub struct AmixerOutput {
    amixer: Amixer,
}

impl AmixerOutput {
    pub fn new(amixer: Amixer) -> Self {
        Self { amixer }
    }
}

#[async_trait]
impl ZoneOutput for AmixerOutput {
    async fn apply(&self, volume: u8, muted: bool) -> Result<(), OutputError> {
        let result = if muted || volume == 0 {
            self.amixer.set_muted(true).await
        } else {
            // Writing a level unmutes
            self.amixer
                .set_volume_percent(i64::from(volume))
                .await
                .map(drop)
        };
        result.map_err(|err| OutputError(err.to_string()))
    }
}

/// Backend running `spec`, or `None` for bookkeeping-only entities
pub fn backend_for(spec: &ProcessSpec, system: &SystemControl) -> Option<Arc<dyn ProcessBackend>> {
    match spec {
        ProcessSpec::None => None,
        ProcessSpec::Unit(unit) => Some(Arc::new(SystemdUnitBackend::new(
            unit.as_str(),
            system.systemctl.clone(),
        ))),
        ProcessSpec::Bluetooth => Some(Arc::new(BluetoothBackend::new(
            system.systemctl.clone(),
            system.bluetooth.clone(),
        ))),
        ProcessSpec::Command { program, args } => {
            Some(Arc::new(CommandBackend::new(program.as_str(), args.clone())))
        }
    }
}

/// A running daemon: engine plus control API
pub struct Daemon {
    server: ControlServer,
    engine: EngineHandle,
}

impl Daemon {
    /// Start with real OS commands
    pub async fn start(config: &DaemonConfig) -> Result<Self> {
        let runner = TokioCommandRunner::new(config.mixer.sudo)
            .with_timeout(Duration::from_secs(config.mixer.command_timeout_secs));
        Self::start_with_runner(config, Arc::new(runner)).await
    }

    /// Start with every OS command going through `runner`
    pub async fn start_with_runner(
        config: &DaemonConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let settings = SettingsStore::load(config.settings_path.clone())
            .await
            .context("Failed to load device settings")?;

        let system = Arc::new(SystemControl::new(
            runner,
            config.mixer.card,
            config.mixer.control.clone(),
        ));

        let bus = EventBus::new(config.event_capacity);
        let sources = Arc::new(SourceRegistry::new(
            config.sources.iter().map(|entry| entry.to_source()),
            bus.clone(),
        ));
        let zones = Arc::new(ZoneRegistry::new(
            config.zones.iter().map(|entry| entry.to_zone()),
            bus,
        ));

        let (supervisor, observations) = Supervisor::new(config.restart_policy());
        let mut managed_units = Vec::new();
        let mut outputs: ZoneOutputs = HashMap::new();
        let mut local_zone = None;

        for entry in &config.sources {
            let spec = entry.process();
            if let Some(backend) = backend_for(&spec, &system) {
                info!(source = %entry.id, process = %backend.describe(), "supervising source");
                supervisor.register(EntityId::Source(entry.id.as_str().into()), backend);
            }
            managed_units.extend(spec.unit().map(str::to_string));
        }

        for entry in &config.zones {
            let zone = ZoneId::new(entry.id.as_str());
            let spec = entry.process();
            if let Some(backend) = backend_for(&spec, &system) {
                info!(zone = %zone, process = %backend.describe(), "supervising zone client");
                supervisor.register(EntityId::Zone(zone.clone()), backend);
            }
            managed_units.extend(spec.unit().map(str::to_string));
            if entry.local {
                outputs.insert(
                    zone.clone(),
                    Arc::new(AmixerOutput::new(system.amixer.clone())),
                );
                local_zone = Some(zone);
            }
        }

        let engine = Engine::spawn(
            config.engine_config(),
            sources.clone(),
            zones.clone(),
            supervisor,
            observations,
            outputs,
        );

        let mut ctx = ApiContext::new(engine.clone(), sources, zones, system, Arc::new(settings))
            .with_services(config.server.services.clone())
            .with_managed_units(managed_units);
        if let Some(zone) = local_zone {
            ctx = ctx.with_local_zone(zone);
        }

        let server = match ControlServer::start(config.server.host, config.server.port_range, ctx)
            .await
        {
            Ok(server) => server,
            Err(err) => {
                engine.shutdown().await;
                return Err(err).context("Failed to start control API");
            }
        };

        Ok(Self { server, engine })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Stop serving, then stop every process the engine started
    pub async fn shutdown(self) {
        self.server.shutdown().await;
        self.engine.shutdown().await;
        info!("audiopi stopped");
    }
}

/// Run until SIGINT or SIGTERM
pub async fn run(config: &DaemonConfig) -> Result<()> {
    let daemon = Daemon::start(config).await?;
    info!(addr = %daemon.local_addr(), "audiopi ready");

    shutdown_signal().await?;
    info!("shutdown requested");

    daemon.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C"),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use system_control::testing::ScriptedRunner;

    fn output() -> (AmixerOutput, ScriptedRunner) {
        let runner = ScriptedRunner::new();
        let amixer = Amixer::new(Arc::new(runner.clone()), 0, "PCM");
        (AmixerOutput::new(amixer), runner)
    }

    #[tokio::test]
    async fn test_output_writes_level() {
        let (output, runner) = output();
        output.apply(100, false).await.unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["/usr/bin/amixer -c 0 set PCM 4.00dB unmute"]
        );
    }

    #[tokio::test]
    async fn test_output_mutes_for_zero_and_mute() {
        let (output, runner) = output();
        output.apply(0, false).await.unwrap();
        output.apply(70, true).await.unwrap();
        assert_eq!(
            runner.command_lines(),
            vec![
                "/usr/bin/amixer -c 0 set PCM mute",
                "/usr/bin/amixer -c 0 set PCM mute"
            ]
        );
    }

    #[tokio::test]
    async fn test_output_reports_mixer_failure() {
        let (output, runner) = output();
        runner.respond(
            "/usr/bin/amixer",
            system_control::CommandOutput::failed(1, "Invalid card"),
        );
        let err = output.apply(40, false).await.unwrap_err();
        assert!(err.to_string().contains("Invalid card"));
    }

    #[test]
    fn test_backend_per_process_spec() {
        let system = SystemControl::new(Arc::new(ScriptedRunner::new()), 0, "PCM");

        assert!(backend_for(&ProcessSpec::None, &system).is_none());
        assert_eq!(
            backend_for(&ProcessSpec::Unit("raspotify".into()), &system)
                .unwrap()
                .describe(),
            "systemd unit raspotify"
        );
        assert_eq!(
            backend_for(&ProcessSpec::Bluetooth, &system)
                .unwrap()
                .describe(),
            "bluetooth adapter"
        );
        assert!(backend_for(
            &ProcessSpec::Command {
                program: "/usr/bin/true".into(),
                args: vec![],
            },
            &system,
        )
        .is_some());
    }
}
