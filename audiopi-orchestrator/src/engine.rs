//! The orchestration engine
//!
//! All intents go through one bounded queue consumed by a single task, so
//! state transitions happen in a total order and no two activations can
//! race. The same task folds in the supervisor's observations between
//! intents; it is the only writer of either registry.
//!
//! ```text
//! EngineHandle::submit ──► queue ──► engine task ──► SourceRegistry / ZoneRegistry
//!                                      ▲    │
//!            SupervisorEvent ──────────┘    └──► Supervisor (start/stop, bounded)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use audiopi_state::{
    CorrelationId, EntityId, EventBus, GroupId, SourceId, SourceRegistry, SourceState,
    ZoneHealth, ZoneId, ZoneRegistry,
};
use audiopi_supervisor::{ProcessState, Supervisor, SupervisorEvent};

use crate::config::EngineConfig;
use crate::error::{OrchestrationError, Result};
use crate::intent::{Ack, Intent, IntentRequest};
use crate::output::ZoneOutput;

/// Hardware outputs keyed by the zone they drive
pub type ZoneOutputs = HashMap<ZoneId, Arc<dyn ZoneOutput>>;

/// Commands sent from handles to the engine task
enum Command {
    Submit {
        request: IntentRequest,
        reply: oneshot::Sender<Result<Ack>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// The engine task's state
pub struct Engine {
    config: EngineConfig,
    sources: Arc<SourceRegistry>,
    zones: Arc<ZoneRegistry>,
    supervisor: Supervisor,
    outputs: ZoneOutputs,
    bus: EventBus,
}

impl Engine {
    /// Spawn the engine task.
    ///
    /// Both registries must publish on the same [`EventBus`]; the engine
    /// counts an intent's events from its sequence numbers. Every zone with
    /// a registered process is started before the first intent is taken.
    pub fn spawn(
        config: EngineConfig,
        sources: Arc<SourceRegistry>,
        zones: Arc<ZoneRegistry>,
        supervisor: Supervisor,
        observations: mpsc::UnboundedReceiver<SupervisorEvent>,
        outputs: ZoneOutputs,
    ) -> EngineHandle {
        let (commands, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let bus = sources.bus().clone();
        let engine = Engine {
            config,
            sources,
            zones,
            supervisor,
            outputs,
            bus,
        };
        let task = tokio::spawn(engine.run(receiver, observations));

        EngineHandle {
            commands,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut observations: mpsc::UnboundedReceiver<SupervisorEvent>,
    ) {
        self.start_zones().await;
        tracing::info!("orchestration engine started");

        loop {
            tokio::select! {
                biased;

                Some(observation) = observations.recv() => self.observe(observation),

                command = commands.recv() => match command {
                    Some(Command::Submit { request, reply }) => {
                        // Observations that arrived while the previous intent
                        // ran describe the world this intent acts on
                        while let Ok(observation) = observations.try_recv() {
                            self.observe(observation);
                        }
                        let result = self.apply(request).await;
                        // Submitter may have given up waiting
                        let _ = reply.send(result);
                    }
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
            }
        }

        tracing::info!("orchestration engine stopped");
    }

    async fn apply(&mut self, request: IntentRequest) -> Result<Ack> {
        let correlation_id = request.correlation_id.unwrap_or_default();
        let intent = request.intent;
        intent.validate()?;

        let before = self.bus.last_seq();
        tracing::debug!(intent = intent.name(), correlation = %correlation_id, "applying intent");

        let result = match &intent {
            Intent::ActivateSource { source } => self.activate_source(source, correlation_id).await,
            Intent::DeactivateSource { source } => {
                self.deactivate_source(source, correlation_id).await
            }
            Intent::SetVolume { zone, level } => self.set_volume(zone, *level, correlation_id).await,
            Intent::SetMute { zone, muted } => self.set_mute(zone, *muted, correlation_id).await,
            Intent::JoinGroup { zone, group } => self
                .zones
                .join_group(zone, group, Some(correlation_id))
                .map(drop)
                .map_err(Into::into),
            Intent::LeaveGroup { zone } => self
                .zones
                .leave_group(zone, Some(correlation_id))
                .map(drop)
                .map_err(Into::into),
            Intent::SetGroupVolume { group, level } => {
                self.set_group_volume(group, *level, correlation_id).await
            }
            Intent::RegisterZone { zone, name } => {
                self.register_zone(zone, name, correlation_id).await
            }
        };

        match result {
            Ok(()) => Ok(Ack {
                correlation_id,
                events: self.bus.last_seq() - before,
            }),
            Err(err) => {
                tracing::warn!(intent = intent.name(), correlation = %correlation_id, error = %err, "intent failed");
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    async fn activate_source(&mut self, id: &SourceId, correlation_id: CorrelationId) -> Result<()> {
        let source = self.sources.get_source(id)?;
        if source.is_active() {
            return Ok(());
        }

        if !source.mixable {
            if let Some(active) = self.sources.active_source() {
                // A source that will not stop must not block the switch
                if let Err(err) = self.stop_source(&active.id, correlation_id).await {
                    tracing::warn!(source = %active.id, error = %err, "forced previous source to failed");
                }
            }
        }

        let corr = Some(correlation_id);
        self.sources.set_state(id, SourceState::Starting, None, corr)?;

        match self.start_process(&EntityId::Source(id.clone())).await {
            Ok(()) => {
                self.sources.set_state(id, SourceState::Active, None, corr)?;
                tracing::info!(source = %id, "source activated");
                Ok(())
            }
            Err(err) => {
                self.sources
                    .set_state(id, SourceState::Failed, Some(err.to_string()), corr)?;
                Err(err)
            }
        }
    }

    async fn deactivate_source(&mut self, id: &SourceId, correlation_id: CorrelationId) -> Result<()> {
        let source = self.sources.get_source(id)?;
        if !source.is_active() {
            return Ok(());
        }
        self.stop_source(id, correlation_id).await
    }

    /// Active -> Stopping -> Idle, or Failed when the process will not stop in time
    async fn stop_source(&mut self, id: &SourceId, correlation_id: CorrelationId) -> Result<()> {
        let corr = Some(correlation_id);
        self.sources.set_state(id, SourceState::Stopping, None, corr)?;

        match self.stop_process(&EntityId::Source(id.clone())).await {
            Ok(()) => {
                self.sources.set_state(id, SourceState::Idle, None, corr)?;
                tracing::info!(source = %id, "source deactivated");
                Ok(())
            }
            Err(err) => {
                self.sources
                    .set_state(id, SourceState::Failed, Some(err.to_string()), corr)?;
                Err(err)
            }
        }
    }

    /// Start the entity's process within the activation timeout.
    ///
    /// Entities without a registered process (line-in, remote zones) have
    /// nothing to start.
    async fn start_process(&self, entity: &EntityId) -> Result<()> {
        if !self.supervisor.is_registered(entity) {
            return Ok(());
        }
        let timeout = self.config.activation_timeout;
        match tokio::time::timeout(timeout, self.supervisor.start(entity)).await {
            Ok(Ok(_handle)) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                self.stop_in_background(entity.clone());
                Err(OrchestrationError::Timeout {
                    entity: entity.clone(),
                    action: "start",
                    timeout,
                })
            }
        }
    }

    async fn stop_process(&self, entity: &EntityId) -> Result<()> {
        if !self.supervisor.is_registered(entity) {
            return Ok(());
        }
        let timeout = self.config.deactivation_timeout;
        match tokio::time::timeout(timeout, self.supervisor.stop(entity)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(OrchestrationError::Timeout {
                entity: entity.clone(),
                action: "stop",
                timeout,
            }),
        }
    }

    /// Let a late start finish and then take the process down
    fn stop_in_background(&self, entity: EntityId) {
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            if let Err(err) = supervisor.stop(&entity).await {
                tracing::warn!(entity = %entity, error = %err, "cleanup stop failed");
            }
        });
    }

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    async fn set_volume(&mut self, id: &ZoneId, level: i64, correlation_id: CorrelationId) -> Result<()> {
        let zone = self.zones.get_zone(id)?;
        let volume = level.clamp(0, 100) as u8;
        if zone.volume != volume {
            self.apply_output(id, volume, zone.muted).await?;
        }
        self.zones.set_volume(id, level, Some(correlation_id))?;
        Ok(())
    }

    async fn set_mute(&mut self, id: &ZoneId, muted: bool, correlation_id: CorrelationId) -> Result<()> {
        let zone = self.zones.get_zone(id)?;
        if zone.muted != muted {
            self.apply_output(id, zone.volume, muted).await?;
        }
        self.zones.set_mute(id, muted, Some(correlation_id))?;
        Ok(())
    }

    async fn set_group_volume(
        &mut self,
        group: &GroupId,
        level: i64,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        let members = self.zones.get_group(group)?.members;
        let volume = level.clamp(0, 100) as u8;

        // Hardware first; on failure put back what was already changed
        let mut applied = Vec::new();
        for member in &members {
            let zone = self.zones.get_zone(member)?;
            if zone.volume == volume || !self.outputs.contains_key(member) {
                continue;
            }
            if let Err(err) = self.apply_output(member, volume, zone.muted).await {
                for previous in applied {
                    if let Err(revert) = self.revert_output(&previous).await {
                        tracing::warn!(zone = %previous.id, error = %revert, "could not revert zone output");
                    }
                }
                return Err(err);
            }
            applied.push(zone);
        }

        self.zones
            .set_group_volume(group, level, Some(correlation_id))?;
        Ok(())
    }

    /// A supervised zone client is only Online once its process runs
    async fn register_zone(
        &mut self,
        id: &ZoneId,
        name: &str,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        let corr = Some(correlation_id);
        let entity = EntityId::Zone(id.clone());
        if self.supervisor.is_registered(&entity) {
            if let Err(err) = self.start_process(&entity).await {
                tracing::warn!(zone = %id, error = %err, "zone client failed to start");
                self.zones.mark_health(id, ZoneHealth::Offline, corr)?;
                return Err(err);
            }
        }
        self.zones.register_zone(id, name, corr)?;
        Ok(())
    }

    async fn apply_output(&self, id: &ZoneId, volume: u8, muted: bool) -> Result<()> {
        let Some(output) = self.outputs.get(id) else {
            return Ok(());
        };
        output.apply(volume, muted).await.map_err(|err| {
            OrchestrationError::ProcessFailure(format!("mixer for zone {}: {}", id, err))
        })
    }

    async fn revert_output(&self, zone: &audiopi_state::Zone) -> Result<()> {
        self.apply_output(&zone.id, zone.volume, zone.muted).await
    }

    /// Start every zone client the supervisor manages
    async fn start_zones(&mut self) {
        for zone in self.zones.list_zones() {
            let entity = EntityId::Zone(zone.id.clone());
            if !self.supervisor.is_registered(&entity) {
                continue;
            }
            let health = match self.start_process(&entity).await {
                Ok(()) => ZoneHealth::Online,
                Err(err) => {
                    tracing::warn!(zone = %zone.id, error = %err, "zone client failed to start");
                    ZoneHealth::Offline
                }
            };
            if let Err(err) = self.zones.mark_health(&zone.id, health, None) {
                tracing::warn!(zone = %zone.id, error = %err, "could not record zone health");
            }
        }
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    fn observe(&mut self, observation: SupervisorEvent) {
        let SupervisorEvent {
            entity,
            state,
            error,
        } = observation;

        let result = match (&entity, state) {
            (EntityId::Zone(zone), ProcessState::Crashed) => {
                self.zones.mark_health(zone, ZoneHealth::Degraded, None).map(drop)
            }
            (EntityId::Zone(zone), ProcessState::Running) => {
                self.zones.mark_health(zone, ZoneHealth::Online, None).map(drop)
            }
            (EntityId::Zone(zone), ProcessState::Failed) => {
                self.zones.mark_health(zone, ZoneHealth::Offline, None).map(drop)
            }
            (EntityId::Source(source), ProcessState::Failed) => self
                .sources
                .set_state(source, SourceState::Failed, error.clone(), None)
                .map(drop),
            _ => {
                tracing::debug!(entity = %entity, state = %state, error = ?error, "observation");
                Ok(())
            }
        };

        if let Err(err) = result {
            tracing::warn!(entity = %entity, state = %state, error = %err, "observation not applied");
        }
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    async fn shutdown(&mut self) {
        tracing::info!("stopping sources and zones");
        let correlation_id = CorrelationId::new();
        for source in self.sources.list_sources() {
            if source.is_active() {
                if let Err(err) = self.stop_source(&source.id, correlation_id).await {
                    tracing::warn!(source = %source.id, error = %err, "source did not stop cleanly");
                }
            }
        }
        for zone in self.zones.list_zones() {
            let entity = EntityId::Zone(zone.id.clone());
            if let Err(err) = self.stop_process(&entity).await {
                tracing::warn!(zone = %zone.id, error = %err, "zone client did not stop cleanly");
            }
        }
        self.supervisor.shutdown().await;
    }
}

/// Cloneable front door to the engine task
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineHandle {
    /// Queue an intent and wait for its outcome.
    ///
    /// Waits for room when the queue is full. Fails with
    /// [`OrchestrationError::Stopped`] once the engine has shut down.
    pub async fn submit(&self, request: impl Into<IntentRequest>) -> Result<Ack> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                request: request.into(),
                reply,
            })
            .await
            .map_err(|_| OrchestrationError::Stopped)?;
        outcome.await.map_err(|_| OrchestrationError::Stopped)?
    }

    /// Stop the active source and every zone client, then end the task.
    ///
    /// Intents queued before the call are still processed.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
        if let Some(task) = self.task.lock().await.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "engine task ended abnormally");
            }
        }
    }

    /// Whether the engine still accepts intents
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("running", &self.is_running())
            .finish()
    }
}
