//! Everything request handlers can reach

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use audiopi_orchestrator::EngineHandle;
use audiopi_state::{EventBus, SourceRegistry, ZoneId, ZoneRegistry};
use system_control::SystemControl;

use crate::settings::SettingsStore;

/// Units the service and multiroom routes toggle
pub const SNAPSERVER_UNIT: &str = "snapserver";
pub const SNAPCLIENT_UNIT: &str = "snapclient";

/// Shared, cheaply cloned handler state
#[derive(Clone)]
pub struct ApiContext {
    pub engine: EngineHandle,
    pub sources: Arc<SourceRegistry>,
    pub zones: Arc<ZoneRegistry>,
    pub system: Arc<SystemControl>,
    pub settings: Arc<SettingsStore>,
    services: Arc<BTreeMap<String, String>>,
    managed_units: Arc<BTreeSet<String>>,
    local_zone: Option<ZoneId>,
    closing: Arc<watch::Sender<bool>>,
}

impl ApiContext {
    pub fn new(
        engine: EngineHandle,
        sources: Arc<SourceRegistry>,
        zones: Arc<ZoneRegistry>,
        system: Arc<SystemControl>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            engine,
            sources,
            zones,
            system,
            settings,
            services: Arc::new(default_services()),
            managed_units: Arc::new(BTreeSet::new()),
            local_zone: None,
            closing: Arc::new(watch::channel(false).0),
        }
    }

    /// Replace the service name → unit allow-list
    pub fn with_services(mut self, services: BTreeMap<String, String>) -> Self {
        self.services = Arc::new(services);
        self
    }

    /// Units whose lifecycle the supervisor owns; direct service control is
    /// refused for them
    pub fn with_managed_units(mut self, units: impl IntoIterator<Item = String>) -> Self {
        self.managed_units = Arc::new(units.into_iter().collect());
        self
    }

    /// The zone this device plays; it owns the master mixer
    pub fn with_local_zone(mut self, zone: ZoneId) -> Self {
        self.local_zone = Some(zone);
        self
    }

    pub fn local_zone(&self) -> Option<&ZoneId> {
        self.local_zone.as_ref()
    }

    pub fn bus(&self) -> &EventBus {
        self.sources.bus()
    }

    pub fn services(&self) -> &BTreeMap<String, String> {
        &self.services
    }

    pub fn unit_for(&self, service: &str) -> Option<&str> {
        self.services.get(service).map(String::as_str)
    }

    pub fn is_managed(&self, unit: &str) -> bool {
        self.managed_units.contains(unit)
    }

    /// End every open event stream
    pub fn close(&self) {
        self.closing.send_replace(true);
    }

    /// Resolves once [`close`](Self::close) has been called
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut closing = self.closing.subscribe();
        async move {
            let _ = closing.wait_for(|closed| *closed).await;
        }
    }
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("services", &self.services)
            .field("managed_units", &self.managed_units)
            .field("local_zone", &self.local_zone)
            .finish_non_exhaustive()
    }
}

/// Services the status page reports by default
pub fn default_services() -> BTreeMap<String, String> {
    [
        ("airplay", "shairport-sync"),
        ("bluetooth", "bluetooth"),
        ("snapclient", SNAPCLIENT_UNIT),
        ("snapserver", SNAPSERVER_UNIT),
        ("spotify", "raspotify"),
    ]
    .into_iter()
    .map(|(name, unit)| (name.to_string(), unit.to_string()))
    .collect()
}
