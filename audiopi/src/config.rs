//! Daemon configuration
//!
//! Layers are merged in order, later wins: compiled defaults,
//! `/etc/audiopi/config.toml`, `<config dir>/audiopi/config.toml`, then
//! `./audiopi.toml` or the file given with `--config`, and finally the
//! `AUDIOPI_*` environment variables. Tables merge key by key; arrays such as
//! `[[sources]]` replace the lower layer's array wholesale.
//!
//! ```toml
//! settings_path = "/etc/audiopi/settings.json"
//!
//! [server]
//! port_range = [8080, 8090]
//!
//! [mixer]
//! card = 0
//! control = "PCM"
//!
//! [[sources]]
//! id = "airplay"
//! kind = "airplay"
//! name = "AirPlay"
//!
//! [[zones]]
//! id = "living-room"
//! name = "Living Room"
//! local = true
//! ```

use std::collections::{BTreeMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{map::Map, Value};

use audiopi_orchestrator::EngineConfig;
use audiopi_state::logging::LoggingMode;
use audiopi_state::{Source, SourceKind, Zone, ZoneHealth, DEFAULT_EVENT_CAPACITY};
use audiopi_supervisor::{default_unit, RestartPolicy, ZONE_UNIT};

/// System-wide configuration file
pub const SYSTEM_CONFIG: &str = "/etc/audiopi/config.toml";

/// Working-directory override, used when no `--config` is given
pub const LOCAL_CONFIG: &str = "audiopi.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid {var} environment variable: `{value}`")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything the daemon reads at startup. Immutable once running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// `silent`, `development`, `debug` or `json`
    pub log_mode: String,
    /// Default `tracing` filter directives
    pub log_level: String,
    /// Persisted device settings (device name and friends)
    pub settings_path: PathBuf,
    /// Events kept for replay
    pub event_capacity: usize,
    pub server: ServerSection,
    pub engine: EngineSection,
    pub supervisor: SupervisorSection,
    pub mixer: MixerSection,
    pub sources: Vec<SourceEntry>,
    pub zones: Vec<ZoneEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: IpAddr,
    /// First free port in `[start, end]` is bound
    pub port_range: (u16, u16),
    /// Service name → systemd unit, for the status and service routes
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub queue_capacity: usize,
    pub activation_timeout_ms: u64,
    pub deactivation_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorSection {
    pub max_restarts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub health_interval_ms: u64,
    pub reset_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MixerSection {
    /// ALSA card index
    pub card: u32,
    /// Simple mixer control
    pub control: String,
    /// Prefix privileged commands with `sudo`
    pub sudo: bool,
    pub command_timeout_secs: u64,
}

/// A configured audio source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    pub id: String,
    pub kind: SourceKind,
    /// Display name; the id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub mixable: bool,
    /// systemd unit overriding the kind's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Foreground command run instead of a unit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// A configured playback zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// This device plays the zone: it runs the zone client and owns the mixer
    #[serde(default)]
    pub local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// How an entity's process is run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessSpec {
    /// Nothing to supervise; the entity is bookkeeping only
    None,
    Unit(String),
    /// The bluetooth unit plus adapter visibility
    Bluetooth,
    Command { program: String, args: Vec<String> },
}

impl ProcessSpec {
    fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(ProcessSpec::Command {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// The systemd unit behind this process, if any
    pub fn unit(&self) -> Option<&str> {
        match self {
            ProcessSpec::Unit(unit) => Some(unit),
            ProcessSpec::Bluetooth => default_unit(SourceKind::Bluetooth),
            ProcessSpec::None | ProcessSpec::Command { .. } => None,
        }
    }
}

impl SourceEntry {
    pub fn new(id: impl Into<String>, kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: Some(name.into()),
            mixable: false,
            unit: None,
            command: Vec::new(),
        }
    }

    pub fn process(&self) -> ProcessSpec {
        if let Some(spec) = ProcessSpec::from_command(&self.command) {
            return spec;
        }
        match (&self.unit, self.kind) {
            (Some(unit), _) => ProcessSpec::Unit(unit.clone()),
            (None, SourceKind::Bluetooth) => ProcessSpec::Bluetooth,
            (None, kind) => default_unit(kind)
                .map(|unit| ProcessSpec::Unit(unit.to_string()))
                .unwrap_or(ProcessSpec::None),
        }
    }

    pub fn to_source(&self) -> Source {
        Source::new(
            self.id.as_str(),
            self.kind,
            self.name.clone().unwrap_or_else(|| self.id.clone()),
        )
        .with_mixable(self.mixable)
    }
}

impl ZoneEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            local: false,
            volume: None,
            unit: None,
            command: Vec::new(),
        }
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn process(&self) -> ProcessSpec {
        if let Some(spec) = ProcessSpec::from_command(&self.command) {
            return spec;
        }
        match &self.unit {
            Some(unit) => ProcessSpec::Unit(unit.clone()),
            None if self.local => ProcessSpec::Unit(ZONE_UNIT.to_string()),
            None => ProcessSpec::None,
        }
    }

    /// Zones with a client process start Offline until it runs
    pub fn to_zone(&self) -> Zone {
        let health = match self.process() {
            ProcessSpec::None => ZoneHealth::Online,
            _ => ZoneHealth::Offline,
        };
        let zone = Zone::new(
            self.id.as_str(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
            health,
        );
        match self.volume {
            Some(volume) => zone.with_volume(volume),
            None => zone,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_mode: "development".to_string(),
            log_level: "info".to_string(),
            settings_path: PathBuf::from("/etc/audiopi/settings.json"),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            server: ServerSection::default(),
            engine: EngineSection::default(),
            supervisor: SupervisorSection::default(),
            mixer: MixerSection::default(),
            sources: vec![
                SourceEntry::new("airplay", SourceKind::Airplay, "AirPlay"),
                SourceEntry::new("spotify", SourceKind::Spotify, "Spotify Connect"),
                SourceEntry::new("bluetooth", SourceKind::Bluetooth, "Bluetooth"),
            ],
            zones: vec![ZoneEntry::new("local", "Audio-Pi").local()],
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port_range: (8080, 8090),
            services: control_server::default_services(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            queue_capacity: defaults.queue_capacity,
            activation_timeout_ms: millis(defaults.activation_timeout),
            deactivation_timeout_ms: millis(defaults.deactivation_timeout),
        }
    }
}

impl Default for SupervisorSection {
    fn default() -> Self {
        let defaults = RestartPolicy::default();
        Self {
            max_restarts: defaults.max_restarts,
            backoff_base_ms: millis(defaults.backoff_base),
            backoff_cap_ms: millis(defaults.backoff_cap),
            health_interval_ms: millis(defaults.health_interval),
            reset_after_secs: defaults.reset_after.as_secs(),
        }
    }
}

impl Default for MixerSection {
    fn default() -> Self {
        Self {
            card: 0,
            control: "PCM".to_string(),
            sudo: true,
            command_timeout_secs: 30,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl DaemonConfig {
    /// Load every layer, apply the environment and validate
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let paths = Self::search_paths(explicit);
        let mut config = Self::from_files(&paths, explicit)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Files consulted, lowest precedence first
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("audiopi").join("config.toml"));
        }
        paths.push(
            explicit
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG)),
        );
        paths
    }

    /// Merge `paths` over the defaults. Missing files are skipped, except
    /// `required`.
    pub fn from_files(paths: &[PathBuf], required: Option<&Path>) -> Result<Self> {
        let mut merged = Value::try_from(Self::default())?;
        for path in paths {
            let contents = match std::fs::read_to_string(path) {
                Ok(contents) => contents,
                Err(err)
                    if err.kind() == std::io::ErrorKind::NotFound
                        && required != Some(path.as_path()) =>
                {
                    tracing::trace!(path = %path.display(), "no configuration file");
                    continue;
                }
                Err(source) => {
                    return Err(ConfigError::Read {
                        path: path.clone(),
                        source,
                    })
                }
            };
            let layer = parse_layer(&contents, &path.display().to_string())?;
            tracing::debug!(path = %path.display(), "loaded configuration layer");
            merged = merge(merged, layer);
        }
        Self::from_value(merged)
    }

    /// One TOML document over the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let layer = parse_layer(contents, "inline configuration")?;
        Self::from_value(merge(Value::try_from(Self::default())?, layer))
    }

    fn from_value(value: Value) -> Result<Self> {
        value.try_into::<Self>().map_err(|source| ConfigError::Parse {
            origin: "merged configuration".to_string(),
            source,
        })
    }

    /// Apply `AUDIOPI_PORT`, `AUDIOPI_LOG_LEVEL`, `AUDIOPI_LOG_MODE` and
    /// `AUDIOPI_SUDO` as read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup("AUDIOPI_PORT") {
            let port = raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                var: "AUDIOPI_PORT",
                value: raw.clone(),
            })?;
            self.server.port_range = (port, port);
        }
        if let Some(level) = lookup("AUDIOPI_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(mode) = lookup("AUDIOPI_LOG_MODE") {
            self.log_mode = mode;
        }
        if let Some(raw) = lookup("AUDIOPI_SUDO") {
            self.mixer.sudo = parse_flag(&raw).ok_or(ConfigError::InvalidEnv {
                var: "AUDIOPI_SUDO",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.logging_mode()?;
        if self.event_capacity == 0 {
            return Err(invalid("event_capacity must be greater than 0"));
        }
        if self.settings_path.as_os_str().is_empty() {
            return Err(invalid("settings_path must not be empty"));
        }

        let (start, end) = self.server.port_range;
        if start > end {
            return Err(invalid(format!(
                "server.port_range start {} is above end {}",
                start, end
            )));
        }
        if self.mixer.command_timeout_secs == 0 {
            return Err(invalid("mixer.command_timeout_secs must be greater than 0"));
        }

        self.engine_config()
            .validate()
            .map_err(|err| invalid(format!("engine: {}", err)))?;
        self.restart_policy()
            .validate()
            .map_err(|err| invalid(format!("supervisor: {}", err)))?;

        check_ids("source", self.sources.iter().map(|s| s.id.as_str()))?;
        check_ids("zone", self.zones.iter().map(|z| z.id.as_str()))?;

        for source in &self.sources {
            if source.unit.is_some() && !source.command.is_empty() {
                return Err(invalid(format!(
                    "source `{}` sets both unit and command",
                    source.id
                )));
            }
        }
        for zone in &self.zones {
            if zone.unit.is_some() && !zone.command.is_empty() {
                return Err(invalid(format!("zone `{}` sets both unit and command", zone.id)));
            }
            if zone.volume.is_some_and(|volume| volume > 100) {
                return Err(invalid(format!("zone `{}` volume must be 0..=100", zone.id)));
            }
        }
        if self.zones.iter().filter(|zone| zone.local).count() > 1 {
            return Err(invalid("only one zone can be local"));
        }
        Ok(())
    }

    pub fn logging_mode(&self) -> Result<LoggingMode> {
        self.log_mode
            .parse()
            .map_err(|_| invalid(format!("unknown log_mode `{}`", self.log_mode)))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_queue_capacity(self.engine.queue_capacity)
            .with_activation_timeout(Duration::from_millis(self.engine.activation_timeout_ms))
            .with_deactivation_timeout(Duration::from_millis(self.engine.deactivation_timeout_ms))
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        let section = &self.supervisor;
        RestartPolicy::default()
            .with_max_restarts(section.max_restarts)
            .with_backoff(
                Duration::from_millis(section.backoff_base_ms),
                Duration::from_millis(section.backoff_cap_ms),
            )
            .with_health_interval(Duration::from_millis(section.health_interval_ms))
            .with_reset_after(Duration::from_secs(section.reset_after_secs))
    }

    /// The resolved configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn parse_layer(contents: &str, origin: &str) -> Result<Value> {
    contents
        .parse::<toml::Table>()
        .map(Value::Table)
        .map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn check_ids<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(invalid(format!("{} id must not be empty", what)));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {} id `{}`", what, id)));
        }
    }
    Ok(())
}

/// Deep-merge `overlay` onto `base`; overlay wins on conflicts
fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            let mut merged: Map<String, Value> = base;
            for (key, value) in overlay {
                let value = match merged.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port_range, (8080, 8090));
        assert_eq!(config.engine_config(), EngineConfig::default());
        assert_eq!(config.restart_policy(), RestartPolicy::default());
        assert_eq!(config.logging_mode().unwrap(), LoggingMode::Development);
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [mixer]
            control = "Master"

            [server.services]
            dlna = "gmediarender"
            "#,
        )
        .unwrap();

        assert_eq!(config.mixer.control, "Master");
        assert_eq!(config.mixer.card, 0);
        assert!(config.mixer.sudo);
        // Tables merge, so the default services survive
        assert_eq!(config.server.services["dlna"], "gmediarender");
        assert_eq!(config.server.services["airplay"], "shairport-sync");
        assert_eq!(config.sources.len(), 3);
    }

    #[test]
    fn test_source_array_replaces_defaults() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [[sources]]
            id = "turntable"
            kind = "line-in"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 1);
        let source = config.sources[0].to_source();
        assert_eq!(source.name, "turntable");
        assert_eq!(config.sources[0].process(), ProcessSpec::None);
    }

    #[test]
    fn test_later_files_win() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.toml");
        let local = dir.path().join("local.toml");
        std::fs::write(&system, "log_level = \"debug\"\n[mixer]\ncard = 1\n").unwrap();
        std::fs::write(&local, "[mixer]\ncard = 2\n").unwrap();
        let missing = dir.path().join("missing.toml");

        let config =
            DaemonConfig::from_files(&[system, missing, local.clone()], Some(&local)).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.mixer.card, 2);
    }

    #[test]
    fn test_required_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("audiopi.toml");

        let result = DaemonConfig::from_files(&[missing.clone()], Some(&missing));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nport_range = 1").unwrap();

        let err = DaemonConfig::from_files(&[path], None).unwrap_err();

        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = DaemonConfig::from_toml_str("[mixer]\nvolume = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DaemonConfig::default();
        config
            .apply_env(env(&[
                ("AUDIOPI_PORT", "9000"),
                ("AUDIOPI_LOG_LEVEL", "audiopi=trace"),
                ("AUDIOPI_SUDO", "no"),
            ]))
            .unwrap();

        assert_eq!(config.server.port_range, (9000, 9000));
        assert_eq!(config.log_level, "audiopi=trace");
        assert!(!config.mixer.sudo);
    }

    #[rstest]
    #[case("AUDIOPI_PORT", "http")]
    #[case("AUDIOPI_PORT", "70000")]
    #[case("AUDIOPI_SUDO", "maybe")]
    fn test_bad_env_values(#[case] var: &str, #[case] value: &str) {
        let mut config = DaemonConfig::default();
        let result = config.apply_env(env(&[(var, value)]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[rstest]
    #[case::port_range("[server]\nport_range = [9000, 8000]")]
    #[case::zero_capacity("event_capacity = 0")]
    #[case::zero_queue("[engine]\nqueue_capacity = 0")]
    #[case::zero_timeout("[engine]\nactivation_timeout_ms = 0")]
    #[case::zero_backoff("[supervisor]\nbackoff_base_ms = 0")]
    #[case::log_mode("log_mode = \"loud\"")]
    #[case::empty_id("[[sources]]\nid = \" \"\nkind = \"airplay\"")]
    #[case::duplicate_source(
        "[[sources]]\nid = \"a\"\nkind = \"airplay\"\n[[sources]]\nid = \"a\"\nkind = \"dlna\""
    )]
    #[case::duplicate_zone("[[zones]]\nid = \"z\"\n[[zones]]\nid = \"z\"")]
    #[case::two_local("[[zones]]\nid = \"a\"\nlocal = true\n[[zones]]\nid = \"b\"\nlocal = true")]
    #[case::unit_and_command(
        "[[sources]]\nid = \"a\"\nkind = \"dlna\"\nunit = \"x\"\ncommand = [\"y\"]"
    )]
    #[case::loud_zone("[[zones]]\nid = \"a\"\nvolume = 120")]
    fn test_invalid_configurations(#[case] document: &str) {
        let config = DaemonConfig::from_toml_str(document).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_process_resolution() {
        let airplay = SourceEntry::new("airplay", SourceKind::Airplay, "AirPlay");
        assert_eq!(airplay.process(), ProcessSpec::Unit("shairport-sync".into()));

        let bluetooth = SourceEntry::new("bt", SourceKind::Bluetooth, "BT");
        assert_eq!(bluetooth.process(), ProcessSpec::Bluetooth);
        assert_eq!(bluetooth.process().unit(), Some("bluetooth"));

        let mut custom = SourceEntry::new("radio", SourceKind::Dlna, "Radio");
        custom.command = vec!["/usr/bin/radio".into(), "--quiet".into()];
        assert_eq!(
            custom.process(),
            ProcessSpec::Command {
                program: "/usr/bin/radio".into(),
                args: vec!["--quiet".into()],
            }
        );

        assert_eq!(
            ZoneEntry::new("local", "Here").local().process(),
            ProcessSpec::Unit(ZONE_UNIT.into())
        );
        assert_eq!(ZoneEntry::new("remote", "There").process(), ProcessSpec::None);
    }

    #[test]
    fn test_zone_health_follows_process() {
        assert_eq!(
            ZoneEntry::new("local", "Here").local().to_zone().health,
            ZoneHealth::Offline
        );
        let mut remote = ZoneEntry::new("remote", "There");
        remote.volume = Some(30);
        let zone = remote.to_zone();
        assert_eq!(zone.health, ZoneHealth::Online);
        assert_eq!(zone.volume, 30);
    }

    #[test]
    fn test_rendered_config_loads_back() {
        let config = DaemonConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[mixer]"));
        assert_eq!(DaemonConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
