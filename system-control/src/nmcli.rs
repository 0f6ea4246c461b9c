//! Wi-Fi management through NetworkManager's `nmcli`

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ControlError;
use crate::runner::{CommandRunner, Invocation};

const NMCLI: &str = "/usr/bin/nmcli";

/// A network seen in a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiNetwork {
    pub ssid: String,
    /// Signal strength 0..=100
    pub signal: u8,
    pub security: String,
}

/// Split one terse (`-t`) nmcli line on unescaped colons.
///
/// nmcli escapes `:` and `\` inside values with a backslash.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse `nmcli -t -f SSID,SIGNAL,SECURITY dev wifi list`.
///
/// Hidden networks (empty SSID) are skipped, each SSID is kept once with
/// its strongest signal and the result is sorted strongest first.
pub fn parse_scan(output: &str) -> Vec<WifiNetwork> {
    let mut best: HashMap<String, WifiNetwork> = HashMap::new();

    for line in output.lines() {
        let fields = split_terse(line);
        if fields.len() < 3 {
            continue;
        }
        let ssid = fields[0].trim();
        if ssid.is_empty() {
            continue;
        }
        let signal = fields[1].trim().parse::<u8>().unwrap_or(0).min(100);
        let network = WifiNetwork {
            ssid: ssid.to_string(),
            signal,
            security: fields[2].trim().to_string(),
        };
        match best.get(ssid) {
            Some(existing) if existing.signal >= signal => {}
            _ => {
                best.insert(network.ssid.clone(), network);
            }
        }
    }

    let mut networks: Vec<WifiNetwork> = best.into_values().collect();
    networks.sort_by(|a, b| b.signal.cmp(&a.signal).then_with(|| a.ssid.cmp(&b.ssid)));
    networks
}

/// Thin client over `nmcli`
#[derive(Debug, Clone)]
pub struct Nmcli {
    runner: Arc<dyn CommandRunner>,
}

impl Nmcli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Scan for networks
    pub async fn scan(&self) -> Result<Vec<WifiNetwork>, ControlError> {
        let invocation = Invocation::new(NMCLI)
            .args(["-t", "-f", "SSID,SIGNAL,SECURITY", "dev", "wifi", "list"])
            .privileged();
        let output = self.runner.run(&invocation).await?.check(&invocation)?;
        let networks = parse_scan(&output.stdout);
        tracing::debug!(count = networks.len(), "wifi scan complete");
        Ok(networks)
    }

    /// Join `ssid`, with a password for secured networks. Returns nmcli's
    /// confirmation line.
    pub async fn connect(&self, ssid: &str, password: Option<&str>) -> Result<String, ControlError> {
        let mut invocation = Invocation::new(NMCLI).args(["dev", "wifi", "connect", ssid]);
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            invocation = invocation.args(["password", password]);
        }
        let invocation = invocation.privileged();
        let output = self
            .runner
            .run(&invocation)
            .await?
            .check(&invocation)
            .map_err(|err| match err {
                // keep the password out of error messages
                ControlError::CommandFailed { code, stderr, .. } => ControlError::CommandFailed {
                    command: format!("{} dev wifi connect {}", NMCLI, ssid),
                    code,
                    stderr,
                },
                other => other,
            })?;
        tracing::info!(ssid, "joined wifi network");
        Ok(output.stdout.trim().to_string())
    }

    /// SSID of the network currently in use, if any
    pub async fn active_ssid(&self) -> Result<Option<String>, ControlError> {
        let invocation = Invocation::new(NMCLI).args(["-t", "-f", "ACTIVE,SSID", "dev", "wifi"]);
        let output = self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(output.stdout.lines().find_map(|line| {
            let fields = split_terse(line);
            match fields.as_slice() {
                [active, ssid, ..] if active == "yes" && !ssid.is_empty() => Some(ssid.clone()),
                _ => None,
            }
        }))
    }
}
