//! The daemon wired end to end over scripted OS commands

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use audiopi::{Daemon, DaemonConfig};
use system_control::testing::ScriptedRunner;
use system_control::CommandOutput;

fn config(dir: &TempDir) -> DaemonConfig {
    let mut config = DaemonConfig::from_toml_str(
        r#"
        [server]
        port_range = [0, 0]

        [[sources]]
        id = "airplay"
        kind = "airplay"
        name = "AirPlay"

        [[sources]]
        id = "turntable"
        kind = "line-in"

        [[zones]]
        id = "living-room"
        name = "Living Room"
        local = true

        [[zones]]
        id = "garden"
        name = "Garden"
        volume = 20
        "#,
    )
    .unwrap();
    config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.settings_path = dir.path().join("settings.json");
    config.validate().unwrap();
    config
}

fn runner() -> ScriptedRunner {
    let runner = ScriptedRunner::new();
    runner.respond("/usr/bin/systemctl is-active", CommandOutput::ok("active\n"));
    runner
}

async fn post_intent(client: &reqwest::Client, base: &str, intent: Value) -> Value {
    client
        .post(format!("{}/api/intents", base))
        .json(&intent)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_daemon_serves_configured_state() {
    let dir = TempDir::new().unwrap();
    let runner = runner();
    let daemon = Daemon::start_with_runner(&config(&dir), Arc::new(runner.clone()))
        .await
        .unwrap();
    let base = format!("http://{}", daemon.local_addr());
    let client = reqwest::Client::new();

    // Any intent is processed after the zone clients were started
    let ack = post_intent(
        &client,
        &base,
        json!({"type": "activate_source", "source": "airplay"}),
    )
    .await;
    assert_eq!(ack["ok"], true);

    let sources: Value = client
        .get(format!("{}/api/sources", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let airplay = sources["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == "airplay")
        .unwrap();
    assert_eq!(airplay["state"], "active");

    let zone: Value = client
        .get(format!("{}/api/zones/living-room", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(zone["data"]["health"], "online");

    let garden: Value = client
        .get(format!("{}/api/zones/garden", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(garden["data"]["volume"], 20);

    let lines = runner.command_lines();
    assert!(lines.contains(&"/usr/bin/systemctl start snapclient".to_string()));
    assert!(lines.contains(&"/usr/bin/systemctl start shairport-sync".to_string()));

    daemon.shutdown().await;
    let lines = runner.command_lines();
    assert!(lines.contains(&"/usr/bin/systemctl stop shairport-sync".to_string()));
    assert!(lines.contains(&"/usr/bin/systemctl stop snapclient".to_string()));
}

#[tokio::test]
async fn test_local_zone_volume_reaches_mixer() {
    let dir = TempDir::new().unwrap();
    let runner = runner();
    let daemon = Daemon::start_with_runner(&config(&dir), Arc::new(runner.clone()))
        .await
        .unwrap();
    let base = format!("http://{}", daemon.local_addr());
    let client = reqwest::Client::new();

    let ack = post_intent(
        &client,
        &base,
        json!({"type": "set_volume", "zone": "living-room", "level": 100}),
    )
    .await;
    assert_eq!(ack["ok"], true);
    assert!(runner
        .command_lines()
        .contains(&"/usr/bin/amixer -c 0 set PCM 4.00dB unmute".to_string()));

    // Remote zones are bookkeeping only
    runner.clear();
    let ack = post_intent(
        &client,
        &base,
        json!({"type": "set_volume", "zone": "garden", "level": 80}),
    )
    .await;
    assert_eq!(ack["ok"], true);
    assert!(!runner
        .command_lines()
        .iter()
        .any(|line| line.starts_with("/usr/bin/amixer")));

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_master_volume_updates_local_zone() {
    let dir = TempDir::new().unwrap();
    let runner = runner();
    let daemon = Daemon::start_with_runner(&config(&dir), Arc::new(runner.clone()))
        .await
        .unwrap();
    let base = format!("http://{}", daemon.local_addr());
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("{}/api/volume/30", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["volume"], 30);
    assert!(runner
        .command_lines()
        .contains(&"/usr/bin/amixer -c 0 set PCM -23.78dB unmute".to_string()));

    let zone: Value = client
        .get(format!("{}/api/zones/living-room", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(zone["data"]["volume"], 30);

    let history: Value = client
        .get(format!("{}/api/events/history?since=0", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = history["data"]["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|event| event["type"] == "zone_volume_changed" && event["zone"] == "living-room"));

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_supervised_units_refused_by_service_route() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::start_with_runner(&config(&dir), Arc::new(runner()))
        .await
        .unwrap();
    let base = format!("http://{}", daemon.local_addr());

    let response = reqwest::Client::new()
        .post(format!("{}/api/service/airplay/stop", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    daemon.shutdown().await;
}

#[tokio::test]
async fn test_broken_settings_file_fails_startup() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    std::fs::write(&config.settings_path, "{ not json").unwrap();

    let result = Daemon::start_with_runner(&config, Arc::new(runner())).await;

    let err = result.err().expect("startup should fail");
    assert!(format!("{:#}", err).contains("settings"));
}
