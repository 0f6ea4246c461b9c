//! Host controls: mixer, services, Wi-Fi, Bluetooth, device name, reboot

use std::collections::BTreeMap;
use std::convert::Infallible;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::reply::Response;
use warp::{Filter, Rejection};

use audiopi_orchestrator::Intent;
use audiopi_state::{SourceId, ZoneId};

use super::{json_body, with_context};
use crate::context::{ApiContext, SNAPCLIENT_UNIT, SNAPSERVER_UNIT};
use crate::error::ApiError;
use crate::reply;
use crate::settings::SettingsError;

/// `GET /api/state`
#[derive(Debug, Clone, Serialize)]
pub struct DeviceState {
    pub device_name: String,
    /// Master mixer level, absent when the mixer could not be read
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    pub audio: AudioInfo,
    /// Wi-Fi network in use
    pub wifi_ssid: Option<String>,
    /// Service name → `systemctl is-active`
    pub services: BTreeMap<String, String>,
    /// Service name → `systemctl is-enabled`
    pub enabled: BTreeMap<String, String>,
    pub active_source: Option<SourceId>,
    pub last_seq: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioInfo {
    pub card: u32,
    pub mixer: String,
    /// Playback limits in 0.01 dB steps
    pub limits: Option<(i64, i64)>,
}

#[derive(Debug, Deserialize)]
pub struct WifiConnect {
    pub ssid: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceName {
    pub name: String,
}

pub fn routes(
    ctx: ApiContext,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static {
    let state = warp::path!("api" / "state")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(device_state);

    let volume = warp::path!("api" / "volume" / i64)
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(set_volume);

    let wifi_scan = warp::path!("api" / "wifi" / "scan")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(wifi_scan);

    let wifi_connect = warp::path!("api" / "wifi" / "connect")
        .and(warp::post())
        .and(json_body::<WifiConnect>())
        .and(with_context(ctx.clone()))
        .and_then(wifi_connect);

    let bt_devices = warp::path!("api" / "bluetooth" / "devices")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(bluetooth_devices);

    let bt_toggle = warp::path!("api" / "bluetooth" / String / String)
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(bluetooth_toggle);

    let service = warp::path!("api" / "service" / String / String)
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(service_action);

    let multiroom = warp::path!("api" / "multiroom" / String)
        .and(warp::post())
        .and(with_context(ctx.clone()))
        .and_then(multiroom);

    let device_name = warp::path!("api" / "device-name")
        .and(warp::post())
        .and(json_body::<DeviceName>())
        .and(with_context(ctx.clone()))
        .and_then(set_device_name);

    let reboot = warp::path!("api" / "reboot")
        .and(warp::post())
        .and(with_context(ctx))
        .and_then(reboot);

    state
        .or(volume)
        .unify()
        .or(wifi_scan)
        .unify()
        .or(wifi_connect)
        .unify()
        .or(bt_devices)
        .unify()
        .or(bt_toggle)
        .unify()
        .or(service)
        .unify()
        .or(multiroom)
        .unify()
        .or(device_name)
        .unify()
        .or(reboot)
        .unify()
}

async fn device_state(ctx: ApiContext) -> Result<Response, Infallible> {
    let mixer = match ctx.system.amixer.status().await {
        Ok(status) => Some(status),
        Err(err) => {
            tracing::warn!(error = %err, "could not read mixer");
            None
        }
    };
    let wifi_ssid = ctx.system.nmcli.active_ssid().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read wifi connection");
        None
    });

    let lookups = ctx.services().iter().map(|(name, unit)| {
        let systemctl = &ctx.system.systemctl;
        async move {
            let status = systemctl
                .is_active(unit)
                .await
                .map(|s| s.to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            let enabled = systemctl
                .is_enabled(unit)
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            (name.clone(), status, enabled)
        }
    });
    let mut services = BTreeMap::new();
    let mut enabled = BTreeMap::new();
    for (name, status, is_enabled) in join_all(lookups).await {
        services.insert(name.clone(), status);
        enabled.insert(name, is_enabled);
    }

    let state = DeviceState {
        device_name: ctx.settings.device_name().await,
        volume: mixer.map(|status| status.volume),
        muted: mixer.map(|status| status.muted),
        audio: AudioInfo {
            card: ctx.system.amixer.card(),
            mixer: ctx.system.amixer.control().to_string(),
            limits: mixer.map(|status| status.limits),
        },
        wifi_ssid,
        services,
        enabled,
        active_source: ctx.sources.active_source().map(|s| s.id),
        last_seq: ctx.bus().last_seq(),
    };
    Ok(reply::ok(state))
}

async fn set_volume(level: i64, ctx: ApiContext) -> Result<Response, Infallible> {
    let result = match ctx.local_zone() {
        Some(zone) => set_zone_volume(&ctx, zone.clone(), level).await,
        None => ctx
            .system
            .amixer
            .set_volume_percent(level)
            .await
            .map(|applied| json!({ "volume": applied }))
            .map_err(ApiError::from),
    };
    Ok(reply::respond(result))
}

/// The local zone owns the mixer, so its volume goes through the engine
async fn set_zone_volume(
    ctx: &ApiContext,
    zone: ZoneId,
    level: i64,
) -> Result<serde_json::Value, ApiError> {
    let ack = ctx
        .engine
        .submit(Intent::SetVolume {
            zone: zone.clone(),
            level,
        })
        .await?;
    let volume = ctx.zones.get_zone(&zone)?.volume;
    Ok(json!({
        "volume": volume,
        "zone": zone,
        "correlation_id": ack.correlation_id,
    }))
}

async fn wifi_scan(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::respond(
        ctx.system.nmcli.scan().await.map_err(ApiError::from),
    ))
}

async fn wifi_connect(body: WifiConnect, ctx: ApiContext) -> Result<Response, Infallible> {
    if body.ssid.trim().is_empty() {
        return Ok(reply::error(ApiError::validation("ssid must not be empty")));
    }
    let result = ctx
        .system
        .nmcli
        .connect(&body.ssid, body.password.as_deref())
        .await
        .map(|message| json!({ "ssid": body.ssid, "result": message }))
        .map_err(ApiError::from);
    Ok(reply::respond(result))
}

async fn bluetooth_devices(ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::respond(
        ctx.system.bluetooth.devices().await.map_err(ApiError::from),
    ))
}

async fn bluetooth_toggle(
    setting: String,
    value: String,
    ctx: ApiContext,
) -> Result<Response, Infallible> {
    let on = match value.as_str() {
        "on" => true,
        "off" => false,
        _ => return Ok(reply::error(ApiError::validation("state must be on or off"))),
    };
    let bluetooth = &ctx.system.bluetooth;
    let result = match setting.as_str() {
        "power" => bluetooth.power(on).await,
        "pairable" => bluetooth.pairable(on).await,
        "discoverable" => bluetooth.discoverable(on).await,
        _ => {
            return Ok(reply::error(ApiError::validation(
                "setting must be power, pairable or discoverable",
            )))
        }
    };
    Ok(reply::respond(
        result
            .map(|()| json!({ "setting": setting, "on": on }))
            .map_err(ApiError::from),
    ))
}

async fn service_action(name: String, action: String, ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::respond(run_service_action(&ctx, &name, &action).await))
}

async fn run_service_action(
    ctx: &ApiContext,
    name: &str,
    action: &str,
) -> Result<serde_json::Value, ApiError> {
    let unit = ctx
        .unit_for(name)
        .ok_or_else(|| ApiError::validation(format!("Invalid service: {}", name)))?;
    if !matches!(action, "start" | "stop" | "restart") {
        return Err(ApiError::validation("action must be start, stop or restart"));
    }
    if ctx.is_managed(unit) {
        return Err(ApiError::conflict(format!(
            "{} is managed by the daemon; submit an intent instead",
            unit
        )));
    }

    let systemctl = &ctx.system.systemctl;
    match action {
        "start" => systemctl.start(unit).await?,
        "stop" => systemctl.stop(unit).await?,
        _ => systemctl.restart(unit).await?,
    }
    tracing::info!(service = name, unit, action, "service action applied");

    let status = systemctl.is_active(unit).await?;
    Ok(json!({ "service": name, "unit": unit, "status": status }))
}

async fn multiroom(mode: String, ctx: ApiContext) -> Result<Response, Infallible> {
    Ok(reply::respond(apply_multiroom(&ctx, &mode).await))
}

/// `server` runs snapserver only, `client` runs snapclient only, `off` neither
async fn apply_multiroom(ctx: &ApiContext, mode: &str) -> Result<serde_json::Value, ApiError> {
    let (enable, disable): (&[&str], &[&str]) = match mode {
        "server" => (&[SNAPSERVER_UNIT], &[SNAPCLIENT_UNIT]),
        "client" => (&[SNAPCLIENT_UNIT], &[SNAPSERVER_UNIT]),
        "off" => (&[], &[SNAPSERVER_UNIT, SNAPCLIENT_UNIT]),
        _ => return Err(ApiError::validation("mode must be server, client, or off")),
    };
    if let Some(unit) = enable.iter().chain(disable).find(|u| ctx.is_managed(u)) {
        return Err(ApiError::conflict(format!("{} is managed by the daemon", unit)));
    }

    let systemctl = &ctx.system.systemctl;
    for unit in enable {
        systemctl.enable_now(unit).await?;
    }
    for unit in disable {
        systemctl.disable_now(unit).await?;
    }
    tracing::info!(mode, "multiroom mode applied");

    Ok(json!({
        "mode": mode,
        "snapserver": systemctl.is_active(SNAPSERVER_UNIT).await?,
        "snapclient": systemctl.is_active(SNAPCLIENT_UNIT).await?,
        "enabled": {
            "snapserver": systemctl.is_enabled(SNAPSERVER_UNIT).await?,
            "snapclient": systemctl.is_enabled(SNAPCLIENT_UNIT).await?,
        }
    }))
}

async fn set_device_name(body: DeviceName, ctx: ApiContext) -> Result<Response, Infallible> {
    let result = match ctx.settings.set_device_name(&body.name).await {
        Ok(name) => Ok(json!({ "device_name": name })),
        Err(SettingsError::Invalid(message)) => Err(ApiError::validation(message)),
        Err(SettingsError::Storage(err)) => Err(ApiError::from(err)),
    };
    Ok(reply::respond(result))
}

async fn reboot(ctx: ApiContext) -> Result<Response, Infallible> {
    tracing::warn!("reboot requested");
    Ok(reply::respond(
        ctx.system
            .reboot()
            .await
            .map(|()| json!({ "rebooting": true }))
            .map_err(ApiError::from),
    ))
}
