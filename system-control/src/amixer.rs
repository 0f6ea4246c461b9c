//! ALSA mixer control through `amixer`
//!
//! The mixer is driven in dB rather than raw percent: a UI level `v` in
//! 0..=100 is bent with a 0.6 exponent and spread over [`MIN_DB`]..=[`MAX_DB`],
//! which makes the low end of the slider usable on small speakers. Level 0
//! mutes the control instead of writing -50 dB.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ControlError;
use crate::runner::{CommandRunner, Invocation};

const AMIXER: &str = "/usr/bin/amixer";

/// dB written for UI level 1
pub const MIN_DB: f64 = -50.0;
/// dB written for UI level 100
pub const MAX_DB: f64 = 4.0;
/// Curve applied to the UI level before mapping to dB
pub const CURVE: f64 = 0.6;

/// Playback limits reported when `amixer` output has none, in 0.01 dB steps
pub const FALLBACK_LIMITS: (i64, i64) = (-5000, 400);

/// dB value for a UI level (1..=100)
pub fn db_for_level(level: u8) -> f64 {
    let x = (f64::from(level.min(100)) / 100.0).powf(CURVE);
    MIN_DB + x * (MAX_DB - MIN_DB)
}

/// UI level for a dB reading; inverse of [`db_for_level`]
pub fn level_for_db(db: f64) -> u8 {
    let db = db.clamp(MIN_DB, MAX_DB);
    let x = (db - MIN_DB) / (MAX_DB - MIN_DB);
    (x.powf(1.0 / CURVE) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// First `[-12.34dB]` field in `amixer get` output
pub fn parse_db(output: &str) -> Option<f64> {
    bracketed(output)
        .filter_map(|field| field.strip_suffix("dB"))
        .find_map(|value| value.parse::<f64>().ok())
}

/// First `[57%]` field in `amixer get` output
pub fn parse_percent(output: &str) -> Option<u8> {
    bracketed(output)
        .filter_map(|field| field.strip_suffix('%'))
        .find_map(|value| value.parse::<u8>().ok())
        .map(|value| value.min(100))
}

/// Whether `amixer get` output reports the control as switched off
pub fn parse_muted(output: &str) -> bool {
    bracketed(output).any(|field| field == "off")
}

/// `Limits: Playback -5000 - 400`, in 0.01 dB steps
pub fn parse_limits(output: &str) -> Option<(i64, i64)> {
    let rest = output.split("Limits:").nth(1)?;
    let rest = rest.trim_start().strip_prefix("Playback")?.trim_start();
    // "-5000 - 400"; the first number may itself carry a minus sign
    let (low, high) = match rest.strip_prefix('-') {
        Some(tail) => {
            let (low, high) = tail.split_once(" - ")?;
            (format!("-{}", low.trim()), high)
        }
        None => {
            let (low, high) = rest.split_once(" - ")?;
            (low.trim().to_string(), high)
        }
    };
    let high = high.split_whitespace().next()?;
    Some((low.parse().ok()?, high.parse().ok()?))
}

/// One reading of the control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MixerStatus {
    pub volume: u8,
    pub muted: bool,
    /// Playback limits in 0.01 dB steps
    pub limits: (i64, i64),
}

impl MixerStatus {
    pub fn parse(output: &str) -> Self {
        let muted = parse_muted(output);
        let volume = if muted {
            0
        } else {
            parse_db(output)
                .map(level_for_db)
                .or_else(|| parse_percent(output))
                .unwrap_or(0)
        };
        Self {
            volume,
            muted,
            limits: parse_limits(output).unwrap_or(FALLBACK_LIMITS),
        }
    }
}

fn bracketed(output: &str) -> impl Iterator<Item = &str> {
    output
        .split('[')
        .skip(1)
        .filter_map(|chunk| chunk.split_once(']').map(|(field, _)| field))
}

/// One simple mixer control on one card
#[derive(Debug, Clone)]
pub struct Amixer {
    runner: Arc<dyn CommandRunner>,
    card: u32,
    control: String,
}

impl Amixer {
    pub fn new(runner: Arc<dyn CommandRunner>, card: u32, control: impl Into<String>) -> Self {
        Self {
            runner,
            card,
            control: control.into(),
        }
    }

    pub fn card(&self) -> u32 {
        self.card
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    /// Current level on the 0..=100 UI scale.
    ///
    /// Prefers the dB field and falls back to amixer's own percent; a muted
    /// control reads as 0.
    pub async fn volume_percent(&self) -> Result<u8, ControlError> {
        Ok(self.status().await?.volume)
    }

    /// Level, switch and limits from one `amixer get`
    pub async fn status(&self) -> Result<MixerStatus, ControlError> {
        Ok(MixerStatus::parse(&self.get().await?))
    }

    /// Set the level, clamping into 0..=100. Returns the level applied.
    pub async fn set_volume_percent(&self, level: i64) -> Result<u8, ControlError> {
        let level = level.clamp(0, 100) as u8;
        if level == 0 {
            self.set(&["mute"]).await?;
            return Ok(0);
        }
        let db = format!("{:.2}dB", db_for_level(level));
        self.set(&[db.as_str(), "unmute"]).await?;
        tracing::debug!(card = self.card, control = %self.control, level, "mixer level set");
        Ok(level)
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), ControlError> {
        self.set(&[if muted { "mute" } else { "unmute" }]).await
    }

    async fn get(&self) -> Result<String, ControlError> {
        let invocation = Invocation::new(AMIXER)
            .args(["-c", &self.card.to_string(), "get", &self.control]);
        let output = self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(output.stdout)
    }

    async fn set(&self, values: &[&str]) -> Result<(), ControlError> {
        let invocation = Invocation::new(AMIXER)
            .args(["-c", &self.card.to_string(), "set", &self.control])
            .args(values.iter().copied())
            .privileged();
        self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(())
    }
}
