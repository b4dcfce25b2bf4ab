//! Experience settings and preferences
//!
//! Timings, thresholds and effect quality. Persisted in LocalStorage on the
//! web, defaults everywhere else.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Settings could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 600,
            QualityPreset::Medium => 2000,
            QualityPreset::High => 6000,
        }
    }
}

/// Experience settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceSettings {
    /// Particle quality preset
    pub quality: QualityPreset,

    // === Timings (ms) ===
    pub typewriter_interval_ms: f64,
    pub intro_hold_ms: f64,
    pub celebration_delay_ms: f64,
    pub gift_reveal_delay_ms: f64,
    pub wheel_spin_ms: f64,
    /// Full turns before the wheel settles
    pub wheel_extra_spins: u32,

    // === Microphone ===
    pub blow_poll_ms: f64,
    /// Loudness threshold (0-256)
    pub blow_threshold: f32,

    // === Audio ===
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (no ambient reveal fireworks)
    pub reduced_motion: bool,
}

impl Default for ExperienceSettings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            typewriter_interval_ms: TYPEWRITER_INTERVAL_MS,
            intro_hold_ms: INTRO_HOLD_MS,
            celebration_delay_ms: CELEBRATION_DELAY_MS,
            gift_reveal_delay_ms: GIFT_REVEAL_DELAY_MS,
            wheel_spin_ms: WHEEL_SPIN_MS,
            wheel_extra_spins: WHEEL_EXTRA_SPINS,

            blow_poll_ms: BLOW_POLL_MS,
            blow_threshold: BLOW_THRESHOLD,

            music_volume: MUSIC_VOLUME,
            sfx_volume: POPPER_VOLUME,
            muted: false,

            reduced_motion: false,
        }
    }
}

impl ExperienceSettings {
    /// Parse settings JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Clamp values that would stall or break the experience
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        for (value, fallback) in [
            (&mut self.typewriter_interval_ms, defaults.typewriter_interval_ms),
            (&mut self.blow_poll_ms, defaults.blow_poll_ms),
        ] {
            // Zero-period intervals would never stop firing
            if !(*value > 0.0) {
                *value = fallback;
            }
        }
        for value in [
            &mut self.intro_hold_ms,
            &mut self.celebration_delay_ms,
            &mut self.gift_reveal_delay_ms,
            &mut self.wheel_spin_ms,
        ] {
            if !(*value >= 0.0) {
                *value = 0.0;
            }
        }
        self.music_volume = self.music_volume.clamp(0.0, 1.0);
        self.sfx_volume = self.sfx_volume.clamp(0.0, 1.0);
    }

    /// Music volume after mute
    pub fn effective_music_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.music_volume }
    }

    /// Effect volume after mute
    pub fn effective_sfx_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.sfx_volume }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        self.quality.max_particles()
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "wishprise_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }
}
