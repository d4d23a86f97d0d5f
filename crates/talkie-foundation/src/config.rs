//! Process-wide configuration.
//!
//! Loaded once at startup by layering: built-in defaults →
//! `$XDG_CONFIG_HOME/talkie.conf` (or an explicit path) → environment
//! variables prefixed `TALKIE__`, with `__` as the nesting separator
//! (e.g. `TALKIE__VAD__SILENCE_SECONDS`). The supervisor is the only
//! component that mutates a loaded `Settings`; every other component
//! observes a read-only snapshot for the duration of one operation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `COLDVOX_SKIP_CONFIG_DISCOVERY`-style escape hatch for tests that
/// don't want to touch the real XDG config path.
pub const SKIP_DISCOVERY_ENV: &str = "TALKIE_SKIP_CONFIG_DISCOVERY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub speech_engine: String,
    pub vosk_modelfile: String,
    pub sherpa_modelfile: String,
    pub vosk_beam: u32,
    pub vosk_lattice: u32,
    pub sherpa_max_active_paths: u32,
    pub confidence_threshold: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            speech_engine: "vosk".into(),
            vosk_modelfile: "vosk-model-small-en-us-0.15".into(),
            sherpa_modelfile: "sherpa-onnx-streaming".into(),
            vosk_beam: 20,
            vosk_lattice: 8,
            sherpa_max_active_paths: 4,
            confidence_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub input_device: String,
    pub resampler_quality: String,
    pub enable_device_monitor: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            input_device: "default".into(),
            resampler_quality: "balanced".into(),
            enable_device_monitor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadSettings {
    pub silence_seconds: f32,
    pub min_duration: f32,
    pub lookback_seconds: f32,
    pub spike_suppression_seconds: f32,
    pub initialization_samples: u32,
    pub noise_floor_percentile: f32,
    pub speech_floor_percentile: f32,
    pub speech_min_multiplier: f32,
    pub speech_max_multiplier: f32,
    pub audio_threshold_multiplier: f32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            silence_seconds: 0.3,
            min_duration: 0.30,
            lookback_seconds: 0.5,
            spike_suppression_seconds: 0.3,
            initialization_samples: 50,
            noise_floor_percentile: 10.0,
            speech_floor_percentile: 70.0,
            speech_min_multiplier: 0.6,
            speech_max_multiplier: 1.3,
            audio_threshold_multiplier: 2.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjectionSettings {
    pub typing_delay_ms: u32,
}

impl Default for InjectionSettings {
    fn default() -> Self {
        Self { typing_delay_ms: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GecSettings {
    pub gec_homophone: bool,
    pub gec_punctcap: bool,
    pub gec_grammar: bool,
}

impl Default for GecSettings {
    fn default() -> Self {
        Self {
            gec_homophone: true,
            gec_punctcap: true,
            gec_grammar: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub audio: AudioSettings,
    pub vad: VadSettings,
    pub injection: InjectionSettings,
    pub gec: GecSettings,
}

impl Settings {
    /// Loads layered config: defaults, then the discovered config file
    /// (unless discovery is skipped), then `TALKIE__`-prefixed env vars.
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);

        if std::env::var(SKIP_DISCOVERY_ENV).is_err() {
            if let Some(path) = default_config_path() {
                if path.exists() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TALKIE")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(
                config::Environment::with_prefix("TALKIE")
                    .separator("__")
                    .try_parsing(true),
            );
        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Clamps out-of-range values, logging a warning for each instead
    /// of failing startup.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if !matches!(self.engine.speech_engine.as_str(), "vosk" | "sherpa") {
            tracing::warn!(
                value = %self.engine.speech_engine,
                "unknown speech engine, clamping to vosk"
            );
            self.engine.speech_engine = "vosk".into();
        }

        if !matches!(
            self.audio.resampler_quality.as_str(),
            "fast" | "balanced" | "quality"
        ) {
            tracing::warn!(
                value = %self.audio.resampler_quality,
                "invalid resampler_quality, clamping to balanced"
            );
            self.audio.resampler_quality = "balanced".into();
        }

        if self.injection.typing_delay_ms == 0 {
            tracing::warn!("typing_delay_ms must be greater than zero, clamping to default");
            self.injection.typing_delay_ms = InjectionSettings::default().typing_delay_ms;
        }

        if self.vad.speech_floor_percentile <= self.vad.noise_floor_percentile {
            tracing::warn!("speech_floor_percentile <= noise_floor_percentile, clamping");
            self.vad.speech_floor_percentile = self.vad.noise_floor_percentile + 1.0;
        }

        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .map(|dir| dir.join("talkie.conf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_validate_cleanly() {
        let mut s = Settings::default();
        s.validate().unwrap();
        assert_eq!(s.engine.speech_engine, "vosk");
    }

    #[test]
    #[serial]
    fn invalid_engine_is_clamped_to_vosk() {
        let mut s = Settings::default();
        s.engine.speech_engine = "whisper".into();
        s.validate().unwrap();
        assert_eq!(s.engine.speech_engine, "vosk");
    }

    #[test]
    #[serial]
    fn zero_typing_delay_is_clamped_to_default() {
        let mut s = Settings::default();
        s.injection.typing_delay_ms = 0;
        s.validate().unwrap();
        assert_eq!(s.injection.typing_delay_ms, InjectionSettings::default().typing_delay_ms);
    }

    #[test]
    #[serial]
    fn bad_resampler_quality_clamped() {
        let mut s = Settings::default();
        s.audio.resampler_quality = "bogus".into();
        s.validate().unwrap();
        assert_eq!(s.audio.resampler_quality, "balanced");
    }

    #[test]
    #[serial]
    fn env_override_wins_over_default() {
        let _skip = EnvVarGuard::set(SKIP_DISCOVERY_ENV, "1");
        let _g = EnvVarGuard::set("TALKIE__VAD__SILENCE_SECONDS", "0.9");
        let settings = Settings::new().unwrap();
        assert_eq!(settings.vad.silence_seconds, 0.9);
    }
}
