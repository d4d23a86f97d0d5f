//! Named defaults mirrored from `VadConfig::default()`, kept separate
//! so call sites that only need one constant don't have to construct
//! a whole config.

pub const DEFAULT_SILENCE_SECONDS: f64 = 0.3;
pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 0.30;
pub const DEFAULT_LOOKBACK_SECONDS: f64 = 0.5;
pub const DEFAULT_SPIKE_SUPPRESSION_SECONDS: f64 = 0.3;
pub const DEFAULT_INITIALIZATION_SAMPLES: usize = 50;
pub const DEFAULT_NOISE_FLOOR_PERCENTILE: f32 = 10.0;
pub const DEFAULT_SPEECH_FLOOR_PERCENTILE: f32 = 70.0;
pub const DEFAULT_SPEECH_MIN_MULTIPLIER: f32 = 0.6;
pub const DEFAULT_SPEECH_MAX_MULTIPLIER: f32 = 1.3;
pub const DEFAULT_AUDIO_THRESHOLD_MULTIPLIER: f32 = 2.5;

/// How often floors are recomputed from the rolling idle-phase window.
pub const FLOOR_DRIFT_RECOMPUTE_SECONDS: f64 = 5.0;

/// Size of the rolling idle-phase energy window used for drift.
pub const DRIFT_WINDOW_CAPACITY: usize = 500;
