//! VAD phases and events.

use talkie_audio::AudioFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Calibrating,
    Idle,
    Speaking,
    Trailing,
}

#[derive(Debug, Clone)]
pub enum VadEvent {
    /// Speech onset: the pre-roll buffer, then the triggering frame.
    SpeechStart { preroll: Vec<AudioFrame> },
    /// Utterance finalized after the trailing phase elapsed.
    SpeechEnd { duration_secs: f64 },
}

#[derive(Debug, Clone)]
pub struct VadConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
    pub silence_seconds: f64,
    pub min_duration: f64,
    pub lookback_seconds: f64,
    pub spike_suppression_seconds: f64,
    pub initialization_samples: usize,
    pub noise_floor_percentile: f32,
    pub speech_floor_percentile: f32,
    pub speech_min_multiplier: f32,
    pub speech_max_multiplier: f32,
    pub audio_threshold_multiplier: f32,
}

impl VadConfig {
    pub fn frames_per_second(&self) -> f64 {
        self.sample_rate_hz as f64 / self.frame_size_samples as f64
    }

    pub fn preroll_capacity(&self) -> usize {
        (self.lookback_seconds * self.frames_per_second()).ceil() as usize
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: 512,
            sample_rate_hz: 16_000,
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

#[derive(Debug, Clone, Default)]
pub struct VadMetrics {
    pub frames_processed: u64,
    pub utterances_started: u64,
    pub utterances_finalized: u64,
    pub utterances_discarded_too_short: u64,
    pub last_energy: f32,
    pub current_noise_floor: f32,
    pub current_speech_floor: f32,
}
