//! The four-phase state machine itself. Driven by
//! `AudioFrame::timestamp_secs` rather than wall-clock `Instant` so it
//! can be exercised deterministically without a clock abstraction —
//! timestamps already come from the chunker's cumulative sample count.

use crate::threshold::AdaptiveThreshold;
use crate::types::{VadConfig, VadEvent, VadMetrics, VadState};
use std::collections::VecDeque;
use talkie_audio::AudioFrame;

pub struct VadStateMachine {
    config: VadConfig,
    threshold: AdaptiveThreshold,
    state: VadState,
    preroll: VecDeque<AudioFrame>,
    calibration_energies: Vec<f32>,
    last_speech_time: f64,
    trailing_entered_at: f64,
    utterance_start_time: f64,
    metrics: VadMetrics,
}

impl VadStateMachine {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            threshold: AdaptiveThreshold::new(config),
            state: VadState::Calibrating,
            preroll: VecDeque::with_capacity(config.preroll_capacity()),
            calibration_energies: Vec::with_capacity(config.initialization_samples),
            last_speech_time: 0.0,
            trailing_entered_at: 0.0,
            utterance_start_time: 0.0,
            config: config.clone(),
        }
    }

    pub fn current_state(&self) -> VadState {
        self.state
    }

    pub fn metrics(&self) -> &VadMetrics {
        &self.metrics
    }

    pub fn reset(&mut self) {
        self.state = VadState::Calibrating;
        self.preroll.clear();
        self.calibration_energies.clear();
        self.metrics = VadMetrics::default();
    }

    /// Feeds one frame with its already-computed energy; returns the
    /// frames (if any) to forward to the recognizer and an optional
    /// lifecycle event.
    pub fn process(&mut self, frame: AudioFrame, energy: f32) -> (Vec<AudioFrame>, Option<VadEvent>) {
        self.metrics.frames_processed += 1;
        self.metrics.last_energy = energy;

        match self.state {
            VadState::Calibrating => self.process_calibrating(frame, energy),
            VadState::Idle => self.process_idle(frame, energy),
            VadState::Speaking => self.process_speaking(frame, energy),
            VadState::Trailing => self.process_trailing(frame, energy),
        }
    }

    fn process_calibrating(&mut self, frame: AudioFrame, energy: f32) -> (Vec<AudioFrame>, Option<VadEvent>) {
        self.calibration_energies.push(energy);
        if self.calibration_energies.len() >= self.config.initialization_samples {
            self.threshold.calibrate(&self.calibration_energies);
            self.metrics.current_noise_floor = self.threshold.noise_floor();
            self.metrics.current_speech_floor = self.threshold.speech_floor();
            self.state = VadState::Idle;
        }
        self.push_preroll(frame);
        (Vec::new(), None)
    }

    fn process_idle(&mut self, frame: AudioFrame, energy: f32) -> (Vec<AudioFrame>, Option<VadEvent>) {
        self.threshold.observe_idle(energy, frame.timestamp_secs);
        self.metrics.current_noise_floor = self.threshold.noise_floor();
        self.metrics.current_speech_floor = self.threshold.speech_floor();

        if energy >= self.threshold.speech_floor() * self.config.speech_min_multiplier {
            let now = frame.timestamp_secs;
            let mut forward: Vec<AudioFrame> = self.preroll.drain(..).collect();
            forward.push(frame);

            self.state = VadState::Speaking;
            self.last_speech_time = now;
            self.utterance_start_time = now;
            self.metrics.utterances_started += 1;

            let event = VadEvent::SpeechStart {
                preroll: forward[..forward.len() - 1].to_vec(),
            };
            return (forward, Some(event));
        }

        self.push_preroll(frame);
        (Vec::new(), None)
    }

    fn process_speaking(&mut self, frame: AudioFrame, energy: f32) -> (Vec<AudioFrame>, Option<VadEvent>) {
        let now = frame.timestamp_secs;
        if energy >= self.threshold.noise_floor() * self.config.audio_threshold_multiplier {
            self.last_speech_time = now;
        }

        let forwarded = vec![frame];

        if now - self.last_speech_time >= self.config.silence_seconds {
            self.state = VadState::Trailing;
            self.trailing_entered_at = now;
        }

        (forwarded, None)
    }

    fn process_trailing(&mut self, frame: AudioFrame, energy: f32) -> (Vec<AudioFrame>, Option<VadEvent>) {
        let now = frame.timestamp_secs;
        let forwarded = vec![frame];

        let is_speech = energy >= self.threshold.noise_floor() * self.config.audio_threshold_multiplier;
        let within_spike_window = now - self.trailing_entered_at < self.config.spike_suppression_seconds;

        if is_speech && within_spike_window {
            self.state = VadState::Speaking;
            self.last_speech_time = now;
            return (forwarded, None);
        }

        if now - self.trailing_entered_at >= self.config.spike_suppression_seconds {
            let duration = now - self.utterance_start_time;
            self.state = VadState::Idle;

            if duration < self.config.min_duration {
                self.metrics.utterances_discarded_too_short += 1;
                return (forwarded, None);
            }

            self.metrics.utterances_finalized += 1;
            return (
                forwarded,
                Some(VadEvent::SpeechEnd { duration_secs: duration }),
            );
        }

        (forwarded, None)
    }

    fn push_preroll(&mut self, frame: AudioFrame) {
        let capacity = self.config.preroll_capacity().max(1);
        if self.preroll.len() >= capacity {
            self.preroll.pop_front();
        }
        self.preroll.push_back(frame);
    }
}
