//! Composes `EnergyCalculator` + `VadStateMachine` into the single
//! entry point the pipeline drives one frame at a time.

use crate::state::VadStateMachine;
use crate::types::{VadConfig, VadEvent, VadMetrics, VadState};
use talkie_audio::{AudioFrame, EnergyCalculator};

pub trait VadEngine {
    fn process(&mut self, frame: AudioFrame) -> (Vec<AudioFrame>, Option<VadEvent>);
    fn reset(&mut self);
    fn current_state(&self) -> VadState;
    fn required_sample_rate(&self) -> u32;
    fn required_frame_size_samples(&self) -> usize;
}

pub struct AdaptiveVad {
    config: VadConfig,
    energy_calc: EnergyCalculator,
    state_machine: VadStateMachine,
}

impl AdaptiveVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            state_machine: VadStateMachine::new(&config),
            energy_calc: EnergyCalculator::new(),
            config,
        }
    }

    pub fn builder() -> AdaptiveVadBuilder {
        AdaptiveVadBuilder::new()
    }

    pub fn metrics(&self) -> &VadMetrics {
        self.state_machine.metrics()
    }
}

impl VadEngine for AdaptiveVad {
    fn process(&mut self, frame: AudioFrame) -> (Vec<AudioFrame>, Option<VadEvent>) {
        let energy = self.energy_calc.calculate(&frame.samples).energy;
        self.state_machine.process(frame, energy)
    }

    fn reset(&mut self) {
        self.state_machine.reset();
    }

    fn current_state(&self) -> VadState {
        self.state_machine.current_state()
    }

    fn required_sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn required_frame_size_samples(&self) -> usize {
        self.config.frame_size_samples
    }
}

pub struct AdaptiveVadBuilder {
    config: VadConfig,
}

impl AdaptiveVadBuilder {
    pub fn new() -> Self {
        Self {
            config: VadConfig::default(),
        }
    }

    pub fn silence_seconds(mut self, secs: f64) -> Self {
        self.config.silence_seconds = secs;
        self
    }

    pub fn min_duration(mut self, secs: f64) -> Self {
        self.config.min_duration = secs;
        self
    }

    pub fn lookback_seconds(mut self, secs: f64) -> Self {
        self.config.lookback_seconds = secs;
        self
    }

    pub fn spike_suppression_seconds(mut self, secs: f64) -> Self {
        self.config.spike_suppression_seconds = secs;
        self
    }

    pub fn frame_size_samples(mut self, samples: usize) -> Self {
        self.config.frame_size_samples = samples;
        self
    }

    pub fn sample_rate_hz(mut self, hz: u32) -> Self {
        self.config.sample_rate_hz = hz;
        self
    }

    pub fn build(self) -> AdaptiveVad {
        AdaptiveVad::new(self.config)
    }
}

impl Default for AdaptiveVadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkie_audio::Samples;

    #[test]
    fn builder_roundtrips_config() {
        let vad = AdaptiveVad::builder()
            .silence_seconds(0.5)
            .min_duration(0.2)
            .frame_size_samples(256)
            .sample_rate_hz(8_000)
            .build();
        assert_eq!(vad.required_frame_size_samples(), 256);
        assert_eq!(vad.required_sample_rate(), 8_000);
    }

    #[test]
    fn fresh_engine_starts_calibrating() {
        let vad = AdaptiveVad::new(VadConfig::default());
        assert_eq!(vad.current_state(), VadState::Calibrating);
    }

    #[test]
    fn reset_returns_to_calibrating() {
        let mut vad = AdaptiveVad::new(VadConfig {
            initialization_samples: 2,
            ..VadConfig::default()
        });
        for i in 0..2 {
            vad.process(AudioFrame {
                samples: Samples::Int16(vec![100; 4]),
                sample_rate: 16_000,
                timestamp_secs: i as f64 * 0.01,
            });
        }
        assert_eq!(vad.current_state(), VadState::Idle);
        vad.reset();
        assert_eq!(vad.current_state(), VadState::Calibrating);
    }
}
