//! Adaptive floor tracking. During calibration, the first
//! `initialization_samples` energies fix `noise_floor` and
//! `speech_floor` via percentile. Afterwards a rolling window of
//! idle-phase energies recomputes the floors every few seconds, with
//! `speech_floor` clamped to `noise_floor × speech_max_multiplier`.

use crate::constants::{DRIFT_WINDOW_CAPACITY, FLOOR_DRIFT_RECOMPUTE_SECONDS};
use crate::types::VadConfig;
use std::collections::VecDeque;

/// Nearest-rank percentile over an unsorted slice of energies.
fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((pct / 100.0) * (sorted.len() as f32 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

pub struct AdaptiveThreshold {
    noise_floor_percentile: f32,
    speech_floor_percentile: f32,
    speech_max_multiplier: f32,
    noise_floor: f32,
    speech_floor: f32,
    drift_window: VecDeque<f32>,
    last_recompute_secs: f64,
}

impl AdaptiveThreshold {
    pub fn new(cfg: &VadConfig) -> Self {
        Self {
            noise_floor_percentile: cfg.noise_floor_percentile,
            speech_floor_percentile: cfg.speech_floor_percentile,
            speech_max_multiplier: cfg.speech_max_multiplier,
            noise_floor: 0.0,
            speech_floor: 0.0,
            drift_window: VecDeque::with_capacity(DRIFT_WINDOW_CAPACITY),
            last_recompute_secs: 0.0,
        }
    }

    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    pub fn speech_floor(&self) -> f32 {
        self.speech_floor
    }

    /// Computes the initial floors from the calibration-phase energies.
    pub fn calibrate(&mut self, energies: &[f32]) {
        self.noise_floor = percentile(energies, self.noise_floor_percentile);
        let raw_speech_floor = percentile(energies, self.speech_floor_percentile);
        self.speech_floor = raw_speech_floor.min(self.noise_floor * self.speech_max_multiplier);
        self.last_recompute_secs = 0.0;
    }

    /// Feeds one idle-phase energy into the rolling drift window and
    /// recomputes floors every `FLOOR_DRIFT_RECOMPUTE_SECONDS`.
    pub fn observe_idle(&mut self, energy: f32, now_secs: f64) {
        if self.drift_window.len() == DRIFT_WINDOW_CAPACITY {
            self.drift_window.pop_front();
        }
        self.drift_window.push_back(energy);

        if now_secs - self.last_recompute_secs >= FLOOR_DRIFT_RECOMPUTE_SECONDS {
            let window: Vec<f32> = self.drift_window.iter().copied().collect();
            self.noise_floor = percentile(&window, self.noise_floor_percentile);
            let raw_speech_floor = percentile(&window, self.speech_floor_percentile);
            self.speech_floor = raw_speech_floor.min(self.noise_floor * self.speech_max_multiplier);
            self.last_recompute_secs = now_secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn calibrate_computes_percentiles() {
        let cfg = VadConfig::default();
        let mut threshold = AdaptiveThreshold::new(&cfg);
        let energies: Vec<f32> = (0..50).map(|i| i as f32).collect();
        threshold.calibrate(&energies);
        assert!(threshold.noise_floor() > 0.0);
        assert!(threshold.speech_floor() >= threshold.noise_floor());
    }

    #[test]
    fn speech_floor_is_clamped_to_max_multiplier() {
        let cfg = VadConfig::default();
        let mut threshold = AdaptiveThreshold::new(&cfg);
        // Mostly-low energies with one huge outlier pushes the raw
        // 70th percentile far above 1.3x the 10th percentile.
        let mut energies = vec![1.0f32; 45];
        energies.extend(vec![1000.0f32; 5]);
        threshold.calibrate(&energies);
        assert!(threshold.speech_floor() <= threshold.noise_floor() * cfg.speech_max_multiplier + 1e-4);
    }

    #[test]
    fn drift_recompute_is_gated_by_interval() {
        let cfg = VadConfig::default();
        let mut threshold = AdaptiveThreshold::new(&cfg);
        threshold.calibrate(&vec![1.0; 50]);
        let mut rng = rand::thread_rng();
        for i in 0..10 {
            let e: f32 = rng.gen_range(0.5..1.5);
            threshold.observe_idle(e, i as f64 * 0.1);
        }
        // Less than FLOOR_DRIFT_RECOMPUTE_SECONDS has elapsed; floor
        // should be unchanged from calibration.
        assert_eq!(threshold.noise_floor(), percentile(&vec![1.0; 50], 10.0));
    }
}
