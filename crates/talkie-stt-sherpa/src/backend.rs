//! Sherpa-ONNX streaming transducer backend. Accepts float32 audio;
//! converts from the pipeline's int16 frames at
//! ingress. Confidence is derived from per-token log-probabilities and
//! normalized onto the same 0..=100-ish scale the Vosk backend uses so
//! `confidence_threshold` filtering is comparable across engines.

use async_trait::async_trait;
use sherpa_rs::transducer::{TransducerConfig, TransducerRecognizer as SherpaRecognizer};
use talkie_audio::{AudioFrame, Samples};
use talkie_foundation::SttError;
use talkie_stt::{EngineOptions, Hypothesis, HypothesisKind, Model, Recognizer};

pub struct SherpaModel {
    config: TransducerConfig,
}

impl SherpaModel {
    pub fn load(options: &EngineOptions) -> Result<Self, SttError> {
        let model_dir = options.model_path.to_string_lossy().to_string();
        if !options.model_path.is_dir() {
            return Err(SttError::ModelNotFound(options.model_path.clone()));
        }

        let config = TransducerConfig {
            encoder: format!("{model_dir}/encoder.onnx"),
            decoder: format!("{model_dir}/decoder.onnx"),
            joiner: format!("{model_dir}/joiner.onnx"),
            tokens: format!("{model_dir}/tokens.txt"),
            max_active_paths: options.sherpa_max_active_paths,
            provider: Some("cpu".to_string()),
            num_threads: Some(1),
            debug: false,
            ..Default::default()
        };

        Ok(Self { config })
    }
}

#[async_trait]
impl Model for SherpaModel {
    async fn create_recognizer(
        &self,
        sample_rate: u32,
        options: &EngineOptions,
    ) -> Result<Box<dyn Recognizer>, SttError> {
        let mut config = self.config.clone();
        config.max_active_paths = options.sherpa_max_active_paths;

        let recognizer = SherpaRecognizer::new(config, sample_rate as i32)
            .map_err(|e| SttError::InvalidConfig(format!("failed to create sherpa recognizer: {e}")))?;

        Ok(Box::new(SherpaStream {
            recognizer,
            sample_rate,
            last_partial: String::new(),
        }))
    }

    fn close(&mut self) {}
}

pub struct SherpaStream {
    recognizer: SherpaRecognizer,
    sample_rate: u32,
    last_partial: String,
}

#[async_trait]
impl Recognizer for SherpaStream {
    async fn accept(&mut self, frame: &AudioFrame) -> Result<Option<Hypothesis>, SttError> {
        let floats = to_float32(&frame.samples);

        self.recognizer
            .accept_waveform(self.sample_rate as i32, &floats)
            .map_err(|e| SttError::TranscriptionFailed(format!("{e}")))?;

        while self.recognizer.is_ready() {
            self.recognizer
                .decode()
                .map_err(|e| SttError::TranscriptionFailed(format!("{e}")))?;
        }

        let text = self.recognizer.text();
        if text.is_empty() || text == self.last_partial {
            return Ok(None);
        }
        self.last_partial = text.clone();
        Ok(Some(Hypothesis::partial(text)))
    }

    async fn finalize(&mut self) -> Result<Hypothesis, SttError> {
        self.recognizer
            .input_finished()
            .map_err(|e| SttError::TranscriptionFailed(format!("{e}")))?;
        while self.recognizer.is_ready() {
            self.recognizer
                .decode()
                .map_err(|e| SttError::TranscriptionFailed(format!("{e}")))?;
        }

        let text = self.recognizer.text();
        let confidence = normalize_confidence(self.recognizer.tokens_log_prob());

        Ok(Hypothesis {
            kind: HypothesisKind::Final,
            text,
            confidence,
            words: None,
        })
    }

    fn reset(&mut self) {
        self.recognizer.reset();
        self.last_partial.clear();
    }

    fn configure(&mut self, _options: &EngineOptions) {}

    fn close(&mut self) {}
}

/// Converts int16 frames to the float32 PCM sherpa-rs expects;
/// float32 frames pass through unchanged.
fn to_float32(samples: &Samples) -> Vec<f32> {
    match samples {
        Samples::Int16(s) => s.iter().map(|&v| v as f32 / 32768.0).collect(),
        Samples::Float32(s) => s.clone(),
    }
}

/// Maps the mean per-token log-probability (typically a small negative
/// number, near 0 for a confident transducer) onto Vosk's roughly
/// 0..=100 confidence scale via a logistic-style squash.
fn normalize_confidence(mean_log_prob: f32) -> f32 {
    let squashed = 1.0 / (1.0 + (-mean_log_prob).exp());
    (squashed * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int16_to_float32_scales_full_range() {
        let samples = Samples::Int16(vec![32767, -32768, 0]);
        let floats = to_float32(&samples);
        assert!((floats[0] - 0.99997).abs() < 0.001);
        assert!((floats[1] - (-1.0)).abs() < 0.001);
        assert_eq!(floats[2], 0.0);
    }

    #[test]
    fn confident_log_prob_normalizes_high() {
        // A near-zero log-prob (very confident) should squash near 100.
        assert!(normalize_confidence(-0.01) > 49.0);
        // A very negative log-prob (unconfident) should squash low.
        assert!(normalize_confidence(-10.0) < 10.0);
    }
}
