//! Vosk/Kaldi backend. Alternatives are fixed at 1 because
//! utterance-level confidence is required; beam and lattice
//! beam are accepted in `EngineOptions` for parity with the config
//! schema but the safe `vosk` crate bindings don't expose a runtime
//! setter for them (Kaldi reads beam width from the model's own
//! `conf/` directory), so they're logged, not applied, here.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use talkie_audio::{AudioFrame, Samples};
use talkie_foundation::SttError;
use talkie_stt::{EngineOptions, Hypothesis, HypothesisKind, Model, Recognizer, WordInfo};
use vosk::{CompleteResult, DecodingState};

use crate::model::resolve_model_path;

pub struct VoskModel {
    model: vosk::Model,
    model_path: PathBuf,
}

impl VoskModel {
    pub fn load(options: &EngineOptions) -> Result<Self, SttError> {
        let model_path = resolve_model_path(&options.model_path);
        if !model_path.is_dir() {
            return Err(SttError::ModelNotFound(model_path));
        }
        let path_str = model_path.to_string_lossy().to_string();
        let model = vosk::Model::new(&path_str)
            .ok_or_else(|| SttError::InvalidConfig(format!("failed to load vosk model at {path_str}")))?;

        tracing::debug!(
            vosk_beam = options.vosk_beam,
            vosk_lattice = options.vosk_lattice,
            "vosk beam/lattice are read from the model's conf/, not set at runtime"
        );

        Ok(Self { model, model_path })
    }
}

#[async_trait]
impl Model for VoskModel {
    async fn create_recognizer(
        &self,
        sample_rate: u32,
        options: &EngineOptions,
    ) -> Result<Box<dyn Recognizer>, SttError> {
        let mut recognizer = vosk::Recognizer::new(&self.model, sample_rate as f32)
            .ok_or_else(|| SttError::InvalidConfig("failed to create vosk recognizer".into()))?;
        recognizer.set_max_alternatives(1);
        recognizer.set_words(true);
        recognizer.set_partial_words(false);

        Ok(Box::new(VoskRecognizer {
            recognizer,
            confidence_threshold: options.confidence_threshold,
        }))
    }

    fn close(&mut self) {
        tracing::debug!(path = %self.model_path.display(), "vosk model closed");
    }
}

pub struct VoskRecognizer {
    recognizer: vosk::Recognizer,
    confidence_threshold: f32,
}

#[async_trait]
impl Recognizer for VoskRecognizer {
    async fn accept(&mut self, frame: &AudioFrame) -> Result<Option<Hypothesis>, SttError> {
        let samples = match &frame.samples {
            Samples::Int16(s) => s.as_slice(),
            Samples::Float32(_) => {
                return Err(SttError::InvalidConfig(
                    "vosk backend requires int16 frames".into(),
                ))
            }
        };

        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| SttError::TranscriptionFailed(format!("{e:?}")))?;

        match state {
            DecodingState::Running => {
                let partial = self.recognizer.partial_result();
                let text = partial.partial.to_string();
                if text.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Hypothesis::partial(text)))
                }
            }
            DecodingState::Finalized | DecodingState::Failed => Ok(None),
        }
    }

    async fn finalize(&mut self) -> Result<Hypothesis, SttError> {
        let result = self.recognizer.final_result();
        let (text, confidence, words) = parse_complete_result(result);
        Ok(Hypothesis {
            kind: HypothesisKind::Final,
            text,
            confidence,
            words,
        })
    }

    fn reset(&mut self) {
        self.recognizer.reset();
    }

    fn configure(&mut self, options: &EngineOptions) {
        self.confidence_threshold = options.confidence_threshold;
    }

    fn close(&mut self) {}
}

/// The first alternative's `confidence` field is the utterance
/// confidence. Vosk's small models frequently omit it; we fall back
/// to a neutral confidence of 100 so the default
/// `confidence_threshold=100` doesn't silently drop every hypothesis.
fn parse_complete_result(result: CompleteResult) -> (String, f32, Option<Vec<WordInfo>>) {
    match result {
        CompleteResult::Single(single) => {
            let words = if single.result.is_empty() {
                None
            } else {
                Some(
                    single
                        .result
                        .iter()
                        .map(|w| WordInfo {
                            start: w.start as f64,
                            end: w.end as f64,
                            conf: w.conf,
                            text: w.word.to_string(),
                        })
                        .collect(),
                )
            };
            (single.text.to_string(), 100.0, words)
        }
        CompleteResult::Multiple(multiple) => {
            if let Some(first) = multiple.alternatives.first() {
                let confidence = extract_confidence(first.confidence);
                (first.text.to_string(), confidence, None)
            } else {
                (String::new(), 0.0, None)
            }
        }
    }
}

fn extract_confidence(raw: f64) -> f32 {
    if raw > 0.0 {
        raw as f32
    } else {
        100.0
    }
}
