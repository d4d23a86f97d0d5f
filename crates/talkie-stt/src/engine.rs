//! Two opaque handle kinds with identical contracts across backends:
//! a 2-backend selection made once at `load`. The supervisor, not
//! this abstraction, swaps backends at runtime.

use async_trait::async_trait;
use talkie_audio::AudioFrame;
use talkie_foundation::SttError;

use crate::types::{EngineOptions, Hypothesis};

/// A loaded acoustic/language model, independent of any one stream.
#[async_trait]
pub trait Model: Send + Sync {
    async fn create_recognizer(
        &self,
        sample_rate: u32,
        options: &EngineOptions,
    ) -> Result<Box<dyn Recognizer>, SttError>;

    fn close(&mut self);
}

/// A single streaming recognition session bound to one model.
#[async_trait]
pub trait Recognizer: Send {
    /// Accepts one frame; returns the current best partial hypothesis
    /// if the engine has one, or `None` while it's still accumulating.
    async fn accept(&mut self, frame: &AudioFrame) -> Result<Option<Hypothesis>, SttError>;

    /// Must be called at end-of-utterance. Returns the final
    /// hypothesis including a confidence used for
    /// `confidence_threshold` filtering after normalization.
    async fn finalize(&mut self) -> Result<Hypothesis, SttError>;

    fn reset(&mut self);

    fn configure(&mut self, options: &EngineOptions);

    fn close(&mut self);
}

/// Loads a model by engine kind. Backend crates implement this for
/// their own model type; `talkie-app` picks one at startup based on
/// `speech_engine`.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, options: &EngineOptions) -> Result<Box<dyn Model>, SttError>;
}

/// Filters a final hypothesis against `confidence_threshold`.
pub fn passes_confidence(hypothesis: &Hypothesis, threshold: f32) -> bool {
    hypothesis.confidence >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HypothesisKind;

    #[test]
    fn confidence_filter_is_inclusive_at_threshold() {
        let h = Hypothesis {
            kind: HypothesisKind::Final,
            text: "hello".into(),
            confidence: 100.0,
            words: None,
        };
        assert!(passes_confidence(&h, 100.0));
        assert!(!passes_confidence(&h, 100.1));
    }
}
