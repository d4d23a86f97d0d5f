pub mod engine;
pub mod types;

pub use engine::{passes_confidence, Model, ModelLoader, Recognizer};
pub use types::{EngineOptions, Hypothesis, HypothesisKind, SpeechEngineKind, WordInfo};
