//! Recognition results.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypothesisKind {
    Partial,
    Final,
}

#[derive(Debug, Clone)]
pub struct WordInfo {
    pub start: f64,
    pub end: f64,
    pub conf: f32,
    pub text: String,
}

/// `{ kind, text, confidence }`. Confidence is engine-specific; each
/// backend normalizes it to a 0..=100-ish scale comparable across
/// engines before it reaches `confidence_threshold` filtering.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub kind: HypothesisKind,
    pub text: String,
    pub confidence: f32,
    pub words: Option<Vec<WordInfo>>,
}

impl Hypothesis {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            kind: HypothesisKind::Partial,
            text: text.into(),
            confidence: 0.0,
            words: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == HypothesisKind::Final
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEngineKind {
    Vosk,
    Sherpa,
}

impl SpeechEngineKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "vosk" => Some(SpeechEngineKind::Vosk),
            "sherpa" => Some(SpeechEngineKind::Sherpa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub model_path: std::path::PathBuf,
    pub sample_rate: u32,
    pub confidence_threshold: f32,
    pub vosk_beam: i32,
    pub vosk_lattice: i32,
    pub sherpa_max_active_paths: i32,
}
