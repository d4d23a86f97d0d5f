//! Composes the homophone, punct/cap, and grammar stages sequentially
//! over one utterance at a time.

use talkie_foundation::GecError;
use talkie_telemetry::GecStageMetrics;

use crate::grammar::{GrammarConfig, GrammarCorrector, GrammarRewriter};
use crate::homophone::{HomophoneCorrector, MaskedLanguageModel};
use crate::punctcap::{PunctCapModel, PunctCapRestorer};

#[derive(Debug, Clone)]
pub struct GecStageToggles {
    pub homophone: bool,
    pub punctcap: bool,
    pub grammar: bool,
}

impl Default for GecStageToggles {
    fn default() -> Self {
        Self {
            homophone: true,
            punctcap: true,
            grammar: false,
        }
    }
}

/// Owns the three stages and the per-utterance re-entrancy guard. One
/// instance processes one utterance at a time; overlapping calls on
/// the same instance is a caller error the type does not attempt to
/// prevent — ordering across an instance is the caller's
/// responsibility.
pub struct GecPipeline<M: MaskedLanguageModel, P: PunctCapModel, R: GrammarRewriter> {
    homophone: HomophoneCorrector<M>,
    punctcap: PunctCapRestorer<P>,
    grammar: GrammarCorrector<R>,
    toggles: GecStageToggles,
    metrics: GecStageMetrics,
}

impl<M: MaskedLanguageModel, P: PunctCapModel, R: GrammarRewriter> GecPipeline<M, P, R> {
    pub fn new(
        homophone: HomophoneCorrector<M>,
        punctcap: PunctCapRestorer<P>,
        grammar: GrammarCorrector<R>,
        toggles: GecStageToggles,
        metrics: GecStageMetrics,
    ) -> Self {
        Self {
            homophone,
            punctcap,
            grammar,
            toggles,
            metrics,
        }
    }

    pub fn metrics(&self) -> &GecStageMetrics {
        &self.metrics
    }

    pub fn process(&self, text: &str) -> Result<String, GecError> {
        if text.trim().is_empty() {
            self.metrics.record_utterance(false, false, false, 0);
            return Ok(String::new());
        }

        let start = std::time::Instant::now();
        let mut current = text.to_string();
        let mut homo_changed = false;
        let mut punct_changed = false;
        let mut grammar_changed = false;

        if self.toggles.homophone {
            match self.homophone.correct(&current) {
                Ok((out, changed)) => {
                    current = out;
                    homo_changed = changed;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "homophone stage failed, passing utterance through unchanged");
                }
            }
        }

        if self.toggles.punctcap {
            match self.punctcap.restore(&current) {
                Ok(out) => {
                    punct_changed = out != current;
                    current = out;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "punctcap stage failed, passing utterance through unchanged");
                }
            }
        }

        if self.toggles.grammar {
            match self.grammar.correct(&current) {
                Ok((out, changed)) => {
                    current = out;
                    grammar_changed = changed;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "grammar stage failed, passing utterance through unchanged");
                }
            }
        }

        let elapsed_us = start.elapsed().as_micros() as u64;
        self.metrics
            .record_utterance(homo_changed, punct_changed, grammar_changed, elapsed_us);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::HomophoneDictionary;
    use crate::homophone::HomophoneCorrector;
    use crate::punctcap::{PunctCapRestorer, NUM_CLASSES};
    use std::collections::HashMap;
    use talkie_nn::WordPieceTokenizer;

    struct IdentityMlm;
    impl MaskedLanguageModel for IdentityMlm {
        fn log_probs_at(&self, _ids: &[u32], _positions: &[usize], target_ids: &[u32]) -> Result<Vec<f32>, GecError> {
            Ok(target_ids.iter().map(|_| -0.01).collect())
        }
    }

    struct PassthroughPunctCap;
    impl PunctCapModel for PassthroughPunctCap {
        fn classify(&self, ids: &[u32]) -> Result<Vec<[f32; NUM_CLASSES]>, GecError> {
            // Every position: lowercase, no punctuation.
            Ok(ids.iter().map(|_| [0f32; NUM_CLASSES]).collect())
        }
    }

    struct NoopRewriter;
    impl GrammarRewriter for NoopRewriter {
        fn rewrite(&self, text: &str) -> Result<String, GecError> {
            Ok(text.to_string())
        }
    }

    struct FailingMlm;
    impl MaskedLanguageModel for FailingMlm {
        fn log_probs_at(&self, _ids: &[u32], _positions: &[usize], _target_ids: &[u32]) -> Result<Vec<f32>, GecError> {
            Err(GecError::Tokenizer("model unavailable".into()))
        }
    }

    fn vocab() -> WordPieceTokenizer {
        let mut lines: Vec<String> = (0..100).map(|i| format!("[unused{i}]")).collect();
        lines.push("[UNK]".into());
        lines.push("[CLS]".into());
        lines.push("[SEP]".into());
        lines.push("[MASK]".into());
        lines[0] = "[PAD]".into();
        for w in ["hello", "how", "are", "you", "there", "their"] {
            lines.push(w.to_string());
        }
        WordPieceTokenizer::from_vocab_lines(lines.iter().map(|s| s.as_str()))
    }

    fn build_pipeline(toggles: GecStageToggles) -> GecPipeline<IdentityMlm, PassthroughPunctCap, NoopRewriter> {
        let dict = HomophoneDictionary::from_groups(vec![vec!["there".into(), "their".into()]]);
        let homophone = HomophoneCorrector::new(vocab(), dict, IdentityMlm);
        let punctcap = PunctCapRestorer::new(vocab(), PassthroughPunctCap);
        let grammar = GrammarCorrector::new(NoopRewriter, GrammarConfig::default());
        GecPipeline::new(homophone, punctcap, grammar, toggles, GecStageMetrics::new())
    }

    #[test]
    fn empty_input_returns_empty_and_zero_timing() {
        let pipeline = build_pipeline(GecStageToggles::default());
        let out = pipeline.process("").unwrap();
        assert_eq!(out, "");
        let snap = pipeline.metrics().snapshot();
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.total_ms, 0);
    }

    #[test]
    fn disabled_stages_are_skipped() {
        let toggles = GecStageToggles {
            homophone: false,
            punctcap: false,
            grammar: false,
        };
        let pipeline = build_pipeline(toggles);
        let out = pipeline.process("hello how are you").unwrap();
        assert_eq!(out, "hello how are you");
    }

    #[test]
    fn stage_failure_falls_through_unchanged() {
        let dict = HomophoneDictionary::from_groups(vec![vec!["there".into(), "their".into()]]);
        let homophone = HomophoneCorrector::new(vocab(), dict, FailingMlm);
        let punctcap = PunctCapRestorer::new(vocab(), PassthroughPunctCap);
        let grammar = GrammarCorrector::new(NoopRewriter, GrammarConfig::default());
        let pipeline = GecPipeline::new(homophone, punctcap, grammar, GecStageToggles::default(), GecStageMetrics::new());

        let out = pipeline.process("there are six of their there").unwrap();
        assert_eq!(out, "there are six of their there");
        let snap = pipeline.metrics().snapshot();
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.homo_changes, 0);
    }

    #[test]
    fn counters_accumulate_across_calls() {
        let pipeline = build_pipeline(GecStageToggles::default());
        pipeline.process("hello how are you").unwrap();
        pipeline.process("").unwrap();
        let snap = pipeline.metrics().snapshot();
        assert_eq!(snap.processed, 2);
    }
}
