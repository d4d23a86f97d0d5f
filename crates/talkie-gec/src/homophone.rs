//! Homophone corrector. Operates at the whitespace-word level:
//! multi-token examples (`"they're"` vs `"their"` vs `"there"`) are
//! each a single word that WordPiece-splits into more than one
//! sub-token, not a multi-word phrase, so masking and scoring only
//! ever spans one word's token range.

use talkie_foundation::GecError;
use talkie_nn::tokenizer::{DEFAULT_MAX_SEQ_LEN, MASK_ID};
use talkie_nn::WordPieceTokenizer;

use crate::dictionary::HomophoneDictionary;

pub const DEFAULT_MARGIN: f32 = 0.0;

/// No numeric default was given for the confidence ceiling; -1.0 nats
/// is chosen here as "not already near-certain" — log-probs close to
/// 0 are reserved for tokens the model is confident about, and this
/// keeps those from churning. Recorded as an Open Question decision
/// in DESIGN.md.
pub const DEFAULT_CONFIDENCE_CEILING: f32 = -1.0;

/// A masked-language-model forward pass: given a token sequence with
/// `[MASK]` already placed at `masked_positions`, return the
/// log-probability of `target_ids[i]` at `masked_positions[i]`.
pub trait MaskedLanguageModel {
    fn log_probs_at(&self, ids: &[u32], masked_positions: &[usize], target_ids: &[u32]) -> Result<Vec<f32>, GecError>;
}

/// Production MLM backed by an ONNX graph session (C8).
pub struct OrtMaskedLm {
    model: talkie_nn::GraphModel,
}

impl OrtMaskedLm {
    pub fn new(model: talkie_nn::GraphModel) -> Self {
        Self { model }
    }
}

impl MaskedLanguageModel for OrtMaskedLm {
    fn log_probs_at(&self, ids: &[u32], masked_positions: &[usize], target_ids: &[u32]) -> Result<Vec<f32>, GecError> {
        let seq_len = ids.len();
        let input: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        let mut request = self.model.create_request();
        request.set_input(0, vec![1, seq_len as i64], input);
        let outputs = request.infer(&self.model)?;
        let logits = outputs
            .first()
            .ok_or_else(|| GecError::Tokenizer("MLM produced no output tensor".into()))?;
        let vocab_size = *logits
            .shape
            .last()
            .ok_or_else(|| GecError::Tokenizer("MLM output tensor has no trailing dim".into()))?;

        let mut out = Vec::with_capacity(masked_positions.len());
        for (&pos, &target) in masked_positions.iter().zip(target_ids) {
            let row = &logits.data[pos * vocab_size..(pos + 1) * vocab_size];
            out.push(log_softmax_at(row, target as usize));
        }
        Ok(out)
    }
}

fn log_softmax_at(logits: &[f32], index: usize) -> f32 {
    let max = logits.iter().cloned().fold(f32::MIN, f32::max);
    let log_sum_exp = logits.iter().map(|&v| (v - max).exp()).sum::<f32>().ln() + max;
    logits[index] - log_sum_exp
}

pub struct HomophoneCorrector<M: MaskedLanguageModel> {
    tokenizer: WordPieceTokenizer,
    dictionary: HomophoneDictionary,
    mlm: M,
    margin: f32,
    confidence_ceiling: f32,
}

impl<M: MaskedLanguageModel> HomophoneCorrector<M> {
    pub fn new(tokenizer: WordPieceTokenizer, dictionary: HomophoneDictionary, mlm: M) -> Self {
        Self {
            tokenizer,
            dictionary,
            mlm,
            margin: DEFAULT_MARGIN,
            confidence_ceiling: DEFAULT_CONFIDENCE_CEILING,
        }
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_confidence_ceiling(mut self, ceiling: f32) -> Self {
        self.confidence_ceiling = ceiling;
        self
    }

    /// Returns the (possibly) corrected text and whether any word changed.
    pub fn correct(&self, text: &str) -> Result<(String, bool), GecError> {
        if text.trim().is_empty() {
            return Ok((String::new(), false));
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let (seq, spans) = self
            .tokenizer
            .encode_with_word_spans(text, DEFAULT_MAX_SEQ_LEN);

        let mut replacements: Vec<Option<&str>> = vec![None; words.len()];
        let mut changed = false;

        for (i, word) in words.iter().enumerate() {
            let Some(&(start, end)) = spans.get(i) else {
                continue;
            };
            if start == end {
                continue; // truncated away by max_len
            }
            let lower = word.to_lowercase();
            let Some(group) = self.dictionary.group_for(&lower) else {
                continue;
            };

            let original_ids = self.tokenizer.tokenize_word(&lower);
            let original_score = self.score_candidate(&seq.ids, start, end, &original_ids)?;

            let mut best_word: Option<&str> = None;
            let mut best_score = f32::MIN;
            for member in group {
                if member.eq_ignore_ascii_case(&lower) {
                    continue;
                }
                let member_ids = self.tokenizer.tokenize_word(&member.to_lowercase());
                let score = self.score_candidate(&seq.ids, start, end, &member_ids)?;
                if score > best_score {
                    best_score = score;
                    best_word = Some(member.as_str());
                }
            }

            if let Some(candidate) = best_word {
                if best_score > original_score + self.margin && original_score < self.confidence_ceiling {
                    replacements[i] = Some(candidate);
                    changed = true;
                }
            }
        }

        let corrected = words
            .iter()
            .enumerate()
            .map(|(i, w)| replacements[i].unwrap_or(w))
            .collect::<Vec<_>>()
            .join(" ");
        Ok((corrected, changed))
    }

    /// Masks `[start, start+len)` where `len = min(word width, candidate
    /// token count)`, then sums the candidate's per-position log-probs,
    /// an approximation to the geometric-mean phrase probability.
    fn score_candidate(&self, ids: &[u32], start: usize, end: usize, candidate_ids: &[u32]) -> Result<f32, GecError> {
        let width = end - start;
        let len = width.min(candidate_ids.len());
        if len == 0 {
            return Ok(0.0);
        }
        let mut masked = ids.to_vec();
        for pos in start..start + len {
            masked[pos] = MASK_ID;
        }
        let positions: Vec<usize> = (start..start + len).collect();
        let targets = &candidate_ids[..len];
        let log_probs = self.mlm.log_probs_at(&masked, &positions, targets)?;
        Ok(log_probs.iter().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic stand-in MLM: a per-token-id log-prob table. Any id
    /// not listed gets a strongly negative default so unrelated tokens
    /// never look attractive to the scorer.
    struct FakeMlm {
        scores: HashMap<u32, f32>,
    }

    impl FakeMlm {
        fn new(scores: HashMap<u32, f32>) -> Self {
            Self { scores }
        }
    }

    impl MaskedLanguageModel for FakeMlm {
        fn log_probs_at(&self, _ids: &[u32], _positions: &[usize], target_ids: &[u32]) -> Result<Vec<f32>, GecError> {
            Ok(target_ids
                .iter()
                .map(|id| *self.scores.get(id).unwrap_or(&-10.0))
                .collect())
        }
    }

    fn vocab_with(words: &[&str]) -> WordPieceTokenizer {
        let mut lines: Vec<String> = (0..100).map(|i| format!("[unused{i}]")).collect();
        lines.push("[UNK]".into());
        lines.push("[CLS]".into());
        lines.push("[SEP]".into());
        lines.push("[MASK]".into());
        lines[0] = "[PAD]".into();
        for w in words {
            lines.push(w.to_string());
        }
        WordPieceTokenizer::from_vocab_lines(lines.iter().map(|s| s.as_str()))
    }

    #[test]
    fn replaces_homophone_when_clearly_better_and_original_unconfident() {
        let words = ["turn", "write", "right", "at", "the", "light"];
        let vocab = vocab_with(&words);
        let dict = HomophoneDictionary::from_groups(vec![vec!["write".into(), "right".into()]]);

        let write_id = vocab.token_to_id("write").unwrap();
        let right_id = vocab.token_to_id("right").unwrap();
        let mut scores = HashMap::new();
        scores.insert(write_id, -3.0); // original: below ceiling, unconfident
        scores.insert(right_id, -0.1); // candidate: clearly better

        let corrector = HomophoneCorrector::new(vocab, dict, FakeMlm::new(scores));
        let (out, changed) = corrector.correct("turn write at the light").unwrap();
        assert!(changed);
        assert_eq!(out, "turn right at the light");
    }

    #[test]
    fn leaves_confident_original_alone() {
        let words = ["write", "right", "a", "letter"];
        let vocab = vocab_with(&words);
        let dict = HomophoneDictionary::from_groups(vec![vec!["write".into(), "right".into()]]);

        let write_id = vocab.token_to_id("write").unwrap();
        let right_id = vocab.token_to_id("right").unwrap();
        let mut scores = HashMap::new();
        scores.insert(write_id, -0.05); // above the confidence ceiling (-1.0)
        scores.insert(right_id, -0.01); // technically scores higher, but churn is suppressed

        let corrector = HomophoneCorrector::new(vocab, dict, FakeMlm::new(scores));
        let (out, changed) = corrector.correct("write a letter").unwrap();
        assert!(!changed);
        assert_eq!(out, "write a letter");
    }

    #[test]
    fn words_outside_any_group_are_untouched() {
        let words = ["hello", "world"];
        let vocab = vocab_with(&words);
        let dict = HomophoneDictionary::from_groups(vec![vec!["write".into(), "right".into()]]);
        let corrector = HomophoneCorrector::new(vocab, dict, FakeMlm::new(HashMap::new()));
        let (out, changed) = corrector.correct("hello world").unwrap();
        assert!(!changed);
        assert_eq!(out, "hello world");
    }

    #[test]
    fn empty_input_short_circuits() {
        let vocab = vocab_with(&["a"]);
        let dict = HomophoneDictionary::from_groups(vec![]);
        let corrector = HomophoneCorrector::new(vocab, dict, FakeMlm::new(HashMap::new()));
        let (out, changed) = corrector.correct("").unwrap();
        assert_eq!(out, "");
        assert!(!changed);
    }

    #[test]
    fn output_word_count_equals_input_word_count() {
        let words = ["i", "went", "to", "there", "their", "house"];
        let vocab = vocab_with(&words);
        let dict = HomophoneDictionary::from_groups(vec![vec!["there".into(), "their".into()]]);
        let there_id = vocab.token_to_id("there").unwrap();
        let their_id = vocab.token_to_id("their").unwrap();
        let mut scores = HashMap::new();
        scores.insert(there_id, -4.0);
        scores.insert(their_id, -0.01);
        let corrector = HomophoneCorrector::new(vocab, dict, FakeMlm::new(scores));
        let (out, _) = corrector.correct("i went to there house").unwrap();
        assert_eq!(out.split_whitespace().count(), 5);
        assert!(out.contains("their"));
        assert!(!out.contains("there house"));
    }
}
