//! Punctuation & capitalization restorer. The class→(casing,
//! punctuation) table is an implementation constant; the ordering
//! chosen here (casing-major, `id = casing*6 + punct`) is recorded in
//! DESIGN.md as an Open Question decision.

use talkie_foundation::GecError;
use talkie_nn::tokenizer::{CLS_ID, MASK_ID, PAD_ID, SEP_ID};
use talkie_nn::WordPieceTokenizer;

pub const NUM_CASINGS: usize = 3;
pub const NUM_PUNCTS: usize = 6;
pub const NUM_CLASSES: usize = NUM_CASINGS * NUM_PUNCTS;

/// Logit margin by which the overall-best class must beat the
/// best-lowercase class to override the mid-sentence lowercase bias.
pub const BIAS_OVERRIDE_MARGIN: f32 = 4.0;

const CONTRACTION_SUFFIXES: [&str; 7] = ["m", "t", "s", "re", "ve", "ll", "d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    Lower,
    Upper,
    FirstCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    None,
    Period,
    Comma,
    Question,
    Exclaim,
    Colon,
}

impl Punct {
    fn text(self) -> &'static str {
        match self {
            Punct::None => "",
            Punct::Period => ".",
            Punct::Comma => ",",
            Punct::Question => "?",
            Punct::Exclaim => "!",
            Punct::Colon => ":",
        }
    }

    fn is_sentence_terminator(self) -> bool {
        matches!(self, Punct::Period | Punct::Question | Punct::Exclaim)
    }
}

const CASINGS: [Casing; NUM_CASINGS] = [Casing::Lower, Casing::Upper, Casing::FirstCap];
const PUNCTS: [Punct; NUM_PUNCTS] = [
    Punct::None,
    Punct::Period,
    Punct::Comma,
    Punct::Question,
    Punct::Exclaim,
    Punct::Colon,
];

pub fn class_for(id: usize) -> (Casing, Punct) {
    (CASINGS[id / NUM_PUNCTS], PUNCTS[id % NUM_PUNCTS])
}

fn apply_casing(text: &str, casing: Casing) -> String {
    match casing {
        Casing::Lower => text.to_lowercase(),
        Casing::Upper => text.to_uppercase(),
        Casing::FirstCap => {
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

/// Argmax over all 24 classes, then argmax restricted to the 6
/// lowercase-casing classes; apply the mid-sentence lowercase bias
/// unless the overall best exceeds the lowercase best by `>= 4.0`.
fn choose_class(logits: &[f32; NUM_CLASSES], apply_bias: bool) -> usize {
    let (best_idx, best_val) = argmax(logits.iter().copied());
    if !apply_bias {
        return best_idx;
    }
    let (lower_idx, lower_val) = argmax((0..NUM_PUNCTS).map(|i| logits[i]));
    if best_val - lower_val >= BIAS_OVERRIDE_MARGIN {
        best_idx
    } else {
        lower_idx
    }
}

fn argmax(values: impl Iterator<Item = f32>) -> (usize, f32) {
    values
        .enumerate()
        .fold((0, f32::MIN), |(bi, bv), (i, v)| if v > bv { (i, v) } else { (bi, bv) })
}

pub trait PunctCapModel {
    /// Per-position logits over the 24 classes, one entry per input id.
    fn classify(&self, ids: &[u32]) -> Result<Vec<[f32; NUM_CLASSES]>, GecError>;
}

pub struct OrtPunctCapModel {
    model: talkie_nn::GraphModel,
}

impl OrtPunctCapModel {
    pub fn new(model: talkie_nn::GraphModel) -> Self {
        Self { model }
    }
}

impl PunctCapModel for OrtPunctCapModel {
    fn classify(&self, ids: &[u32]) -> Result<Vec<[f32; NUM_CLASSES]>, GecError> {
        let seq_len = ids.len();
        let input: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        let mut request = self.model.create_request();
        request.set_input(0, vec![1, seq_len as i64], input);
        let outputs = request.infer(&self.model)?;
        let logits = outputs
            .first()
            .ok_or_else(|| GecError::Tokenizer("punct/cap model produced no output tensor".into()))?;
        let expected = seq_len * NUM_CLASSES;
        if logits.data.len() != expected {
            return Err(GecError::Tokenizer(format!(
                "punct/cap output has {} values, expected seq_len*{NUM_CLASSES}={expected}",
                logits.data.len()
            )));
        }
        let mut out = Vec::with_capacity(seq_len);
        for pos in 0..seq_len {
            let mut row = [0f32; NUM_CLASSES];
            row.copy_from_slice(&logits.data[pos * NUM_CLASSES..(pos + 1) * NUM_CLASSES]);
            out.push(row);
        }
        Ok(out)
    }
}

pub struct PunctCapRestorer<M: PunctCapModel> {
    tokenizer: WordPieceTokenizer,
    model: M,
}

struct WordBuilder {
    core: String,
    trailing_punct: Punct,
}

impl WordBuilder {
    fn render(&self) -> String {
        format!("{}{}", self.core, self.trailing_punct.text())
    }
}

impl<M: PunctCapModel> PunctCapRestorer<M> {
    pub fn new(tokenizer: WordPieceTokenizer, model: M) -> Self {
        Self { tokenizer, model }
    }

    pub fn restore(&self, text: &str) -> Result<String, GecError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let seq = self
            .tokenizer
            .encode(text, talkie_nn::tokenizer::DEFAULT_MAX_SEQ_LEN);
        let class_logits = self.model.classify(&seq.ids)?;

        let mut words: Vec<WordBuilder> = Vec::new();
        let mut prev_was_terminator = true; // start-of-text: no bias on the first word
        let mut is_first = true;
        let mut prev_was_apostrophe = false;

        for (pos, &id) in seq.ids.iter().enumerate() {
            if matches!(id, PAD_ID | CLS_ID | SEP_ID | MASK_ID) {
                continue;
            }
            let apply_bias = !prev_was_terminator && !is_first;
            let class_id = choose_class(&class_logits[pos], apply_bias);
            let (casing, punct) = class_for(class_id);
            let token = self.tokenizer.id_to_token(id).unwrap_or("[UNK]");

            if let Some(suffix) = token.strip_prefix("##") {
                let cased = apply_casing(suffix, casing);
                if let Some(last) = words.last_mut() {
                    last.core.push_str(&cased);
                    last.trailing_punct = punct;
                } else {
                    words.push(WordBuilder { core: cased, trailing_punct: punct });
                }
                prev_was_apostrophe = false;
            } else if token == "'" {
                if let Some(last) = words.last_mut() {
                    last.core.push('\'');
                    last.trailing_punct = punct;
                } else {
                    words.push(WordBuilder { core: "'".into(), trailing_punct: punct });
                }
                prev_was_apostrophe = true;
                is_first = false;
                prev_was_terminator = punct.is_sentence_terminator();
                continue;
            } else if prev_was_apostrophe && CONTRACTION_SUFFIXES.contains(&token) {
                let cased = apply_casing(token, casing);
                if let Some(last) = words.last_mut() {
                    last.core.push_str(&cased);
                    last.trailing_punct = punct;
                }
                prev_was_apostrophe = false;
            } else {
                let cased = apply_casing(token, casing);
                words.push(WordBuilder { core: cased, trailing_punct: punct });
                prev_was_apostrophe = false;
            }

            is_first = false;
            prev_was_terminator = punct.is_sentence_terminator();
        }

        Ok(words.iter().map(WordBuilder::render).collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePunctCapModel {
        peak_class: std::collections::HashMap<usize, usize>,
    }

    impl FakePunctCapModel {
        fn new(peak_class: std::collections::HashMap<usize, usize>) -> Self {
            Self { peak_class }
        }
    }

    impl PunctCapModel for FakePunctCapModel {
        fn classify(&self, ids: &[u32]) -> Result<Vec<[f32; NUM_CLASSES]>, GecError> {
            Ok((0..ids.len())
                .map(|pos| {
                    let mut row = [0f32; NUM_CLASSES];
                    let peak = *self.peak_class.get(&pos).unwrap_or(&0);
                    row[peak] = 10.0;
                    row
                })
                .collect())
        }
    }

    fn full_vocab() -> WordPieceTokenizer {
        let mut lines: Vec<String> = (0..100).map(|i| format!("[unused{i}]")).collect();
        lines.push("[UNK]".into());
        lines.push("[CLS]".into());
        lines.push("[SEP]".into());
        lines.push("[MASK]".into());
        lines[0] = "[PAD]".into();
        for w in ["hello", "how", "are", "you", "'", "re", "write"] {
            lines.push(w.to_string());
        }
        WordPieceTokenizer::from_vocab_lines(lines.iter().map(|s| s.as_str()))
    }

    #[test]
    fn capitalizes_first_word_and_terminates_last() {
        let vocab = full_vocab();
        // token order within ids: [CLS, hello, how, are, you, SEP]
        let mut peaks = std::collections::HashMap::new();
        peaks.insert(1, 2 * NUM_PUNCTS + 0); // hello -> FirstCap, None
        peaks.insert(2, 0); // how -> Lower, None
        peaks.insert(3, 0); // are -> Lower, None
        peaks.insert(4, 0 * NUM_PUNCTS + 3); // you -> Lower, Question
        let model = FakePunctCapModel::new(peaks);
        let restorer = PunctCapRestorer::new(vocab, model);
        let out = restorer.restore("hello how are you").unwrap();
        assert_eq!(out, "Hello how are you?");
    }

    #[test]
    fn bias_suppresses_uppercase_mid_sentence_without_large_margin() {
        let logits_with_small_margin = {
            let mut row = [0f32; NUM_CLASSES];
            row[NUM_PUNCTS + 0] = 5.0; // Upper, None — overall best
            row[0] = 4.0; // Lower, None — best lowercase, margin 1.0 < 4.0
            row
        };
        let chosen = choose_class(&logits_with_small_margin, true);
        assert_eq!(chosen, 0); // bias wins: stays lowercase
    }

    #[test]
    fn bias_yields_to_confident_uppercase_prediction() {
        let logits_with_large_margin = {
            let mut row = [0f32; NUM_CLASSES];
            row[NUM_PUNCTS + 0] = 9.0; // Upper, None
            row[0] = 4.0; // Lower, None — margin 5.0 >= 4.0
            row
        };
        let chosen = choose_class(&logits_with_large_margin, true);
        assert_eq!(chosen, NUM_PUNCTS); // overall best wins
    }

    #[test]
    fn apostrophe_and_contraction_suffix_attach_without_space() {
        let vocab = full_vocab();
        // [CLS, you, ', re, SEP]
        let mut peaks = std::collections::HashMap::new();
        peaks.insert(1, 0); // you -> lower, none
        peaks.insert(2, 0); // ' -> lower, none
        peaks.insert(3, 0 * NUM_PUNCTS + 1); // re -> lower, Period
        let model = FakePunctCapModel::new(peaks);
        let restorer = PunctCapRestorer::new(vocab, model);
        let out = restorer.restore("you ' re").unwrap();
        assert_eq!(out, "you're.");
    }

    #[test]
    fn empty_input_returns_empty_string() {
        let vocab = full_vocab();
        let model = FakePunctCapModel::new(std::collections::HashMap::new());
        let restorer = PunctCapRestorer::new(vocab, model);
        assert_eq!(restorer.restore("").unwrap(), "");
    }
}
