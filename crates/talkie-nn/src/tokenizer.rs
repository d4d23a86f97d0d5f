//! Hand-rolled WordPiece tokenizer. Not the `tokenizers` crate — the
//! vocab format here is a bare newline-delimited token list, not a
//! `tokenizer.json`, and the greedy-longest-prefix algorithm is small
//! enough to own directly.

use std::collections::HashMap;
use std::path::Path;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 100;
pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;
pub const MASK_ID: u32 = 103;
pub const DEFAULT_MAX_SEQ_LEN: usize = 64;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const MASK_TOKEN: &str = "[MASK]";

#[derive(Debug, Clone)]
pub struct TokenSequence {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

pub struct WordPieceTokenizer {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
}

impl WordPieceTokenizer {
    pub fn from_vocab_file(path: &Path) -> Result<Self, talkie_foundation::GecError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| talkie_foundation::GecError::Tokenizer(format!("reading vocab file: {e}")))?;
        Ok(Self::from_vocab_lines(contents.lines()))
    }

    pub fn from_vocab_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let id_to_token: Vec<String> = lines.map(|l| l.to_string()).collect();
        let token_to_id = id_to_token
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self {
            token_to_id,
            id_to_token,
        }
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(id as usize).map(|s| s.as_str())
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Greedy longest-prefix-match WordPiece for a single lowercased word.
    pub fn tokenize_word(&self, word: &str) -> Vec<u32> {
        if self.token_to_id.contains_key(word) {
            return vec![self.token_to_id[word]];
        }

        let chars: Vec<char> = word.chars().collect();
        let mut out = Vec::new();
        let mut start = 0;
        let mut is_first_piece = true;

        while start < chars.len() {
            let mut end = chars.len();
            let mut matched = None;
            while end > start {
                let candidate: String = chars[start..end].iter().collect();
                let lookup = if is_first_piece {
                    candidate
                } else {
                    format!("##{candidate}")
                };
                if let Some(&id) = self.token_to_id.get(&lookup) {
                    matched = Some((id, end));
                    break;
                }
                end -= 1;
            }

            match matched {
                Some((id, end)) => {
                    out.push(id);
                    start = end;
                    is_first_piece = false;
                }
                None => {
                    return vec![UNK_ID];
                }
            }
        }

        out
    }

    /// `encode(text, max_len)`: lowercase, whitespace-split, WordPiece
    /// each word, wrap in `[CLS]`/`[SEP]`, pad/truncate to `max_len`.
    pub fn encode(&self, text: &str, max_len: usize) -> TokenSequence {
        let lowered = text.to_lowercase();
        let mut ids = vec![CLS_ID];

        for word in lowered.split_whitespace() {
            ids.extend(self.tokenize_word(word));
        }

        // Truncate at max_len - 1 so [SEP] still fits.
        if ids.len() > max_len.saturating_sub(1) {
            ids.truncate(max_len.saturating_sub(1));
        }
        ids.push(SEP_ID);

        while ids.len() < max_len {
            ids.push(PAD_ID);
        }
        ids.truncate(max_len);

        let attention_mask = ids.iter().map(|&id| if id == PAD_ID { 0 } else { 1 }).collect();

        TokenSequence { ids, attention_mask }
    }

    /// Like `encode`, but also returns each whitespace word's token
    /// span (start, end) within `ids`, accounting for the leading
    /// `[CLS]`. Used by the GEC stages to locate a word's positions
    /// for masking. A word dropped by truncation gets an empty span.
    pub fn encode_with_word_spans(&self, text: &str, max_len: usize) -> (TokenSequence, Vec<(usize, usize)>) {
        let lowered = text.to_lowercase();
        let mut ids = vec![CLS_ID];
        let mut spans = Vec::new();

        for word in lowered.split_whitespace() {
            let word_ids = self.tokenize_word(word);
            let start = ids.len();
            ids.extend(word_ids);
            let end = ids.len();
            spans.push((start, end));
        }

        let content_len = max_len.saturating_sub(1);
        if ids.len() > content_len {
            ids.truncate(content_len);
        }
        spans = spans
            .into_iter()
            .map(|(s, e)| (s.min(ids.len()), e.min(ids.len())))
            .collect();
        ids.push(SEP_ID);

        while ids.len() < max_len {
            ids.push(PAD_ID);
        }
        ids.truncate(max_len);

        let attention_mask = ids.iter().map(|&id| if id == PAD_ID { 0 } else { 1 }).collect();
        (TokenSequence { ids, attention_mask }, spans)
    }

    /// `attention_mask(ids)`: 1 where id != [PAD], else 0.
    pub fn attention_mask(ids: &[u32]) -> Vec<u32> {
        ids.iter().map(|&id| if id == PAD_ID { 0 } else { 1 }).collect()
    }

    /// Joins tokens back into whitespace-split words, reattaching
    /// `##`-prefixed continuations without a space. Skips special
    /// tokens. Round-trips exactly for in-vocabulary whole words.
    pub fn decode(&self, ids: &[u32]) -> String {
        let mut words: Vec<String> = Vec::new();
        for &id in ids {
            if matches!(id, PAD_ID | CLS_ID | SEP_ID | MASK_ID) {
                continue;
            }
            let token = self.id_to_token(id).unwrap_or(UNK_TOKEN);
            if let Some(suffix) = token.strip_prefix("##") {
                if let Some(last) = words.last_mut() {
                    last.push_str(suffix);
                    continue;
                }
            }
            words.push(token.to_string());
        }
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vocab() -> WordPieceTokenizer {
        let lines = [
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "hello", "how", "are", "you", "the",
            "run", "##ning", "car", "##s",
        ];
        WordPieceTokenizer::from_vocab_lines(lines.into_iter())
    }

    fn full_vocab() -> WordPieceTokenizer {
        // Build a vocab whose special-token ids match the fixed ids
        // by padding with filler entries up to each reserved slot.
        let mut lines: Vec<String> = (0..100).map(|i| format!("[unused{i}]")).collect();
        lines.push(UNK_TOKEN.to_string());
        lines.push(CLS_TOKEN.to_string());
        lines.push(SEP_TOKEN.to_string());
        lines.push(MASK_TOKEN.to_string());
        lines[PAD_ID as usize] = PAD_TOKEN.to_string();
        for w in ["hello", "how", "are", "you", "run", "car"] {
            lines.push(w.to_string());
        }
        lines.push("##ning".to_string());
        lines.push("##s".to_string());
        WordPieceTokenizer::from_vocab_lines(lines.iter().map(|s| s.as_str()))
    }

    #[test]
    fn special_ids_match_spec_constants() {
        let vocab = full_vocab();
        assert_eq!(vocab.token_to_id(PAD_TOKEN), Some(PAD_ID));
        assert_eq!(vocab.token_to_id(UNK_TOKEN), Some(UNK_ID));
        assert_eq!(vocab.token_to_id(CLS_TOKEN), Some(CLS_ID));
        assert_eq!(vocab.token_to_id(SEP_TOKEN), Some(SEP_ID));
        assert_eq!(vocab.token_to_id(MASK_TOKEN), Some(MASK_ID));
    }

    #[test]
    fn encode_wraps_with_cls_and_sep_and_pads() {
        let vocab = full_vocab();
        let seq = vocab.encode("hello how are you", 16);
        assert_eq!(seq.ids.len(), 16);
        assert_eq!(seq.ids[0], CLS_ID);
        let sep_pos = seq.ids.iter().position(|&id| id == SEP_ID).unwrap();
        assert_eq!(sep_pos, 5); // CLS + 4 words + SEP
        for &id in &seq.ids[sep_pos + 1..] {
            assert_eq!(id, PAD_ID);
        }
    }

    #[test]
    fn attention_mask_matches_non_pad_positions() {
        let vocab = full_vocab();
        let seq = vocab.encode("hello", 8);
        let mask = WordPieceTokenizer::attention_mask(&seq.ids);
        assert_eq!(mask, seq.attention_mask);
        assert_eq!(mask.iter().sum::<u32>() as usize, seq.ids.iter().filter(|&&id| id != PAD_ID).count());
    }

    #[test]
    fn unknown_word_maps_to_unk() {
        let vocab = test_vocab();
        let seq = vocab.encode("zzzznotaword", 8);
        assert!(seq.ids.contains(&UNK_ID));
    }

    #[test]
    fn continuation_pieces_use_hash_prefix() {
        let vocab = full_vocab();
        let ids = vocab.tokenize_word("running");
        let tokens: Vec<&str> = ids.iter().map(|&id| vocab.id_to_token(id).unwrap()).collect();
        assert_eq!(tokens, vec!["run", "##ning"]);
    }

    #[test]
    fn encode_truncates_before_sep_not_after() {
        let vocab = full_vocab();
        let seq = vocab.encode("hello how are you hello how are you hello how are you", 6);
        assert_eq!(seq.ids.len(), 6);
        // SEP always survives truncation — it's the last non-pad id.
        assert_eq!(*seq.ids.last().unwrap(), SEP_ID);
        assert_eq!(seq.ids[0], CLS_ID);
    }

    #[test]
    fn word_spans_locate_each_words_tokens() {
        let vocab = full_vocab();
        let (seq, spans) = vocab.encode_with_word_spans("running cars", 16);
        assert_eq!(spans.len(), 2);
        let (s0, e0) = spans[0];
        let (s1, e1) = spans[1];
        assert_eq!(s0, 1); // right after [CLS]
        assert_eq!(e0 - s0, 2); // "run", "##ning"
        assert_eq!(s1, e0);
        assert_eq!(e1 - s1, 2); // "car", "##s"
        assert_eq!(seq.ids[0], CLS_ID);
    }

    #[test]
    fn decode_rejoins_continuation_without_space() {
        let vocab = full_vocab();
        let seq = vocab.encode("running cars", 16);
        let decoded = vocab.decode(&seq.ids);
        assert_eq!(decoded, "running cars");
    }
}
