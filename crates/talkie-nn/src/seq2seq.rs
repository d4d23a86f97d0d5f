//! Seq2seq backend: an `ort`-backed encoder/decoder session pair,
//! sharing `GraphModel`'s load path, with a greedy decoding loop.

use std::path::Path;
use talkie_foundation::NnError;

use crate::graph::{Device, GraphModel, NnRuntimeCore};
use crate::tokenizer::{WordPieceTokenizer, CLS_ID, PAD_ID, SEP_ID};

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub beam_size: u32,
    pub max_decode_len: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            beam_size: 1,
            max_decode_len: 256,
        }
    }
}

pub struct Seq2seqTranslator {
    encoder: GraphModel,
    decoder: GraphModel,
    tokenizer: WordPieceTokenizer,
}

impl Seq2seqTranslator {
    pub fn load(dir: &Path, tokenizer: WordPieceTokenizer, core: NnRuntimeCore) -> Result<Self, NnError> {
        let encoder = GraphModel::load(&dir.join("encoder.onnx"), Device::Cpu, core.clone())?;
        let decoder = GraphModel::load(&dir.join("decoder.onnx"), Device::Cpu, core)?;
        Ok(Self {
            encoder,
            decoder,
            tokenizer,
        })
    }

    /// Greedy (beam_size=1 only) decode loop: encode once, then
    /// repeatedly infer the decoder on the growing output sequence
    /// until `[SEP]` or `max_decode_len`.
    pub fn translate(&self, text: &str, opts: &TranslateOptions) -> Result<String, NnError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if opts.beam_size != 1 {
            tracing::debug!(beam_size = opts.beam_size, "only greedy (beam_size=1) decoding is implemented");
        }

        let encoded = self.tokenizer.encode(text, crate::tokenizer::DEFAULT_MAX_SEQ_LEN);
        let ids: Vec<i64> = encoded.ids.iter().map(|&id| id as i64).collect();
        let seq_len = ids.len();

        let mut request = self.encoder.create_request();
        request.set_input(0, vec![1, seq_len as i64], ids);
        let encoder_out = request.infer(&self.encoder)?;

        let mut output_ids = vec![CLS_ID as i64];
        for _ in 0..opts.max_decode_len {
            let mut decode_request = self.decoder.create_request();
            decode_request.set_input(0, vec![1, output_ids.len() as i64], output_ids.clone());
            if let Some(first) = encoder_out.first() {
                let flat: Vec<i64> = first.data.iter().map(|&f| f as i64).collect();
                decode_request.set_input(1, first.shape.iter().map(|&d| d as i64).collect(), flat);
            }
            let decoded = decode_request.infer(&self.decoder)?;
            let next_id = argmax_last_position(&decoded)?;
            output_ids.push(next_id);
            if next_id == SEP_ID as i64 {
                break;
            }
        }

        let final_ids: Vec<u32> = output_ids
            .into_iter()
            .filter(|&id| id != PAD_ID as i64)
            .map(|id| id as u32)
            .collect();
        Ok(self.tokenizer.decode(&final_ids))
    }
}

fn argmax_last_position(outputs: &[crate::graph::InferOutput]) -> Result<i64, NnError> {
    let logits = outputs.first().ok_or_else(|| NnError::ShapeMismatch {
        expected: "at least one decoder output".into(),
        actual: "none".into(),
    })?;
    let vocab_size = *logits.shape.last().ok_or_else(|| NnError::ShapeMismatch {
        expected: "rank >= 1 logits tensor".into(),
        actual: format!("shape {:?}", logits.shape),
    })?;
    let last_position = &logits.data[logits.data.len() - vocab_size..];
    let (best_idx, _) = last_position
        .iter()
        .enumerate()
        .fold((0usize, f32::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
    Ok(best_idx as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_spec_latency_defaults() {
        let opts = TranslateOptions::default();
        assert_eq!(opts.beam_size, 1);
        assert_eq!(opts.max_decode_len, 256);
    }
}
