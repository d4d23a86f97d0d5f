pub mod graph;
pub mod seq2seq;
pub mod tokenizer;

pub use graph::{Device, GraphModel, InferOutput, InferRequest, NnRuntimeCore};
pub use seq2seq::{Seq2seqTranslator, TranslateOptions};
pub use tokenizer::{TokenSequence, WordPieceTokenizer};
