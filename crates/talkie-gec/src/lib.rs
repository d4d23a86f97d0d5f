pub mod dictionary;
pub mod grammar;
pub mod homophone;
pub mod pipeline;
pub mod punctcap;

pub use dictionary::HomophoneDictionary;
pub use grammar::{GrammarConfig, GrammarCorrector, GrammarRewriter, Seq2seqGrammarRewriter};
pub use homophone::{HomophoneCorrector, MaskedLanguageModel, OrtMaskedLm};
pub use pipeline::{GecPipeline, GecStageToggles};
pub use punctcap::{Casing, Punct, PunctCapModel, PunctCapRestorer};
