//! Grammar corrector. Seq2seq rewrite of the whole string, disabled
//! by default since the tiny model hallucinates on short or
//! out-of-distribution input; an optional Levenshtein guard rejects
//! rewrites that drift too far from the input.

use talkie_foundation::GecError;

#[derive(Debug, Clone)]
pub struct GrammarConfig {
    pub enabled: bool,
    /// Reject a rewrite whose Levenshtein distance from the input
    /// exceeds this fraction of the input's character length. `None`
    /// disables the guard and returns the rewrite verbatim.
    pub max_levenshtein_fraction: Option<f32>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_levenshtein_fraction: None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait GrammarRewriter {
    fn rewrite(&self, text: &str) -> Result<String, GecError>;
}

pub struct Seq2seqGrammarRewriter {
    translator: talkie_nn::Seq2seqTranslator,
    options: talkie_nn::TranslateOptions,
}

impl Seq2seqGrammarRewriter {
    pub fn new(translator: talkie_nn::Seq2seqTranslator, options: talkie_nn::TranslateOptions) -> Self {
        Self { translator, options }
    }
}

impl GrammarRewriter for Seq2seqGrammarRewriter {
    fn rewrite(&self, text: &str) -> Result<String, GecError> {
        Ok(self.translator.translate(text, &self.options)?)
    }
}

pub struct GrammarCorrector<R: GrammarRewriter> {
    rewriter: R,
    config: GrammarConfig,
}

impl<R: GrammarRewriter> GrammarCorrector<R> {
    pub fn new(rewriter: R, config: GrammarConfig) -> Self {
        Self { rewriter, config }
    }

    /// Returns the (possibly) rewritten text and whether it changed.
    /// Disabled-by-default short-circuits to the input unchanged.
    pub fn correct(&self, text: &str) -> Result<(String, bool), GecError> {
        if !self.config.enabled || text.trim().is_empty() {
            return Ok((text.to_string(), false));
        }

        let candidate = self.rewriter.rewrite(text)?;

        if let Some(fraction) = self.config.max_levenshtein_fraction {
            let distance = levenshtein(text, &candidate);
            let threshold = (text.chars().count() as f32 * fraction).ceil() as usize;
            if distance > threshold {
                tracing::warn!(distance, threshold, "grammar rewrite rejected by levenshtein guard");
                return Ok((text.to_string(), false));
            }
        }

        let changed = candidate != text;
        Ok((candidate, changed))
    }
}

/// Classic O(len_a * len_b) edit distance, rolling two rows.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct FakeRewriter {
        output: String,
    }

    impl GrammarRewriter for FakeRewriter {
        fn rewrite(&self, _text: &str) -> Result<String, GecError> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn levenshtein_matches_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn disabled_by_default_leaves_input_untouched() {
        let rewriter = FakeRewriter { output: "A completely different sentence".into() };
        let corrector = GrammarCorrector::new(rewriter, GrammarConfig::default());
        let (out, changed) = corrector.correct("the cat sat on the mat").unwrap();
        assert_eq!(out, "the cat sat on the mat");
        assert!(!changed);
    }

    #[test]
    fn guard_rejects_rewrites_that_drift_too_far() {
        let rewriter = FakeRewriter { output: "a totally unrelated sentence about nothing".into() };
        let config = GrammarConfig {
            enabled: true,
            max_levenshtein_fraction: Some(0.3),
        };
        let corrector = GrammarCorrector::new(rewriter, config);
        let (out, changed) = corrector.correct("the cat sat on the mat").unwrap();
        assert_eq!(out, "the cat sat on the mat");
        assert!(!changed);
    }

    #[test]
    fn guard_allows_rewrites_within_threshold() {
        let rewriter = FakeRewriter { output: "The cat sat on the mat.".into() };
        let config = GrammarConfig {
            enabled: true,
            max_levenshtein_fraction: Some(0.3),
        };
        let corrector = GrammarCorrector::new(rewriter, config);
        let (out, changed) = corrector.correct("the cat sat on the mat").unwrap();
        assert_eq!(out, "The cat sat on the mat.");
        assert!(changed);
    }

    #[test]
    fn unguarded_output_returned_verbatim() {
        let rewriter = FakeRewriter { output: "wildly different text entirely".into() };
        let config = GrammarConfig {
            enabled: true,
            max_levenshtein_fraction: None,
        };
        let corrector = GrammarCorrector::new(rewriter, config);
        let (out, changed) = corrector.correct("original text").unwrap();
        assert_eq!(out, "wildly different text entirely");
        assert!(changed);
    }

    #[test]
    fn mocked_rewriter_is_called_once_per_correct_call() {
        let mut mock = MockGrammarRewriter::new();
        mock.expect_rewrite()
            .times(1)
            .withf(|text| text == "the cat sat on the mat")
            .returning(|_| Ok("The cat sat on the mat.".to_string()));

        let config = GrammarConfig {
            enabled: true,
            max_levenshtein_fraction: Some(0.3),
        };
        let corrector = GrammarCorrector::new(mock, config);
        let (out, changed) = corrector.correct("the cat sat on the mat").unwrap();
        assert_eq!(out, "The cat sat on the mat.");
        assert!(changed);
    }

    #[test]
    fn mocked_rewriter_error_propagates() {
        let mut mock = MockGrammarRewriter::new();
        mock.expect_rewrite()
            .returning(|_| Err(GecError::Tokenizer("translator unavailable".into())));

        let config = GrammarConfig {
            enabled: true,
            max_levenshtein_fraction: None,
        };
        let corrector = GrammarCorrector::new(mock, config);
        assert!(corrector.correct("some text").is_err());
    }

    proptest! {
        #[test]
        fn levenshtein_is_zero_for_identical_strings(s in "[a-zA-Z ]{0,40}") {
            prop_assert_eq!(levenshtein(&s, &s), 0);
        }

        #[test]
        fn levenshtein_is_symmetric(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
            prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        }

        #[test]
        fn levenshtein_is_bounded_by_longer_length(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
            let bound = a.chars().count().max(b.chars().count());
            prop_assert!(levenshtein(&a, &b) <= bound);
        }
    }
}
