//! Lexicon Sentiment Classifier
//!
//! Rule-based polarity scoring used when no model artifacts are configured.

use crate::engine::{SentimentLabel, SentimentResult};
use crate::{InferenceError, SentimentClassifier};
use std::collections::HashMap;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 1.5),
    ("great", 2.0),
    ("excellent", 2.5),
    ("amazing", 2.5),
    ("awesome", 2.5),
    ("cool", 2.0),
    ("love", 2.5),
    ("loved", 2.5),
    ("lovely", 2.0),
    ("like", 1.0),
    ("liked", 1.0),
    ("nice", 1.5),
    ("happy", 2.0),
    ("best", 2.5),
    ("fantastic", 2.5),
    ("wonderful", 2.5),
    ("brilliant", 2.5),
    ("enjoy", 1.5),
    ("enjoyed", 1.5),
    ("perfect", 2.5),
    ("superb", 2.5),
    ("beautiful", 2.0),
    ("fun", 1.5),
    ("glad", 1.5),
    ("impressive", 2.0),
    ("recommend", 1.5),
    ("helpful", 1.5),
    ("pleasant", 1.5),
    ("satisfied", 1.5),
    ("favorite", 2.0),
    ("incredible", 2.5),
    ("outstanding", 2.5),
    ("thanks", 1.0),
    ("works", 1.0),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", 1.5),
    ("terrible", 2.5),
    ("awful", 2.5),
    ("horrible", 2.5),
    ("hate", 2.5),
    ("hated", 2.5),
    ("worst", 2.5),
    ("poor", 1.5),
    ("boring", 1.5),
    ("sad", 1.5),
    ("angry", 2.0),
    ("disappointing", 2.0),
    ("disappointed", 2.0),
    ("ugly", 2.0),
    ("broken", 2.0),
    ("useless", 2.0),
    ("annoying", 2.0),
    ("fail", 1.5),
    ("failed", 1.5),
    ("failure", 2.0),
    ("slow", 1.0),
    ("wrong", 1.5),
    ("waste", 2.0),
    ("sucks", 2.5),
    ("mediocre", 1.5),
    ("problem", 1.0),
    ("painful", 2.0),
    ("buggy", 1.5),
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "so",
    "super",
    "pretty",
    "incredibly",
    "absolutely",
    "totally",
    "quite",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "hardly", "neither", "nor", "without",
];

/// Tokens after a negator that are still flipped
const NEGATION_SCOPE: usize = 3;

/// Slope of the logistic squashing applied to the raw polarity
const SCORE_SLOPE: f64 = 1.6;

/// Word-list sentiment classifier
pub struct LexiconClassifier {
    polarity: HashMap<&'static str, f64>,
}

impl LexiconClassifier {
    /// Create a classifier with the built-in word lists
    pub fn new() -> Self {
        let polarity = POSITIVE_WORDS
            .iter()
            .map(|&(w, v)| (w, v))
            .chain(NEGATIVE_WORDS.iter().map(|&(w, v)| (w, -v)))
            .collect();
        Self { polarity }
    }

    /// Raw signed polarity of a text; positive means positive sentiment
    pub fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .collect();

        let mut total = 0.0;
        let mut boost = 1.0;
        let mut negated_for = 0usize;

        for token in tokens {
            if NEGATORS.contains(&token) || token.ends_with("n't") {
                negated_for = NEGATION_SCOPE;
                continue;
            }
            if INTENSIFIERS.contains(&token) {
                boost = 1.5;
                continue;
            }

            if let Some(&value) = self.polarity.get(token) {
                let value = value * boost;
                total += if negated_for > 0 { -value } else { value };
                negated_for = 0;
            } else {
                negated_for = negated_for.saturating_sub(1);
            }
            boost = 1.0;
        }

        let exclamations = text.matches('!').count().min(3) as f64;
        total * (1.0 + 0.1 * exclamations)
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<SentimentResult, InferenceError> {
        let polarity = self.polarity(text);
        let label = if polarity >= 0.0 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        };
        let score = 1.0 / (1.0 + (-SCORE_SLOPE * polarity.abs()).exp());
        Ok(SentimentResult::new(label, score))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positive_sentence() {
        let classifier = LexiconClassifier::new();
        let result = classifier.classify("Hey this project is pretty cool!").unwrap();
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!(result.score > 0.99);
    }

    #[test]
    fn test_negative_sentence() {
        let classifier = LexiconClassifier::new();
        let result = classifier.classify("This was a terrible, boring waste of time").unwrap();
        assert_eq!(result.label, SentimentLabel::Negative);
        assert!(result.score > 0.9);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let classifier = LexiconClassifier::new();
        assert_eq!(
            classifier.classify("this is not good").unwrap().label,
            SentimentLabel::Negative
        );
        assert_eq!(
            classifier.classify("I don't hate it").unwrap().label,
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_neutral_text_is_uncertain() {
        let classifier = LexiconClassifier::new();
        let result = classifier.classify("The meeting is on Tuesday").unwrap();
        assert!((result.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_intensifier_raises_confidence() {
        let classifier = LexiconClassifier::new();
        let plain = classifier.classify("good").unwrap().score;
        let boosted = classifier.classify("really good").unwrap().score;
        assert!(boosted > plain);
    }

    proptest! {
        #[test]
        fn prop_score_in_unit_interval(text in "\\PC{1,200}") {
            let classifier = LexiconClassifier::new();
            let result = classifier.classify(&text).unwrap();
            prop_assert!((0.0..=1.0).contains(&result.score));
            prop_assert!(result.score >= 0.5);
        }

        #[test]
        fn prop_deterministic(text in "[a-z !']{1,80}") {
            let classifier = LexiconClassifier::new();
            prop_assert_eq!(classifier.classify(&text).unwrap(), classifier.classify(&text).unwrap());
        }
    }
}
