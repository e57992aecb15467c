use analysis_core::SentimentModel;
use std::collections::{HashMap, HashSet};

pub mod aggregator;
pub use aggregator::SentimentAggregator;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

/// A negated word keeps half its strength with the opposite sign.
const NEGATION_FACTOR: f64 = -0.5;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("great", 0.8), ("excellent", 1.0), ("good", 0.7), ("best", 1.0),
    ("strong", 0.5), ("positive", 0.5), ("success", 0.6), ("successful", 0.7),
    ("growth", 0.5), ("gain", 0.5), ("gains", 0.5), ("profit", 0.5),
    ("profitable", 0.6), ("record", 0.4), ("rise", 0.4), ("increase", 0.4),
    ("increased", 0.4), ("surge", 0.7), ("rally", 0.6), ("bullish", 0.7),
    ("upgrade", 0.6), ("approved", 0.5), ("approval", 0.5), ("beat", 0.5),
    ("exceed", 0.6), ("outperform", 0.7), ("robust", 0.6), ("recovery", 0.4),
    ("expansion", 0.4), ("dividend", 0.4), ("bonus", 0.5), ("buyback", 0.4),
    ("upside", 0.5), ("optimistic", 0.6), ("improved", 0.5), ("improvement", 0.5),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -0.7), ("poor", -0.6), ("worst", -1.0), ("weak", -0.5),
    ("negative", -0.5), ("loss", -0.6), ("losses", -0.6), ("decline", -0.5),
    ("declined", -0.5), ("decrease", -0.4), ("fall", -0.4), ("drop", -0.4),
    ("plunge", -0.8), ("crash", -0.9), ("bearish", -0.7), ("downgrade", -0.6),
    ("miss", -0.5), ("fail", -0.7), ("failed", -0.7), ("failure", -0.7),
    ("disappoint", -0.6), ("concern", -0.4), ("risk", -0.3), ("warning", -0.5),
    ("penalty", -0.6), ("fine", -0.3), ("fined", -0.6), ("suspended", -0.7),
    ("suspension", -0.7), ("default", -0.8), ("bankruptcy", -1.0), ("lawsuit", -0.6),
    ("investigation", -0.5), ("layoff", -0.6), ("dilution", -0.4), ("delisted", -0.8),
];

/// Word-list polarity model.
///
/// Polarity is the mean strength of the lexicon words found in the text,
/// with negations within three words flipping and halving a word.
/// Text without lexicon words scores 0.
pub struct LexiconSentimentModel {
    lexicon: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl LexiconSentimentModel {
    pub fn new() -> Self {
        let lexicon = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS.iter())
            .copied()
            .collect();

        Self {
            lexicon,
            negations: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '(' | ')' | '"'))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl SentimentModel for LexiconSentimentModel {
    fn polarity(&self, text: &str) -> f64 {
        let words = Self::tokenize(text);

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negations.contains(w.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut total = 0.0;
        let mut matched = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&strength) = self.lexicon.get(word.as_str()) else {
                continue;
            };

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            total += if negated { strength * NEGATION_FACTOR } else { strength };
            matched += 1;
        }

        if matched == 0 {
            return 0.0;
        }
        (total / matched as f64).clamp(-1.0, 1.0)
    }
}

impl Default for LexiconSentimentModel {
    fn default() -> Self {
        Self::new()
    }
}
