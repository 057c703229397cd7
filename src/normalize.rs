
// imports
use crate::source::Catalog;

use std::collections::{HashMap, HashSet};
use tracing::debug;

// english stop words, matched after lower casing
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "etc", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "may", "me", "more", "most", "must", "my", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "out", "over", "own", "per", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "upon", "very", "via", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "within", "without", "would", "you", "your", "yours",
];


/// Turns concept labels into sequences of normalized terms.
pub struct Normalizer {
    stop_words: HashSet<&'static str>,
}

// defines the behavior needed for tokenizing a label
pub trait Tokenizer {
    fn tokenize(&self, sequence: &str) -> Vec<String>;
}

impl Tokenizer for Normalizer {
    // tokens are maximal runs of alphanumeric characters, stop words are dropped
    fn tokenize(&self, sequence: &str) -> Vec<String> {
        sequence
            .split(|c: char| !c.is_alphanumeric())
            .filter(|tok| !tok.is_empty() && !self.stop_words.contains(tok))
            .map(|tok| tok.to_string())
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {

    pub fn new() -> Normalizer {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect()
        }
    }

    fn parse_line(line: &str) -> String {

        // the label is trimmed and lower cased, parenthetical qualifiers such as "(annual %)"
        // are replaced by a delimiter. An unmatched '(' drops the rest of the label.
        let lowered = line.trim().to_lowercase();
        let mut depth: usize = 0;
        let mut parsed = String::with_capacity(lowered.len());

        for c in lowered.chars() {
            match c {
                '(' => {
                    depth += 1;
                    parsed.push(' ');
                },
                ')' if depth > 0 => {
                    depth -= 1;
                    parsed.push(' ');
                },
                _ if depth > 0 => continue,
                _ => parsed.push(c)
            }
        }
        parsed
    }

    /// Normalizes a single label without batch-wide pruning, as used for ad hoc queries.
    pub fn tokens(&self, label: &str) -> Vec<String> {
        self.tokenize(&Normalizer::parse_line(label))
    }

    fn accumulate(tokens: &[String], token2count: &mut HashMap<String, usize>) {
        // how many times each term appears in the whole batch
        for tok in tokens {
            let val = token2count.entry(tok.to_owned()).or_insert(0);
            *val += 1;
        }
    }

    /// Normalizes every label of the catalog, in catalog order, and removes the terms that
    /// occur exactly once across the whole batch. Labels left without terms keep their
    /// (empty) slot.
    pub fn normalize(&self, catalog: &Catalog) -> Vec<Vec<String>> {

        let mut token2count: HashMap<String, usize> = HashMap::new();
        let sequences: Vec<Vec<String>> = catalog.concepts().iter().map(|concept| {
            let tokens = self.tokens(&concept.label);
            Normalizer::accumulate(&tokens, &mut token2count);
            tokens
        }).collect();

        let n_rare = token2count.values().filter(|count| **count == 1).count();
        debug!("pruning {} single-occurrence terms out of {}", n_rare, token2count.len());

        sequences.into_iter().map(|sequence| {
            sequence.into_iter().filter(|tok| token2count.get(tok).map_or(false, |count| *count > 1)).collect()
        }).collect()
    }
}
