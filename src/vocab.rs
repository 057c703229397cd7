
// imports
use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Sparse term frequencies of one label: (term id, count), sorted by term id.
pub type Bag = Vec<(usize, usize)>;


/// Dense term ids `[0, V)` in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    t2i: HashMap<String, usize>,
}

impl Vocabulary {

    /// Assigns ids walking the sequences in order, so the same batch always yields the
    /// same ids.
    pub fn build(sequences: &[Vec<String>]) -> Vocabulary {

        let mut terms: Vec<String> = Vec::new();
        let mut t2i: HashMap<String, usize> = HashMap::new();

        for tok in sequences.iter().flatten() {
            if !t2i.contains_key(tok) {
                t2i.insert(tok.to_owned(), terms.len());
                terms.push(tok.to_owned());
            }
        }

        info!("vocabulary holds {} terms", terms.len());
        Self {
            terms: terms,
            t2i: t2i
        }
    }

    /// Rebuilds a vocabulary from terms listed in id order.
    pub fn from_terms(terms: Vec<String>) -> Vocabulary {
        let t2i = terms.iter().enumerate().map(|(i, t)| (t.to_owned(), i)).collect();
        Self {
            terms: terms,
            t2i: t2i
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.t2i.get(term).copied()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(|t| t.as_str())
    }

    /// Counts the in-vocabulary terms of `tokens`; unknown terms are skipped.
    pub fn to_bag(&self, tokens: &[String]) -> Bag {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for id in tokens.iter().filter_map(|tok| self.id(tok)) {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}


/// One bag per concept, in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    bags: Vec<Bag>,
}

impl Corpus {

    pub fn build(vocabulary: &Vocabulary, sequences: &[Vec<String>]) -> Corpus {
        Self {
            bags: sequences.iter().map(|sequence| vocabulary.to_bag(sequence)).collect()
        }
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }

    pub fn bags(&self) -> &[Bag] {
        &self.bags
    }
}


#[cfg(test)]
mod tests {

    use super::{Corpus, Vocabulary};

    fn sequences(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter().map(|s| s.iter().map(|t| t.to_string()).collect()).collect()
    }

    #[test]
    fn ids_follow_first_seen_order() {

        let seqs = sequences(&[&["population", "growth"], &[], &["growth", "rate", "population"]]);
        let vocab = Vocabulary::build(&seqs);

        assert_eq!(vocab.terms(), &["population", "growth", "rate"]);
        assert_eq!(vocab.id("rate"), Some(2));
        assert_eq!(vocab.term(1), Some("growth"));
        assert_eq!(vocab.id("gdp"), None);
        assert_eq!(Vocabulary::from_terms(vocab.terms().to_vec()), vocab);
    }

    #[test]
    fn bag_counts_and_order() {

        let seqs = sequences(&[&["rate", "growth", "rate"], &["growth"]]);
        let vocab = Vocabulary::build(&seqs);

        // rate -> 0, growth -> 1, sorted by id
        let bag = vocab.to_bag(&seqs[0]);
        assert_eq!(bag, vec![(0, 2), (1, 1)]);

        // out of vocabulary terms are ignored
        let query = sequences(&[&["growth", "inflation"]]);
        assert_eq!(vocab.to_bag(&query[0]), vec![(1, 1)]);
    }

    #[test]
    fn corpus_keeps_empty_slots() {

        let seqs = sequences(&[&["growth"], &[], &["growth", "growth"]]);
        let vocab = Vocabulary::build(&seqs);
        let corpus = Corpus::build(&vocab, &seqs);

        assert_eq!(corpus.len(), 3);
        assert!(corpus.bags()[1].is_empty());
        assert_eq!(corpus.bags()[2], vec![(0, 2)]);

        // the sum of counts never exceeds the sequence length
        for (bag, seq) in corpus.bags().iter().zip(seqs.iter()) {
            assert!(bag.iter().map(|(_, c)| c).sum::<usize>() <= seq.len());
        }
    }
}
