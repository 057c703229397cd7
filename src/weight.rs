
// imports
use crate::vocab::{Bag, Corpus};

use tracing::debug;

/// Sparse TF-IDF weights of one label: (term id, weight), sorted by term id.
pub type WeightedVector = Vec<(usize, f64)>;


/// Corpus-wide document frequencies turned into inverse document frequencies.
#[derive(Clone, Debug, PartialEq)]
pub struct TfIdf {
    num_docs: usize,
    idf: Vec<f64>,
}

impl TfIdf {

    /// `num_terms` is the vocabulary size; the corpus bags index into `[0, num_terms)`.
    pub fn fit(corpus: &Corpus, num_terms: usize) -> TfIdf {

        // number of bags holding each term at least once
        let mut df: Vec<usize> = vec![0; num_terms];
        for bag in corpus.bags() {
            for (id, _) in bag {
                if let Some(val) = df.get_mut(*id) {
                    *val += 1;
                }
            }
        }

        let n = corpus.len() as f64;
        let idf = df.iter().map(|df| {
            if *df == 0 { 0.0 } else { (n / *df as f64).ln() }
        }).collect::<Vec<f64>>();

        debug!("fitted idf over {} documents and {} terms", corpus.len(), num_terms);
        Self {
            num_docs: corpus.len(),
            idf: idf
        }
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn idf(&self, id: usize) -> Option<f64> {
        self.idf.get(id).copied()
    }

    /// count × ln(N / df) for every term of the bag
    pub fn weight(&self, bag: &Bag) -> WeightedVector {
        bag.iter()
            .filter_map(|(id, count)| self.idf(*id).map(|idf| (*id, *count as f64 * idf)))
            .collect()
    }

    pub fn weight_corpus(&self, corpus: &Corpus) -> Vec<WeightedVector> {
        corpus.bags().iter().map(|bag| self.weight(bag)).collect()
    }
}


#[cfg(test)]
mod tests {

    use super::TfIdf;
    use crate::vocab::{Corpus, Vocabulary};
    use approx::assert_relative_eq;

    fn build_corpus(raw: &[&[&str]]) -> (Vocabulary, Corpus) {
        let seqs: Vec<Vec<String>> = raw.iter().map(|s| s.iter().map(|t| t.to_string()).collect()).collect();
        let vocab = Vocabulary::build(&seqs);
        let corpus = Corpus::build(&vocab, &seqs);
        (vocab, corpus)
    }

    #[test]
    fn tfidf_weights_test() {

        // population: df 2, growth: df 2, rate: df 1, N = 3
        let (vocab, corpus) = build_corpus(&[&["population", "population", "rate"], &["population", "growth"], &["growth"]]);
        let tfidf = TfIdf::fit(&corpus, vocab.len());
        let weighted = tfidf.weight_corpus(&corpus);

        assert_eq!(tfidf.num_docs(), 3);
        assert_eq!(weighted[0].len(), 2);
        assert_eq!(weighted[0][0].0, 0);
        assert_relative_eq!(weighted[0][0].1, 2.0 * (3.0f64 / 2.0).ln());
        assert_relative_eq!(weighted[0][1].1, 3.0f64.ln());
        assert_relative_eq!(weighted[2][0].1, (3.0f64 / 2.0).ln());
    }

    #[test]
    fn ubiquitous_terms_and_empty_bags_weigh_nothing() {

        let (vocab, corpus) = build_corpus(&[&["growth"], &[], &["growth"]]);
        let tfidf = TfIdf::fit(&corpus, vocab.len());
        let weighted = tfidf.weight_corpus(&corpus);

        assert!(weighted[1].is_empty());
        assert_relative_eq!(weighted[0][0].1, (3.0f64 / 2.0).ln());

        let (vocab, corpus) = build_corpus(&[&["growth"], &["growth"]]);
        let tfidf = TfIdf::fit(&corpus, vocab.len());
        assert_eq!(tfidf.weight(&corpus.bags()[0]), vec![(0, 0.0)]);
    }

    #[test]
    fn unseen_term_has_zero_idf() {
        let (_, corpus) = build_corpus(&[&["growth"]]);
        let tfidf = TfIdf::fit(&corpus, 2);
        assert_eq!(tfidf.idf(1), Some(0.0));
        assert_eq!(tfidf.idf(2), None);
    }
}
