
// imports
use crate::config::{files_handling, Args, Config, LsiParams};
use crate::error::Result;
use crate::lsi::Projection;
use crate::normalize::Normalizer;
use crate::relation::SimilarityRelation;
use crate::similarity::{SimilarityIndex, SimilarityMatrix};
use crate::source::{Catalog, Concept};
use crate::vocab::{Corpus, Vocabulary};
use crate::weight::TfIdf;

use std::time::Instant;
use ndarray::{Array1, Array2};
use tracing::{debug, info};


/// Outcome of an ad hoc lookup of two concepts.
#[derive(Clone, Debug, PartialEq)]
pub enum PairOutcome {
    Similarity { left: usize, right: usize, score: f64 },
    /// The keys that could not be resolved, each side checked on its own.
    NotFound { left: Option<String>, right: Option<String> },
}


/// Every stage value of one run, built once from a catalog.
///
/// Each stage consumes the previous one's output; all of them are keyed by the catalog
/// position of a concept.
pub struct Analysis {
    catalog: Catalog,
    normalizer: Normalizer,
    vocabulary: Vocabulary,
    corpus: Corpus,
    tfidf: TfIdf,
    projection: Projection,
    latent: Array2<f64>,
    index: SimilarityIndex,
}

impl Analysis {

    pub fn build(catalog: Catalog, params: &LsiParams) -> Analysis {

        let normalizer = Normalizer::new();
        let sequences = normalizer.normalize(&catalog);
        let empty = sequences.iter().filter(|s| s.is_empty()).count();
        if empty > 0 {
            debug!("{} labels have no terms left after normalization", empty);
        }

        let vocabulary = Vocabulary::build(&sequences);
        let corpus = Corpus::build(&vocabulary, &sequences);

        let tfidf = TfIdf::fit(&corpus, vocabulary.len());
        let weighted = tfidf.weight_corpus(&corpus);

        let identifiers: Vec<&str> = catalog.concepts().iter().map(|concept| concept.identifier.as_str()).collect();
        let projection = Projection::fit(&weighted, &identifiers, vocabulary.len(), params);
        let latent = projection.fold_in_all(&weighted);
        let index = SimilarityIndex::new(&latent);

        Self {
            catalog: catalog,
            normalizer: normalizer,
            vocabulary: vocabulary,
            corpus: corpus,
            tfidf: tfidf,
            projection: projection,
            latent: latent,
            index: index
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn latent(&self) -> &Array2<f64> {
        &self.latent
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn matrix(&self) -> SimilarityMatrix {
        SimilarityMatrix::build(&self.index, &self.latent)
    }

    /// Projects free text through the fitted model, without refitting.
    pub fn fold_in(&self, text: &str) -> Array1<f64> {
        let tokens = self.normalizer.tokens(text);
        let bag = self.vocabulary.to_bag(&tokens);
        self.projection.fold_in(&self.tfidf.weight(&bag))
    }

    /// The `k` concepts closest to free text.
    pub fn nearest(&self, text: &str, k: usize) -> Vec<(&Concept, f64)> {
        self.index.nearest(&self.fold_in(text), k).into_iter()
            .filter_map(|(i, score)| self.catalog.get(i).map(|concept| (concept, score)))
            .collect()
    }

    /// Similarity of two concepts given by identifier or label.
    pub fn pair(&self, a: &str, b: &str) -> PairOutcome {

        let left = self.catalog.resolve(a);
        let right = self.catalog.resolve(b);

        match (left, right) {
            (Some(left), Some(right)) => PairOutcome::Similarity {
                left: left,
                right: right,
                score: self.index.score(left, right).unwrap_or(0.0)
            },
            _ => PairOutcome::NotFound {
                left: left.map_or(Some(a.to_owned()), |_| None),
                right: right.map_or(Some(b.to_owned()), |_| None)
            }
        }
    }

    /// Persists the intermediate artifacts of the run under `output_dir`.
    pub fn save_artifacts(&self, output_dir: &str) -> Result<()> {
        files_handling::save_output(output_dir, "concepts", &self.catalog)?;
        files_handling::save_output(output_dir, "vocab", &self.vocabulary)?;
        files_handling::save_output(output_dir, "corpus", &self.corpus)?;
        files_handling::save_output(output_dir, "projection", self.projection.term_topics())?;
        files_handling::save_output(output_dir, "latent", &self.latent)?;
        info!("saved intermediate artifacts to {}", output_dir);
        Ok(())
    }
}


pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure -
    // -> configuration of arguments
    // -> concept retrieval
    // -> vocabulary, weighting and projection
    // -> similarity relation, optional pair lookup

    pub fn run(args: &Args) -> Result<()> {

        info!("building parameters...");
        let params = Config::new(args)?.get_params();
        info!("{}", params);

        // retrieval failures end the run here, before any computation
        let catalog = params.source.fetch()?;

        let timer = Instant::now();
        info!("starting vocabulary building and projection...");
        let analysis = Analysis::build(catalog, &params.lsi);

        if let Some(artifacts_dir) = &params.artifacts_dir {
            analysis.save_artifacts(artifacts_dir)?;
        }

        let matrix = analysis.matrix();
        SimilarityRelation::new(analysis.catalog(), &matrix).save(&params.output_file)?;
        info!("finished similarity relation, took {} seconds ...", timer.elapsed().as_secs());

        if let Some(keys) = &args.pair {
            if let [a, b] = keys.as_slice() {
                Pipeline::report_pair(&analysis, a, b);
            }
        }

        Ok(())
    }

    fn report_pair(analysis: &Analysis, a: &str, b: &str) {
        match analysis.pair(a, b) {
            PairOutcome::Similarity { left, right, score } => {
                let catalog = analysis.catalog();
                if let (Some(x), Some(y)) = (catalog.get(left), catalog.get(right)) {
                    println!("Similarity between {} and {} is {}", x.label, y.label, score);
                }
            },
            PairOutcome::NotFound { left, right } => {
                for key in left.iter().chain(right.iter()) {
                    println!("'{}' not found", key);
                }
            }
        }
    }
}
