
mod config;
mod error;
mod lsi;
mod normalize;
mod pipeline;
mod relation;
mod similarity;
mod source;
mod vocab;
mod weight;

pub use config::{files_handling, Args, Config, LsiParams, Params};
pub use error::{Result, SimError};
pub use lsi::Projection;
pub use normalize::{Normalizer, Tokenizer};
pub use pipeline::{Analysis, PairOutcome, Pipeline};
pub use relation::{RelationRow, SimilarityRelation};
pub use similarity::{SimilarityIndex, SimilarityMatrix};
pub use source::{Catalog, Concept, ConceptSource};
pub use vocab::{Bag, Corpus, Vocabulary};
pub use weight::{TfIdf, WeightedVector};
