
// imports
use crate::config::files_handling;
use crate::error::{Result, SimError};

use std::collections::HashMap;
use std::fmt::Display;
use std::time::Instant;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_REF_PERIOD: u16 = 2013;

// datasets of the world development indicators graph that hold observations for one
// reference year, ordered by title
const DATASETS_QUERY: &str = "
PREFIX qb: <http://purl.org/linked-data/cube#>
PREFIX sdmx-dimension: <http://purl.org/linked-data/sdmx/2009/dimension#>
PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX year: <http://reference.data.gov.uk/id/year/>
SELECT DISTINCT ?dataset ?title
WHERE {
  GRAPH <http://worldbank.270a.info/graph/world-development-indicators> {
    ?s qb:dataSet ?dataset .
    ?s sdmx-dimension:refPeriod year:{ref_period} .
  }
  GRAPH <http://worldbank.270a.info/graph/meta> {
    ?dataset dcterms:title ?title .
  }
}
ORDER BY ?title
";


/// A dataset description: stable external key plus free-text label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub identifier: String,
    pub label: String,
}

impl Concept {
    pub fn new(identifier: &str, label: &str) -> Concept {
        Self {
            identifier: identifier.to_owned(),
            label: label.to_owned(),
        }
    }
}


/// The canonical, ordered batch of concepts of one run.
///
/// The position of a concept in the catalog is the index every later stage is
/// keyed by (bags, weighted vectors, latent vectors, matrix rows).
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    concepts: Vec<Concept>,
    positions: HashMap<String, usize>,
}

impl Catalog {

    /// Builds the catalog in the given order. A repeated identifier keeps its first
    /// occurrence, later ones are dropped.
    pub fn new<I: IntoIterator<Item = Concept>>(records: I) -> Catalog {

        let mut concepts: Vec<Concept> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for concept in records {
            if positions.contains_key(&concept.identifier) {
                warn!("dropping duplicate identifier {} (label '{}')", concept.identifier, concept.label);
                continue;
            }
            positions.insert(concept.identifier.to_owned(), concepts.len());
            concepts.push(concept);
        }

        Self {
            concepts: concepts,
            positions: positions
        }
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn get(&self, index: usize) -> Option<&Concept> {
        self.concepts.get(index)
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.positions.get(identifier).copied()
    }

    /// Looks a user supplied key up as an identifier first, then as a label
    /// (first match in catalog order).
    pub fn resolve(&self, key: &str) -> Option<usize> {
        self.position(key)
            .or_else(|| self.concepts.iter().position(|concept| concept.label == key))
    }
}


/// Where the concepts of a run come from, decided once at configuration time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptSource {
    /// A SPARQL endpoint, filtered to one reference year.
    Endpoint {
        uri: String,
        #[serde(default = "default_ref_period")]
        ref_period: u16,
    },
    /// A local CSV table with a header row followed by (identifier, label) rows.
    Cache { path: String },
}

fn default_ref_period() -> u16 {
    DEFAULT_REF_PERIOD
}

impl Display for ConceptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptSource::Endpoint { uri, ref_period } => write!(f, "endpoint {} (ref period {})", uri, ref_period),
            ConceptSource::Cache { path } => write!(f, "cache {}", path),
        }
    }
}

impl ConceptSource {

    pub fn endpoint(uri: &str, ref_period: Option<u16>) -> ConceptSource {
        ConceptSource::Endpoint {
            uri: uri.to_owned(),
            ref_period: ref_period.unwrap_or(DEFAULT_REF_PERIOD),
        }
    }

    pub fn cache(path: &str) -> ConceptSource {
        ConceptSource::Cache { path: path.to_owned() }
    }

    /// Retrieves the ordered concept list. Any failure here is fatal for the run.
    pub fn fetch(&self) -> Result<Catalog> {

        let timer = Instant::now();
        info!("fetching concepts from {}", self);

        let catalog = match self {
            ConceptSource::Endpoint { uri, ref_period } => {
                let records = Self::query_endpoint(uri, *ref_period)?;
                Catalog::new(records)
            },
            ConceptSource::Cache { path } => files_handling::read_input::<Catalog>(path)?
        };

        info!("fetched {} concepts, took {} seconds ...", catalog.len(), timer.elapsed().as_secs());
        Ok(catalog)
    }

    fn query_endpoint(uri: &str, ref_period: u16) -> Result<Vec<Concept>> {

        let query = DATASETS_QUERY.replace("{ref_period}", &ref_period.to_string());
        debug!("sparql query: {}", query);

        let client = reqwest::blocking::Client::new();
        let response = client
            .get(uri)
            .query(&[("query", query.as_str())])
            .header(ACCEPT, "application/sparql-results+json")
            .send()?;

        if !response.status().is_success() {
            return Err(SimError::Source(format!("endpoint {} returned {}", uri, response.status())));
        }

        let body = response.text()?;
        parse_bindings(&body)
    }
}


#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

// maps `?dataset` to the identifier and `?title` to the label, keeping the endpoint order
fn parse_bindings(body: &str) -> Result<Vec<Concept>> {

    let response: SparqlResponse = serde_json::from_str(body)?;

    response.results.bindings.iter().enumerate().map(|(row, binding)| {
        match (binding.get("dataset"), binding.get("title")) {
            (Some(dataset), Some(title)) => Ok(Concept::new(&dataset.value, &title.value)),
            _ => Err(SimError::Source(format!("binding {} lacks ?dataset or ?title", row)))
        }
    }).collect()
}
