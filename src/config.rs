
// imports
use crate::error::{Result, SimError};
use crate::source::ConceptSource;

use clap::Parser;
use serde::Deserialize;
use std::{fmt::Display, fs::File, io::BufReader};

const DEFAULT_NUM_TOPICS: usize = 200;
const DEFAULT_POWER_ITERS: usize = 2;
const DEFAULT_OVERSAMPLE: usize = 10;
const DEFAULT_SEED: u64 = 0;


/// Latent semantic similarity between statistical dataset labels.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "concept_lsi", version)]
pub struct Args {
    /// JSON parameters file; command line values take precedence over it
    #[arg(long)]
    pub config: Option<String>,

    /// SPARQL endpoint to harvest dataset titles from
    #[arg(long, conflicts_with = "cache")]
    pub endpoint: Option<String>,

    /// Reference year the harvested datasets must have observations for
    #[arg(long, requires = "endpoint")]
    pub ref_period: Option<u16>,

    /// Cached CSV of (identifier, label) rows with a header
    #[arg(long)]
    pub cache: Option<String>,

    /// Where to write the similarity relation (CSV)
    #[arg(long)]
    pub output: Option<String>,

    /// Number of latent topics
    #[arg(long)]
    pub topics: Option<usize>,

    /// Number of power iterations of the decomposition
    #[arg(long)]
    pub iters: Option<usize>,

    /// Extra random samples drawn beyond the number of topics
    #[arg(long)]
    pub oversample: Option<usize>,

    /// Seed of the decomposition's random test matrix
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for intermediate artifacts (concepts, vocabulary, corpus, projections)
    #[arg(long)]
    pub artifacts_dir: Option<String>,

    /// Report the similarity of two concepts, given by identifier or label
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    pub pair: Option<Vec<String>>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}


// the JSON parameters file, every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct JsonParams {
    source: Option<ConceptSource>,
    output_file: Option<String>,
    num_topics: Option<usize>,
    power_iters: Option<usize>,
    oversample: Option<usize>,
    seed: Option<u64>,
    artifacts_dir: Option<String>,
}


#[derive(Clone, Debug, PartialEq)]
pub struct LsiParams {
    pub num_topics: usize,
    pub power_iters: usize,
    pub oversample: usize,
    pub seed: u64,
}

impl Default for LsiParams {
    fn default() -> Self {
        Self {
            num_topics: DEFAULT_NUM_TOPICS,
            power_iters: DEFAULT_POWER_ITERS,
            oversample: DEFAULT_OVERSAMPLE,
            seed: DEFAULT_SEED,
        }
    }
}

impl LsiParams {

    /// Rejects settings the decomposition cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(SimError::Config("num_topics must be positive".into()));
        }
        if self.power_iters == 0 {
            return Err(SimError::Config("power_iters must be positive".into()));
        }
        Ok(())
    }
}

impl Display for LsiParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decomposition hyper parameters:
        num_topics: {},
        power_iters: {},
        oversample: {},
        seed: {}",
        self.num_topics, self.power_iters, self.oversample, self.seed
        )
    }
}


#[derive(Clone, Debug)]
pub struct Params {
    pub source: ConceptSource,
    pub output_file: String,
    pub artifacts_dir: Option<String>,
    pub lsi: LsiParams,
}

impl Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using params:
        source: {}
        output_file: {}
        artifacts_dir: {:?}
        Using {}",
        self.source, self.output_file, self.artifacts_dir, self.lsi)
    }
}


pub struct Config {
    params: Params
}

impl Config {

    pub fn get_params(&self) -> Params {
        self.params.clone()
    }

    /// Picks the concept source out of the command line flags, `None` when neither an
    /// endpoint nor a cache was given.
    pub fn select_source(endpoint: Option<&str>, ref_period: Option<u16>, cache: Option<&str>) -> Result<Option<ConceptSource>> {
        match (endpoint, cache) {
            (Some(_), Some(_)) => Err(SimError::Config("an endpoint and a cache were both given, choose one".into())),
            (Some(uri), None) => Ok(Some(ConceptSource::endpoint(uri, ref_period))),
            (None, Some(path)) => Ok(Some(ConceptSource::cache(path))),
            (None, None) => Ok(None)
        }
    }

    pub fn missing_source() -> SimError {
        SimError::Config("no concept source given, use --endpoint or --cache".into())
    }

    pub fn new(args: &Args) -> Result<Config> {

        // parse the optional json file first, command line values override it
        let json: JsonParams = match &args.config {
            Some(path) => {
                let f = BufReader::new(File::open(path)?);
                serde_json::from_reader(f)?
            },
            None => JsonParams::default()
        };

        let source = Config::select_source(args.endpoint.as_deref(), args.ref_period, args.cache.as_deref())?
            .or(json.source)
            .ok_or_else(Config::missing_source)?;

        let output_file = args.output.clone().or(json.output_file)
            .ok_or_else(|| SimError::Config("no output file given, use --output".into()))?;

        let lsi = LsiParams {
            num_topics: args.topics.or(json.num_topics).unwrap_or(DEFAULT_NUM_TOPICS),
            power_iters: args.iters.or(json.power_iters).unwrap_or(DEFAULT_POWER_ITERS),
            oversample: args.oversample.or(json.oversample).unwrap_or(DEFAULT_OVERSAMPLE),
            seed: args.seed.or(json.seed).unwrap_or(DEFAULT_SEED),
        };

        lsi.validate()?;

        let params = Params {
            source: source,
            output_file: output_file,
            artifacts_dir: args.artifacts_dir.clone().or(json.artifacts_dir),
            lsi: lsi
        };

        Ok (
            Self {
                params: params
            }
        )
    }

}


pub mod files_handling {

    use crate::error::{Result, SimError};
    use crate::source::{Catalog, Concept};
    use crate::vocab::{Corpus, Vocabulary};

    use ndarray::Array2;
    use ndarray_npy::write_npy;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use flate2::{Compression, read::GzDecoder, write::GzEncoder};

    /// Reads `file_path` as given.
    pub fn read_input<R: ReadFile>(file_path: &str) -> Result<<R as ReadFile>::Item> {
        let input = <R as ReadFile>::read_file(file_path)?;
        Ok(input)
    }

    /// Saves `item` under `output_dir`, creating it when needed. `file_name` carries no
    /// extension, each implementation adds its own.
    pub fn save_output<S: SaveFile>(output_dir: &str, file_name: &str, item: &S) -> Result<()> {

        // create output folder
        fs::create_dir_all(output_dir)?;

        item.save_file(output_dir, file_name)?;
        Ok(())
    }

    pub trait ReadFile {
        type Item;
        fn read_file(file_path: &str) -> Result<Self::Item>;
    }

    pub trait SaveFile {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()>;
    }

    impl ReadFile for Catalog {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {

            // header row first, then (identifier, label) rows; extra columns are ignored
            let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(file_path)?;
            let mut records: Vec<Concept> = Vec::new();
            for (row, record) in rdr.records().enumerate() {
                let record = record?;
                match (record.get(0), record.get(1)) {
                    (Some(identifier), Some(label)) => records.push(Concept::new(identifier, label)),
                    _ => return Err(SimError::Source(format!("{}: row {} has fewer than two fields", file_path, row + 2)))
                }
            }
            Ok(Catalog::new(records))
        }
    }

    impl SaveFile for Catalog {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".csv";
            let mut wrt = csv::WriterBuilder::new().from_path(out)?;
            wrt.write_record(["identifier", "label"])?;
            for concept in self.concepts() {
                wrt.write_record([&concept.identifier, &concept.label])?;
            }
            wrt.flush()?;
            Ok(())
        }
    }

    impl ReadFile for Vocabulary {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let f = BufReader::new(File::open(file_path)?);
            let terms: Vec<String> = serde_json::from_reader(f)?;
            Ok(Vocabulary::from_terms(terms))
        }
    }

    impl SaveFile for Vocabulary {
        // terms listed in id order
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".json";
            let f = BufWriter::new(File::create(out)?);
            serde_json::to_writer(f, self.terms())?;
            Ok(())
        }
    }

    impl ReadFile for Corpus {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let f = BufReader::new(File::open(file_path)?);
            let reader = GzDecoder::new(f);
            let corpus: Corpus = bincode::deserialize_from(reader)?;
            Ok(corpus)
        }
    }

    impl SaveFile for Corpus {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".bin.gz";
            let f = BufWriter::new(File::create(out)?);
            let mut writer = GzEncoder::new(f, Compression::default());
            bincode::serialize_into(&mut writer, self)?;
            writer.finish()?.flush()?;
            Ok(())
        }
    }

    impl SaveFile for Array2<f64> {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".npy";
            write_npy(out, self)?;
            Ok(())
        }
    }
}
