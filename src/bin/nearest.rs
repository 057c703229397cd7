use clap::Parser;
use concept_lsi::{Analysis, Config, LsiParams, Result};
use std::{fs::File, io::{self, BufRead}, process};
use tracing::{error, Level};


// answers free-text queries against a catalog: each line of the queries file is folded
// into the fitted latent space and the k closest concepts are printed.
// treated as binary executable so it can be ran independently from main

/// Closest catalog concepts for free-text queries.
#[derive(Parser, Debug)]
#[command(name = "nearest")]
struct NearestArgs {
    /// Cached CSV of (identifier, label) rows with a header
    #[arg(long, conflicts_with = "endpoint")]
    cache: Option<String>,

    /// SPARQL endpoint to harvest dataset titles from
    #[arg(long)]
    endpoint: Option<String>,

    /// Reference year the harvested datasets must have observations for
    #[arg(long, requires = "endpoint")]
    ref_period: Option<u16>,

    /// File holding one query per line
    #[arg(long)]
    queries: String,

    /// Number of concepts printed per query
    #[arg(short, long, default_value_t = 10)]
    k: usize,

    #[arg(long, default_value_t = 200)]
    topics: usize,

    #[arg(long, default_value_t = 2)]
    iters: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {

    let args = NearestArgs::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &NearestArgs) -> Result<()> {

    let source = Config::select_source(args.endpoint.as_deref(), args.ref_period, args.cache.as_deref())?
        .ok_or_else(Config::missing_source)?;

    let params = LsiParams {
        num_topics: args.topics,
        power_iters: args.iters,
        seed: args.seed,
        ..LsiParams::default()
    };
    params.validate()?;

    let lines = io::BufReader::new(File::open(&args.queries)?).lines();
    let queries = lines.collect::<std::result::Result<Vec<String>, io::Error>>()?;

    // the model is fitted once, every query reuses it
    let analysis = Analysis::build(source.fetch()?, &params);

    for query in queries.iter().filter(|q| !q.trim().is_empty()) {

        println!("searching {} most similar concepts to '{}'", args.k, query);
        for (i, (concept, score)) in analysis.nearest(query, args.k).iter().enumerate() {
            println!("{} : {} ? {} ({}) = {}", i, query, concept.label, concept.identifier, score);
        }
        println!("\n");
    }

    Ok(())
}
