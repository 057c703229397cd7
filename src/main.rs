use clap::Parser;
use concept_lsi::{Args, Pipeline};
use std::process;
use tracing::{error, Level};

fn main() {

    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = Pipeline::run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}
