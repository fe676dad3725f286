mod cli;
mod logging;
mod output;
mod stream;

use std::process;

use clap::Parser;

use cli::{AccumulatorArgs, Cli, Command};
use fortuna::config::{self, Config};
use fortuna::Accumulator;

/// Build the configuration by layering: defaults → TOML file → CLI overrides.
fn build_config(args: &AccumulatorArgs) -> Config {
    let mut cfg = match config::load_config(args.config_file.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{}", e);
            Config::default()
        }
    };

    if let Some(ref path) = args.seed_file {
        cfg.accumulator.seed_file = Some(path.clone());
    }
    if let Some(v) = args.resave_interval {
        cfg.accumulator.resave_interval_secs = v;
    }

    cfg.accumulator.validate();
    cfg.sources.validate();
    cfg
}

fn run_generate(cli: &Cli, config: &Config) {
    if cli.bytes == 0 {
        log::error!("byte count must be greater than 0");
        process::exit(1);
    }

    let acc: Accumulator = match Accumulator::with_config(&config.accumulator) {
        Ok(acc) => acc,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    let bytes = acc.random_data(cli.bytes);
    let written = output::write_output(&bytes, &cli.format, cli.output_file.as_deref());
    if let Err(e) = acc.close() {
        log::error!("{}", e);
        process::exit(1);
    }
    if let Err(e) = written {
        log::error!("error writing output: {}", e);
        process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Stream(args)) => {
            logging::init(&args.log, true);
            let config = build_config(&args.accumulator);
            if let Err(e) = stream::run(args, &config) {
                log::error!("{}", e);
                process::exit(1);
            }
        }
        None => {
            logging::init(&cli.log, false);
            let config = build_config(&cli.accumulator);
            run_generate(&cli, &config);
        }
    }
}
