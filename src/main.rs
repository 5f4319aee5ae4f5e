use clap::Parser;
use log::{debug, LevelFilter};

mod args;
mod polls;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();
    debug!("args: {:?}", args);

    match polls::run(&args) {
        Ok(summary) => {
            if args.check {
                println!(
                    "Check passed: {} rows from {} polls, nothing written",
                    summary.rows, summary.polls
                );
            } else {
                for p in summary.written.iter() {
                    debug!("written: {}", p.display());
                }
                println!("Wrote {} rows to {}", summary.rows, summary.output.display());
            }
        }
        Err(e) => {
            polls::report_error(&e);
            std::process::exit(1);
        }
    }
}
