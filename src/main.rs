use crate::cli::run;

mod aggregator;
mod app;
mod art;
pub mod cli;
mod config;
pub mod domain;
pub mod http;
mod ingest;
mod notify;
mod scheduler;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
