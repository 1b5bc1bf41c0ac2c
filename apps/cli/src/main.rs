//! Batchline CLI — a minimal chunk-oriented batch ETL demo.
//!
//! Seeds employee rows into a local database, reads them back through a
//! forward-only cursor, uppercases each name, and exports the result to a
//! delimited file in committed chunks.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
