use anyhow::Context;
use clap::Parser;
use tracing::Level;

use ext_hash_index::keys::read_keys;
use ext_hash_index::report::ProbeReport;
use ext_hash_index::setup::*;
use ext_hash_index::IndexError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    let key_file = read_keys(&config.key_file, config.key_count)
        .await
        .with_context(|| format!("reading keys from {}", config.key_file.display()))?;

    let directory = match build_index(&config, &key_file) {
        Ok(directory) => directory,
        Err(err @ IndexError::DirectoryAlloc { .. }) => {
            return Err(err).context("cannot expand directory further");
        }
        Err(err) => return Err(err).context("building index"),
    };

    println!("\n========================= RESULTS =========================");
    println!(
        "Final directory after inserting all {} keys:\n",
        key_file.keys.len()
    );
    println!("{directory}");

    let report = ProbeReport::collect(&directory, &key_file.keys);
    if !config.quiet {
        for line in report.lines() {
            println!("{line}");
        }
    }
    println!("{report}");
    Ok(())
}
