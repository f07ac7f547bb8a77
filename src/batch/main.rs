//! Batch resolution of a CSV file of addresses.
//!
//! Reads `postal_code;locality;street` rows and writes one row of
//! TERC/SIMC/ULIC codes per input row, in input order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use teryt_resolver::config::Config;
use teryt_resolver::{AddressQuery, AddressService, MatchKind};

#[derive(Parser, Debug)]
#[command(name = "batch")]
#[command(about = "Resolve a CSV file of addresses to TERYT codes")]
struct Args {
    /// Config file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV (semicolon separated, with a header row)
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Addresses resolved at the same time
    #[arg(long, default_value = "8")]
    concurrency: usize,
}

#[derive(Debug, Deserialize)]
struct InputRow {
    postal_code: String,
    locality: String,
    #[serde(default)]
    street: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct OutputRow {
    postal_code: String,
    locality: String,
    street: String,
    voivodeship: Option<String>,
    county: Option<String>,
    municipality: Option<String>,
    municipality_match: Option<MatchKind>,
    simc: Option<String>,
    locality_match: Option<MatchKind>,
    locality_fallback: bool,
    ulic: Option<String>,
    street_match: Option<MatchKind>,
    error: String,
}

impl OutputRow {
    fn for_query(query: &AddressQuery) -> Self {
        Self {
            postal_code: query.postal_code.clone(),
            locality: query.locality.clone(),
            street: query.street.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

async fn resolve_row(service: &AddressService, query: AddressQuery) -> OutputRow {
    let mut row = OutputRow::for_query(&query);
    match service.lookup(&query).await {
        Ok(lookup) => {
            let result = lookup.result;
            row.voivodeship = result.voivodeship.code.clone();
            row.county = result.county.code.clone();
            row.municipality = result.municipality.code.clone();
            row.municipality_match = Some(result.municipality.match_kind);
            row.simc = result.locality.code.clone();
            row.locality_match = Some(result.locality.match_kind);
            row.locality_fallback = result.locality.fallback;
            row.ulic = result.street.code.clone();
            row.street_match = Some(result.street.match_kind);
            if let Some(e) = result
                .locality
                .adapter_error
                .or(result.street.adapter_error)
            {
                row.error = e;
            }
        }
        Err(e) => {
            warn!("{} {}: {}", query.postal_code, query.locality, e);
            row.error = e.to_string();
        }
    }
    row
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("TERYT Batch Resolver");
    info!("Input: {}", args.input.display());

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let service = AddressService::from_config(&config).context("Failed to load reference data")?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    let mut inputs = Vec::new();
    for (idx, record) in reader.deserialize::<InputRow>().enumerate() {
        match record {
            Ok(row) => inputs.push(Ok(AddressQuery::new(
                &row.postal_code,
                &row.locality,
                row.street.as_deref(),
            ))),
            Err(e) => {
                warn!("Row {}: {}", idx + 2, e);
                inputs.push(Err(e.to_string()));
            }
        }
    }
    info!("Resolving {} addresses against '{}'", inputs.len(), service.backend());

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let service = &service;
    let mut results = stream::iter(inputs)
        .map(|input| async move {
            match input {
                Ok(query) => resolve_row(service, query).await,
                Err(e) => OutputRow {
                    error: e,
                    ..Default::default()
                },
            }
        })
        .buffered(args.concurrency.max(1));

    let mut failed = 0usize;
    while let Some(row) = results.next().await {
        if !row.error.is_empty() {
            failed += 1;
        }
        writer.serialize(&row)?;
        pb.inc(1);
    }
    writer.flush()?;
    pb.finish_and_clear();

    info!(
        "Wrote {} rows to {} ({} with errors)",
        pb.position(),
        args.output.display(),
        failed
    );

    Ok(())
}
