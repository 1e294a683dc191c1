//! Tessera CLI
//!
//! Command-line entrypoint for ingestion runs:
//! - Ingesting delimited text files into a graph bundle via a mapper
//!   definition (JSON)
//! - Printing or writing the resulting bundle for downstream bulk import

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use tessera_ingest_csv::{bundle_process_from_path, MapperDefinition};
use tessera_schema::BuiltinSchema;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(
    author,
    version,
    about = "Tessera: delimited-text to graph-bundle ingestion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest sources into a graph bundle.
    Ingest {
        #[command(subcommand)]
        command: IngestCommands,
    },
}

#[derive(Subcommand)]
enum IngestCommands {
    /// Ingest one CSV file with a mapper definition.
    Csv(IngestCsvArgs),
}

#[derive(Args)]
struct IngestCsvArgs {
    /// Mapper definition (JSON).
    #[arg(long)]
    mapper: PathBuf,

    /// Input CSV file.
    #[arg(long)]
    input: PathBuf,

    /// Cell delimiter (one character).
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Write the bundle here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print the bundle JSON.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest {
            command: IngestCommands::Csv(args),
        } => ingest_csv(args),
    }
}

fn ingest_csv(args: IngestCsvArgs) -> Result<()> {
    let delimiter = parse_delimiter(&args.delimiter)?;

    let mapper_file = File::open(&args.mapper)
        .with_context(|| format!("opening mapper {}", args.mapper.display()))?;
    let mapper: MapperDefinition = serde_json::from_reader(BufReader::new(mapper_file))
        .with_context(|| format!("parsing mapper {}", args.mapper.display()))?;

    let schema = BuiltinSchema::new();
    let bundle = bundle_process_from_path(&args.input, &mapper, delimiter, &schema)
        .with_context(|| format!("ingesting {}", args.input.display()))?;

    eprintln!(
        "{} {} objects into {}",
        "ingested".green().bold(),
        bundle.objects.len(),
        bundle.id.cyan()
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&bundle)?
    } else {
        serde_json::to_string(&bundle)?
    };
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    if raw == "tab" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [b] => Ok(*b),
        _ => Err(anyhow!(
            "delimiter must be a single character (or `tab`), got `{raw}`"
        )),
    }
}
