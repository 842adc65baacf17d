use std::collections::HashMap;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;

use chartspec::config::{AnnotationDataset, ChartConfig};
use chartspec::{csv_reader, data, transform};

#[derive(Parser, Debug)]
#[command(name = "chartspec")]
#[command(about = "Resolve tabular rows and a chart configuration into a RenderSpec", long_about = None)]
struct Args {
    /// Chart configuration: inline JSON or a path to a JSON file
    config: String,

    /// Treat stdin as a JSON array of row objects instead of CSV
    #[arg(long)]
    json: bool,

    /// Path to a JSON file of annotation datasets, keyed by source name
    #[arg(long)]
    annotations: Option<String>,

    /// Log pipeline diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let config: ChartConfig = if args.config.trim_start().starts_with('{') {
        serde_json::from_str(&args.config).context("Failed to parse inline configuration")?
    } else {
        let text = std::fs::read_to_string(&args.config)
            .with_context(|| format!("Failed to read configuration file '{}'", args.config))?;
        serde_json::from_str(&text).context("Failed to parse configuration file")?
    };

    let rows = if args.json {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        let value: serde_json::Value =
            serde_json::from_str(&input).context("Failed to parse JSON rows")?;
        data::rows_from_json(&value)?
    } else {
        csv_reader::read_rows_from_stdin()?
    };

    let datasets: HashMap<String, AnnotationDataset> = match &args.annotations {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read annotations file '{}'", path))?;
            serde_json::from_str(&text).context("Failed to parse annotation datasets")?
        }
        None => HashMap::new(),
    };

    let spec = transform::build_render_spec(rows, &datasets, &config)
        .context("Failed to build render spec")?;

    let output =
        serde_json::to_string_pretty(&spec).context("Failed to serialize render spec")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(output.as_bytes())
        .context("Failed to write to stdout")?;
    handle.write_all(b"\n")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
