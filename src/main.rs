//! `plagscan` command line: run one submission through the pipeline or list
//! stored reports.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use plagscan::{Pipeline, PipelineConfig, Submission};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plagscan", version, about = "Near-duplicate submission detection")]
struct Cli {
    /// Pipeline configuration file (YAML). Defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a file as a submission and print the report.
    Check {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        work: String,
        /// Name recorded for the submission; defaults to the file's base name.
        #[arg(long)]
        file_name: Option<String>,
        path: PathBuf,
    },
    /// List stored reports for a work.
    Reports { work: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Command::Check {
            sender,
            work,
            file_name,
            path,
        } => check(&pipeline, sender, work, file_name, &path).await,
        Command::Reports { work } => {
            let mut reports = pipeline.detector().reports().list_by_work(&work)?;
            reports.sort_by_key(|r| r.timestamp);
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
    }
}

async fn check(
    pipeline: &Pipeline,
    sender: String,
    work: String,
    file_name: Option<String>,
    path: &Path,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let file_name = match file_name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("path has no file name")?,
    };

    pipeline
        .bootstrap()
        .await
        .context("vector index is not ready")?;
    let analysis = pipeline
        .detector()
        .analyze(&Submission::new(sender, work, file_name, text))
        .await?;

    let output = json!({
        "report": analysis.report,
        "matches": analysis.matches,
        "point_id": analysis.point_id,
        "report_persisted": analysis.persisted,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
