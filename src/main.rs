// src/main.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use course_intake::config::IntakeConfig;
use course_intake::core::parser::UniversalParser;
use course_intake::core::rules::RuleSet;
use course_intake::utils::document_processor::DocumentProcessor;
use course_intake::FieldExtractor;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "course-intake")]
#[command(about = "Extract training-course fields from .docx, .doc and .txt outlines")]
#[command(version)]
struct Cli {
    /// JSON rule file replacing the builtin heuristics
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one document and print the record as JSON
    Extract {
        file: PathBuf,
        /// Wrap the record with source, format and field coverage
        #[arg(long)]
        report: bool,
    },
    /// Extract every document in a directory into per-document JSON files
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
    },
    /// Print the active rule table as JSON, a starting point for custom rule files
    Rules,
    /// Serve the extractor over gRPC (requires the `with-proto` feature)
    Serve {
        /// Listen address, overrides COURSE_INTAKE_GRPC_ADDR
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },
}

fn load_extractor(rules_path: Option<&Path>) -> anyhow::Result<FieldExtractor> {
    match rules_path {
        Some(path) => {
            let rules = RuleSet::from_json_file(path)?;
            info!("Loaded {} rules from {}", rules.rules.len(), path.display());
            Ok(FieldExtractor::with_rules(rules)?)
        }
        None => Ok(FieldExtractor::new()),
    }
}

#[cfg(feature = "with-proto")]
fn serve(addr: std::net::SocketAddr, processor: DocumentProcessor) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(course_intake::grpc_service::start_grpc_server(addr, processor))
}

#[cfg(not(feature = "with-proto"))]
fn serve(_addr: std::net::SocketAddr, _processor: DocumentProcessor) -> anyhow::Result<()> {
    anyhow::bail!("this build has no gRPC support; rebuild with `--features with-proto`")
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = IntakeConfig::from_env().context("Invalid configuration")?;

    let rules_path = cli.rules.as_deref().or(config.rules_path.as_deref());
    let processor = DocumentProcessor::with_parts(
        UniversalParser::with_mmap_threshold(config.mmap_threshold),
        load_extractor(rules_path)?,
    );

    match cli.command {
        Commands::Extract { file, report } => {
            let extraction = processor
                .extract_file(&file)
                .with_context(|| format!("Failed to extract {}", file.display()))?;
            let json = if report {
                serde_json::to_string_pretty(&extraction)?
            } else {
                serde_json::to_string_pretty(&extraction.record)?
            };
            println!("{}", json);
        }
        Commands::Batch {
            input_dir,
            output_dir,
        } => {
            let summary = processor.process_documents(&input_dir, &output_dir)?;
            println!(
                "Extracted {} documents, {} failed. Reports written to {}",
                summary.processed,
                summary.failed,
                output_dir.display()
            );
        }
        Commands::Rules => {
            println!("{}", processor.extractor().rules().to_json_pretty()?);
        }
        Commands::Serve { addr } => serve(addr.unwrap_or(config.grpc_addr), processor)?,
    }

    Ok(())
}
