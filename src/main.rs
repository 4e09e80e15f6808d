use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use newsdigest::source::DEFAULT_SECTION;
use newsdigest::volume::months::DEFAULT_MAX_MONTH_DISTANCE;
use newsdigest::{infer_year, write_json, ReaderConfig, ReconstructionConfig, Reconstructor, TranscriptReader};

#[derive(Parser, Debug)]
#[command(name = "newsdigest")]
#[command(about = "Reconstruct abstracts, headings and cross-references from an OCR'd newspaper digest")]
#[command(version)]
struct Args {
    /// Transcript of one digest volume
    transcript: PathBuf,

    /// Volume year (defaults to the transcript's parent directory name)
    #[arg(long)]
    year: Option<i32>,

    /// Transcript section holding the abstracts
    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,

    /// Volume output file path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,

    /// Largest edit distance accepted when matching month tokens
    #[arg(long, default_value_t = DEFAULT_MAX_MONTH_DISTANCE)]
    month_distance: usize,

    /// Do not create synthetic records for SeeAbstract lines
    #[arg(long)]
    no_synthetic: bool,

    /// Input lines carry `N|` line-number prefixes
    #[arg(long)]
    numbered: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // WHY: structured JSON logging enables observability and debugging in production
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();

    info!("Starting newsdigest");
    info!(?args, "Parsed CLI arguments");

    // WHY: validate input early to fail fast with clear error
    if !args.transcript.is_file() {
        anyhow::bail!("Transcript does not exist: {}", args.transcript.display());
    }

    let year = match args.year.or_else(|| infer_year(&args.transcript)) {
        Some(year) => year,
        None => anyhow::bail!(
            "Cannot infer the volume year from {}; pass --year",
            args.transcript.display()
        ),
    };

    let reader = TranscriptReader::new(ReaderConfig {
        numbered: args.numbered,
        ..ReaderConfig::default()
    });
    let (transcript, read_stats) = reader.read_transcript(&args.transcript).await?;

    let config = ReconstructionConfig {
        year,
        section: args.section.clone(),
        max_month_distance: args.month_distance,
        materialize_see_abstracts: !args.no_synthetic,
        source_label: read_stats.file_path.clone(),
        ..ReconstructionConfig::default()
    };
    let reconstructor = Reconstructor::new(config)?;
    let volume = reconstructor.reconstruct_transcript(&transcript);

    if let Some(out) = &args.out {
        write_json(out, &volume, args.pretty).await?;
    }
    write_json(&args.stats_out, &volume.stats, true).await?;

    let stats = &volume.stats;
    println!("newsdigest v{} - {} ({})", env!("CARGO_PKG_VERSION"), stats.source, year);
    println!("  Lines read: {}", stats.lines_read);
    println!(
        "  Abstracts: {} parsed, {} malformed, {} synthetic",
        stats.abstracts_parsed, stats.abstracts_malformed, stats.synthetic_abstracts
    );
    println!(
        "  Headings: {} / {} / {} ({} cross-references, {} unclassified)",
        stats.headings, stats.subheadings1, stats.subheadings2, stats.cross_references, stats.headings_unclassified
    );
    println!("  Page breaks: {}", stats.page_breaks);
    if !stats.missing_ids.is_empty() {
        println!("  Missing abstract numbers: {:?}", stats.missing_ids);
    }
    println!("  Diagnostics: {} ({})", stats.diagnostics, stats.status);

    info!("Run complete");
    Ok(if volume.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
