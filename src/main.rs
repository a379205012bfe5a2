use anyhow::Result;
use clap::Parser;

use tablepull::cli::analyze_command;
use tablepull::logging::init_logging;

#[derive(Parser)]
#[command(name = "tablepull")]
#[command(about = "Download a PDF from blob storage, run layout analysis, and print its tables")]
#[command(version)]
struct Cli {
    /// Blob name of the document to analyze
    #[arg(default_value = "psd-data.pdf")]
    blob: String,

    /// Container holding the blob (overrides configuration)
    #[arg(short, long)]
    container: Option<String>,

    /// Print only the first N tables
    #[arg(short, long)]
    limit: Option<usize>,

    /// Skip the dashed rule between header and body
    #[arg(long)]
    no_separator: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    analyze_command(cli.blob, cli.container, cli.limit, !cli.no_separator).await
}
