use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::analysis::LayoutAnalyzer;
use crate::blob::BlobStore;
use crate::config::TablePullConfig;
use crate::error::TablePullResult;
use crate::render::TableFormatter;
use crate::table::Table;

/// Download a document, analyze its layout, and print the reconstructed
/// tables.
pub async fn analyze_command(
    blob: String,
    container: Option<String>,
    limit: Option<usize>,
    separator: bool,
) -> Result<()> {
    let mut config = TablePullConfig::load()?;
    if let Some(container) = container {
        config.storage.container = container;
    }
    config.validate()?;

    let timeout = Duration::from_secs(config.analysis.request_timeout_secs);

    info!(
        "📥 Downloading '{}' from container '{}'",
        blob, config.storage.container
    );
    let store = BlobStore::new(&config.storage, timeout)?;
    let document = store.download(&blob).await?;

    info!("🔍 Analyzing document layout ({} bytes)", document.len());
    let analyzer = LayoutAnalyzer::new(&config.analysis);
    let result = analyzer.analyze(document).await?;

    let doc_tables = result.tables.unwrap_or_default();
    if doc_tables.is_empty() {
        println!("No tables found in the analyzed document.");
        return Ok(());
    }
    info!("📊 Analysis recognized {} tables", doc_tables.len());

    let tables = doc_tables
        .iter()
        .map(|doc_table| {
            let table = Table::from_cells(&doc_table.to_cells())?;
            if table.height() != doc_table.row_count || table.width() != doc_table.column_count {
                warn!(
                    "⚠️  Reconstructed {}x{} but the service reported {}x{}",
                    table.height(),
                    table.width(),
                    doc_table.row_count,
                    doc_table.column_count
                );
            }
            Ok(table)
        })
        .collect::<TablePullResult<Vec<_>>>()?;

    let formatter = TableFormatter::new()
        .padding(config.output.padding)
        .separator(separator && config.output.separator);
    println!("{}", format_output(&tables, &formatter, limit));

    Ok(())
}

/// Assemble the stdout report: rendered tables separated by blank lines,
/// then the closing summary with a note for anything held back by --limit.
/// Degenerate empty tables are skipped rather than printed as blank space.
fn format_output(tables: &[Table], formatter: &TableFormatter, limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(tables.len()).min(tables.len());
    let mut output = String::new();

    for table in tables.iter().take(shown) {
        if table.is_empty() {
            continue;
        }
        output.push_str(&formatter.format_table(table));
        output.push_str("\n\n");
    }

    if shown < tables.len() {
        output.push_str(&format!(
            "({} more tables not shown)\n",
            tables.len() - shown
        ));
    }
    output.push_str(&format!(
        "🎉 Reconstructed {} of {} tables.",
        shown,
        tables.len()
    ));
    output
}
