use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use lattice_index::{
    DocId, LatticeAnalyzerBuilder, LatticeFilterConfig, LatticeIndex, LatticeQueryConfig,
    MatchLatticeQuery,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[path = "lattice_search/json_report_formatter.rs"]
mod json_report_formatter;

use json_report_formatter::{write_report, Hit, SearchReport};

#[derive(Debug, Parser)]
#[command(name = "lattice_search")]
#[command(about = "Index lattice-annotated documents and run a payload-scored match query")]
struct Args {
    /// JSON lines, one `{"id": <u32>, "text": <annotated text>}` per line.
    #[arg(long, env = "LATTICE_SEARCH_DOCS")]
    docs: PathBuf,
    #[arg(long, env = "LATTICE_SEARCH_QUERY")]
    query: String,
    #[arg(long, env = "LATTICE_SEARCH_FILTER_CONFIG")]
    filter_config: Option<PathBuf>,
    #[arg(long, env = "LATTICE_SEARCH_QUERY_CONFIG")]
    query_config: Option<PathBuf>,
    #[arg(long, env = "LATTICE_SEARCH_TOP_K", default_value_t = 10)]
    top_k: usize,
    #[arg(long, env = "LATTICE_SEARCH_EXPLAIN", default_value_t = false)]
    explain: bool,
    /// Writes the report here instead of stdout.
    #[arg(long, env = "LATTICE_SEARCH_OUT")]
    out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DocRecord {
    id: DocId,
    text: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let filter_config = match &args.filter_config {
        Some(path) => LatticeFilterConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => LatticeFilterConfig::default(),
    };
    let query_config = match &args.query_config {
        Some(path) => LatticeQueryConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => LatticeQueryConfig::default(),
    };

    let analyzer = LatticeAnalyzerBuilder::new(filter_config)
        .build()
        .map_err(|e| format!("Failed to build analyzer: {e}"))?;
    let mut index = LatticeIndex::new(analyzer);
    let skipped = load_documents(&args.docs, &mut index)?;

    let query = MatchLatticeQuery::new(args.query.as_str(), query_config)
        .map_err(|e| format!("Invalid query config: {e}"))?;
    let built = query
        .build(index.analyzer())
        .map_err(|e| format!("Failed to build query '{}': {e}", args.query))?;

    let hits = match &built {
        Some(q) => q
            .search(&index, args.top_k)
            .into_iter()
            .map(|d| Hit {
                doc: d.doc,
                score: d.score,
                explanation: args.explain.then(|| q.explain(&index, d.doc)),
            })
            .collect(),
        None => Vec::new(),
    };

    let report = SearchReport {
        query: args.query.clone(),
        parsed_query: built.as_ref().map(ToString::to_string),
        num_docs: index.num_docs(),
        skipped_docs: skipped,
        hits,
    };
    write_report(args.out.as_deref(), &report)
}

/// Returns the number of lines that could not be indexed.
fn load_documents(path: &Path, index: &mut LatticeIndex) -> Result<usize, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read documents '{}': {err}", path.display()))?;

    let mut skipped = 0;
    for (line_no, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: DocRecord = serde_json::from_str(line).map_err(|err| {
            format!("{}:{}: invalid document record: {err}", path.display(), line_no + 1)
        })?;
        if let Err(err) = index.add_document(record.id, &record.text) {
            tracing::warn!(doc = record.id, line = line_no + 1, error = %err, "skipping document");
            skipped += 1;
        }
    }
    tracing::debug!(docs = index.num_docs(), skipped, "indexed documents");
    Ok(skipped)
}
