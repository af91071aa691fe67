// src/pipeline.rs

use anyhow::Result;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::{aggregate::Aggregator, discover, output, parse};

/// What a run did, for the caller and for tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_skipped: Vec<PathBuf>,
    /// Category → institutions parsed from its file.
    pub per_category: BTreeMap<String, usize>,
    pub total_institutions: usize,
    pub written: Vec<PathBuf>,
}

/// Discover ranking files in `dir`, pivot them, and write the three CSVs
/// back into `dir`. Returns `None` without writing anything when no
/// `top.*.html` file exists.
#[instrument(level = "info", skip(dir), fields(dir = %dir.display()))]
pub fn run(dir: &Path) -> Result<Option<RunSummary>> {
    let found = discover::discover_ranking_files(dir)?;
    if found.candidates.is_empty() {
        info!("No ranking HTML files found in {}", dir.display());
        return Ok(None);
    }

    let mut per_category = BTreeMap::new();
    let mut agg = Aggregator::new();
    for (category, path) in &found.files {
        info!("Processing {} (category: {})", path.display(), category);
        let table = parse::parse_ranking_file(path)?;
        info!("  Found {} institutions", table.len());
        per_category.insert(category.clone(), table.len());
        agg = agg.add(category.as_str(), table);
    }

    let pivot = agg.finish();
    info!("Total unique institutions: {}", pivot.institutions.len());
    info!("Categories: {}", pivot.categories.join(", "));

    let written = output::write_pivot(dir, &pivot)?;

    Ok(Some(RunSummary {
        files_found: found.candidates.len(),
        files_skipped: found.skipped,
        per_category,
        total_institutions: pivot.institutions.len(),
        written,
    }))
}
