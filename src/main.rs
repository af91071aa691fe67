use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    // ─── 2) discover → parse → pivot → write, in the working dir ─────
    let summary = rankpivot::run(Path::new(".")).context("ranking pivot failed")?;

    if let Some(s) = summary {
        info!(
            files = s.files_found,
            skipped = s.files_skipped.len(),
            categories = s.per_category.len(),
            institutions = s.total_institutions,
            "all done"
        );
    }
    Ok(())
}
