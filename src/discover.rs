// src/discover.rs

use anyhow::{bail, Context, Result};
use glob::{glob, Pattern};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Glob used to find candidate ranking tables.
pub const RANKING_GLOB: &str = "top.*.html";

static CATEGORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"top\.([a-z]{3})\.html").expect("category regex is valid"));

/// Result of scanning a directory for ranking files.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Every path the glob matched, in glob order.
    pub candidates: Vec<PathBuf>,
    /// Category code → file, for names that carried a valid code.
    pub files: BTreeMap<String, PathBuf>,
    /// Matched the glob but not the category pattern.
    pub skipped: Vec<PathBuf>,
}

/// Extract the three-letter category from a name like `top.cdm.html`.
///
/// The pattern is searched, not anchored: `top.top.cdm.html` yields `cdm`.
pub fn category_from_filename(file_name: &str) -> Option<String> {
    CATEGORY_RE
        .captures(file_name)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_owned()))
}

/// List `top.*.html` files in `dir` and key them by category code.
///
/// Files whose name doesn't yield a code are logged and left out. Two
/// files resolving to the same code is an error.
pub fn discover_ranking_files(dir: &Path) -> Result<Discovery> {
    let pattern = format!(
        "{}/{}",
        Pattern::escape(&dir.to_string_lossy()),
        RANKING_GLOB
    );
    let candidates: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list entries for '{}'", pattern))?
        .into_iter()
        .filter(|p| p.is_file())
        .collect();
    info!("Found {} ranking files", candidates.len());

    let mut out = Discovery {
        candidates,
        ..Default::default()
    };

    for path in &out.candidates {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(category) = category_from_filename(&name) else {
            warn!("Skipping {} - couldn't extract category", path.display());
            out.skipped.push(path.clone());
            continue;
        };

        if let Some(prev) = out.files.get(&category) {
            bail!(
                "category '{}' claimed by both {} and {}",
                category,
                prev.display(),
                path.display()
            );
        }
        debug!(category = %category, path = %path.display(), "discovered");
        out.files.insert(category, path.clone());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_category_extraction() {
        assert_eq!(category_from_filename("top.cdm.html"), Some("cdm".into()));
        assert_eq!(category_from_filename("top.eng.html"), Some("eng".into()));
        assert_eq!(category_from_filename("top.CDM.html"), None);
        assert_eq!(category_from_filename("top.abcd.html"), None);
        assert_eq!(category_from_filename("top.ab.html"), None);
        assert_eq!(category_from_filename("top.top.cdm.html"), Some("cdm".into()));
        assert_eq!(category_from_filename("top.x.html"), None);
    }

    #[test]
    fn test_discover_keys_by_category() -> Result<()> {
        let tmp = tempdir()?;
        for name in ["top.eng.html", "top.cdm.html", "top.misc.html", "other.html"] {
            fs::write(tmp.path().join(name), "<table></table>")?;
        }
        fs::create_dir(tmp.path().join("top.dir.html"))?;

        let found = discover_ranking_files(tmp.path())?;
        assert_eq!(found.candidates.len(), 3);
        assert_eq!(
            found.files.keys().map(String::as_str).collect::<Vec<_>>(),
            ["cdm", "eng"]
        );
        assert_eq!(found.skipped.len(), 1);
        assert!(found.skipped[0].ends_with("top.misc.html"));
        assert!(found.files["cdm"].ends_with("top.cdm.html"));
        Ok(())
    }

    #[test]
    fn test_nested_name_resolves_to_inner_code() -> Result<()> {
        let tmp = tempdir()?;
        fs::write(tmp.path().join("top.top.cdm.html"), "<table></table>")?;

        let found = discover_ranking_files(tmp.path())?;
        assert!(found.skipped.is_empty());
        assert!(found.files["cdm"].ends_with("top.top.cdm.html"));
        Ok(())
    }

    #[test]
    fn test_duplicate_category_is_an_error() -> Result<()> {
        let tmp = tempdir()?;
        fs::write(tmp.path().join("top.cdm.html"), "<table></table>")?;
        fs::write(tmp.path().join("top.top.cdm.html"), "<table></table>")?;

        let err = discover_ranking_files(tmp.path()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("'cdm'"), "{}", msg);
        assert!(msg.contains("top.cdm.html"), "{}", msg);
        assert!(msg.contains("top.top.cdm.html"), "{}", msg);
        Ok(())
    }

    #[test]
    fn test_discover_empty_dir() -> Result<()> {
        let tmp = tempdir()?;
        let found = discover_ranking_files(tmp.path())?;
        assert!(found.candidates.is_empty());
        assert!(found.files.is_empty());
        Ok(())
    }
}
