// src/output.rs

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::aggregate::{Matrix, Pivot};

pub const OVERALL_SCORES_CSV: &str = "rankings_overall_scores.csv";
pub const AUTHOR_COUNTS_CSV: &str = "rankings_author_counts.csv";
pub const AUTHOR_SHARES_CSV: &str = "rankings_author_shares.csv";

/// How a metric is rendered into a CSV cell.
pub trait CellValue: Copy {
    fn render(&self) -> String;
}

impl CellValue for f64 {
    /// Shortest round-trip form, keeping `.0` on integral values (`88.0`).
    /// Magnitudes below `1e-4` or from `1e16` up use a signed exponent of at
    /// least two digits (`1e-05`, `1.5e+16`). NaN renders as an empty cell.
    fn render(&self) -> String {
        let v = *self;
        if v.is_nan() {
            return String::new();
        }
        if v.is_infinite() {
            return if v > 0.0 { "inf".into() } else { "-inf".into() };
        }

        let abs = v.abs();
        if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
            let sci = format!("{:e}", v);
            let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }

        let plain = v.to_string();
        if plain.contains('.') {
            plain
        } else {
            plain + ".0"
        }
    }
}

impl CellValue for i64 {
    fn render(&self) -> String {
        self.to_string()
    }
}

/// Write one matrix as CSV: an empty corner cell, then the column labels;
/// each following row is the row label and its cells, empty where absent.
pub fn write_matrix<W: Write, T: CellValue>(w: W, matrix: &Matrix<T>) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(w);

    let header = std::iter::once("").chain(matrix.columns.iter().map(String::as_str));
    writer.write_record(header).context("writing CSV header")?;

    for (label, cells) in matrix.iter_rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(label.to_owned());
        record.extend(cells.iter().map(|c| c.map(|v| v.render()).unwrap_or_default()));
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row for {}", label))?;
    }

    writer.flush().context("flushing CSV writer")?;
    Ok(())
}

/// Write `matrix` to `path`, replacing any existing file.
pub fn write_matrix_file<T: CellValue>(path: &Path, matrix: &Matrix<T>) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_matrix(file, matrix).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), rows = matrix.rows.len(), "wrote matrix");
    Ok(())
}

/// Write all three pivots into `dir` under their fixed names. Returns the
/// paths in the order written.
pub fn write_pivot(dir: &Path, pivot: &Pivot) -> Result<Vec<PathBuf>> {
    let overall = dir.join(OVERALL_SCORES_CSV);
    let counts = dir.join(AUTHOR_COUNTS_CSV);
    let shares = dir.join(AUTHOR_SHARES_CSV);

    write_matrix_file(&overall, &pivot.overall_scores)?;
    write_matrix_file(&counts, &pivot.author_counts)?;
    write_matrix_file(&shares, &pivot.author_shares)?;

    let written = vec![overall, counts, shares];
    info!("Generated CSV files:");
    for p in &written {
        info!("- {}", p.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::parse::{Metrics, RankingTable};
    use std::fs;
    use tempfile::tempdir;

    fn one(name: &str, score: f64, count: i64, share: f64) -> RankingTable {
        let mut t = RankingTable::default();
        t.institutions.insert(
            name.to_string(),
            Metrics {
                overall_score: score,
                author_count: count,
                author_share: share,
            },
        );
        t
    }

    fn render<T: CellValue>(m: &Matrix<T>) -> String {
        let mut buf = Vec::new();
        write_matrix(&mut buf, m).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(88.0_f64.render(), "88.0");
        assert_eq!(95.5_f64.render(), "95.5");
        assert_eq!(0.1_f64.render(), "0.1");
        assert_eq!(120_i64.render(), "120");
        assert_eq!((-0.0_f64).render(), "-0.0");
        assert_eq!(0.0001_f64.render(), "0.0001");
        assert_eq!(1e15_f64.render(), "1000000000000000.0");
    }

    #[test]
    fn test_exponent_rendering() {
        assert_eq!(1e-5_f64.render(), "1e-05");
        assert_eq!(1.5e-7_f64.render(), "1.5e-07");
        assert_eq!(1e16_f64.render(), "1e+16");
        assert_eq!(1.2345e20_f64.render(), "1.2345e+20");
        assert_eq!((-2.5e-120_f64).render(), "-2.5e-120");
    }

    #[test]
    fn test_non_finite_rendering() {
        assert_eq!(f64::NAN.render(), "");
        assert_eq!(f64::INFINITY.render(), "inf");
        assert_eq!(f64::NEG_INFINITY.render(), "-inf");
    }

    #[test]
    fn test_nan_score_and_tiny_share_in_csv() {
        let pivot = Aggregator::new()
            .add("cdm", one("MIT", f64::NAN, 120, 0.00001))
            .finish();
        assert_eq!(render(&pivot.overall_scores), ",cdm\nMIT,\n");
        assert_eq!(render(&pivot.author_shares), ",cdm\nMIT,1e-05\n");
    }

    #[test]
    fn test_matrix_layout_with_gaps() {
        let pivot = Aggregator::new()
            .add("cdm", one("MIT", 95.5, 120, 2.3))
            .add("eng", one("Stanford", 88.0, 90, 1.8))
            .finish();
        assert_eq!(
            render(&pivot.overall_scores),
            ",cdm,eng\nMIT,95.5,\nStanford,,88.0\n"
        );
        assert_eq!(
            render(&pivot.author_counts),
            ",cdm,eng\nMIT,120,\nStanford,,90\n"
        );
    }

    #[test]
    fn test_names_with_commas_and_quotes_are_quoted() {
        let pivot = Aggregator::new()
            .add("abc", one("Univ. of X, \"Main\"", 1.0, 1, 0.5))
            .finish();
        assert_eq!(
            render(&pivot.author_shares),
            ",abc\n\"Univ. of X, \"\"Main\"\"\",0.5\n"
        );
    }

    #[test]
    fn test_write_pivot_creates_three_files() -> Result<()> {
        let tmp = tempdir()?;
        fs::write(tmp.path().join(OVERALL_SCORES_CSV), "stale")?;

        let pivot = Aggregator::new().add("cdm", one("MIT", 95.5, 120, 2.3)).finish();
        let written = write_pivot(tmp.path(), &pivot)?;

        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(tmp.path().join(OVERALL_SCORES_CSV))?,
            ",cdm\nMIT,95.5\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join(AUTHOR_COUNTS_CSV))?,
            ",cdm\nMIT,120\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join(AUTHOR_SHARES_CSV))?,
            ",cdm\nMIT,2.3\n"
        );
        Ok(())
    }
}
