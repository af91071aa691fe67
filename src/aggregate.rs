// src/aggregate.rs

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::parse::{Metrics, RankingTable};

/// Institutions × categories, one cell per (institution, category) pair.
/// Absent cells stay `None`; there is no zero fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    cells: Vec<Vec<Option<T>>>,
}

impl<T: Copy> Matrix<T> {
    fn empty(rows: &[String], columns: &[String]) -> Self {
        Self {
            rows: rows.to_vec(),
            columns: columns.to_vec(),
            cells: vec![vec![None; columns.len()]; rows.len()],
        }
    }

    fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[row][col] = Some(value);
    }

    pub fn get(&self, institution: &str, category: &str) -> Option<T> {
        let r = self.rows.binary_search_by(|s| s.as_str().cmp(institution)).ok()?;
        let c = self.columns.binary_search_by(|s| s.as_str().cmp(category)).ok()?;
        self.cells[r][c]
    }

    /// Row label paired with that row's cells, in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &[Option<T>])> {
        self.rows
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    /// Number of populated cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// The three pivoted outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub institutions: Vec<String>,
    pub categories: Vec<String>,
    pub overall_scores: Matrix<f64>,
    pub author_counts: Matrix<i64>,
    pub author_shares: Matrix<f64>,
}

/// Accumulates per-category tables before pivoting.
#[derive(Debug, Default)]
pub struct Aggregator {
    by_category: BTreeMap<String, BTreeMap<String, Metrics>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one category's parse into the accumulator. An empty table still
    /// registers the category as a column.
    pub fn add(mut self, category: impl Into<String>, table: RankingTable) -> Self {
        self.by_category.insert(category.into(), table.institutions);
        self
    }

    pub fn finish(self) -> Pivot {
        let institutions: Vec<String> = self
            .by_category
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let categories: Vec<String> = self.by_category.keys().cloned().collect();

        let mut overall_scores = Matrix::empty(&institutions, &categories);
        let mut author_counts = Matrix::empty(&institutions, &categories);
        let mut author_shares = Matrix::empty(&institutions, &categories);

        for (col, institutions_in_cat) in self.by_category.values().enumerate() {
            for (name, m) in institutions_in_cat {
                // `institutions` is the union of these keys, so the search always hits.
                let Ok(row) = institutions.binary_search(name) else {
                    debug_assert!(false, "{} missing from institution union", name);
                    continue;
                };
                overall_scores.set(row, col, m.overall_score);
                author_counts.set(row, col, m.author_count);
                author_shares.set(row, col, m.author_share);
            }
        }

        debug!(
            institutions = institutions.len(),
            categories = categories.len(),
            cells = overall_scores.filled(),
            "pivot built"
        );

        Pivot {
            institutions,
            categories,
            overall_scores,
            author_counts,
            author_shares,
        }
    }
}
