// src/parse.rs

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::{collections::BTreeMap, fmt, fs, path::Path, str::FromStr};
use tracing::{debug, instrument, trace};

/// Rank, institution, score, authors, share.
pub const MIN_CELLS: usize = 5;

/// First-cell values that mark header/structural rows.
pub const HEADER_MARKERS: &[&str] = &["Entity", "TD"];

/// The three numbers carried by one ranking row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub overall_score: f64,
    pub author_count: i64,
    pub author_share: f64,
}

/// One successfully parsed row.
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionRecord {
    pub institution: String,
    pub metrics: Metrics,
}

/// Institution cell, resolved once: either it wraps a hyperlink or it's plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstitutionCell {
    Link(String),
    Text(String),
}

impl InstitutionCell {
    pub fn from_element(cell: ElementRef<'_>, link: &Selector) -> Self {
        match cell.select(link).next() {
            Some(a) => InstitutionCell::Link(text_of(a)),
            None => InstitutionCell::Text(text_of(cell)),
        }
    }

    /// Trimmed display name.
    pub fn name(&self) -> &str {
        match self {
            InstitutionCell::Link(s) | InstitutionCell::Text(s) => s.trim(),
        }
    }
}

/// Which numeric column failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    OverallScore,
    AuthorCount,
    AuthorShare,
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumericColumn::OverallScore => "overall score",
            NumericColumn::AuthorCount => "author count",
            NumericColumn::AuthorShare => "author share",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    TooFewCells(usize),
    EmptyRank,
    HeaderMarker(String),
    EmptyInstitution,
    BadNumber { column: NumericColumn, value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewCells(n) => write!(f, "only {} cells, need {}", n, MIN_CELLS),
            SkipReason::EmptyRank => f.write_str("empty rank cell"),
            SkipReason::HeaderMarker(m) => write!(f, "header row ({})", m),
            SkipReason::EmptyInstitution => f.write_str("empty institution name"),
            SkipReason::BadNumber { column, value } => {
                write!(f, "{} is not numeric: {:?}", column, value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record(InstitutionRecord),
    Skip(SkipReason),
}

/// Everything pulled out of one ranking document.
#[derive(Debug, Default)]
pub struct RankingTable {
    /// Institution → metrics. A later row with the same name replaces an earlier one.
    pub institutions: BTreeMap<String, Metrics>,
    /// `(row index, reason)` for every `tr` that didn't produce a record.
    pub skipped: Vec<(usize, SkipReason)>,
}

impl RankingTable {
    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

fn parse_num<T: FromStr>(raw: &str, column: NumericColumn) -> Result<T, SkipReason> {
    let s = raw.trim();
    s.parse::<T>().map_err(|_| SkipReason::BadNumber {
        column,
        value: s.to_owned(),
    })
}

/// CSS selectors used to walk a ranking table.
#[derive(Debug, Clone)]
pub struct RowParser {
    row: Selector,
    cell: Selector,
    link: Selector,
}

impl Default for RowParser {
    fn default() -> Self {
        Self {
            row: Selector::parse("tr").expect("tr selector should parse"),
            cell: Selector::parse("td").expect("td selector should parse"),
            link: Selector::parse("a").expect("a selector should parse"),
        }
    }
}

impl RowParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a single `tr` element.
    pub fn parse_row(&self, row: ElementRef<'_>) -> RowOutcome {
        match self.try_parse_row(row) {
            Ok(rec) => RowOutcome::Record(rec),
            Err(reason) => RowOutcome::Skip(reason),
        }
    }

    /// Classify every `tr` in the document, in document order.
    pub fn parse_rows(&self, html: &str) -> Vec<RowOutcome> {
        let doc = Html::parse_document(html);
        doc.select(&self.row).map(|r| self.parse_row(r)).collect()
    }

    fn try_parse_row(&self, row: ElementRef<'_>) -> Result<InstitutionRecord, SkipReason> {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
        if cells.len() < MIN_CELLS {
            return Err(SkipReason::TooFewCells(cells.len()));
        }

        let rank = text_of(cells[0]);
        let rank = rank.trim();
        if rank.is_empty() {
            return Err(SkipReason::EmptyRank);
        }
        if HEADER_MARKERS.contains(&rank) {
            return Err(SkipReason::HeaderMarker(rank.to_owned()));
        }

        let institution = InstitutionCell::from_element(cells[1], &self.link).name().to_owned();
        if institution.is_empty() {
            return Err(SkipReason::EmptyInstitution);
        }

        let metrics = Metrics {
            overall_score: parse_num(&text_of(cells[2]), NumericColumn::OverallScore)?,
            author_count: parse_num(&text_of(cells[3]), NumericColumn::AuthorCount)?,
            author_share: parse_num(&text_of(cells[4]), NumericColumn::AuthorShare)?,
        };

        Ok(InstitutionRecord {
            institution,
            metrics,
        })
    }
}

/// Classify every `tr` in `html` with a fresh [`RowParser`].
pub fn parse_rows(html: &str) -> Vec<RowOutcome> {
    RowParser::new().parse_rows(html)
}

/// Parse a ranking document into its institution table. Never fails on bad rows.
#[instrument(level = "debug", skip(html), fields(content_len = html.len()))]
pub fn parse_ranking_html(html: &str) -> RankingTable {
    let mut table = RankingTable::default();
    for (idx, outcome) in parse_rows(html).into_iter().enumerate() {
        match outcome {
            RowOutcome::Record(rec) => {
                trace!(row = idx, institution = %rec.institution, "parsed row");
                table.institutions.insert(rec.institution, rec.metrics);
            }
            RowOutcome::Skip(reason) => {
                trace!(row = idx, reason = %reason, "skipped row");
                table.skipped.push((idx, reason));
            }
        }
    }
    debug!(
        institutions = table.institutions.len(),
        skipped = table.skipped.len(),
        "finished ranking table"
    );
    table
}

/// Read and parse one ranking file.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_ranking_file<P: AsRef<Path>>(path: P) -> Result<RankingTable> {
    let html = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read ranking file: {:?}", path.as_ref()))?;
    Ok(parse_ranking_html(&html))
}
