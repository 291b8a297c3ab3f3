//! Price loading for the runner.
//!
//! Two formats are accepted:
//! - CSV with a header row; the price column is chosen by name, falling back
//!   to a `price` column and then to the last column.
//! - Tick `.dat` files, one `DATE TIME ASK/BID` quote per line; the ask is
//!   taken.
//!
//! Lines that cannot be parsed are skipped with a warning and counted, never
//! fabricated or interpolated.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

use arl_core::engine::MIN_WINDOW_PRICES;

/// Errors from the price loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("price column '{0}' not found in header")]
    MissingColumn(String),

    #[error("only {found} usable prices in {path} (need at least {min})")]
    TooFewPrices {
        path: PathBuf,
        found: usize,
        min: usize,
    },
}

/// On-disk price format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    Csv,
    Dat,
}

impl PriceFormat {
    /// Guess from the file extension: `.dat` is a tick file, anything else CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("dat") => PriceFormat::Dat,
            _ => PriceFormat::Csv,
        }
    }
}

/// Options controlling how prices are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub format: Option<PriceFormat>,
    pub price_column: Option<String>,
}

/// Prices parsed from one source, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub prices: Vec<f64>,
    /// Data lines dropped because they could not be parsed.
    pub skipped: usize,
    pub format: PriceFormat,
    pub source: PathBuf,
    /// BLAKE3 over the parsed prices, for fingerprinting the input.
    pub dataset_hash: String,
}

/// Load prices from `path`.
pub fn load_prices(path: &Path, opts: &LoadOptions) -> Result<LoadedPrices, LoadError> {
    let format = opts.format.unwrap_or_else(|| PriceFormat::from_path(path));
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (prices, skipped) = match format {
        PriceFormat::Csv => parse_csv(file, opts.price_column.as_deref())?,
        PriceFormat::Dat => parse_dat(BufReader::new(file))?,
    };

    if prices.len() < MIN_WINDOW_PRICES {
        return Err(LoadError::TooFewPrices {
            path: path.to_path_buf(),
            found: prices.len(),
            min: MIN_WINDOW_PRICES,
        });
    }

    tracing::info!(
        path = %path.display(),
        ?format,
        prices = prices.len(),
        skipped,
        "loaded prices"
    );

    Ok(LoadedPrices {
        dataset_hash: dataset_hash(&prices),
        prices,
        skipped,
        format,
        source: path.to_path_buf(),
    })
}

/// Parse a headed CSV. Returns the prices and the number of skipped rows.
pub fn parse_csv<R: Read>(reader: R, column: Option<&str>) -> Result<(Vec<f64>, usize), LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let index = match column {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))?,
        None => headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("price"))
            .unwrap_or_else(|| headers.len().saturating_sub(1)),
    };

    let mut prices = Vec::new();
    let mut skipped = 0;
    for (row, record) in csv_reader.records().enumerate() {
        let parsed = record
            .ok()
            .and_then(|r| r.get(index).and_then(|v| v.parse::<f64>().ok()))
            .filter(|p| p.is_finite());
        match parsed {
            Some(price) => prices.push(price),
            None => {
                skipped += 1;
                // +2: one-based, after the header
                tracing::warn!(line = row + 2, "skipping malformed csv row");
            }
        }
    }
    Ok((prices, skipped))
}

/// Parse `DATE TIME ASK/BID` tick lines. Blank lines are ignored.
pub fn parse_dat<R: BufRead>(reader: R) -> Result<(Vec<f64>, usize), LoadError> {
    let mut prices = Vec::new();
    let mut skipped = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Read {
            line: i + 1,
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_ask(&line) {
            Some(ask) => prices.push(ask),
            None => {
                skipped += 1;
                tracing::warn!(line = i + 1, content = %line, "skipping malformed tick line");
            }
        }
    }
    Ok((prices, skipped))
}

/// The ask of one tick line: the last whitespace-separated token before `/`.
fn parse_ask(line: &str) -> Option<f64> {
    let (quote, _bid) = line.split_once('/')?;
    let ask = quote.split_whitespace().last()?.parse::<f64>().ok()?;
    ask.is_finite().then_some(ask)
}

fn dataset_hash(prices: &[f64]) -> String {
    let mut hasher = blake3::Hasher::new();
    for p in prices {
        hasher.update(&p.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
