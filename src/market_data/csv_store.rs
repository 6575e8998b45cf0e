use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use tracing::{debug, info, instrument};

use super::discovery::{discover, is_gzip};
use super::normaliser::{parse_epoch, required, QuoteColumns};
use super::session::{StatusRecord, TradingSessions};
use super::{QuoteSource, QuoteStoreError, StoreResult};
use crate::engine::types::{QuoteSnapshot, VenueId};

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new().delimiter(b';').flexible(true).from_reader(input)
}

// `.gz` files are decompressed on the fly
fn open(path: &Path) -> StoreResult<Box<dyn Read>> {
    let file = File::open(path).map_err(|source| QuoteStoreError::Io { path: path.to_path_buf(), source })?;
    let file = BufReader::new(file);
    Ok(if is_gzip(path) { Box::new(GzDecoder::new(file)) } else { Box::new(file) })
}

/// Parse one quote file. Records carrying sentinel prices are dropped;
/// the second value is how many.
pub fn read_quotes<R: Read>(input: R, isin: &str) -> StoreResult<(Vec<QuoteSnapshot>, usize)> {
    let mut rdr = reader(input);
    let columns = QuoteColumns::from_headers(rdr.headers()?)?;
    let mut quotes = Vec::new();
    let mut rejected = 0usize;
    for record in rdr.records() {
        match columns.parse(&record?, isin)? {
            Some(q) => quotes.push(q),
            None => rejected += 1,
        }
    }
    Ok((quotes, rejected))
}

pub fn read_statuses<R: Read>(input: R) -> StoreResult<Vec<StatusRecord>> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let epoch = required(&headers, "epoch")?;
    let mic = required(&headers, "mic")?;
    let status = required(&headers, "market_trading_status")?;

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let raw = record.get(status).unwrap_or("").trim();
        let code = raw.parse::<u64>().map_err(|_| QuoteStoreError::InvalidField {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            column: "market_trading_status".into(),
            value: raw.to_string(),
        })?;
        out.push(StatusRecord {
            venue: VenueId::new(record.get(mic).unwrap_or("").trim()),
            timestamp: parse_epoch(&record, epoch)?,
            status: code,
        });
    }
    Ok(out)
}

/// Directory-backed quote source: every matching QTE/STS file below `root`.
#[derive(Debug, Clone)]
pub struct CsvQuoteStore {
    root: PathBuf,
    trim_sessions: bool,
}

impl CsvQuoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), trim_sessions: true }
    }

    /// Skip continuous-trading trimming even when status files exist.
    pub fn without_session_trim(mut self) -> Self {
        self.trim_sessions = false;
        self
    }
}

impl QuoteSource for CsvQuoteStore {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn load_quotes(&self, instrument_id: &str) -> StoreResult<Vec<QuoteSnapshot>> {
        let files = discover(&self.root, instrument_id)?;
        if files.quotes.is_empty() {
            return Err(QuoteStoreError::NoData(instrument_id.to_string()));
        }

        let mut quotes = Vec::new();
        let mut rejected = 0usize;
        for path in &files.quotes {
            let (mut q, r) = read_quotes(open(path)?, instrument_id)?;
            debug!(file = %path.display(), quotes = q.len(), rejected = r, "read quote file");
            quotes.append(&mut q);
            rejected += r;
        }

        if self.trim_sessions {
            let mut statuses = Vec::new();
            for path in &files.statuses {
                statuses.extend(read_statuses(open(path)?)?);
            }
            quotes = TradingSessions::from_statuses(&statuses).trim(quotes);
        }

        // stable: per-venue input order survives for equal timestamps
        quotes.sort_by_key(|q| q.timestamp);
        info!(quotes = quotes.len(), rejected, "loaded quotes");
        Ok(quotes)
    }
}
