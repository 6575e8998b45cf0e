// Quote store: turns raw venue files into cleaned snapshots for the engine
pub mod discovery;   // locate QTE / STS files for an instrument
pub mod normaliser;  // CSV records -> QuoteSnapshot, sentinel filtering
pub mod session;     // continuous-trading windows from status codes
pub mod csv_store;   // file-backed QuoteSource

use std::path::PathBuf;

use crate::engine::types::QuoteSnapshot;

pub use csv_store::CsvQuoteStore;

#[derive(Debug, thiserror::Error)]
pub enum QuoteStoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("missing required column `{0}`")]
    MissingColumn(String),
    #[error("line {line}: cannot parse `{value}` in column `{column}`")]
    InvalidField { line: u64, column: String, value: String },
    #[error("no quote files found for instrument {0}")]
    NoData(String),
}

pub type StoreResult<T> = Result<T, QuoteStoreError>;

/// Anything able to hand the engine one instrument's cleaned snapshots,
/// sorted by timestamp.
pub trait QuoteSource {
    fn load_quotes(&self, instrument_id: &str) -> StoreResult<Vec<QuoteSnapshot>>;
}
