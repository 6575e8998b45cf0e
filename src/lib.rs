//! Cross-venue arbitrage detection over historical top-of-book snapshots.
//!
//! Quotes from several venues are aligned onto one timeline with a bounded
//! staleness join, optionally delayed on the bid side to model latency,
//! scanned for bid > ask crossings between different venues, and collapsed
//! so a persisting opportunity is reported once.

pub mod config;
pub mod engine;
pub mod market_data;
pub mod report;
pub mod telemetry;

pub use engine::{AnalyzerConfig, ArbitrageAnalyzer, ArbitrageEvent, LatencyMode, QuoteSnapshot};
