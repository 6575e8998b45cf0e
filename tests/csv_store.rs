use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use venue_arb::engine::types::VenueId;
use venue_arb::market_data::{CsvQuoteStore, QuoteSource, QuoteStoreError};
use venue_arb::{AnalyzerConfig, ArbitrageAnalyzer};

const ISIN: &str = "ES0113900J37";

fn write(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

fn write_gz(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    let mut enc = GzEncoder::new(fs::File::create(dir.join(name)).unwrap(), Compression::default());
    enc.write_all(body.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn fixture() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let day = root.path().join("2024-06-11");

    write(
        &day,
        "QTE_2024-06-11_ES0113900J37_SAN_XMAD_1.csv",
        "epoch;mic;isin;px_bid_0;qty_bid_0;px_ask_0;qty_ask_0\n\
         1000;XMAD;ES0113900J37;4.10;100;4.12;50\n\
         2000;XMAD;ES0113900J37;999999.999;100;4.12;50\n\
         3000;XMAD;ES0113900J37;4.10;100;4.12;50\n",
    );
    write(
        &day.join("aquis"),
        "QTE_2024-06-11_ES0113900J37_SAN_AQEU_1.csv",
        "epoch;mic;isin;px_bid_0;qty_bid_0;px_ask_0;qty_ask_0\n\
         1000;AQEU;ES0113900J37;4.15;30;4.16;40\n\
         3000;AQEU;ES0113900J37;4.15;30;4.16;40\n",
    );
    write(
        &day,
        "STS_2024-06-11_ES0113900J37_SAN_XMAD_1.csv",
        "epoch;mic;market_trading_status\n\
         500;XMAD;5832713\n\
         2500;XMAD;5832737\n",
    );
    // other instrument, must be ignored
    write(
        &day,
        "QTE_2024-06-11_ES0000000001_XXX_XMAD_1.csv",
        "epoch;mic;px_bid_0;qty_bid_0;px_ask_0;qty_ask_0\n1000;XMAD;1;1;2;1\n",
    );
    root
}

#[test]
fn loads_cleans_and_trims() {
    let root = fixture();
    let quotes = CsvQuoteStore::new(root.path()).load_quotes(ISIN).unwrap();

    // XMAD: 2000 rejected (sentinel), 3000 outside continuous trading
    let xmad: Vec<i64> = quotes.iter().filter(|q| q.venue.as_str() == "XMAD").map(|q| q.timestamp).collect();
    let aqeu: Vec<i64> = quotes.iter().filter(|q| q.venue.as_str() == "AQEU").map(|q| q.timestamp).collect();
    assert_eq!(xmad, vec![1000]);
    assert_eq!(aqeu, vec![1000, 3000]);
    assert!(quotes.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(quotes.iter().all(|q| q.instrument_id == ISIN));
}

#[test]
fn session_trim_can_be_disabled() {
    let root = fixture();
    let quotes = CsvQuoteStore::new(root.path())
        .without_session_trim()
        .load_quotes(ISIN)
        .unwrap();
    assert_eq!(quotes.len(), 4);
}

#[test]
fn loaded_quotes_feed_the_analyzer() {
    let root = fixture();
    let quotes = CsvQuoteStore::new(root.path()).load_quotes(ISIN).unwrap();
    let events = ArbitrageAnalyzer::new(AnalyzerConfig::default())
        .unwrap()
        .find_arbitrage(&quotes)
        .unwrap();

    assert_eq!(events.len(), 1);
    let e = &events[0];
    assert_eq!(e.timestamp, 1000);
    assert_eq!(e.from_venue, VenueId::from("XMAD"));
    assert_eq!(e.to_venue, VenueId::from("AQEU"));
    assert_eq!(e.tradable_volume, 30.0);
    assert!((e.profit - 0.9).abs() < 1e-9);
}

#[test]
fn unknown_instrument_is_reported() {
    let root = fixture();
    let err = CsvQuoteStore::new(root.path()).load_quotes("US0000000000").unwrap_err();
    assert!(matches!(err, QuoteStoreError::NoData(isin) if isin == "US0000000000"));
}

#[test]
fn reads_gzip_compressed_files() {
    let root = tempfile::tempdir().unwrap();
    let day = root.path().join("2024-06-11");
    write_gz(
        &day,
        "QTE_2024-06-11_ES0113900J37_SAN_XMAD_1.csv.gz",
        "epoch;mic;isin;px_bid_0;qty_bid_0;px_ask_0;qty_ask_0\n\
         1000;XMAD;ES0113900J37;4.10;100;4.12;50\n\
         4000;XMAD;ES0113900J37;4.10;100;4.12;50\n",
    );
    write_gz(
        &day,
        "STS_2024-06-11_ES0113900J37_SAN_XMAD_1.csv.gz",
        "epoch;mic;market_trading_status\n\
         500;XMAD;5832713\n\
         3000;XMAD;5832737\n",
    );
    // plain and compressed files mix in one directory
    write(
        &day,
        "QTE_2024-06-11_ES0113900J37_SAN_AQEU_1.csv",
        "epoch;mic;isin;px_bid_0;qty_bid_0;px_ask_0;qty_ask_0\n\
         1000;AQEU;ES0113900J37;4.15;30;4.16;40\n",
    );

    let quotes = CsvQuoteStore::new(root.path()).load_quotes(ISIN).unwrap();
    // XMAD 4000 falls after the close at 3000
    let xmad: Vec<_> = quotes.iter().filter(|q| q.venue.as_str() == "XMAD").collect();
    assert_eq!(xmad.len(), 1);
    assert_eq!(xmad[0].timestamp, 1000);
    assert_eq!(xmad[0].top_of_book().bid.map(|l| l.price), Some(4.10));
    assert_eq!(quotes.iter().filter(|q| q.venue.as_str() == "AQEU").count(), 1);
}
