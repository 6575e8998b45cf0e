// Convert `;`-separated venue records into engine snapshots.
// Empty cells mean "no level"; depth stops at the first missing price.

use csv::StringRecord;
use smallvec::SmallVec;

use super::{QuoteStoreError, StoreResult};
use crate::engine::types::{BookLevel, Levels, Micros, QuoteSnapshot, VenueId, MAX_LEVELS};

// Reject values venues publish in place of a real price
pub const REJECTED_PRICES: [f64; 6] = [666666.666, 999999.999, 999999.989, 999999.988, 999999.979, 999999.123];

pub fn is_rejected_price(price: f64) -> bool {
    REJECTED_PRICES.contains(&price)
}

#[derive(Debug, Clone, Copy)]
struct SideColumns {
    price: Option<usize>,
    size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct QuoteColumns {
    epoch: usize,
    mic: usize,
    isin: Option<usize>,
    asks: [SideColumns; MAX_LEVELS],
    bids: [SideColumns; MAX_LEVELS],
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_f64(record: &StringRecord, idx: Option<usize>, column: &str) -> StoreResult<Option<f64>> {
    let Some(raw) = idx.and_then(|i| record.get(i)).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| QuoteStoreError::InvalidField {
        line: line_of(record),
        column: column.to_string(),
        value: raw.to_string(),
    })
}

pub(crate) fn parse_epoch(record: &StringRecord, idx: usize) -> StoreResult<Micros> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<Micros>()
        .or_else(|_| raw.parse::<f64>().map(|v| v as Micros))
        .map_err(|_| QuoteStoreError::InvalidField {
            line: line_of(record),
            column: "epoch".into(),
            value: raw.to_string(),
        })
}

pub(crate) fn required(headers: &StringRecord, name: &str) -> StoreResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| QuoteStoreError::MissingColumn(name.to_string()))
}

impl QuoteColumns {
    pub fn from_headers(headers: &StringRecord) -> StoreResult<Self> {
        let find = |name: String| headers.iter().position(|h| h.trim() == name);
        let side = |px: &str, qty: &str| -> [SideColumns; MAX_LEVELS] {
            std::array::from_fn(|i| SideColumns {
                price: find(format!("{px}_{i}")),
                size: find(format!("{qty}_{i}")),
            })
        };
        let columns = Self {
            epoch: required(headers, "epoch")?,
            mic: required(headers, "mic")?,
            isin: find("isin".to_string()),
            asks: side("px_ask", "qty_ask"),
            bids: side("px_bid", "qty_bid"),
        };
        if columns.asks[0].price.is_none() {
            return Err(QuoteStoreError::MissingColumn("px_ask_0".into()));
        }
        if columns.bids[0].price.is_none() {
            return Err(QuoteStoreError::MissingColumn("px_bid_0".into()));
        }
        Ok(columns)
    }

    // Returns the levels plus whether any sentinel price was seen on the side
    fn levels(record: &StringRecord, cols: &[SideColumns; MAX_LEVELS], px: &str, qty: &str) -> StoreResult<(Levels, bool)> {
        let mut levels: Levels = SmallVec::new();
        let mut rejected = false;
        let mut contiguous = true;
        for (i, col) in cols.iter().enumerate() {
            let price = parse_f64(record, col.price, &format!("{px}_{i}"))?;
            let Some(price) = price else {
                contiguous = false;
                continue;
            };
            if is_rejected_price(price) {
                rejected = true;
            }
            if contiguous {
                let size = parse_f64(record, col.size, &format!("{qty}_{i}"))?.unwrap_or(0.0);
                levels.push(BookLevel::new(price, size));
            }
        }
        Ok((levels, rejected))
    }

    /// `Ok(None)` when the record carries a sentinel price on any level.
    pub fn parse(&self, record: &StringRecord, fallback_isin: &str) -> StoreResult<Option<QuoteSnapshot>> {
        let (asks, ask_rejected) = Self::levels(record, &self.asks, "px_ask", "qty_ask")?;
        let (bids, bid_rejected) = Self::levels(record, &self.bids, "px_bid", "qty_bid")?;
        if ask_rejected || bid_rejected {
            return Ok(None);
        }

        let instrument_id = self
            .isin
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_isin)
            .to_string();

        Ok(Some(QuoteSnapshot {
            instrument_id,
            venue: VenueId::new(record.get(self.mic).unwrap_or("").trim()),
            timestamp: parse_epoch(record, self.epoch)?,
            asks,
            bids,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> StringRecord {
        StringRecord::from(vec![
            "epoch", "mic", "px_bid_0", "qty_bid_0", "px_ask_0", "qty_ask_0", "px_bid_1", "qty_bid_1", "px_ask_1",
            "qty_ask_1",
        ])
    }

    #[test]
    fn test_parse_top_levels() {
        let cols = QuoteColumns::from_headers(&headers()).unwrap();
        let rec = StringRecord::from(vec!["1718092800000123", "XMAD", "4.10", "300", "4.11", "250", "4.09", "100", "", ""]);
        let snap = cols.parse(&rec, "ES0113900J37").unwrap().unwrap();
        assert_eq!(snap.timestamp, 1_718_092_800_000_123);
        assert_eq!(snap.venue, VenueId::from("XMAD"));
        assert_eq!(snap.instrument_id, "ES0113900J37");
        assert_eq!(snap.bids.len(), 2);
        assert_eq!(snap.asks.len(), 1);
        assert_eq!(snap.top_of_book().ask, Some(BookLevel::new(4.11, 250.0)));
    }

    #[test]
    fn test_missing_level_zero_leaves_side_empty() {
        let cols = QuoteColumns::from_headers(&headers()).unwrap();
        let rec = StringRecord::from(vec!["10", "AQEU", "", "", "4.11", "250", "4.09", "100", "", ""]);
        let snap = cols.parse(&rec, "X").unwrap().unwrap();
        assert!(snap.bids.is_empty());
        assert_eq!(snap.top_of_book().bid, None);
    }

    #[test]
    fn test_sentinel_price_drops_record() {
        let cols = QuoteColumns::from_headers(&headers()).unwrap();
        let rec = StringRecord::from(vec!["10", "AQEU", "4.10", "1", "4.11", "1", "4.09", "1", "999999.999", "1"]);
        assert_eq!(cols.parse(&rec, "X").unwrap(), None);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let cols = QuoteColumns::from_headers(&headers()).unwrap();
        let rec = StringRecord::from(vec!["10", "AQEU", "abc", "1", "4.11", "1", "", "", "", ""]);
        assert!(matches!(cols.parse(&rec, "X"), Err(QuoteStoreError::InvalidField { .. })));
    }

    #[test]
    fn test_missing_required_column() {
        let h = StringRecord::from(vec!["mic", "px_bid_0", "px_ask_0"]);
        assert!(matches!(QuoteColumns::from_headers(&h), Err(QuoteStoreError::MissingColumn(c)) if c == "epoch"));
    }
}
