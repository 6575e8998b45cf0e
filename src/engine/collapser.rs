use tracing::{debug, instrument};

use crate::engine::types::{ArbitrageEvent, Micros};

pub const DEFAULT_PERSISTENCE_US: Micros = 1_000_000;

/// Report a persisting opportunity once. An event is kept when any of its
/// attributes differs from the last kept event, or when more than
/// `persistence_us` has passed since that event. An identical opportunity
/// reappearing after the window counts as new.
///
/// `events` must be in timestamp order.
#[instrument(level = "debug", skip(events), fields(events = events.len()))]
pub fn collapse(events: &[ArbitrageEvent], persistence_us: Micros) -> Vec<ArbitrageEvent> {
    let mut kept: Vec<ArbitrageEvent> = Vec::new();

    for event in events {
        let emit = match kept.last() {
            None => true,
            Some(last) => {
                !event.same_opportunity(last) || event.timestamp - last.timestamp > persistence_us
            }
        };
        if emit {
            kept.push(event.clone());
        }
    }

    debug!(kept = kept.len(), dropped = events.len() - kept.len(), "collapsed opportunities");
    metrics::counter!("venue_arb_events").increment(kept.len() as u64);
    kept
}
