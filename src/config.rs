//! Layered settings: built-in defaults, then an optional TOML file, then
//! `VENUE_ARB_*` environment variables.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::engine::analyzer::{AnalyzerConfig, DEFAULT_TOLERANCE_US};
use crate::engine::collapser::DEFAULT_PERSISTENCE_US;
use crate::engine::latency::LatencyMode;
use crate::engine::types::{Micros, VenueId};

pub const DEFAULT_CONFIG_FILE: &str = "venue_arb";
pub const ENV_PREFIX: &str = "VENUE_ARB";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub tolerance_us: Micros,
    pub latency_us: Micros,
    pub persistence_us: Micros,
    pub latency_mode: LatencyMode,
    #[serde(default)]
    pub venues: Option<Vec<String>>,
    pub log_filter: String,
}

impl Settings {
    /// `path` overrides the default `venue_arb.toml` lookup; the default file
    /// is optional, an explicit one is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("tolerance_us", DEFAULT_TOLERANCE_US)?
            .set_default("latency_us", 0)?
            .set_default("persistence_us", DEFAULT_PERSISTENCE_US)?
            .set_default("latency_mode", "query_offset")?
            .set_default("log_filter", "info")?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("venues"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn analyzer(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            tolerance_us: self.tolerance_us,
            latency_us: self.latency_us,
            persistence_us: self.persistence_us,
            latency_mode: self.latency_mode,
            venues: self
                .venues
                .as_ref()
                .map(|vs| vs.iter().map(|v| VenueId::new(v.trim().to_uppercase())).collect()),
        }
    }
}
