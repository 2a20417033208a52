//! Player configuration, read from a TOML file.
//!
//! ```toml
//! machine = "pal"
//! speed = 4
//! log_level = "debug"
//! trace = true
//!
//! [[instruments]]
//! name = "lead"
//! kind = "2a03"
//! volume = { items = [15, 12, 10, 8], release_point = 3 }
//! duty = { items = [2] }
//! ```
//!
//! Instruments are numbered by their position in the list.

use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ParseConfigSnafu, ReadFileSnafu, Result};
use crate::instrument::instrument::Instrument;
use crate::note::table::Machine;

/// Ticks per row when neither the config nor the pattern sets one.
pub const DEFAULT_SPEED: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub machine: Machine,
    pub speed: u8,
    pub log_level: String,
    pub trace: bool,
    pub instruments: Vec<Instrument>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine: Machine::Ntsc,
            speed: DEFAULT_SPEED,
            log_level: "info".to_string(),
            trace: false,
            instruments: Vec::new(),
        }
    }
}

impl Config {
    /// Read `path`. No path, or a path that does not exist, gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&data, path)
    }

    /// Parse config text. `path` is only used in the error.
    pub fn parse(data: &str, path: &Path) -> Result<Self> {
        toml::from_str(data).context(ParseConfigSnafu { path })
    }

    /// Configured log level; unknown names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::instrument::InstrumentType;

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/chipvoice.toml")));
        assert_eq!(config.ok(), Some(Config::default()));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            machine = "pal"

            [[instruments]]
            kind = "s5b"
            duty = { items = [0] }
            "#,
            Path::new("test.toml"),
        )
        .expect("valid config");

        assert_eq!(config.machine, Machine::Pal);
        assert_eq!(config.speed, DEFAULT_SPEED);
        assert_eq!(config.instruments.len(), 1);
        assert_eq!(config.instruments[0].kind, InstrumentType::S5B);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let err = Config::parse("speed = \"fast\"", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn level_filter_falls_back_to_info() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Info);

        let config = Config {
            log_level: "trace".to_string(),
            ..Config::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Trace);
    }
}
