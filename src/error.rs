//! Crate-wide error type.
//!
//! Steady-state tick processing never fails; errors only come from setup (voice construction,
//! instrument assignment, pattern text, config) and from the audio/logging plumbing of the binary.

use std::path::PathBuf;

use snafu::prelude::*;

use crate::channel::Chip;
use crate::instrument::instrument::InstrumentType;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("No {} channel at index {}", chip, index))]
    UnsupportedChannel { chip: Chip, index: usize },
    #[snafu(display("Instrument type {} cannot be used on channel {}", kind, channel))]
    IncompatibleInstrument { kind: InstrumentType, channel: String },
    #[snafu(display("Instrument {:02X} is not defined", index))]
    UnknownInstrument { index: u8 },
    #[snafu(display("Pattern line {}, column {}: {}", line, column, reason))]
    ParseRow { line: usize, column: usize, reason: String },
    #[snafu(display("Failed to read {}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[snafu(display("Invalid config {}", path.display()))]
    ParseConfig { path: PathBuf, source: toml::de::Error },
    #[snafu(display("Failed to install logger"))]
    Logger { source: log::SetLoggerError },
    #[snafu(display("No audio output device"))]
    AudioStream { source: rodio::StreamError },
    #[snafu(display("Audio playback failed"))]
    AudioPlay { source: rodio::PlayError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
