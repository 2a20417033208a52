//! Channel voices: tracker rows in, register writes out.
//!
//! - **handler**: chip-independent channel state and common effects
//! - **voice**: `ChannelVoice` trait, row and tick flow
//! - **mmc5**: MMC5 square channels
//! - **tables**: duty conversion and vibrato tables
//!
//! [`create_voice`] picks the implementation for a chip and channel index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnsupportedChannelSnafu};
use crate::note::table::NoteTable;

pub mod handler;
pub mod mmc5;
pub mod tables;
pub mod voice;


use mmc5::Mmc5Channel;
use voice::ChannelVoice;

/// Sound chips a tracker module can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chip {
    #[serde(rename = "2a03")]
    Apu2A03,
    Vrc6,
    Vrc7,
    Fds,
    Mmc5,
    N163,
    S5B,
}

impl Chip {
    /// Channels this crate can drive on the chip.
    pub fn voice_count(self) -> usize {
        match self {
            Chip::Mmc5 => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chip::Apu2A03 => "2A03",
            Chip::Vrc6 => "VRC6",
            Chip::Vrc7 => "VRC7",
            Chip::Fds => "FDS",
            Chip::Mmc5 => "MMC5",
            Chip::N163 => "N163",
            Chip::S5B => "5B",
        };
        f.write_str(name)
    }
}

/// Build the voice for channel `index` of `chip`.
pub fn create_voice(
    chip: Chip,
    index: usize,
    table: &'static dyn NoteTable,
) -> Result<Box<dyn ChannelVoice>> {
    match chip {
        Chip::Mmc5 if index < chip.voice_count() => Ok(Box::new(Mmc5Channel::new(index, table))),
        _ => UnsupportedChannelSnafu { chip, index }.fail(),
    }
}
