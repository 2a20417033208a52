//! Note → timer period tables for 2A03-style pulse timers (2A03, MMC5).
//!
//! A pulse channel's frequency is `clock / (16 * (period + 1))`, so the period for a note is
//! `round(clock / (16 * f)) - 1` with A-4 (note 57) at 440 Hz. Periods that do not fit the
//! 11-bit timer are clamped to 0x7FF.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::note::note::{NOTE_COUNT, PitchClass, midi_note};

/// NTSC 2A03 CPU clock.
pub const CPU_CLOCK_NTSC: u32 = 1_789_773;

/// PAL 2A07 CPU clock.
pub const CPU_CLOCK_PAL: u32 = 1_662_607;

/// Largest value of the 11-bit pulse timer.
pub const MAX_PERIOD: u16 = 0x7FF;

/// Video standard of the emulated console. Selects the CPU clock and the tick rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Machine {
    #[default]
    Ntsc,
    Pal,
}

impl Machine {
    pub fn cpu_clock(self) -> u32 {
        match self {
            Machine::Ntsc => CPU_CLOCK_NTSC,
            Machine::Pal => CPU_CLOCK_PAL,
        }
    }

    /// Engine ticks per second (one per video frame).
    pub fn frame_rate(self) -> f64 {
        match self {
            Machine::Ntsc => 60.0988,
            Machine::Pal => 50.007,
        }
    }

    /// CPU cycles in one engine tick.
    pub fn cycles_per_tick(self) -> usize {
        (self.cpu_clock() as f64 / self.frame_rate()).round() as usize
    }

    pub fn period_table(self) -> &'static PeriodTable {
        static NTSC: OnceLock<PeriodTable> = OnceLock::new();
        static PAL: OnceLock<PeriodTable> = OnceLock::new();
        match self {
            Machine::Ntsc => NTSC.get_or_init(|| PeriodTable::new(CPU_CLOCK_NTSC)),
            Machine::Pal => PAL.get_or_init(|| PeriodTable::new(CPU_CLOCK_PAL)),
        }
    }
}

/// Resolves notes to timer periods.
pub trait NoteTable: Send + Sync {
    /// Period for an absolute note index (C-0 = 0). Indices outside the table are clamped to it.
    fn period(&self, note: i32) -> u16;

    /// Period for a note given as octave + pitch class.
    fn resolve_period(&self, octave: u8, pitch: PitchClass) -> u16 {
        self.period(midi_note(octave, pitch))
    }
}

/// Precomputed 96-note period table for one CPU clock.
#[derive(Clone, Debug)]
pub struct PeriodTable {
    periods: [u16; NOTE_COUNT],
}

impl PeriodTable {
    pub fn new(clock: u32) -> Self {
        let mut periods = [0u16; NOTE_COUNT];
        for (note, period) in periods.iter_mut().enumerate() {
            let freq = 440.0 * f64::powf(2.0, (note as f64 - 57.0) / 12.0);
            let value = (clock as f64 / (16.0 * freq)).round() - 1.0;
            *period = value.clamp(0.0, MAX_PERIOD as f64) as u16;
        }
        Self { periods }
    }
}

impl NoteTable for PeriodTable {
    fn period(&self, note: i32) -> u16 {
        let index = note.clamp(0, NOTE_COUNT as i32 - 1) as usize;
        self.periods[index]
    }
}
