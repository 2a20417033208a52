//! Instrument definitions.
//!
//! An instrument is a chip type plus up to five sequences (volume, arpeggio, pitch, hi-pitch,
//! duty). Channels of other chips may borrow it as long as their handler factory accepts the
//! type; the MMC5 squares accept 2A03, VRC6, N163 and S5B instruments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sound chip an instrument was authored for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentType {
    #[serde(rename = "2a03")]
    Apu2A03,
    #[serde(rename = "vrc6")]
    Vrc6,
    #[serde(rename = "vrc7")]
    Vrc7,
    #[serde(rename = "fds")]
    Fds,
    #[serde(rename = "n163")]
    N163,
    #[serde(rename = "s5b")]
    S5B,
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentType::Apu2A03 => "2A03",
            InstrumentType::Vrc6 => "VRC6",
            InstrumentType::Vrc7 => "VRC7",
            InstrumentType::Fds => "FDS",
            InstrumentType::N163 => "N163",
            InstrumentType::S5B => "S5B",
        };
        f.write_str(name)
    }
}

/// Sequence slots, in the order the handler runs them each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceKind {
    Volume,
    Arpeggio,
    Pitch,
    HiPitch,
    DutyCycle,
}

impl SequenceKind {
    pub const COUNT: usize = 5;

    pub const ALL: [SequenceKind; Self::COUNT] = [
        SequenceKind::Volume,
        SequenceKind::Arpeggio,
        SequenceKind::Pitch,
        SequenceKind::HiPitch,
        SequenceKind::DutyCycle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// How arpeggio sequence values are applied to the playing note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpeggioMode {
    /// Offset from the triggered note.
    #[default]
    Absolute,
    /// Value is the note itself.
    Fixed,
    /// Offsets accumulate into the note.
    Relative,
}

/// A macro sequence: one value per tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub items: Vec<i8>,
    #[serde(default)]
    pub loop_point: Option<usize>,
    #[serde(default)]
    pub release_point: Option<usize>,
    #[serde(default)]
    pub arpeggio_mode: ArpeggioMode,
}

impl Sequence {
    pub fn new(items: Vec<i8>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_loop(mut self, point: usize) -> Self {
        self.loop_point = Some(point);
        self
    }

    pub fn with_release(mut self, point: usize) -> Self {
        self.release_point = Some(point);
        self
    }

    pub fn with_arpeggio_mode(mut self, mode: ArpeggioMode) -> Self {
        self.arpeggio_mode = mode;
        self
    }
}

/// A sequence instrument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(default)]
    pub name: String,
    pub kind: InstrumentType,
    #[serde(default)]
    pub volume: Option<Sequence>,
    #[serde(default)]
    pub arpeggio: Option<Sequence>,
    #[serde(default)]
    pub pitch: Option<Sequence>,
    #[serde(default)]
    pub hi_pitch: Option<Sequence>,
    #[serde(default)]
    pub duty: Option<Sequence>,
}

impl Instrument {
    pub fn new(name: impl Into<String>, kind: InstrumentType) -> Self {
        Self {
            name: name.into(),
            kind,
            volume: None,
            arpeggio: None,
            pitch: None,
            hi_pitch: None,
            duty: None,
        }
    }

    pub fn with_sequence(mut self, kind: SequenceKind, sequence: Sequence) -> Self {
        *self.slot_mut(kind) = Some(sequence);
        self
    }

    pub fn sequence(&self, kind: SequenceKind) -> Option<&Sequence> {
        match kind {
            SequenceKind::Volume => self.volume.as_ref(),
            SequenceKind::Arpeggio => self.arpeggio.as_ref(),
            SequenceKind::Pitch => self.pitch.as_ref(),
            SequenceKind::HiPitch => self.hi_pitch.as_ref(),
            SequenceKind::DutyCycle => self.duty.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: SequenceKind) -> &mut Option<Sequence> {
        match kind {
            SequenceKind::Volume => &mut self.volume,
            SequenceKind::Arpeggio => &mut self.arpeggio,
            SequenceKind::Pitch => &mut self.pitch,
            SequenceKind::HiPitch => &mut self.hi_pitch,
            SequenceKind::DutyCycle => &mut self.duty,
        }
    }
}
