//! Notes and effect commands as they appear in one channel cell of a pattern row.

use std::fmt;

/// Number of effect columns a cell can carry.
pub const MAX_EFFECT_COLUMNS: usize = 4;

/// Highest octave in the note range (8 octaves, 96 notes).
pub const MAX_OCTAVE: u8 = 7;

/// Number of notes addressable by the period tables.
pub const NOTE_COUNT: usize = 96;

/// Pitch class within an octave. C = 0 … B = 11.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Two-character name used in the row text format (`C-`, `C#`, …).
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C-",
            PitchClass::Cs => "C#",
            PitchClass::D => "D-",
            PitchClass::Ds => "D#",
            PitchClass::E => "E-",
            PitchClass::F => "F-",
            PitchClass::Fs => "F#",
            PitchClass::G => "G-",
            PitchClass::Gs => "G#",
            PitchClass::A => "A-",
            PitchClass::As => "A#",
            PitchClass::B => "B-",
        }
    }
}

/// Note column of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// Empty row: channel keeps its state.
    #[default]
    None,
    /// Note cut (`---`).
    Halt,
    /// Note release / key-off (`===`).
    Release,
    Pitch(PitchClass),
}

impl Note {
    /// True for an actual pitched note (not empty, halt or release).
    pub fn is_pitched(self) -> bool {
        matches!(self, Note::Pitch(_))
    }
}

/// Absolute note index: 12 notes per octave, C-0 = 0.
pub fn midi_note(octave: u8, pitch: PitchClass) -> i32 {
    octave as i32 * 12 + pitch.index() as i32
}

/// Tracker effects. The letter is the pattern-data encoding; the parameter byte is carried
/// separately in [`EffectCommand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// `Fxx`: speed (ticks per row).
    Speed,
    /// `Bxx`: jump to row.
    Jump,
    /// `Dxx`: skip to next pattern.
    Skip,
    /// `Cxx`: halt song.
    Halt,
    /// `Exx`: chip-specific volume/envelope control.
    Volume,
    /// `3xx`: automatic portamento.
    Portamento,
    /// `Hxy`: hardware sweep up (2A03 only).
    SweepUp,
    /// `Ixy`: hardware sweep down (2A03 only).
    SweepDown,
    /// `0xy`: arpeggio.
    Arpeggio,
    /// `4xy`: vibrato.
    Vibrato,
    /// `7xy`: tremolo.
    Tremolo,
    /// `Pxx`: fine pitch, 0x80 = centre.
    Pitch,
    /// `Gxx`: delay the row by xx ticks.
    Delay,
    /// `Zxx`: DPCM delta counter (2A03 only).
    Dac,
    /// `1xx`: portamento up.
    PortaUp,
    /// `2xx`: portamento down.
    PortaDown,
    /// `Vxx`: duty cycle.
    DutyCycle,
    /// `Qxy`: slide up y semitones at speed x.
    SlideUp,
    /// `Rxy`: slide down y semitones at speed x.
    SlideDown,
    /// `Axy`: volume slide.
    VolumeSlide,
    /// `Sxx`: cut the note after xx ticks.
    NoteCut,
    /// `Lxx`: release the note after xx ticks.
    NoteRelease,
}

impl Effect {
    pub fn letter(self) -> char {
        match self {
            Effect::Speed => 'F',
            Effect::Jump => 'B',
            Effect::Skip => 'D',
            Effect::Halt => 'C',
            Effect::Volume => 'E',
            Effect::Portamento => '3',
            Effect::SweepUp => 'H',
            Effect::SweepDown => 'I',
            Effect::Arpeggio => '0',
            Effect::Vibrato => '4',
            Effect::Tremolo => '7',
            Effect::Pitch => 'P',
            Effect::Delay => 'G',
            Effect::Dac => 'Z',
            Effect::PortaUp => '1',
            Effect::PortaDown => '2',
            Effect::DutyCycle => 'V',
            Effect::SlideUp => 'Q',
            Effect::SlideDown => 'R',
            Effect::VolumeSlide => 'A',
            Effect::NoteCut => 'S',
            Effect::NoteRelease => 'L',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let effect = match letter.to_ascii_uppercase() {
            'F' => Effect::Speed,
            'B' => Effect::Jump,
            'D' => Effect::Skip,
            'C' => Effect::Halt,
            'E' => Effect::Volume,
            '3' => Effect::Portamento,
            'H' => Effect::SweepUp,
            'I' => Effect::SweepDown,
            '0' => Effect::Arpeggio,
            '4' => Effect::Vibrato,
            '7' => Effect::Tremolo,
            'P' => Effect::Pitch,
            'G' => Effect::Delay,
            'Z' => Effect::Dac,
            '1' => Effect::PortaUp,
            '2' => Effect::PortaDown,
            'V' => Effect::DutyCycle,
            'Q' => Effect::SlideUp,
            'R' => Effect::SlideDown,
            'A' => Effect::VolumeSlide,
            'S' => Effect::NoteCut,
            'L' => Effect::NoteRelease,
            _ => return None,
        };
        Some(effect)
    }

    /// Effects that act on the whole song rather than on a channel.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Effect::Speed | Effect::Jump | Effect::Skip | Effect::Halt
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectCommand {
    pub effect: Effect,
    pub param: u8,
}

impl EffectCommand {
    pub fn new(effect: Effect, param: u8) -> Self {
        Self { effect, param }
    }
}

impl fmt::Display for EffectCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02X}", self.effect.letter(), self.param)
    }
}

/// One channel's cell in a pattern row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChanNote {
    pub note: Note,
    /// Octave 0–7; meaningful only for pitched notes.
    pub octave: u8,
    pub instrument: Option<u8>,
    /// Volume column 0–0x0F.
    pub volume: Option<u8>,
    pub effects: [Option<EffectCommand>; MAX_EFFECT_COLUMNS],
}

impl ChanNote {
    pub fn pitched(pitch: PitchClass, octave: u8) -> Self {
        Self {
            note: Note::Pitch(pitch),
            octave,
            ..Self::default()
        }
    }

    pub fn with_instrument(mut self, instrument: u8) -> Self {
        self.instrument = Some(instrument);
        self
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Put `effect` in the first free effect column. Extra effects beyond
    /// [`MAX_EFFECT_COLUMNS`] are dropped.
    pub fn with_effect(mut self, effect: Effect, param: u8) -> Self {
        if let Some(slot) = self.effects.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(EffectCommand::new(effect, param));
        }
        self
    }

    /// First command for `effect` within the first `columns` effect columns.
    pub fn find_effect(&self, effect: Effect, columns: usize) -> Option<u8> {
        self.effects
            .iter()
            .take(columns)
            .flatten()
            .find(|cmd| cmd.effect == effect)
            .map(|cmd| cmd.param)
    }
}
