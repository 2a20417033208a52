//! Channel handler base: the chip-independent half of every channel voice.
//!
//! Holds the note/period/volume/duty state, the common tracker effects (arpeggio, portamento,
//! vibrato, tremolo, fine pitch, slides, volume slide, note cut/release/delay) and the active
//! instrument handler. Chip voices embed a `ChannelHandler` and only add what their hardware
//! needs: custom effects, duty conversion and the register writes.
//!
//! Pitch works in the period domain of 2A03-style timers: a larger period is a lower note.

use crate::channel::Chip;
use crate::channel::tables::vibrato_table;
use crate::instrument::handler::{ArpeggioStep, InstHandler, SequenceOutput};
use crate::instrument::instrument::{Instrument, InstrumentType};
use crate::note::note::{ChanNote, Effect, PitchClass, midi_note};
use crate::note::table::NoteTable;

/// Volume column values are kept shifted left by this much so slides can move in fractions.
pub const VOL_COLUMN_SHIFT: u32 = 3;

/// Full volume column (0x0F) in shifted units.
pub const VOL_COLUMN_MAX: i32 = 0x0F << VOL_COLUMN_SHIFT;

/// `last_period` value that never matches a real period; forces the next full period write.
pub const PERIOD_SENTINEL: u16 = 0xFFFF;

/// Fine pitch (`Pxx`) centre.
const FINE_PITCH_CENTRE: u8 = 0x80;

/// Pitch effect owning the period this row. Only one can be active at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PitchEffect {
    #[default]
    None,
    Arpeggio,
    Portamento,
    PortaUp,
    PortaDown,
    Slide,
}

/// A row held back by `Gxx`.
#[derive(Clone, Debug)]
pub struct DelayedRow {
    pub row: ChanNote,
    pub effect_columns: usize,
    pub instrument: Option<Instrument>,
    pub ticks: u8,
}

/// Chip-independent channel state.
pub struct ChannelHandler {
    chip: Chip,
    index: usize,
    table: &'static dyn NoteTable,
    max_period: u16,
    max_volume: u8,

    /// Absolute note index of the playing note.
    pub(crate) note: i32,
    /// Timer period before vibrato, fine pitch and instrument pitch.
    pub(crate) period: i32,
    /// Period written by the last refresh, or [`PERIOD_SENTINEL`].
    pub(crate) last_period: u16,
    /// Volume column, shifted by [`VOL_COLUMN_SHIFT`].
    pub(crate) volume: i32,
    /// Instrument volume (volume sequence, or the chip's ceiling on note-on).
    pub(crate) inst_volume: i32,
    pub(crate) duty_period: i32,
    pub(crate) default_duty: i32,
    pub(crate) gate: bool,
    pub(crate) release: bool,

    pub(crate) instrument: Option<u8>,
    /// Type of the instrument currently loaded. Updated in the same row as the note-on.
    pub(crate) inst_type_current: Option<InstrumentType>,
    pub(crate) inst_handler: Option<Box<dyn InstHandler>>,
    pub(crate) inst_pitch: i32,

    fine_pitch: u8,
    pitch_effect: PitchEffect,
    arpeggio: u8,
    arp_state: u8,
    porta_speed: i32,
    porta_to: i32,
    vibrato_depth: usize,
    vibrato_speed: u8,
    vibrato_phase: u8,
    tremolo_depth: usize,
    tremolo_speed: u8,
    tremolo_phase: u8,
    volume_slide: u8,
    note_cut: Option<u8>,
    note_release: Option<u8>,
    pub(crate) delayed: Option<DelayedRow>,
}

impl ChannelHandler {
    pub fn new(
        chip: Chip,
        index: usize,
        table: &'static dyn NoteTable,
        max_period: u16,
        max_volume: u8,
    ) -> Self {
        let mut handler = Self {
            chip,
            index,
            table,
            max_period,
            max_volume,
            note: 0,
            period: 0,
            last_period: PERIOD_SENTINEL,
            volume: VOL_COLUMN_MAX,
            inst_volume: 0,
            duty_period: 0,
            default_duty: 0,
            gate: false,
            release: false,
            instrument: None,
            inst_type_current: None,
            inst_handler: None,
            inst_pitch: 0,
            fine_pitch: FINE_PITCH_CENTRE,
            pitch_effect: PitchEffect::None,
            arpeggio: 0,
            arp_state: 0,
            porta_speed: 0,
            porta_to: 0,
            vibrato_depth: 0,
            vibrato_speed: 0,
            vibrato_phase: 0,
            tremolo_depth: 0,
            tremolo_speed: 0,
            tremolo_phase: 0,
            volume_slide: 0,
            note_cut: None,
            note_release: None,
            delayed: None,
        };
        handler.reset();
        handler
    }

    pub fn chip(&self) -> Chip {
        self.chip
    }

    /// Channel index within its chip.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable channel name for diagnostics.
    pub fn name(&self) -> String {
        format!("{} #{}", self.chip, self.index + 1)
    }

    pub fn gate(&self) -> bool {
        self.gate
    }

    pub fn is_releasing(&self) -> bool {
        self.release
    }

    pub fn note(&self) -> i32 {
        self.note
    }

    pub fn duty_period(&self) -> i32 {
        self.duty_period
    }

    pub fn default_duty(&self) -> i32 {
        self.default_duty
    }

    pub fn inst_type_current(&self) -> Option<InstrumentType> {
        self.inst_type_current
    }

    pub fn has_inst_handler(&self) -> bool {
        self.inst_handler.is_some()
    }

    pub fn last_period(&self) -> u16 {
        self.last_period
    }

    /// Back to power-on state. Drops the instrument handler.
    pub fn reset(&mut self) {
        self.note = 0;
        self.period = 0;
        self.last_period = PERIOD_SENTINEL;
        self.volume = VOL_COLUMN_MAX;
        self.inst_volume = 0;
        self.duty_period = 0;
        self.default_duty = 0;
        self.gate = false;
        self.release = false;
        self.instrument = None;
        self.inst_type_current = None;
        self.inst_handler = None;
        self.inst_pitch = 0;
        self.fine_pitch = FINE_PITCH_CENTRE;
        self.pitch_effect = PitchEffect::None;
        self.arpeggio = 0;
        self.arp_state = 0;
        self.porta_speed = 0;
        self.porta_to = 0;
        self.vibrato_depth = 0;
        self.vibrato_speed = 0;
        self.vibrato_phase = 0;
        self.tremolo_depth = 0;
        self.tremolo_speed = 0;
        self.tremolo_phase = 0;
        self.volume_slide = 0;
        self.note_cut = None;
        self.note_release = None;
        self.delayed = None;
    }

    fn note_period(&self, note: i32) -> i32 {
        self.table.period(note) as i32
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    /// Start a note: resolve its period, open the gate and clear release. Under an active
    /// `3xx` the period glides to the new note instead of jumping. Returns the note index.
    pub fn run_note(&mut self, octave: u8, pitch: PitchClass) -> i32 {
        let note = midi_note(octave, pitch);
        let period = self.note_period(note);

        if self.pitch_effect == PitchEffect::Portamento && self.porta_speed > 0 && self.gate {
            self.porta_to = period;
        } else {
            self.period = period;
            self.porta_to = 0;
        }
        if self.pitch_effect == PitchEffect::Slide {
            self.pitch_effect = PitchEffect::None;
        }

        self.arp_state = 0;
        self.gate = true;
        self.release = false;
        note
    }

    /// Silence the channel now.
    pub fn cut_note(&mut self) {
        self.gate = false;
        self.release = false;
        self.porta_to = 0;
    }

    /// Key-off: the instrument continues past its release points.
    pub fn release_note(&mut self) {
        self.release = true;
        if let Some(handler) = self.inst_handler.as_mut() {
            handler.release();
        }
    }

    /// Volume column from a row. Values above 0x0F are ignored.
    pub fn set_volume_column(&mut self, volume: u8) {
        if volume <= 0x0F {
            self.volume = (volume as i32) << VOL_COLUMN_SHIFT;
        }
    }

    /// Clear pending note cut/release when a row carries any note.
    pub(crate) fn clear_note_timers(&mut self) {
        self.note_cut = None;
        self.note_release = None;
    }

    pub(crate) fn trigger_instrument(&mut self) {
        if let Some(handler) = self.inst_handler.as_mut() {
            handler.trigger();
        }
    }

    // -------------------------------------------------------------------------
    // Effects
    // -------------------------------------------------------------------------

    /// Effects every channel understands. Returns false when `effect` is left to the chip.
    pub fn check_common_effects(&mut self, effect: Effect, param: u8) -> bool {
        match effect {
            Effect::Arpeggio => {
                self.arpeggio = param;
                if param != 0 {
                    self.pitch_effect = PitchEffect::Arpeggio;
                } else if self.pitch_effect == PitchEffect::Arpeggio {
                    self.pitch_effect = PitchEffect::None;
                    self.period = self.note_period(self.note);
                }
            }
            Effect::Portamento => {
                self.porta_speed = param as i32;
                self.pitch_effect = PitchEffect::Portamento;
                if param == 0 {
                    self.porta_to = 0;
                    self.pitch_effect = PitchEffect::None;
                }
            }
            Effect::PortaUp => {
                self.porta_speed = param as i32;
                self.pitch_effect = if param == 0 {
                    PitchEffect::None
                } else {
                    PitchEffect::PortaUp
                };
            }
            Effect::PortaDown => {
                self.porta_speed = param as i32;
                self.pitch_effect = if param == 0 {
                    PitchEffect::None
                } else {
                    PitchEffect::PortaDown
                };
            }
            Effect::Vibrato => {
                self.vibrato_depth = ((param & 0x0F) as usize) << 4;
                self.vibrato_speed = param >> 4;
                if param == 0 {
                    self.vibrato_phase = 0;
                }
            }
            Effect::Tremolo => {
                self.tremolo_depth = ((param & 0x0F) as usize) << 4;
                self.tremolo_speed = param >> 4;
                if param == 0 {
                    self.tremolo_phase = 0;
                }
            }
            Effect::Pitch => self.fine_pitch = param,
            Effect::VolumeSlide => self.volume_slide = param,
            Effect::SlideUp => self.setup_slide(param, true),
            Effect::SlideDown => self.setup_slide(param, false),
            Effect::NoteCut => self.note_cut = Some(param),
            Effect::NoteRelease => self.note_release = Some(param),
            _ => return false,
        }
        true
    }

    /// `Qxy`/`Rxy`: glide `y` semitones at speed `2x + 1`.
    fn setup_slide(&mut self, param: u8, up: bool) {
        let semitones = (param & 0x0F) as i32;
        if semitones == 0 {
            return;
        }
        self.porta_speed = ((param >> 4) as i32) * 2 + 1;
        self.note = if up {
            self.note + semitones
        } else {
            self.note - semitones
        };
        self.porta_to = self.note_period(self.note);
        self.pitch_effect = PitchEffect::Slide;
    }

    /// Count down `Gxx`. Returns the row once its delay has run out.
    pub(crate) fn tick_delay(&mut self) -> Option<DelayedRow> {
        let delayed = self.delayed.as_mut()?;
        if delayed.ticks > 0 {
            delayed.ticks -= 1;
            return None;
        }
        self.delayed.take()
    }

    /// Per-tick update of the common effects.
    pub(crate) fn update_effects(&mut self) {
        if let Some(ticks) = self.note_cut.as_mut() {
            if *ticks == 0 {
                self.note_cut = None;
                self.cut_note();
            } else {
                *ticks -= 1;
            }
        }

        if let Some(ticks) = self.note_release.as_mut() {
            if *ticks == 0 {
                self.note_release = None;
                if !self.release {
                    self.release_note();
                }
            } else {
                *ticks -= 1;
            }
        }

        if self.volume_slide != 0 {
            let up = (self.volume_slide >> 4) as i32;
            let down = (self.volume_slide & 0x0F) as i32;
            self.volume = if up != 0 {
                (self.volume + up).min(VOL_COLUMN_MAX)
            } else {
                (self.volume - down).max(0)
            };
        }

        match self.pitch_effect {
            PitchEffect::None => {}
            PitchEffect::Arpeggio => self.update_arpeggio(),
            PitchEffect::Portamento | PitchEffect::Slide => self.update_portamento(),
            PitchEffect::PortaUp => self.period = (self.period - self.porta_speed).max(0),
            PitchEffect::PortaDown => {
                self.period = (self.period + self.porta_speed).min(self.max_period as i32)
            }
        }

        self.vibrato_phase = (self.vibrato_phase + self.vibrato_speed) & 63;
        self.tremolo_phase = (self.tremolo_phase + self.tremolo_speed) & 63;
    }

    fn update_arpeggio(&mut self) {
        let offset = match self.arp_state {
            0 => 0,
            1 => {
                if self.arpeggio & 0x0F == 0 {
                    self.arp_state += 1;
                }
                (self.arpeggio >> 4) as i32
            }
            _ => (self.arpeggio & 0x0F) as i32,
        };
        self.period = self.note_period(self.note + offset);
        self.arp_state = (self.arp_state + 1) % 3;
    }

    fn update_portamento(&mut self) {
        if self.porta_speed == 0 || self.porta_to == 0 {
            return;
        }
        if self.period > self.porta_to {
            self.period = (self.period - self.porta_speed).max(self.porta_to);
        } else if self.period < self.porta_to {
            self.period = (self.period + self.porta_speed).min(self.porta_to);
        }
        if self.period == self.porta_to && self.pitch_effect == PitchEffect::Slide {
            self.pitch_effect = PitchEffect::None;
        }
    }

    // -------------------------------------------------------------------------
    // Instrument
    // -------------------------------------------------------------------------

    /// Advance the instrument handler one tick.
    pub(crate) fn update_instrument(&mut self) -> Option<SequenceOutput> {
        self.inst_handler.as_mut().map(|handler| handler.update())
    }

    /// Apply one tick of instrument output. `duty` is the chip-converted duty value.
    pub(crate) fn apply_sequence_output(&mut self, out: SequenceOutput, duty: Option<i32>) {
        if let Some(volume) = out.volume {
            self.inst_volume = volume as i32;
        }

        if self.pitch_effect != PitchEffect::Portamento {
            match out.arpeggio {
                Some(ArpeggioStep::Offset(offset)) => {
                    self.period = self.note_period(self.note + offset)
                }
                Some(ArpeggioStep::Fixed(note)) => self.period = self.note_period(note),
                Some(ArpeggioStep::Relative(offset)) => {
                    self.note += offset;
                    self.period = self.note_period(self.note);
                }
                Some(ArpeggioStep::Restore) => self.period = self.note_period(self.note),
                None => {}
            }
        }

        self.inst_pitch = out.pitch;

        if let Some(duty) = duty {
            self.duty_period = duty;
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    fn vibrato(&self) -> i32 {
        if self.vibrato_depth == 0 {
            return 0;
        }
        let table = vibrato_table();
        let phase = self.vibrato_phase as usize;
        match phase & 0x30 {
            0x00 => table[self.vibrato_depth + phase],
            0x10 => table[self.vibrato_depth + 15 - (phase - 16)],
            0x20 => -table[self.vibrato_depth + (phase - 32)],
            _ => -table[self.vibrato_depth + 15 - (phase - 48)],
        }
    }

    fn tremolo(&self) -> i32 {
        if self.tremolo_depth == 0 {
            return 0;
        }
        let table = vibrato_table();
        let phase = (self.tremolo_phase >> 1) as usize;
        let value = if phase < 16 {
            table[self.tremolo_depth + phase]
        } else {
            table[self.tremolo_depth + 15 - (phase - 16)]
        };
        value >> 1
    }

    /// Timer period for this tick: base period plus vibrato, fine pitch and instrument pitch,
    /// limited to the channel's timer width.
    pub fn calculate_period(&self) -> u16 {
        let fine = FINE_PITCH_CENTRE as i32 - self.fine_pitch as i32;
        let period = self.period - self.vibrato() + fine + self.inst_pitch;
        period.clamp(0, self.max_period as i32) as u16
    }

    /// Output volume for this tick: instrument volume scaled by the volume column, minus
    /// tremolo. Never rounds an audible note down to silence; zero while the gate is closed.
    pub fn calculate_volume(&self) -> u8 {
        if !self.gate {
            return 0;
        }
        let column = self.volume >> VOL_COLUMN_SHIFT;
        let mut volume = (self.inst_volume * column) / 15 - self.tremolo();
        volume = volume.clamp(0, self.max_volume as i32);
        if volume == 0 && self.inst_volume > 0 && column > 0 {
            volume = 1;
        }
        volume as u8
    }
}
