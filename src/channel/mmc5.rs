//! MMC5 square channels.
//!
//! The [MMC5](https://www.nesdev.org/wiki/MMC5_audio) carries two pulse channels that behave
//! like the 2A03 pulses without sweep. Per square, at `$5000 + 4 * index`:
//!
//! - `+0` control: duty (bits 6–7), length halt / envelope loop (bit 5), constant volume
//!   (bit 4), volume or envelope period (bits 0–3)
//! - `+2` timer low 8 bits
//! - `+3` length counter load (bits 3–7), timer high 3 bits; writing it restarts the envelope
//!   and reloads the length counter
//!
//! `$5015` enables the squares (bits 0–1) and must be kept set on every refresh.
//!
//! `Exx` selects how the envelope and length counter are used:
//!
//! - `E00`–`E1F`: one-shot, length counter loaded with the parameter
//! - `EE0`–`EE3`: bit 0 = hardware envelope, bit 1 = no loop

use log::debug;

use crate::channel::Chip;
use crate::channel::handler::{ChannelHandler, PERIOD_SENTINEL};
use crate::channel::tables::DUTY_2A03_FROM_VRC6;
use crate::channel::voice::{ChannelVoice, dispatch_note_data};
use crate::instrument::handler::SeqInstHandler;
use crate::instrument::instrument::{Instrument, InstrumentType};
use crate::note::note::{ChanNote, Effect, PitchClass};
use crate::note::table::{MAX_PERIOD, NoteTable};
use crate::sink::RegisterSink;

/// Square 1 register block; square 2 follows 4 bytes later.
pub const MMC5_SQUARE_BASE: u16 = 0x5000;

/// Channel enable / length status register.
pub const MMC5_STATUS: u16 = 0x5015;

/// `$5015` value enabling both squares.
pub const ENABLE_SQUARES: u8 = 0x03;

/// Control value for a silent channel: length halt + constant volume 0.
pub const SILENCE: u8 = 0x30;

pub const MAX_VOLUME: u8 = 0x0F;

/// Duty offset given to Sunsoft 5B instruments (tone enabled).
const S5B_DUTY_OFFSET: u8 = 0x40;

/// Duty used for instruments from chips without a duty setting.
const S5B_DUTY: i32 = 0x02;

/// `Exx` below this loads the length counter.
const LENGTH_COUNTER_LIMIT: u8 = 0x20;

/// `EE0`–`EE3` envelope mode range.
const ENVELOPE_MODE_FIRST: u8 = 0xE0;
const ENVELOPE_MODE_END: u8 = 0xE4;

/// One MMC5 square channel.
pub struct Mmc5Channel {
    base: ChannelHandler,
    hardware_envelope: bool,
    envelope_loop: bool,
    reset_envelope: bool,
    length_counter: u8,
}

impl Mmc5Channel {
    /// Square `index` (0 or 1).
    pub fn new(index: usize, table: &'static dyn NoteTable) -> Self {
        Self {
            base: ChannelHandler::new(Chip::Mmc5, index, table, MAX_PERIOD, MAX_VOLUME),
            hardware_envelope: false,
            envelope_loop: true,
            reset_envelope: false,
            length_counter: 1,
        }
    }

    /// First register of this square's block.
    pub fn register_base(&self) -> u16 {
        MMC5_SQUARE_BASE + 4 * self.base.index() as u16
    }

    pub fn hardware_envelope(&self) -> bool {
        self.hardware_envelope
    }

    pub fn envelope_loop(&self) -> bool {
        self.envelope_loop
    }

    pub fn length_counter(&self) -> u8 {
        self.length_counter
    }

    /// True when the next refresh must rewrite `+3` to restart the envelope/length counter.
    pub fn reset_pending(&self) -> bool {
        self.reset_envelope
    }
}

impl ChannelVoice for Mmc5Channel {
    fn base(&self) -> &ChannelHandler {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ChannelHandler {
        &mut self.base
    }

    fn handle_note_data(
        &mut self,
        row: &ChanNote,
        effect_columns: usize,
        instrument: Option<&Instrument>,
    ) {
        dispatch_note_data(self, row, effect_columns, instrument);

        if row.note.is_pitched() && (!self.envelope_loop || self.hardware_envelope) {
            self.reset_envelope = true;
        }
    }

    fn handle_custom_effects(&mut self, effect: Effect, param: u8) {
        if self.base.check_common_effects(effect, param) {
            return;
        }
        match effect {
            Effect::Volume if param < LENGTH_COUNTER_LIMIT => {
                self.length_counter = param;
                self.envelope_loop = false;
                self.reset_envelope = true;
            }
            Effect::Volume if (ENVELOPE_MODE_FIRST..ENVELOPE_MODE_END).contains(&param) => {
                if !self.envelope_loop || !self.hardware_envelope {
                    self.reset_envelope = true;
                }
                self.hardware_envelope = param & 0x01 == 0x01;
                self.envelope_loop = param & 0x02 != 0x02;
            }
            Effect::DutyCycle => {
                self.base.default_duty = param as i32;
                self.base.duty_period = param as i32;
            }
            _ => {}
        }
    }

    fn handle_empty_note(&mut self) {}

    fn handle_cut(&mut self) {
        self.base.cut_note();
    }

    fn handle_release(&mut self) {
        if !self.base.release {
            self.base.release_note();
        }
    }

    fn handle_note(&mut self, pitch: PitchClass, octave: u8) {
        self.base.note = self.base.run_note(octave, pitch);
        self.base.duty_period = self.base.default_duty;
        self.base.inst_volume = MAX_VOLUME as i32;
    }

    fn create_inst_handler(&mut self, kind: InstrumentType) -> bool {
        match kind {
            InstrumentType::Apu2A03
            | InstrumentType::Vrc6
            | InstrumentType::N163
            | InstrumentType::S5B => {
                let duty_offset = if kind == InstrumentType::S5B {
                    S5B_DUTY_OFFSET
                } else {
                    0
                };
                debug!("{}: new {} instrument handler", self.base.name(), kind);
                self.base.inst_handler =
                    Some(Box::new(SeqInstHandler::new(kind, MAX_VOLUME, duty_offset)));
                true
            }
            InstrumentType::Vrc7 | InstrumentType::Fds => false,
        }
    }

    fn reset_channel(&mut self) {
        self.base.reset();
        self.envelope_loop = true;
        self.hardware_envelope = false;
        self.length_counter = 1;
        self.reset_envelope = false;
        debug!("{}: reset", self.base.name());
    }

    fn refresh_channel(&mut self, sink: &mut dyn RegisterSink) {
        let period = self.base.calculate_period();
        let volume = self.base.calculate_volume();
        let duty = (self.base.duty_period & 0x03) as u8;
        let offset = self.register_base();

        sink.write_register(MMC5_STATUS, ENABLE_SQUARES);

        if !self.base.gate {
            sink.write_register(offset, SILENCE);
            self.base.last_period = PERIOD_SENTINEL;
            self.reset_envelope = false;
            return;
        }

        let control = (duty << 6)
            | (u8::from(self.envelope_loop) << 5)
            | (u8::from(!self.hardware_envelope) << 4)
            | volume;
        sink.write_register(offset, control);

        let low = (period & 0xFF) as u8;
        let high = (period >> 8) as u8;
        let last_high = self.base.last_period >> 8;

        sink.write_register(offset + 2, low);
        if high as u16 != last_high || self.reset_envelope {
            sink.write_register(offset + 3, high | (self.length_counter << 3));
        }

        self.base.last_period = period;
        self.reset_envelope = false;
    }

    fn convert_duty(&self, duty: i32) -> i32 {
        match self.base.inst_type_current {
            Some(InstrumentType::Vrc6) => DUTY_2A03_FROM_VRC6[(duty & 0x07) as usize],
            Some(InstrumentType::N163) => duty,
            Some(InstrumentType::S5B) => S5B_DUTY,
            _ => duty,
        }
    }

    fn clear_registers(&mut self, sink: &mut dyn RegisterSink) {
        let offset = self.register_base();
        sink.write_register(offset, SILENCE);
        sink.write_register(offset + 2, 0);
        sink.write_register(offset + 3, 0);
    }

    fn custom_effect_string(&self) -> String {
        let mut out = String::new();
        if !self.envelope_loop {
            out.push_str(&format!(" E{:02X}", self.length_counter));
        }
        if !self.envelope_loop || self.hardware_envelope {
            let mode = u8::from(!self.envelope_loop) * 2 + u8::from(self.hardware_envelope);
            out.push_str(&format!(" EE{mode:X}"));
        }
        out
    }
}
