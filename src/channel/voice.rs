//! `ChannelVoice` trait: what the player drives, one implementation per chip family.
//!
//! A voice embeds a [`ChannelHandler`] and exposes it through `base`/`base_mut`. The row and
//! tick flow is provided here once; chips fill in the hooks (custom effects, note handling,
//! handler factory, duty conversion, register writes).
//!
//! Row flow ([`ChannelVoice::play_note`]): `Gxx` deferral → effects → volume column →
//! instrument → note hook → instrument trigger.
//! Tick flow ([`ChannelVoice::process_channel`]): delayed row → common effects → instrument
//! sequences. [`ChannelVoice::refresh_channel`] then turns the state into register writes.

use log::warn;

use crate::channel::handler::{ChannelHandler, DelayedRow};
use crate::error::{IncompatibleInstrumentSnafu, Result};
use crate::instrument::instrument::{Instrument, InstrumentType};
use crate::note::note::{ChanNote, Effect, EffectCommand, Note, PitchClass};
use crate::sink::RegisterSink;

/// Trait for emulated sound channels driven by tracker rows.
pub trait ChannelVoice {
    fn base(&self) -> &ChannelHandler;
    fn base_mut(&mut self) -> &mut ChannelHandler;

    /// Chip-specific effects. Implementations try [`ChannelHandler::check_common_effects`]
    /// first and ignore anything they do not understand.
    fn handle_custom_effects(&mut self, effect: Effect, param: u8);
    /// Row without a note.
    fn handle_empty_note(&mut self);
    /// `---`
    fn handle_cut(&mut self);
    /// `===`
    fn handle_release(&mut self);
    /// Pitched note.
    fn handle_note(&mut self, pitch: PitchClass, octave: u8);
    /// Install a fresh instrument handler for `kind`. Returns false when the channel cannot
    /// play instruments of that type; the current handler is then left untouched.
    fn create_inst_handler(&mut self, kind: InstrumentType) -> bool;
    /// Write this tick's state to the chip.
    fn refresh_channel(&mut self, sink: &mut dyn RegisterSink);
    /// Silence the channel's registers (teardown, mute).
    fn clear_registers(&mut self, sink: &mut dyn RegisterSink);

    /// Map an instrument duty value onto this chip's duty settings.
    fn convert_duty(&self, duty: i32) -> i32 {
        duty
    }

    /// Tokens describing chip state that is not visible in the pattern (display/export).
    fn custom_effect_string(&self) -> String {
        String::new()
    }

    fn reset_channel(&mut self) {
        self.base_mut().reset();
    }

    /// Process one row cell.
    fn handle_note_data(
        &mut self,
        row: &ChanNote,
        effect_columns: usize,
        instrument: Option<&Instrument>,
    ) {
        dispatch_note_data(self, row, effect_columns, instrument);
    }

    /// Entry point for a new row. Holds the row back when it carries `Gxx`.
    fn play_note(&mut self, row: &ChanNote, effect_columns: usize, instrument: Option<&Instrument>) {
        if let Some(pending) = self.base_mut().delayed.take() {
            self.handle_note_data(&pending.row, pending.effect_columns, pending.instrument.as_ref());
        }

        match row.find_effect(Effect::Delay, effect_columns) {
            Some(ticks) if ticks > 0 => {
                let mut row = row.clone();
                for slot in row.effects.iter_mut() {
                    if slot.is_some_and(|cmd| cmd.effect == Effect::Delay) {
                        *slot = None;
                    }
                }
                self.base_mut().delayed = Some(DelayedRow {
                    row,
                    effect_columns,
                    instrument: instrument.cloned(),
                    ticks,
                });
            }
            _ => self.handle_note_data(row, effect_columns, instrument),
        }
    }

    /// One tick of effect and instrument processing.
    fn process_channel(&mut self) {
        if let Some(pending) = self.base_mut().tick_delay() {
            self.handle_note_data(&pending.row, pending.effect_columns, pending.instrument.as_ref());
        }

        self.base_mut().update_effects();

        if let Some(out) = self.base_mut().update_instrument() {
            let duty = out.duty.map(|duty| self.convert_duty(duty as i32));
            self.base_mut().apply_sequence_output(out, duty);
        }
    }

    /// Assign instrument `index`. A new handler is created when the type changes; the handler
    /// factory refusing the type is an error and keeps the previous instrument.
    fn load_instrument(&mut self, index: u8, instrument: &Instrument) -> Result<()> {
        let needs_handler = self
            .base()
            .inst_handler
            .as_ref()
            .is_none_or(|handler| handler.kind() != instrument.kind);
        if needs_handler && !self.create_inst_handler(instrument.kind) {
            return IncompatibleInstrumentSnafu {
                kind: instrument.kind,
                channel: self.base().name(),
            }
            .fail();
        }

        let base = self.base_mut();
        if let Some(handler) = base.inst_handler.as_mut() {
            handler.load(instrument);
        }
        base.instrument = Some(index);
        base.inst_type_current = Some(instrument.kind);
        Ok(())
    }
}

/// Generic row handling shared by every voice. Voices that extend
/// [`ChannelVoice::handle_note_data`] call this first.
pub fn dispatch_note_data<V: ChannelVoice + ?Sized>(
    voice: &mut V,
    row: &ChanNote,
    effect_columns: usize,
    instrument: Option<&Instrument>,
) {
    if row.note != Note::None {
        voice.base_mut().clear_note_timers();
    }

    let effects = row.effects.iter().take(effect_columns).flatten();
    let (slides, others): (Vec<&EffectCommand>, Vec<&EffectCommand>) = effects
        .filter(|cmd| !cmd.effect.is_global() && cmd.effect != Effect::Delay)
        .partition(|cmd| matches!(cmd.effect, Effect::SlideUp | Effect::SlideDown));

    for cmd in others {
        voice.handle_custom_effects(cmd.effect, cmd.param);
    }

    if let Some(volume) = row.volume {
        voice.base_mut().set_volume_column(volume);
    }

    if let (Some(index), Some(instrument)) = (row.instrument, instrument) {
        if let Err(err) = voice.load_instrument(index, instrument) {
            warn!("{err}");
        }
    }

    match row.note {
        Note::None => voice.handle_empty_note(),
        Note::Halt => voice.handle_cut(),
        Note::Release => voice.handle_release(),
        Note::Pitch(pitch) => voice.handle_note(pitch, row.octave),
    }

    // Slides start from the note played on this row.
    for cmd in slides {
        voice.handle_custom_effects(cmd.effect, cmd.param);
    }

    if row.note.is_pitched() {
        voice.base_mut().trigger_instrument();
    }
}
