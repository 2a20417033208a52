//! Row/tick sequencer driving a set of channel voices.
//!
//! Each engine tick (one video frame) the player:
//!
//! 1. on the first tick of a row, applies the global effects of the row (`Fxx` speed, `Bxx` jump,
//!    `Dxx` skip, `Cxx` halt) and hands every channel its cell;
//! 2. runs `process_channel` on every voice;
//! 3. runs `refresh_channel` on every voice, in channel order, into the sink.
//!
//! A track is a single pattern. `Bxx` jumps to row `xx`; `Dxx` and `Cxx` end the track after the
//! current row.

use log::{debug, warn};

use crate::channel::voice::ChannelVoice;
use crate::channel::{Chip, create_voice};
use crate::config::DEFAULT_SPEED;
use crate::error::{Result, UnknownInstrumentSnafu};
use crate::instrument::instrument::Instrument;
use crate::note::note::{ChanNote, Effect};
use crate::note::parse::parse_rows;
use crate::note::table::NoteTable;
use crate::sink::RegisterSink;

/// `Fxx` values from here on set the tempo, not the speed.
const TEMPO_THRESHOLD: u8 = 0x20;

/// A single pattern of rows, one cell per channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub speed: u8,
    /// Effect columns in use; columns beyond this are ignored.
    pub effect_columns: usize,
    pub rows: Vec<Vec<ChanNote>>,
}

impl Track {
    /// Parse pattern text with `channels` cells per row. The effect column count is the widest
    /// column actually used (at least one).
    pub fn parse(text: &str, channels: usize, speed: u8) -> Result<Self> {
        let rows = parse_rows(text, channels)?;
        let effect_columns = rows
            .iter()
            .flatten()
            .filter_map(|cell| cell.effects.iter().rposition(Option::is_some))
            .max()
            .map_or(1, |last| last + 1);
        Ok(Self {
            speed,
            effect_columns,
            rows,
        })
    }
}

pub struct Player<S: RegisterSink> {
    voices: Vec<Box<dyn ChannelVoice>>,
    instruments: Vec<Instrument>,
    track: Track,
    sink: S,
    row: usize,
    tick: u8,
    speed: u8,
    rows_played: usize,
    next_row: Option<usize>,
    finished: bool,
}

impl<S: RegisterSink> Player<S> {
    /// One voice per channel of `chip`. The track must have as many cells per row as the chip has
    /// voices.
    pub fn new(
        chip: Chip,
        table: &'static dyn NoteTable,
        instruments: Vec<Instrument>,
        track: Track,
        sink: S,
    ) -> Result<Self> {
        let voices = (0..chip.voice_count())
            .map(|index| create_voice(chip, index, table))
            .collect::<Result<Vec<_>>>()?;
        let speed = if track.speed == 0 {
            DEFAULT_SPEED
        } else {
            track.speed
        };
        let finished = track.rows.is_empty();
        Ok(Self {
            voices,
            instruments,
            track,
            sink,
            row: 0,
            tick: 0,
            speed,
            rows_played: 0,
            next_row: None,
            finished,
        })
    }

    pub fn voices(&self) -> &[Box<dyn ChannelVoice>] {
        &self.voices
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Row currently playing.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Rows fully played so far, jumps included.
    pub fn rows_played(&self) -> usize {
        self.rows_played
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run one engine tick. Returns false once the track has ended.
    pub fn step(&mut self) -> bool {
        if self.finished {
            return false;
        }

        if self.tick == 0 {
            self.play_row();
        }

        for voice in self.voices.iter_mut() {
            voice.process_channel();
        }
        for voice in self.voices.iter_mut() {
            voice.refresh_channel(&mut self.sink);
        }

        self.tick += 1;
        if self.tick >= self.speed {
            self.tick = 0;
            self.advance_row();
        }
        true
    }

    /// Silence every channel and end playback.
    pub fn stop(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset_channel();
            voice.clear_registers(&mut self.sink);
        }
        self.finished = true;
    }

    fn play_row(&mut self) {
        let Some(row) = self.track.rows.get(self.row) else {
            self.finished = true;
            return;
        };
        let columns = self.track.effect_columns;

        for cmd in row
            .iter()
            .flat_map(|cell| cell.effects.iter().take(columns).flatten())
            .filter(|cmd| cmd.effect.is_global())
        {
            match cmd.effect {
                Effect::Speed if cmd.param > 0 && cmd.param < TEMPO_THRESHOLD => {
                    self.speed = cmd.param
                }
                Effect::Speed => debug!("tempo {} not supported, ignored", cmd.param),
                Effect::Jump => self.next_row = Some(cmd.param as usize),
                Effect::Skip | Effect::Halt => self.next_row = Some(usize::MAX),
                _ => {}
            }
        }

        for (voice, cell) in self.voices.iter_mut().zip(row) {
            let instrument = match cell.instrument {
                Some(index) => {
                    let found = self.instruments.get(index as usize);
                    if found.is_none() {
                        warn!("{}", UnknownInstrumentSnafu { index }.build());
                    }
                    found
                }
                None => None,
            };
            voice.play_note(cell, columns, instrument);
        }
    }

    fn advance_row(&mut self) {
        self.rows_played += 1;
        self.row = match self.next_row.take() {
            Some(row) => row,
            None => self.row + 1,
        };
        if self.row >= self.track.rows.len() {
            self.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::instrument::{InstrumentType, Sequence, SequenceKind};
    use crate::note::table::Machine;
    use crate::sink::RegisterWrite;

    fn player(text: &str, instruments: Vec<Instrument>) -> Player<Vec<RegisterWrite>> {
        let track = Track::parse(text, 2, 2).expect("valid track");
        Player::new(
            Chip::Mmc5,
            Machine::Ntsc.period_table(),
            instruments,
            track,
            Vec::new(),
        )
        .expect("mmc5 voices")
    }

    fn w(address: u16, value: u8) -> RegisterWrite {
        RegisterWrite::new(address, value)
    }

    #[test]
    fn track_counts_used_effect_columns() {
        let track = Track::parse("C-4 .. . ... A01 | ...\n... | ...", 2, 6).unwrap();
        assert_eq!(track.effect_columns, 2);

        let track = Track::parse("C-4 | ...", 2, 6).unwrap();
        assert_eq!(track.effect_columns, 1);
    }

    #[test]
    fn first_tick_writes_both_channels_in_order() {
        let mut player = player("A-4 .. . ... | ... .. . ...", Vec::new());

        assert!(player.step());

        assert_eq!(
            player.sink(),
            &vec![
                w(0x5015, 0x03),
                w(0x5000, 0x3F),
                w(0x5002, 0xFD),
                w(0x5003, 0x08),
                w(0x5015, 0x03),
                w(0x5004, 0x30),
            ]
        );
    }

    #[test]
    fn rows_advance_every_speed_ticks() {
        let mut player = player("C-4 | ...\nD-4 | ...\nE-4 | ...", Vec::new());

        player.step();
        assert_eq!(player.row(), 0);
        player.step();
        assert_eq!(player.row(), 1);
        assert_eq!(player.rows_played(), 1);
    }

    #[test]
    fn speed_effect_changes_row_length() {
        let mut player = player("C-4 .. . F03 | ...\nD-4 | ...", Vec::new());

        player.step();
        player.step();
        assert_eq!(player.speed(), 3);
        assert_eq!(player.row(), 0);

        player.step();
        assert_eq!(player.row(), 1);
    }

    #[test]
    fn halt_ends_track_after_row() {
        let mut player = player("C-4 .. . C00 | ...\nD-4 | ...", Vec::new());

        assert!(player.step());
        assert!(player.step());
        assert!(player.is_finished());
        assert!(!player.step());
    }

    #[test]
    fn jump_loops_track() {
        let mut player = player("C-4 | ...\nD-4 .. . B00 | ...", Vec::new());

        for _ in 0..4 {
            player.step();
        }

        assert_eq!(player.row(), 0);
        assert_eq!(player.rows_played(), 2);
        assert!(!player.is_finished());
    }

    #[test]
    fn track_ends_after_last_row() {
        let mut player = player("C-4 | ...", Vec::new());

        player.step();
        player.step();

        assert!(!player.step());
    }

    #[test]
    fn instruments_come_from_bank() {
        let quiet = Instrument::new("quiet", InstrumentType::Apu2A03)
            .with_sequence(SequenceKind::Volume, Sequence::new(vec![4]));
        let mut player = player("A-4 00 . ... | ... .. . ...", vec![quiet]);

        player.step();

        assert!(player.voices()[0].base().has_inst_handler());
        assert!(player.sink().contains(&w(0x5000, 0x34)));
    }

    #[test]
    fn unknown_instrument_still_plays_note() {
        let mut player = player("A-4 07 . ... | ... .. . ...", Vec::new());

        player.step();

        let voice = &player.voices()[0];
        assert!(voice.base().gate());
        assert!(!voice.base().has_inst_handler());
    }

    #[test]
    fn stop_clears_every_channel() {
        let mut player = player("A-4 | C-3", Vec::new());
        player.step();
        player.sink_mut().clear();

        player.stop();

        assert_eq!(
            player.sink(),
            &vec![
                w(0x5000, 0x30),
                w(0x5002, 0x00),
                w(0x5003, 0x00),
                w(0x5004, 0x30),
                w(0x5006, 0x00),
                w(0x5007, 0x00),
            ]
        );
        assert!(player.voices().iter().all(|voice| !voice.base().gate()));
        assert!(!player.step());
    }
}
