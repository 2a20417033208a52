//! Instrument handlers: per-tick sequence playback for the active instrument of a channel.
//!
//! A channel owns at most one handler (`Option<Box<dyn InstHandler>>`) and replaces it wholesale
//! when an instrument of another type is assigned. The handler never touches the channel; each
//! tick it returns a [`SequenceOutput`] that the channel applies to its own state.

use crate::instrument::instrument::{
    ArpeggioMode, Instrument, InstrumentType, Sequence, SequenceKind,
};
use crate::note::table::MAX_PERIOD;

/// Hi-pitch sequence values are in units of 16 pitch steps.
const HI_PITCH_SCALE: i32 = 16;

/// The accumulated pitch never bends further than a whole period range either way.
const PITCH_LIMIT: i32 = MAX_PERIOD as i32;

/// Note change requested by an arpeggio sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpeggioStep {
    /// Play the triggered note plus this many semitones.
    Offset(i32),
    /// Play this absolute note.
    Fixed(i32),
    /// Move the base note by this many semitones.
    Relative(i32),
    /// A fixed arpeggio just ended: return to the base note.
    Restore,
}

/// What the instrument asks of the channel for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceOutput {
    /// Instrument volume, already limited to the handler's maximum.
    pub volume: Option<u8>,
    pub arpeggio: Option<ArpeggioStep>,
    /// Accumulated pitch offset of the pitch and hi-pitch sequences since the trigger, within
    /// `±MAX_PERIOD`.
    pub pitch: i32,
    /// Raw duty value (duty offset applied); the channel converts it for its own chip.
    pub duty: Option<u8>,
}

/// Trait for instrument handlers driven once per tick by a channel.
pub trait InstHandler {
    /// Instrument type this handler was created for.
    fn kind(&self) -> InstrumentType;
    /// Take the sequences of `instrument`. Playback restarts on the next trigger.
    fn load(&mut self, instrument: &Instrument);
    /// Restart every sequence (note-on).
    fn trigger(&mut self);
    /// Key-off: sequences with a release point continue after it.
    fn release(&mut self);
    /// Advance one tick.
    fn update(&mut self) -> SequenceOutput;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SeqState {
    Running,
    /// Last item was played; the next tick reports the end once.
    Finished,
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Value(i8),
    End,
    Idle,
}

/// Playback cursor over one sequence.
#[derive(Clone, Debug)]
struct SequencePlayer {
    sequence: Sequence,
    position: usize,
    state: SeqState,
    released: bool,
}

impl SequencePlayer {
    fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            position: 0,
            state: SeqState::Idle,
            released: false,
        }
    }

    fn restart(&mut self) {
        self.position = 0;
        self.released = false;
        self.state = if self.sequence.items.is_empty() {
            SeqState::Idle
        } else {
            SeqState::Running
        };
    }

    fn release(&mut self) {
        self.released = true;
        if self.state != SeqState::Running {
            return;
        }
        if let Some(point) = self.sequence.release_point {
            self.position = point + 1;
            if self.position >= self.sequence.items.len() {
                self.state = SeqState::Finished;
            }
        }
    }

    fn step(&mut self) -> Step {
        match self.state {
            SeqState::Idle => return Step::Idle,
            SeqState::Finished => {
                self.state = SeqState::Idle;
                return Step::End;
            }
            SeqState::Running => {}
        }

        let Some(&value) = self.sequence.items.get(self.position) else {
            self.state = SeqState::Idle;
            return Step::End;
        };

        let holding = !self.released && self.sequence.release_point == Some(self.position);
        if !holding {
            self.position += 1;
            if self.position >= self.sequence.items.len() {
                match self.loop_target() {
                    Some(point) => self.position = point,
                    None => self.state = SeqState::Finished,
                }
            }
        }

        Step::Value(value)
    }

    /// Loop point to jump to at the end of the sequence. A loop that lies before the release
    /// point only applies until the note is released.
    fn loop_target(&self) -> Option<usize> {
        let point = self.sequence.loop_point?;
        if point >= self.sequence.items.len() {
            return None;
        }
        match self.sequence.release_point {
            Some(release) if self.released && point <= release => None,
            _ => Some(point),
        }
    }
}

/// Sequence-driven instrument handler used by the pulse-style channels.
pub struct SeqInstHandler {
    kind: InstrumentType,
    max_volume: u8,
    duty_offset: u8,
    players: [Option<SequencePlayer>; SequenceKind::COUNT],
    pitch: i32,
}

impl SeqInstHandler {
    /// `max_volume` caps volume sequence values; `duty_offset` is added to every duty value
    /// before it reaches the channel.
    pub fn new(kind: InstrumentType, max_volume: u8, duty_offset: u8) -> Self {
        Self {
            kind,
            max_volume,
            duty_offset,
            players: Default::default(),
            pitch: 0,
        }
    }

    pub fn max_volume(&self) -> u8 {
        self.max_volume
    }

    pub fn duty_offset(&self) -> u8 {
        self.duty_offset
    }

    fn step(&mut self, kind: SequenceKind) -> Step {
        match &mut self.players[kind.index()] {
            Some(player) => player.step(),
            None => Step::Idle,
        }
    }

    fn arpeggio_mode(&self) -> ArpeggioMode {
        self.players[SequenceKind::Arpeggio.index()]
            .as_ref()
            .map(|player| player.sequence.arpeggio_mode)
            .unwrap_or_default()
    }
}

impl InstHandler for SeqInstHandler {
    fn kind(&self) -> InstrumentType {
        self.kind
    }

    fn load(&mut self, instrument: &Instrument) {
        for kind in SequenceKind::ALL {
            self.players[kind.index()] = instrument.sequence(kind).cloned().map(SequencePlayer::new);
        }
    }

    fn trigger(&mut self) {
        self.pitch = 0;
        for player in self.players.iter_mut().flatten() {
            player.restart();
        }
    }

    fn release(&mut self) {
        for player in self.players.iter_mut().flatten() {
            player.release();
        }
    }

    fn update(&mut self) -> SequenceOutput {
        let mut out = SequenceOutput::default();

        if let Step::Value(value) = self.step(SequenceKind::Volume) {
            out.volume = Some((value.max(0) as u8).min(self.max_volume));
        }

        let mode = self.arpeggio_mode();
        out.arpeggio = match (self.step(SequenceKind::Arpeggio), mode) {
            (Step::Value(value), ArpeggioMode::Absolute) => Some(ArpeggioStep::Offset(value as i32)),
            (Step::Value(value), ArpeggioMode::Fixed) => Some(ArpeggioStep::Fixed(value as i32)),
            (Step::Value(value), ArpeggioMode::Relative) => {
                Some(ArpeggioStep::Relative(value as i32))
            }
            (Step::End, ArpeggioMode::Fixed) => Some(ArpeggioStep::Restore),
            _ => None,
        };

        if let Step::Value(value) = self.step(SequenceKind::Pitch) {
            self.pitch = (self.pitch + value as i32).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        if let Step::Value(value) = self.step(SequenceKind::HiPitch) {
            self.pitch =
                (self.pitch + value as i32 * HI_PITCH_SCALE).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        out.pitch = self.pitch;

        if let Step::Value(value) = self.step(SequenceKind::DutyCycle) {
            out.duty = Some(self.duty_offset.wrapping_add(value as u8));
        }

        out
    }
}
