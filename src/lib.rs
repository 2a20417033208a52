//! Chipvoice: tracker-style register synthesis for NES expansion audio.
//!
//! Turns pattern rows (notes, instruments, effects) into the register writes a sound chip
//! expects, once per engine tick, and can render those writes on an emulated chip. The
//! [MMC5](https://www.nesdev.org/wiki/MMC5_audio) squares are the supported channels.
//!
//! ## Modules
//!
//! - **channel** – channel voices: shared effect/instrument state, the `ChannelVoice` row and
//!   tick flow, MMC5 square register output
//! - **chip** – [MMC5 audio](https://www.nesdev.org/wiki/MMC5_audio) model: pulse×2, PCM,
//!   length counter, [envelope](https://www.nesdev.org/wiki/APU_Envelope), 44.1 kHz output
//! - **config** – TOML player configuration
//! - **error** – crate error type
//! - **instrument** – instruments, sequences, per-tick sequence playback
//! - **note** – notes, effects, pattern text codec, note → period tables
//! - **player** – row/tick sequencer over a set of voices
//! - **sink** – `RegisterSink` trait, recorder and trace sinks

pub mod channel;
pub mod chip;
pub mod config;
pub mod error;
pub mod instrument;
pub mod note;
pub mod player;
pub mod sink;

pub use error::{Error, Result};
