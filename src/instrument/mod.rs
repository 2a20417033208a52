//! Instruments and the per-tick sequence playback that drives a channel.
//!
//! - **instrument**: instrument types, sequences, instrument definitions
//! - **handler**: `InstHandler` trait and the sequence-driven `SeqInstHandler`

pub mod handler;
pub mod instrument;

#[cfg(test)]
mod tests;
