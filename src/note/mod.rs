//! Tracker row data: notes, effect commands, the row text format, and note → period tables.
//!
//! - **note**: `Note`, `ChanNote`, `Effect`, `EffectCommand`
//! - **parse**: row text codec (`C#4 01 F E01 V02`)
//! - **table**: 2A03-style period tables for NTSC and PAL clocks

pub mod note;
pub mod parse;
pub mod table;
