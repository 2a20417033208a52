//! Emulated sound hardware the register writes can be rendered on.
//!
//! - **mmc5**: MMC5 expansion audio (2 pulse channels + raw PCM), sampled at 44.1 kHz.

pub mod mmc5;

#[cfg(test)]
mod tests;
