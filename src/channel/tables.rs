//! Immutable lookup tables shared by all channels.

use std::sync::OnceLock;

/// VRC6 duty (3 bits, 1/16 … 8/16) → nearest 2A03/MMC5 duty (12.5%, 25%, 50%).
pub const DUTY_2A03_FROM_VRC6: [i32; 8] = [0, 0, 1, 1, 1, 1, 2, 2];

/// Peak vibrato/tremolo excursion for each of the 16 depth settings.
const VIBRATO_DEPTH: [f64; 16] = [
    1.0, 1.5, 2.5, 4.0, 5.0, 7.0, 10.0, 12.0, 14.0, 17.0, 22.0, 30.0, 44.0, 64.0, 96.0, 128.0,
];

/// Quarter-wave sine table shared by vibrato and tremolo. Index = `(depth << 4) | phase`,
/// phase 0–15 covering 0 to π/2.
pub fn vibrato_table() -> &'static [i32; 256] {
    static TABLE: OnceLock<[i32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0i32; 256];
        for (depth, peak) in VIBRATO_DEPTH.iter().enumerate() {
            for phase in 0..16 {
                let angle = (phase as f64 / 16.0) * std::f64::consts::FRAC_PI_2;
                table[(depth << 4) | phase] = (angle.sin() * peak) as i32;
            }
        }
        table
    })
}
