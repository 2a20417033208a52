use crate::{
    chip::mmc5::{Mmc5Audio, SAMPLE_RATE},
    note::table::{CPU_CLOCK_NTSC, Machine},
    sink::{RegisterSink, TraceSink},
};

const FRAME: usize = 7457;

fn chip() -> Mmc5Audio {
    Mmc5Audio::new(Machine::Ntsc)
}

fn enabled_chip() -> Mmc5Audio {
    let mut chip = chip();
    chip.write(0x5015, 0x03);
    chip
}

#[test]
fn length_load_ignored_while_disabled() {
    let mut chip = chip();
    chip.write(0x5003, 0x08);

    assert_eq!(chip.length_counter(0), 0);
    assert_eq!(chip.read_status(), 0);
}

#[test]
fn length_load_sets_status_bit() {
    let mut chip = enabled_chip();
    chip.write(0x5007, 0x08); // index 1 -> 254

    assert_eq!(chip.length_counter(1), 254);
    assert_eq!(chip.read_status(), 0x02);
}

#[test]
fn disabling_clears_length() {
    let mut chip = enabled_chip();
    chip.write(0x5003, 0x08);

    chip.write(0x5015, 0x02);

    assert_eq!(chip.length_counter(0), 0);
}

#[test]
fn timer_period_is_latched_from_both_registers() {
    let mut chip = chip();
    chip.write(0x5002, 0xFD);
    chip.write(0x5003, 0x0A);

    assert_eq!(chip.timer_period(0), 0x2FD);

    chip.write(0x5002, 0x10);
    assert_eq!(chip.timer_period(0), 0x210);
}

#[test]
fn length_counts_down_unless_halted() {
    let mut chip = enabled_chip();
    chip.write(0x5000, 0x10);
    chip.write(0x5003, 0x00); // index 0 -> 10
    chip.write(0x5004, 0x30);
    chip.write(0x5007, 0x00);

    chip.tick(FRAME * 3);

    assert_eq!(chip.length_counter(0), 7);
    assert_eq!(chip.length_counter(1), 10);
}

#[test]
fn envelope_restarts_on_high_write_and_decays() {
    let mut chip = enabled_chip();
    chip.write(0x5000, 0x00);
    chip.write(0x5003, 0x08);

    chip.tick(FRAME);
    assert_eq!(chip.volume(0), 15);

    chip.tick(FRAME);
    assert_eq!(chip.volume(0), 14);

    chip.write(0x5003, 0x08);
    chip.tick(FRAME);
    assert_eq!(chip.volume(0), 15);
}

#[test]
fn constant_volume_bypasses_envelope() {
    let mut chip = enabled_chip();
    chip.write(0x5000, 0x3A);

    assert_eq!(chip.volume(0), 0x0A);
}

#[test]
fn sweep_registers_are_ignored() {
    let mut chip = chip();
    chip.write(0x5002, 0x40);

    chip.write(0x5001, 0xFF);
    chip.write(0x5005, 0xFF);

    assert_eq!(chip.timer_period(0), 0x40);
    assert_eq!(chip.timer_period(1), 0);
}

#[test]
fn pcm_write_mode_ignores_zero() {
    let mut chip = chip();
    chip.write(0x5011, 0x80);
    chip.write(0x5011, 0x00);
    assert_eq!(chip.pcm(), 0x80);

    chip.write(0x5010, 0x01);
    chip.write(0x5011, 0x20);
    assert_eq!(chip.pcm(), 0x80);
}

#[test]
fn one_second_yields_sample_rate_samples() {
    let mut chip = chip();

    chip.tick(CPU_CLOCK_NTSC as usize);

    let produced = chip.pending_samples() as i64;
    assert!((produced - SAMPLE_RATE as i64).abs() <= 1);
}

#[test]
fn idle_chip_is_silent() {
    let mut chip = chip();
    chip.tick(FRAME);

    assert!(chip.take_samples().iter().all(|&s| s == 0.0));
    assert_eq!(chip.pending_samples(), 0);
}

#[test]
fn playing_square_produces_signal() {
    let mut chip = enabled_chip();
    chip.write(0x5000, 0xBF);
    chip.write(0x5002, 0xFD);
    chip.write(0x5003, 0x08);

    chip.tick(FRAME * 4);

    let samples = chip.take_samples();
    assert!(samples.iter().any(|&s| s > 0.0));
    assert!(samples.iter().any(|&s| s == 0.0));
    assert!(samples.iter().all(|&s| s <= 1.0));
}

#[test]
fn drain_samples_copies_in_order() {
    let mut chip = chip();
    chip.write(0x5011, 0xFF);
    chip.tick(FRAME);
    let pending = chip.pending_samples();

    let mut out = [0.0f32; 16];
    let n = chip.drain_samples(&mut out);

    assert_eq!(n, 16);
    assert!(out.iter().all(|&s| s > 0.0));
    assert_eq!(chip.pending_samples(), pending - 16);
}

#[test]
fn trace_sink_forwards_to_chip() {
    let mut sink = TraceSink::new(chip());
    sink.write_register(0x5015, 0x01);
    sink.write_register(0x5003, 0x08);

    assert_eq!(sink.take_tick().len(), 2);
    assert_eq!(sink.inner().read_status(), 0x01);
}
