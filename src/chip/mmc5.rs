//! MMC5 expansion audio.
//!
//! Implements the [MMC5 audio](https://www.nesdev.org/wiki/MMC5_audio) block: two pulse channels
//! that work like the [APU Pulse](https://www.nesdev.org/wiki/APU_Pulse) minus the sweep unit,
//! plus an 8-bit raw PCM channel. Registers $5000–$5007, $5010, $5011, $5015.
//!
//! ## Differences from the 2A03 pulses
//!
//! - No sweep unit, so periods below 8 are not muted.
//! - Envelope and length counter are both clocked at a fixed ~240 Hz; there is no frame counter
//!   mode or IRQ.
//!
//! Output is mixed with the APU pulse curve and sampled at 44.1 kHz.

use log::trace;

use crate::note::table::Machine;
use crate::sink::RegisterSink;

pub const SAMPLE_RATE: u32 = 44_100;

/// CPU cycles between envelope/length clocks (~240 Hz on NTSC).
const FRAME_PERIOD: u32 = 7457;

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Duty waveforms, sequencer steps 0→7→6→…→1.
const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [0, 0, 0, 0, 0, 0, 1, 1], // 25%
    [0, 0, 0, 0, 1, 1, 1, 1], // 50%
    [1, 1, 1, 1, 1, 1, 0, 0], // 25% negated
];

/// Share of full scale given to the PCM channel.
const PCM_GAIN: f32 = 0.25;

// -----------------------------------------------------------------------------
// Pulse channel ($5000–$5003 = pulse 1, $5004–$5007 = pulse 2)
// -----------------------------------------------------------------------------

#[derive(Default)]
struct Pulse {
    enabled: bool,
    duty: u8,
    length_halt: bool,
    constant_volume: bool,
    volume: u8,
    timer_period: u16,
    timer: u16,
    sequencer_step: u8,
    length_counter: u8,
    envelope_start: bool,
    envelope_divider: u8,
    envelope_decay: u8,
}

impl Pulse {
    /// +0: duty, length halt / envelope loop, constant volume, volume/envelope period.
    fn write_control(&mut self, data: u8) {
        self.duty = (data >> 6) & 3;
        self.length_halt = data & 0x20 != 0;
        self.constant_volume = data & 0x10 != 0;
        self.volume = data & 0x0F;
    }

    /// +2: timer low 8 bits.
    fn write_timer_low(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// +3: length counter load, timer high 3 bits; restarts envelope and sequencer.
    fn write_timer_high(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        if self.enabled {
            self.length_counter = LENGTH_TABLE[(data >> 3) as usize & 0x1F];
        }
        self.envelope_start = true;
        self.sequencer_step = 0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.length_counter = 0;
        }
    }

    fn clock_length(&mut self) {
        if !self.length_halt && self.length_counter > 0 {
            self.length_counter -= 1;
        }
    }

    fn clock_envelope(&mut self) {
        if self.envelope_start {
            self.envelope_decay = 15;
            self.envelope_divider = self.volume;
            self.envelope_start = false;
        } else if self.envelope_divider > 0 {
            self.envelope_divider -= 1;
        } else {
            self.envelope_divider = self.volume;
            if self.envelope_decay > 0 {
                self.envelope_decay -= 1;
            } else if self.length_halt {
                self.envelope_decay = 15;
            }
        }
    }

    fn level(&self) -> u8 {
        if self.constant_volume {
            self.volume
        } else {
            self.envelope_decay
        }
    }

    fn output(&self) -> u8 {
        if !self.enabled
            || self.length_counter == 0
            || PULSE_DUTY[self.duty as usize][self.sequencer_step as usize] == 0
        {
            return 0;
        }
        self.level()
    }

    fn tick_apu_cycle(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period;
        self.sequencer_step = (self.sequencer_step.wrapping_sub(1)) & 7;
    }
}

/// Pulse output: 95.52 / (8128/n + 100), n = pulse1 + pulse2 (0–30). APU_Mixer.
fn pulse_table(n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }
    95.52 / (8128.0 / (n as f32) + 100.0)
}

// -----------------------------------------------------------------------------
// MMC5 audio: register dispatch, frame clock, tick, sample buffer
// -----------------------------------------------------------------------------

/// MMC5 audio state. `tick(cycles)` advances the channels and pushes 44.1 kHz samples.
pub struct Mmc5Audio {
    pulses: [Pulse; 2],
    pcm_read_mode: bool,
    pcm: u8,
    frame_cycle: u32,
    cpu_cycle: u64,
    cycles_per_sample: f64,
    sample_phase: f64,
    sample_buffer: Vec<f32>,
}

impl Mmc5Audio {
    pub fn new(machine: Machine) -> Self {
        Self {
            pulses: Default::default(),
            pcm_read_mode: false,
            pcm: 0,
            frame_cycle: 0,
            cpu_cycle: 0,
            cycles_per_sample: machine.cpu_clock() as f64 / SAMPLE_RATE as f64,
            sample_phase: 0.0,
            sample_buffer: Vec::new(),
        }
    }

    /// Write to MMC5 audio registers. $5001/$5005 (sweep on the 2A03) do nothing here.
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x5000 => self.pulses[0].write_control(data),
            0x5002 => self.pulses[0].write_timer_low(data),
            0x5003 => self.pulses[0].write_timer_high(data),
            0x5004 => self.pulses[1].write_control(data),
            0x5006 => self.pulses[1].write_timer_low(data),
            0x5007 => self.pulses[1].write_timer_high(data),
            0x5010 => self.pcm_read_mode = data & 0x01 != 0,
            // Zero is ignored in write mode.
            0x5011 if !self.pcm_read_mode && data != 0 => self.pcm = data,
            0x5015 => {
                self.pulses[0].set_enabled(data & 0x01 != 0);
                self.pulses[1].set_enabled(data & 0x02 != 0);
            }
            _ => trace!("MMC5: ignored write ${addr:04X} <- {data:02X}"),
        }
    }

    /// Read $5015: bits 0–1 = length counter > 0 for pulse 1 and 2.
    pub fn read_status(&self) -> u8 {
        let mut r = 0;
        if self.pulses[0].length_counter > 0 {
            r |= 0x01;
        }
        if self.pulses[1].length_counter > 0 {
            r |= 0x02;
        }
        r
    }

    /// Timer period currently latched for pulse `index`.
    pub fn timer_period(&self, index: usize) -> u16 {
        self.pulses[index].timer_period
    }

    pub fn length_counter(&self, index: usize) -> u8 {
        self.pulses[index].length_counter
    }

    /// Volume pulse `index` plays at when its duty step is high: the constant volume, or the
    /// envelope's decay level.
    pub fn volume(&self, index: usize) -> u8 {
        self.pulses[index].level()
    }

    pub fn pcm(&self) -> u8 {
        self.pcm
    }

    /// Envelope and length counter, clocked together.
    fn clock_frame(&mut self) {
        for pulse in self.pulses.iter_mut() {
            pulse.clock_envelope();
            pulse.clock_length();
        }
    }

    fn mix(&self) -> f32 {
        let pulse_sum = (self.pulses[0].output() + self.pulses[1].output()) as usize;
        let pcm = self.pcm as f32 / 255.0 * PCM_GAIN;
        (pulse_table(pulse_sum) + pcm).min(1.0)
    }

    /// Advance by `cycles` CPU cycles. One sample pushed every `cpu_clock / 44100` cycles.
    pub fn tick(&mut self, cycles: usize) {
        for _ in 0..cycles {
            self.cpu_cycle += 1;
            self.frame_cycle += 1;
            if self.frame_cycle >= FRAME_PERIOD {
                self.frame_cycle = 0;
                self.clock_frame();
            }

            if self.cpu_cycle % 2 == 0 {
                for pulse in self.pulses.iter_mut() {
                    pulse.tick_apu_cycle();
                }
            }

            self.sample_phase += 1.0;
            if self.sample_phase >= self.cycles_per_sample {
                self.sample_phase -= self.cycles_per_sample;
                self.sample_buffer.push(self.mix());
            }
        }
    }

    /// Samples generated but not yet drained.
    pub fn pending_samples(&self) -> usize {
        self.sample_buffer.len()
    }

    /// Drain samples from the internal buffer into `out`. Returns number of samples copied.
    pub fn drain_samples(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.sample_buffer.len());
        out[..n].copy_from_slice(&self.sample_buffer[..n]);
        self.sample_buffer.drain(..n);
        n
    }

    /// Take every buffered sample.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.sample_buffer)
    }
}

impl RegisterSink for Mmc5Audio {
    fn write_register(&mut self, address: u16, value: u8) {
        self.write(address, value);
    }
}
