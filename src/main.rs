//! Chipvoice entry point.
//!
//! Plays a pattern on the emulated MMC5 squares: rows are turned into register writes, the
//! writes drive the chip model, and the chip's samples go to the default audio device.
//! Usage: chipvoice [pattern.txt] [--config chipvoice.toml] [--trace] [--mute]

use std::path::PathBuf;

use ansi_term::Colour::{Cyan, Green, Red, Yellow};
use ansi_term::Style;
use clap::Parser;
use log::{LevelFilter, info};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use snafu::ResultExt;

use chipvoice::Result;
use chipvoice::channel::Chip;
use chipvoice::channel::mmc5::MMC5_STATUS;
use chipvoice::chip::mmc5::{Mmc5Audio, SAMPLE_RATE};
use chipvoice::config::Config;
use chipvoice::error::{AudioPlaySnafu, AudioStreamSnafu, LoggerSnafu, ReadFileSnafu};
use chipvoice::instrument::instrument::{
    ArpeggioMode, Instrument, InstrumentType, Sequence, SequenceKind,
};
use chipvoice::player::{Player, Track};
use chipvoice::sink::{RegisterWrite, TraceSink};

/// Played when no pattern file is given. Square 1 carries the melody, square 2 the bass.
const DEMO_PATTERN: &str = "\
# square 1                  | square 2
A-4 00 F ... ... | A-2 01 A E10
... .. . 401 ... | ... .. . ...
C-5 00 E ... ... | ... .. . ...
... .. . ... ... | A-2 01 . ...
E-5 00 F 047 ... | ... .. . ...
... .. . ... ... | E-2 01 . ...
D-5 02 C ... ... | ... .. . EE1
=== .. . ... ... | ... .. . ...
C-5 00 F 301 ... | F-2 01 F EE0
B-4 .. . ... ... | ... .. . ...
A-4 .. . ... S02 | E-2 01 . ...
--- .. . ... ... | --- .. . ...
";

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Pattern text file. Plays a built-in demo when omitted.
    pattern: Option<PathBuf>,
    /// TOML config file (machine, speed, instruments).
    #[arg(long, default_value = "chipvoice.toml")]
    config: PathBuf,
    /// Print every register write.
    #[arg(long)]
    trace: bool,
    /// Render without opening an audio device.
    #[arg(long)]
    mute: bool,
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long)]
    log_level: Option<String>,
    /// Stop after this many rows.
    #[arg(long)]
    rows: Option<usize>,
}

fn main() {
    if let Err(err) = run(Args::parse()) {
        eprintln!("{} {}", Red.bold().paint("ERROR"), err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(Some(args.config.as_path()))?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    setup_logger(config.level_filter())?;

    let text = match &args.pattern {
        Some(path) => std::fs::read_to_string(path).context(ReadFileSnafu { path })?,
        None => DEMO_PATTERN.to_string(),
    };
    if config.instruments.is_empty() {
        config.instruments = demo_instruments();
    }

    let chip = Chip::Mmc5;
    let track = Track::parse(&text, chip.voice_count(), config.speed)?;
    info!(
        "{} rows, {} channels, speed {}, {:?}",
        track.rows.len(),
        chip.voice_count(),
        config.speed,
        config.machine
    );

    let sink = TraceSink::new(Mmc5Audio::new(config.machine));
    let mut player = Player::new(
        chip,
        config.machine.period_table(),
        config.instruments,
        track,
        sink,
    )?;

    let trace = args.trace || config.trace;
    let cycles = config.machine.cycles_per_tick();
    let mut tick = 0usize;
    while player.step() {
        let writes = player.sink_mut().take_tick();
        if trace {
            print_trace(tick, player.rows_played(), &writes);
        }
        player.sink_mut().inner_mut().tick(cycles);
        tick += 1;
        if args.rows.is_some_and(|limit| player.rows_played() >= limit) {
            break;
        }
    }

    for voice in player.voices() {
        info!("{}:{}", voice.base().name(), voice.custom_effect_string());
    }

    player.stop();
    let mut chip_model = player.into_sink().into_inner();
    chip_model.tick(cycles);
    let samples = chip_model.take_samples();
    info!(
        "{} ticks, {:.2} s of audio",
        tick,
        samples.len() as f64 / SAMPLE_RATE as f64
    );

    if !args.mute {
        play(samples)?;
    }
    Ok(())
}

fn setup_logger(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => Red.bold().paint("ERROR"),
                log::Level::Warn => Yellow.bold().paint("WARN"),
                log::Level::Info => Green.paint("INFO"),
                log::Level::Debug => Cyan.paint("DEBUG"),
                log::Level::Trace => Style::new().dimmed().paint("TRACE"),
            };
            out.finish(format_args!("[{} {}] {}", level, record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context(LoggerSnafu)
}

/// One line per tick: tick number, row, then every write. `$5015` writes are dimmed.
fn print_trace(tick: usize, row: usize, writes: &[RegisterWrite]) {
    let mut line = format!("{:>5} {:>3} |", tick, row);
    for write in writes {
        let text = format!(" ${:04X}={:02X}", write.address, write.value);
        if write.address == MMC5_STATUS {
            line.push_str(&Style::new().dimmed().paint(text).to_string());
        } else {
            line.push_str(&Green.paint(text).to_string());
        }
    }
    println!("{line}");
}

fn play(samples: Vec<f32>) -> Result<()> {
    let (_stream, handle) = OutputStream::try_default().context(AudioStreamSnafu)?;
    let sink = Sink::try_new(&handle).context(AudioPlaySnafu)?;
    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
    sink.sleep_until_end();
    Ok(())
}

fn demo_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("lead", InstrumentType::Apu2A03)
            .with_sequence(
                SequenceKind::Volume,
                Sequence::new(vec![15, 13, 12, 11, 10, 4, 2, 0]).with_release(4),
            )
            .with_sequence(SequenceKind::DutyCycle, Sequence::new(vec![2, 2, 1])),
        Instrument::new("bass", InstrumentType::Vrc6)
            .with_sequence(SequenceKind::Volume, Sequence::new(vec![15, 14, 12, 10]))
            .with_sequence(SequenceKind::DutyCycle, Sequence::new(vec![7])),
        Instrument::new("chime", InstrumentType::S5B)
            .with_sequence(
                SequenceKind::Arpeggio,
                Sequence::new(vec![0, 12, 0, 7])
                    .with_loop(0)
                    .with_arpeggio_mode(ArpeggioMode::Absolute),
            )
            .with_sequence(SequenceKind::Volume, Sequence::new(vec![12, 10, 8, 6])),
    ]
}
