use crate::instrument::{
    handler::{ArpeggioStep, InstHandler, SeqInstHandler},
    instrument::{ArpeggioMode, Instrument, InstrumentType, Sequence, SequenceKind},
};

fn handler_for(instrument: &Instrument) -> SeqInstHandler {
    let mut handler = SeqInstHandler::new(instrument.kind, 0x0F, 0);
    handler.load(instrument);
    handler.trigger();
    handler
}

fn volumes(handler: &mut SeqInstHandler, ticks: usize) -> Vec<Option<u8>> {
    (0..ticks).map(|_| handler.update().volume).collect()
}

#[test]
fn sequence_plays_once_then_stops() {
    let inst = Instrument::new("pluck", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Volume, Sequence::new(vec![15, 10, 5]));
    let mut handler = handler_for(&inst);

    assert_eq!(
        volumes(&mut handler, 5),
        vec![Some(15), Some(10), Some(5), None, None]
    );
}

#[test]
fn sequence_loops_from_loop_point() {
    let inst = Instrument::new("trill", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Volume, Sequence::new(vec![9, 8, 7]).with_loop(1));
    let mut handler = handler_for(&inst);

    assert_eq!(
        volumes(&mut handler, 6),
        vec![Some(9), Some(8), Some(7), Some(8), Some(7), Some(8)]
    );
}

#[test]
fn sequence_holds_at_release_point_until_released() {
    let inst = Instrument::new("pad", InstrumentType::Apu2A03).with_sequence(
        SequenceKind::Volume,
        Sequence::new(vec![12, 10, 6, 2]).with_release(1),
    );
    let mut handler = handler_for(&inst);

    assert_eq!(
        volumes(&mut handler, 4),
        vec![Some(12), Some(10), Some(10), Some(10)]
    );

    handler.release();
    assert_eq!(volumes(&mut handler, 3), vec![Some(6), Some(2), None]);
}

#[test]
fn loop_before_release_stops_after_release() {
    let inst = Instrument::new("organ", InstrumentType::Apu2A03).with_sequence(
        SequenceKind::Volume,
        Sequence::new(vec![8, 7, 6, 3]).with_loop(0).with_release(2),
    );
    let mut handler = handler_for(&inst);

    // Holds on the release point, loop never reached while held.
    assert_eq!(volumes(&mut handler, 4), vec![Some(8), Some(7), Some(6), Some(6)]);

    handler.release();
    assert_eq!(volumes(&mut handler, 2), vec![Some(3), None]);
}

#[test]
fn trigger_restarts_sequences() {
    let inst = Instrument::new("pluck", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Volume, Sequence::new(vec![4, 2]));
    let mut handler = handler_for(&inst);
    volumes(&mut handler, 3);

    handler.trigger();

    assert_eq!(handler.update().volume, Some(4));
}

#[test]
fn volume_is_clamped_to_channel_maximum() {
    let inst = Instrument::new("loud", InstrumentType::N163)
        .with_sequence(SequenceKind::Volume, Sequence::new(vec![15, -3]));
    let mut handler = SeqInstHandler::new(InstrumentType::N163, 0x0F, 0);
    handler.load(&inst);
    handler.trigger();

    assert_eq!(handler.max_volume(), 0x0F);
    assert_eq!(handler.update().volume, Some(15));
    assert_eq!(handler.update().volume, Some(0));

    let mut quiet = SeqInstHandler::new(InstrumentType::N163, 0x07, 0);
    quiet.load(&inst);
    quiet.trigger();
    assert_eq!(quiet.update().volume, Some(7));
}

#[test]
fn duty_offset_is_added_to_duty_values() {
    let inst = Instrument::new("tone", InstrumentType::S5B)
        .with_sequence(SequenceKind::DutyCycle, Sequence::new(vec![0, 1]));
    let mut handler = SeqInstHandler::new(InstrumentType::S5B, 0x0F, 0x40);
    handler.load(&inst);
    handler.trigger();

    assert_eq!(handler.duty_offset(), 0x40);
    assert_eq!(handler.update().duty, Some(0x40));
    assert_eq!(handler.update().duty, Some(0x41));
}

#[test]
fn pitch_sequences_accumulate() {
    let inst = Instrument::new("bend", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Pitch, Sequence::new(vec![2, -1]))
        .with_sequence(SequenceKind::HiPitch, Sequence::new(vec![1]));
    let mut handler = handler_for(&inst);

    assert_eq!(handler.update().pitch, 2 + 16);
    assert_eq!(handler.update().pitch, 2 + 16 - 1);
    assert_eq!(handler.update().pitch, 17);

    handler.trigger();
    assert_eq!(handler.update().pitch, 18);
}

#[test]
fn held_hi_pitch_bends_back_right_after_release() {
    // Holds +127 until released, then loops -127.
    let inst = Instrument::new("dive", InstrumentType::Apu2A03).with_sequence(
        SequenceKind::HiPitch,
        Sequence::new(vec![127, -127]).with_loop(1).with_release(0),
    );
    let mut handler = handler_for(&inst);

    for _ in 0..100_000 {
        handler.update();
    }
    assert_eq!(handler.update().pitch, 0x7FF);

    handler.release();
    assert_eq!(handler.update().pitch, 0x7FF - 127 * 16);
    assert_eq!(handler.update().pitch, 0x7FF - 2 * 127 * 16);
    assert_eq!(handler.update().pitch, -0x7FF);
    assert_eq!(handler.update().pitch, -0x7FF);
}

#[test]
fn arpeggio_modes() {
    let absolute = Instrument::new("arp", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Arpeggio, Sequence::new(vec![0, 4]));
    let mut handler = handler_for(&absolute);
    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Offset(0)));
    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Offset(4)));
    assert_eq!(handler.update().arpeggio, None);

    let relative = Instrument::new("climb", InstrumentType::Apu2A03).with_sequence(
        SequenceKind::Arpeggio,
        Sequence::new(vec![1]).with_arpeggio_mode(ArpeggioMode::Relative),
    );
    let mut handler = handler_for(&relative);
    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Relative(1)));
}

#[test]
fn fixed_arpeggio_restores_base_note_when_done() {
    let inst = Instrument::new("drum", InstrumentType::Apu2A03).with_sequence(
        SequenceKind::Arpeggio,
        Sequence::new(vec![60, 36]).with_arpeggio_mode(ArpeggioMode::Fixed),
    );
    let mut handler = handler_for(&inst);

    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Fixed(60)));
    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Fixed(36)));
    assert_eq!(handler.update().arpeggio, Some(ArpeggioStep::Restore));
    assert_eq!(handler.update().arpeggio, None);
}

#[test]
fn untriggered_handler_is_silent() {
    let inst = Instrument::new("pluck", InstrumentType::Apu2A03)
        .with_sequence(SequenceKind::Volume, Sequence::new(vec![15]));
    let mut handler = SeqInstHandler::new(InstrumentType::Apu2A03, 0x0F, 0);
    handler.load(&inst);

    let out = handler.update();

    assert_eq!(out.volume, None);
    assert_eq!(out.duty, None);
}

#[test]
fn instrument_deserializes_from_toml() {
    let inst: Instrument = toml::from_str(
        r#"
        name = "lead"
        kind = "vrc6"
        volume = { items = [15, 12, 8], release_point = 1 }
        arpeggio = { items = [0, 12], arpeggio_mode = "fixed" }
        "#,
    )
    .expect("valid instrument");

    assert_eq!(inst.kind, InstrumentType::Vrc6);
    assert_eq!(inst.volume.as_ref().and_then(|seq| seq.release_point), Some(1));
    assert_eq!(
        inst.arpeggio.as_ref().map(|seq| seq.arpeggio_mode),
        Some(ArpeggioMode::Fixed)
    );
    assert!(inst.duty.is_none());
}
