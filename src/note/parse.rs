//! Row text codec.
//!
//! One line per row, one cell per channel, cells separated by `|`:
//!
//! ```text
//! # note ins vol effects...
//! C#4 01 F E01 V02 | ... .. . ...
//! --- .. . ...     | === .. . A04
//! ```
//!
//! `...` is an empty note, `---` a note cut, `===` a release. `..`, `.` and `...` leave the
//! instrument, volume and effect columns empty. Effects are a letter plus two hex digits. A `#`
//! at the start of a line or after whitespace begins a comment; inside a note name it is the
//! sharp sign. Blank lines are skipped.

use std::fmt;

use snafu::ensure;

use crate::error::{ParseRowSnafu, Result};
use crate::note::note::{
    ChanNote, Effect, EffectCommand, MAX_EFFECT_COLUMNS, MAX_OCTAVE, Note, PitchClass,
};

/// Parse a whole pattern: every non-empty row must have exactly `channels` cells.
pub fn parse_rows(text: &str, channels: usize) -> Result<Vec<Vec<ChanNote>>> {
    let mut rows = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        let content = strip_comment(raw);
        if content.trim().is_empty() {
            continue;
        }
        let cells = content
            .split('|')
            .enumerate()
            .map(|(column, cell)| parse_cell(cell, line, column + 1))
            .collect::<Result<Vec<_>>>()?;
        ensure!(
            cells.len() == channels,
            ParseRowSnafu {
                line,
                column: cells.len(),
                reason: format!("expected {} cells, found {}", channels, cells.len()),
            }
        );
        rows.push(cells);
    }
    Ok(rows)
}

/// Text before the first `#` that starts the line or follows whitespace.
fn strip_comment(raw: &str) -> &str {
    let mut previous = None;
    for (index, c) in raw.char_indices() {
        if c == '#' && previous.is_none_or(char::is_whitespace) {
            return &raw[..index];
        }
        previous = Some(c);
    }
    raw
}

/// Parse one cell. `line` and `column` only feed error messages.
pub fn parse_cell(cell: &str, line: usize, column: usize) -> Result<ChanNote> {
    let fail = |reason: String| ParseRowSnafu {
        line,
        column,
        reason,
    };

    let mut fields = cell.split_whitespace();
    let mut out = ChanNote::default();

    let Some(note) = fields.next() else {
        return fail("empty cell".to_string()).fail();
    };
    let (note, octave) = parse_note(note).ok_or_else(|| fail(format!("bad note `{note}`")).build())?;
    out.note = note;
    out.octave = octave;

    if let Some(field) = fields.next() {
        out.instrument = if field == ".." {
            None
        } else {
            Some(parse_hex(field, 2).ok_or_else(|| fail(format!("bad instrument `{field}`")).build())?)
        };
    }

    if let Some(field) = fields.next() {
        out.volume = if field == "." {
            None
        } else {
            let volume = parse_hex(field, 1)
                .ok_or_else(|| fail(format!("bad volume `{field}`")).build())?;
            Some(volume)
        };
    }

    let mut column_index = 0;
    for field in fields {
        ensure!(
            column_index < MAX_EFFECT_COLUMNS,
            ParseRowSnafu {
                line,
                column,
                reason: format!("more than {MAX_EFFECT_COLUMNS} effect columns"),
            }
        );
        if field != "..." {
            let command =
                parse_effect(field).ok_or_else(|| fail(format!("bad effect `{field}`")).build())?;
            out.effects[column_index] = Some(command);
        }
        column_index += 1;
    }

    Ok(out)
}

fn parse_note(field: &str) -> Option<(Note, u8)> {
    match field {
        "..." => return Some((Note::None, 0)),
        "---" => return Some((Note::Halt, 0)),
        "===" => return Some((Note::Release, 0)),
        _ => {}
    }
    if field.len() != 3 || !field.is_ascii() {
        return None;
    }
    let name = &field[..2];
    let pitch = PitchClass::ALL
        .iter()
        .copied()
        .find(|pitch| pitch.name().eq_ignore_ascii_case(name))?;
    let octave = field[2..].parse::<u8>().ok()?;
    (octave <= MAX_OCTAVE).then_some((Note::Pitch(pitch), octave))
}

fn parse_effect(field: &str) -> Option<EffectCommand> {
    let mut chars = field.chars();
    let effect = Effect::from_letter(chars.next()?)?;
    let param = parse_hex(chars.as_str(), 2)?;
    Some(EffectCommand::new(effect, param))
}

fn parse_hex(field: &str, digits: usize) -> Option<u8> {
    if field.len() != digits || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(field, 16).ok()
}

impl fmt::Display for ChanNote {
    /// Writes the cell in the same format [`parse_cell`] reads, with every effect column filled.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.note {
            Note::None => write!(f, "...")?,
            Note::Halt => write!(f, "---")?,
            Note::Release => write!(f, "===")?,
            Note::Pitch(pitch) => write!(f, "{}{}", pitch.name(), self.octave)?,
        }
        match self.instrument {
            Some(instrument) => write!(f, " {instrument:02X}")?,
            None => write!(f, " ..")?,
        }
        match self.volume {
            Some(volume) => write!(f, " {volume:X}")?,
            None => write!(f, " .")?,
        }
        for command in &self.effects {
            match command {
                Some(command) => write!(f, " {command}")?,
                None => write!(f, " ...")?,
            }
        }
        Ok(())
    }
}
