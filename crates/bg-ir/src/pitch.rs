//! Note-name pitch resolution.
//!
//! Maps names like `C4`, `F#3`, or `Bb2` to frequencies in equal
//! temperament with A4 = 440 Hz. Names that do not parse resolve to
//! `None`; callers skip the voice rather than guessing a pitch.

/// Semitone offsets within an octave for the letters A through G.
const LETTER_SEMITONES: [i32; 7] = [9, 11, 0, 2, 4, 5, 7];

/// Parse a note name into a MIDI note number.
///
/// Accepts a letter `A`-`G` (either case), an optional `#` or `b`
/// accidental, and an octave digit. `C4` is MIDI 60.
pub fn parse_note(name: &str) -> Option<i32> {
    let mut chars = name.chars();

    let letter = chars.next()?.to_ascii_uppercase();
    if !letter.is_ascii_uppercase() || letter > 'G' {
        return None;
    }
    let mut semitone = LETTER_SEMITONES[(letter as u8 - b'A') as usize];

    let mut next = chars.next()?;
    match next {
        '#' => {
            semitone += 1;
            next = chars.next()?;
        }
        'b' => {
            semitone -= 1;
            next = chars.next()?;
        }
        _ => {}
    }

    let octave = next.to_digit(10)? as i32;
    if chars.next().is_some() {
        return None;
    }

    Some((octave + 1) * 12 + semitone)
}

/// Frequency of a MIDI note number in Hz.
pub fn midi_freq(midi: i32) -> f32 {
    440.0 * ((midi - 69) as f32 / 12.0).exp2()
}

/// Frequency of a note name in Hz, or `None` if it does not parse.
pub fn note_freq(name: &str) -> Option<f32> {
    parse_note(name).map(midi_freq)
}
