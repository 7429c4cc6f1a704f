//! Bidirectional text preparation for PDF form field values
//!
//! Form field values are stored in logical order. Many viewers reorder
//! digit runs inside Hebrew text incorrectly, so numbers are pinned
//! left-to-right with explicit embedding controls and marks.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const LRM: char = '\u{200E}';
pub const RLM: char = '\u{200F}';
pub const LRE: char = '\u{202A}';
pub const PDF: char = '\u{202C}';

lazy_static! {
    /// Digit run with optional internal `.` / `,` separators, e.g. `1,234.56`
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+(?:[.,][0-9]+)*").unwrap();
}

/// Hebrew block plus Hebrew presentation forms
pub fn is_hebrew(c: char) -> bool {
    matches!(c, '\u{0590}'..='\u{05FF}' | '\u{FB1D}'..='\u{FB4F}')
}

pub fn contains_hebrew(text: &str) -> bool {
    text.chars().any(is_hebrew)
}

/// Invisible direction marks, embeddings, overrides and isolates
pub fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{061C}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
    )
}

pub fn strip_bidi_controls(text: &str) -> String {
    text.chars().filter(|c| !is_bidi_control(*c)).collect()
}

/// Prepare a raw cell value for a form field
///
/// Apply exactly once per value: a second pass would wrap digit runs again.
/// Text without Hebrew is only NFC-normalized.
pub fn normalize_field_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text: String = raw.nfc().collect();
    if !contains_hebrew(&text) {
        return text;
    }

    let mut out = String::with_capacity(text.len() + 16);
    out.push(RLM);

    let mut last = 0;
    for run in DIGIT_RUN.find_iter(&text) {
        out.push_str(&text[last..run.start()]);
        out.push(LRM);
        out.push(LRE);
        out.push_str(run.as_str());
        out.push(PDF);
        out.push(LRM);
        last = run.end();
    }
    out.push_str(&text[last..]);

    out
}

/// Longest prefix of a normalized value that fits in `max_chars` characters
///
/// Control characters count toward the limit. A wrapped digit run
/// (`LRM LRE digits PDF LRM`) is kept or dropped as a whole.
pub fn truncate_normalized(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut end = 0;
    while end < chars.len() {
        let unit = wrapped_run_len(&chars[end..]).unwrap_or(1);
        if end + unit > max_chars {
            break;
        }
        end += unit;
    }
    chars[..end].iter().collect()
}

fn wrapped_run_len(chars: &[char]) -> Option<usize> {
    if chars.len() < 2 || chars[0] != LRM || chars[1] != LRE {
        return None;
    }
    let close = chars.iter().position(|c| *c == PDF)?;
    (chars.get(close + 1) == Some(&LRM)).then_some(close + 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ltr,
    Rtl,
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        _ => c,
    }
}

/// Reorder a logical string for drawing left to right in an appearance stream
///
/// Single-paragraph reordering with a right-to-left base when Hebrew is present.
/// Neutrals join a left-to-right run only when both neighbours are LTR.
/// Controls are dropped.
pub fn visual_order(text: &str) -> String {
    let chars: Vec<char> = text.chars().filter(|c| !is_bidi_control(*c)).collect();
    if !chars.iter().copied().any(is_hebrew) {
        return chars.into_iter().collect();
    }

    let strong: Vec<Option<Direction>> = chars
        .iter()
        .map(|&c| {
            if is_hebrew(c) {
                Some(Direction::Rtl)
            } else if c.is_alphanumeric() {
                Some(Direction::Ltr)
            } else {
                None
            }
        })
        .collect();

    let mut resolved = Vec::with_capacity(chars.len());
    for i in 0..chars.len() {
        let dir = match strong[i] {
            Some(dir) => dir,
            None => {
                let before = strong[..i].iter().rev().find_map(|d| *d);
                let after = strong[i + 1..].iter().find_map(|d| *d);
                if before == Some(Direction::Ltr) && after == Some(Direction::Ltr) {
                    Direction::Ltr
                } else {
                    Direction::Rtl
                }
            }
        };
        resolved.push(dir);
    }

    let mut runs: Vec<(Direction, Vec<char>)> = Vec::new();
    for (c, dir) in chars.into_iter().zip(resolved) {
        match runs.last_mut() {
            Some((last, run)) if *last == dir => run.push(c),
            _ => runs.push((dir, vec![c])),
        }
    }

    let mut out = String::with_capacity(text.len());
    for (dir, run) in runs.into_iter().rev() {
        match dir {
            Direction::Ltr => out.extend(run),
            Direction::Rtl => out.extend(run.into_iter().rev().map(mirror)),
        }
    }
    out
}
