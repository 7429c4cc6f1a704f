//! PDF string encodings used by form values and appearance streams

use lopdf::{Object, StringFormat};

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding treated as Latin-1)
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a value as a PDF text string: literal for printable ASCII, UTF-16BE otherwise
pub fn encode_text_string(text: &str) -> Object {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Encode to WinAnsi (Windows-1252); `None` if any character has no code
pub fn to_winansi_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| match c as u32 {
            0x0020..=0x007E => Some(c as u8),
            0x00A0..=0x00FF => Some(c as u8),
            0x20AC => Some(0x80),
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85),
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95),
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        })
        .collect()
}

/// Approximate Helvetica advance widths at 1000 units/em for a WinAnsi byte
pub fn helvetica_width(byte: u8) -> f64 {
    match byte {
        32 => 278.0,
        33..=47 => 333.0,
        48..=57 => 556.0,
        58..=64 => 333.0,
        73 | 74 => 278.0,
        77 => 833.0,
        65..=90 => 667.0,
        91..=96 => 333.0,
        102 | 105 | 106 | 108 | 116 => 278.0,
        109 | 119 => 833.0,
        97..=122 => 556.0,
        _ => 556.0,
    }
}
