// Copyright (c) 2026 rezky_nightky

use std::char;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Charset(u32);

impl Charset {
    pub const LETTERS: Charset = Charset(0x1);
    pub const DIGITS: Charset = Charset(0x2);
    pub const PUNCTUATION: Charset = Charset(0x4);
    pub const KATAKANA: Charset = Charset(0x8);
    pub const GREEK: Charset = Charset(0x10);
    pub const CYRILLIC: Charset = Charset(0x20);
    pub const BINARY: Charset = Charset(0x100);
    pub const HEX: Charset = Charset(0x200);
    pub const RUNIC: Charset = Charset(0x1000);
    pub const SYMBOLS: Charset = Charset(0x2000);
    pub const BLOCKS: Charset = Charset(0x8000);
    pub const DNA: Charset = Charset(0x40000);

    pub const ASCII: Charset = Charset(0x7);
    pub const MATRIX: Charset = Charset(0xB);

    pub fn contains(self, other: Charset) -> bool {
        (self.0 & other.0) != 0
    }

    const fn with(self, other: Charset) -> Charset {
        Charset(self.0 | other.0)
    }
}

pub const CHARSET_NAMES: &[(&str, &str)] = &[
    ("matrix", "Letters + digits + katakana"),
    ("ascii", "Letters + digits + punctuation"),
    ("letters", "Latin letters only"),
    ("digits", "Digits only"),
    ("binary", "0 and 1"),
    ("hex", "0-9 and A-F"),
    ("katakana", "Half-width katakana"),
    ("greek", "Greek"),
    ("cyrillic", "Cyrillic"),
    ("runic", "Runic"),
    ("symbols", "Math/technical symbols"),
    ("blocks", "Block elements"),
    ("dna", "DNA bases (ACGT)"),
    ("cyberpunk", "Katakana + hex + symbols"),
];

pub fn charset_from_str(spec: &str) -> Result<Charset, String> {
    match spec.trim().to_ascii_lowercase().as_str() {
        "matrix" | "auto" => Ok(Charset::MATRIX),
        "ascii" => Ok(Charset::ASCII),
        "letters" | "english" => Ok(Charset::LETTERS),
        "digits" | "dec" | "decimal" => Ok(Charset::DIGITS),
        "bin" | "binary" | "01" => Ok(Charset::BINARY),
        "hex" | "hexadecimal" => Ok(Charset::HEX),
        "katakana" => Ok(Charset::KATAKANA),
        "greek" => Ok(Charset::GREEK),
        "cyrillic" => Ok(Charset::CYRILLIC),
        "runic" => Ok(Charset::RUNIC),
        "symbols" => Ok(Charset::SYMBOLS),
        "blocks" => Ok(Charset::BLOCKS),
        "dna" => Ok(Charset::DNA),
        "cyberpunk" => Ok(Charset::KATAKANA.with(Charset::HEX).with(Charset::SYMBOLS)),
        other => Err(format!("unsupported charset: {} (see --list-charsets)", other)),
    }
}

fn push_range(out: &mut Vec<char>, start: u32, end: u32) {
    out.extend((start..=end).filter_map(char::from_u32));
}

pub fn build_chars(charset: Charset) -> Vec<char> {
    let mut out: Vec<char> = Vec::new();

    if charset.contains(Charset::BINARY) {
        push_range(&mut out, 0x30, 0x31);
    }
    if charset.contains(Charset::HEX) {
        push_range(&mut out, 0x30, 0x39);
        push_range(&mut out, 0x41, 0x46);
    }
    if charset.contains(Charset::LETTERS) {
        push_range(&mut out, 0x41, 0x5A);
        push_range(&mut out, 0x61, 0x7A);
    }
    if charset.contains(Charset::DIGITS) {
        push_range(&mut out, 0x30, 0x39);
    }
    if charset.contains(Charset::PUNCTUATION) {
        push_range(&mut out, 0x21, 0x2F);
        push_range(&mut out, 0x3A, 0x40);
    }
    if charset.contains(Charset::KATAKANA) {
        push_range(&mut out, 0xFF66, 0xFF9D);
    }
    if charset.contains(Charset::GREEK) {
        push_range(&mut out, 0x0391, 0x03A9);
    }
    if charset.contains(Charset::CYRILLIC) {
        push_range(&mut out, 0x0410, 0x044F);
    }
    if charset.contains(Charset::RUNIC) {
        push_range(&mut out, 0x16A0, 0x16EA);
    }
    if charset.contains(Charset::SYMBOLS) {
        out.extend("∞∑∫√π∆Ωµλ≈≠≤≥×÷±∂∇∈∩∪⊕⊗".chars());
    }
    if charset.contains(Charset::BLOCKS) {
        push_range(&mut out, 0x2580, 0x259F);
    }
    if charset.contains(Charset::DNA) {
        out.extend("ACGT".chars());
    }

    if out.is_empty() {
        out = fallback();
    }
    out
}

/// Glyph alphabet from bundle text: every printable, non-space character.
pub fn from_text(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect()
}

pub fn fallback() -> Vec<char> {
    vec!['0', '1']
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_has_only_0_and_1() {
        assert_eq!(build_chars(Charset::BINARY), vec!['0', '1']);
    }

    #[test]
    fn unknown_charset_is_reported() {
        assert!(charset_from_str("klingon").is_err());
        assert_eq!(charset_from_str(" Matrix "), Ok(Charset::MATRIX));
    }

    #[test]
    fn from_text_drops_whitespace_and_controls() {
        assert_eq!(from_text("a b\n\tc"), vec!['a', 'b', 'c']);
    }

    #[test]
    fn every_listed_name_resolves() {
        for (name, _) in CHARSET_NAMES {
            assert!(!build_chars(charset_from_str(name).unwrap()).is_empty(), "{name}");
        }
    }
}
