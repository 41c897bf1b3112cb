//! Metrics and encoding for the three standard Helvetica faces.
//!
//! The base-14 fonts need no embedding, so the PDF stays small and
//! deterministic. Text is encoded as WinAnsi (CP-1252); characters outside
//! it are replaced by `?`. Widths are the Adobe AFM advance widths in
//! 1/1000 em for printable ASCII; other WinAnsi glyphs use a close
//! per-glyph estimate.

/// A font face used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Oblique,
}

impl Face {
    /// Resource name in the page's font dictionary.
    pub fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
            Face::Oblique => "F3",
        }
    }

    /// PostScript name of the base-14 font.
    pub fn base_font(self) -> &'static str {
        match self {
            Face::Regular => "Helvetica",
            Face::Bold => "Helvetica-Bold",
            Face::Oblique => "Helvetica-Oblique",
        }
    }

    pub const ALL: [Face; 3] = [Face::Regular, Face::Bold, Face::Oblique];
}

// Code points 32..=126.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode `text` as WinAnsi bytes. Characters outside the encoding become
/// `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi(c).unwrap_or(b'?')).collect()
}

/// Number of characters in `text` that [`encode`] replaces with `?`.
pub fn unencodable(text: &str) -> usize {
    text.chars().filter(|&c| win_ansi(c).is_none()).count()
}

fn win_ansi(c: char) -> Option<u8> {
    let byte = match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Advance width of one encoded byte, in 1/1000 em.
fn glyph_width(face: Face, byte: u8) -> u16 {
    let table = match face {
        Face::Bold => &HELVETICA_BOLD,
        Face::Regular | Face::Oblique => &HELVETICA,
    };
    match byte {
        32..=126 => table[(byte - 32) as usize],
        0x85 | 0x89 | 0x97 => 1000,
        0x91 | 0x92 | 0x82 => 278,
        0x93 | 0x94 | 0x84 => 500,
        0x95 => 350,
        0x96 => 556,
        0x99 => 1000,
        0xA0 => 278,
        _ => 556,
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(face: Face, size: f32, text: &str) -> f32 {
    let units: u32 = encode(text)
        .into_iter()
        .map(|b| glyph_width(face, b) as u32)
        .sum();
    units as f32 * size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode("R&D (v2)"), b"R&D (v2)".to_vec());
    }

    #[test]
    fn typographic_characters_map_to_win_ansi() {
        assert_eq!(encode("• – “é”"), vec![0x95, b' ', 0x96, b' ', 0x93, 0xE9, 0x94]);
        assert_eq!(encode("日本"), b"??".to_vec());
    }

    #[test]
    fn unencodable_counts_substitutions() {
        assert_eq!(unencodable("Café – 100%"), 0);
        assert_eq!(unencodable("İstanbul şubesi"), 2);
        assert_eq!(unencodable("Привет"), 6);
        assert_eq!(unencodable("?"), 0);
    }

    #[test]
    fn widths_follow_afm_metrics() {
        assert_eq!(text_width(Face::Regular, 10.0, "i"), 2.22);
        assert_eq!(text_width(Face::Bold, 1000.0, "W"), 944.0);
        assert!(text_width(Face::Bold, 12.0, "slide") > text_width(Face::Regular, 12.0, "slide"));
    }
}
