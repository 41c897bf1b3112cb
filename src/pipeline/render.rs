//! PDF synthesis: [`SlideRecord`]s → paginated Letter-size report.
//!
//! ## Why lay out text by hand?
//!
//! The report is a single column of styled paragraphs: a centred title,
//! two header lines, then one shaded heading and a bulleted list per slide.
//! Drawing that directly with content-stream operators keeps the output
//! byte-for-byte reproducible and means slide text is only ever a string
//! operand. It is never interpreted as markup, so `&`, `<` and `>` print as
//! typed.
//!
//! ## Determinism
//!
//! No compression, no document ID, fonts referenced by name. Given the same
//! slides, label and `generated_at`, the bytes are identical. The timestamp
//! appears twice, in the header line and in the Info `CreationDate`, and
//! both are fixed-width.

use crate::error::PipelineError;
use crate::keys;
use crate::pipeline::extract::SlideRecord;
use crate::pipeline::fonts::{self, Face};
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

// ── Page geometry (points) ──────────────────────────────────────────────

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const HEADER_GAP: f32 = 30.0;
const SLIDE_GAP: f32 = 15.0;

pub const EMPTY_SLIDE_TEXT: &str = "No text content on this slide";
const BULLET: &str = "• ";

// ── Styles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    face: Face,
    size: f32,
    leading: f32,
    color: [f32; 3],
    space_before: f32,
    space_after: f32,
    indent: f32,
    align: Align,
    band: Option<[f32; 3]>,
}

const fn rgb(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

const DOC_TITLE: Style = Style {
    face: Face::Bold,
    size: 24.0,
    leading: 29.0,
    color: rgb(0x1a, 0x36, 0x5d),
    space_before: 0.0,
    space_after: 30.0,
    indent: 0.0,
    align: Align::Center,
    band: None,
};

const NORMAL: Style = Style {
    face: Face::Regular,
    size: 10.0,
    leading: 12.0,
    color: [0.0, 0.0, 0.0],
    space_before: 0.0,
    space_after: 0.0,
    indent: 0.0,
    align: Align::Left,
    band: None,
};

const SLIDE_HEADING: Style = Style {
    face: Face::Bold,
    size: 16.0,
    leading: 20.0,
    color: rgb(0x2d, 0x37, 0x48),
    space_before: 20.0,
    space_after: 12.0,
    indent: 0.0,
    align: Align::Left,
    band: Some(rgb(0xf7, 0xfa, 0xfc)),
};

const CONTENT: Style = Style {
    face: Face::Regular,
    size: 11.0,
    leading: 14.0,
    color: rgb(0x4a, 0x55, 0x68),
    space_before: 6.0,
    space_after: 6.0,
    indent: 20.0,
    align: Align::Left,
    band: None,
};

const EMPTY_NOTE: Style = Style {
    face: Face::Oblique,
    ..CONTENT
};

// ── Entry point ─────────────────────────────────────────────────────────

/// Render the summary report for one deck.
///
/// `document_label` is the deck's file name or key; the report title is
/// derived from it with [`document_title`].
pub fn render(
    slides: &[SlideRecord],
    document_label: &str,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, PipelineError> {
    let title = document_title(document_label);
    let substituted = substitution_count(&title, slides);
    if substituted > 0 {
        warn!(
            "{} characters in {} have no WinAnsi glyph and render as '?'",
            substituted, document_label
        );
    }
    let mut layout = Layout::new();

    layout.paragraph(&DOC_TITLE, &title, false);
    layout.paragraph(
        &NORMAL,
        &format!("Generated on: {} UTC", generated_at.format("%Y-%m-%d %H:%M:%S")),
        false,
    );
    layout.paragraph(&NORMAL, &format!("Total Slides: {}", slides.len()), false);
    layout.space(HEADER_GAP);

    for slide in slides {
        layout.paragraph(
            &SLIDE_HEADING,
            &format!("Slide {}: {}", slide.slide_number, slide.title),
            false,
        );
        if slide.content_lines.is_empty() {
            layout.paragraph(&EMPTY_NOTE, EMPTY_SLIDE_TEXT, false);
        } else {
            for line in &slide.content_lines {
                layout.paragraph(&CONTENT, line, true);
            }
        }
        layout.space(SLIDE_GAP);
    }

    let pages = layout.finish();
    debug!("Laid out {} slides on {} pages", slides.len(), pages.len());
    write_document(pages, &title, generated_at)
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").expect("static regex"));

/// Report title for a document label: directory and extension stripped,
/// underscores turned into spaces, each word capitalised.
///
/// `pptxs/q3_sales_REVIEW.pptx` → `Q3 Sales Review`
/// Characters across the report text that the standard fonts cannot show.
pub fn substitution_count(title: &str, slides: &[SlideRecord]) -> usize {
    fonts::unencodable(title)
        + slides
            .iter()
            .map(|s| {
                fonts::unencodable(&s.title)
                    + s.content_lines.iter().map(|l| fonts::unencodable(l)).sum::<usize>()
            })
            .sum::<usize>()
}

pub fn document_title(label: &str) -> String {
    let spaced = keys::base_name(label).replace('_', " ");
    WORD.replace_all(&spaced, |caps: &regex::Captures<'_>| {
        let word = &caps[0];
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    })
    .into_owned()
}

// ── Layout ──────────────────────────────────────────────────────────────

struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    /// Top of the next line.
    y: f32,
    at_top: bool,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
            at_top: true,
        }
    }

    /// Vertical space; dropped at the top of a page.
    fn space(&mut self, points: f32) {
        if !self.at_top {
            self.y -= points;
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = PAGE_HEIGHT - MARGIN;
        self.at_top = true;
    }

    fn paragraph(&mut self, style: &Style, text: &str, bulleted: bool) {
        let bullet_width = if bulleted {
            fonts::text_width(style.face, style.size, BULLET)
        } else {
            0.0
        };
        let left = MARGIN + style.indent;
        let available = CONTENT_WIDTH - style.indent - bullet_width;
        let lines = wrap(text, style.face, style.size, available);

        self.space(style.space_before);
        for (i, line) in lines.iter().enumerate() {
            if self.y - style.leading < MARGIN {
                self.break_page();
            }
            let bottom = self.y - style.leading;
            if let Some(band) = style.band {
                self.fill_rect(band, MARGIN, bottom, CONTENT_WIDTH, style.leading);
            }
            let baseline = self.y - style.leading * 0.75;
            let x = match style.align {
                Align::Left => left + bullet_width,
                Align::Center => {
                    MARGIN + (CONTENT_WIDTH - fonts::text_width(style.face, style.size, line)) / 2.0
                }
            };
            if bulleted && i == 0 {
                self.show_text(style, left, baseline, BULLET);
            }
            self.show_text(style, x, baseline, line);
            self.y = bottom;
            self.at_top = false;
        }
        self.space(style.space_after);
    }

    fn fill_rect(&mut self, color: [f32; 3], x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("rg", color.iter().map(|&c| c.into()).collect()));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn show_text(&mut self, style: &Style, x: f32, y: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![style.face.resource().into(), style.size.into()],
        ));
        self.ops.push(Operation::new("rg", style.color.iter().map(|&c| c.into()).collect()));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(fonts::encode(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

/// Greedy word wrap. Words wider than a whole line are split by character.
fn wrap(text: &str, face: Face, size: f32, width: f32) -> Vec<String> {
    let fits = |s: &str| fonts::text_width(face, size, s) <= width;
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if fits(&candidate) {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if fits(word) {
            line = word.to_string();
            continue;
        }
        for c in word.chars() {
            line.push(c);
            if !fits(&line) && line.chars().count() > 1 {
                line.pop();
                lines.push(std::mem::replace(&mut line, c.to_string()));
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ── Document assembly ───────────────────────────────────────────────────

fn pdf_failed(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::RenderFailed {
        what: "PDF",
        detail: e.to_string(),
    }
}

fn write_document(
    pages: Vec<Vec<Operation>>,
    title: &str,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, PipelineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts_dict = Dictionary::new();
    for face in Face::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts_dict.set(face.resource(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts_dict });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode().map_err(pdf_failed)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH as i64),
                Object::Integer(PAGE_HEIGHT as i64),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(fonts::encode(title)),
        "Producer" => Object::string_literal("slidepress"),
        "CreationDate" => Object::string_literal(generated_at.format("D:%Y%m%d%H%M%SZ").to_string()),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_failed)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slide(n: usize, title: &str, lines: &[&str]) -> SlideRecord {
        SlideRecord {
            slide_number: n,
            title: title.to_string(),
            content_lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn replace_same_len(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
        assert_eq!(from.len(), to.len());
        let mut out = haystack.to_vec();
        let mut i = 0;
        while i + from.len() <= out.len() {
            if &out[i..i + from.len()] == from {
                out[i..i + from.len()].copy_from_slice(to);
                i += from.len();
            } else {
                i += 1;
            }
        }
        out
    }

    #[test]
    fn title_is_derived_from_label() {
        assert_eq!(document_title("pptxs/q3_sales_REVIEW.pptx"), "Q3 Sales Review");
        assert_eq!(document_title("deck.PPTX"), "Deck");
        assert_eq!(document_title("team/roadmap 2025.pptx"), "Roadmap 2025");
    }

    #[test]
    fn output_is_a_pdf_with_header_lines() {
        let bytes = render(&[slide(1, "Intro", &["Hello"])], "intro.pptx", at(2024, 1, 2, 3, 4, 5)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(count(&bytes, b"(Generated on: 2024-01-02 03:04:05 UTC)"), 1);
        assert_eq!(count(&bytes, b"(Total Slides: 1)"), 1);
        assert_eq!(count(&bytes, b"(Slide 1: Intro)"), 1);
        assert_eq!(count(&bytes, b"(Hello)"), 1);
        assert_eq!(count(&bytes, b"(D:20240102030405Z)"), 1);
    }

    #[test]
    fn empty_placeholder_appears_once_per_empty_slide() {
        let slides = vec![
            slide(1, "One", &[]),
            slide(2, "Two", &["content"]),
            slide(3, "Three", &[]),
        ];
        let bytes = render(&slides, "d.pptx", at(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(count(&bytes, b"(No text content on this slide)"), 2);
    }

    #[test]
    fn markup_characters_print_literally() {
        let bytes = render(&[slide(1, "R&D", &["R&D <beta> & more"])], "d.pptx", at(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(count(&bytes, b"(R&D <beta> & more)"), 1);
        assert_eq!(count(&bytes, b"&amp;"), 0);
    }

    #[test]
    fn identical_input_renders_identically_modulo_timestamp() {
        let slides = vec![slide(1, "A", &["x", "y"]), slide(2, "Slide 2", &[])];
        let t1 = at(2024, 1, 1, 10, 0, 0);
        let t2 = at(2025, 2, 3, 4, 5, 6);

        let a = render(&slides, "deck.pptx", t1).unwrap();
        assert_eq!(a, render(&slides, "deck.pptx", t1).unwrap());

        let b = render(&slides, "deck.pptx", t2).unwrap();
        let a = replace_same_len(&a, b"2024-01-01 10:00:00", b"2025-02-03 04:05:06");
        let a = replace_same_len(&a, b"D:20240101100000Z", b"D:20250203040506Z");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_deck_is_header_only() {
        let bytes = render(&[], "empty.pptx", at(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(count(&bytes, b"(Total Slides: 0)"), 1);
        assert_eq!(count(&bytes, b"(Slide "), 0);
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn characters_outside_win_ansi_are_counted_and_replaced() {
        let slides = vec![slide(1, "Özet", &["Şube raporu", "Итоги"])];
        assert_eq!(substitution_count("Rapor", &slides), 1 + 5);
        assert_eq!(substitution_count("Plain", &[slide(1, "Ünïcode ok", &["café"])]), 0);

        let bytes = render(&slides, "rapor.pptx", at(2024, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(count(&bytes, b"(?ube raporu)"), 1);
        assert_eq!(count(&bytes, b"(?????)"), 1);
    }

    #[test]
    fn long_decks_paginate() {
        let lines: Vec<String> = (0..6).map(|i| format!("Point number {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let slides: Vec<_> = (1..=30).map(|n| slide(n, "Topic", &refs)).collect();
        let bytes = render(&slides, "long.pptx", at(2024, 1, 1, 0, 0, 0)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 5, "pages: {}", doc.get_pages().len());
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap(&text, Face::Regular, 11.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(fonts::text_width(Face::Regular, 11.0, line) <= 200.0, "{line}");
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn overlong_word_is_split() {
        let word = "x".repeat(200);
        let lines = wrap(&word, Face::Regular, 11.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }
}
