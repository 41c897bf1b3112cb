//! Slide-content extraction: parsed presentation → [`SlideRecord`]s.
//!
//! ## Why runs only?
//!
//! Content lines are built from `a:r` runs. Fields (slide numbers, dates)
//! and soft breaks are layout furniture; including them would repeat the
//! slide number on every page of the summary. Titles are the exception:
//! the title shape's whole text is used, breaks folded into spaces.

use pptx_reader::{Presentation, Slide};
use serde::{Deserialize, Serialize};

/// Text content of one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based position in the presentation.
    pub slide_number: usize,
    pub title: String,
    /// One entry per non-empty paragraph of every non-title shape.
    pub content_lines: Vec<String>,
}

/// Extract one record per slide, in presentation order.
pub fn extract(presentation: &Presentation) -> Vec<SlideRecord> {
    presentation
        .slides
        .iter()
        .enumerate()
        .map(|(idx, slide)| extract_slide(slide, idx + 1))
        .collect()
}

fn extract_slide(slide: &Slide, slide_number: usize) -> SlideRecord {
    let title_index = slide.title_index();

    let title = title_index
        .map(|i| fold_lines(&slide.shapes[i].text()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Slide {slide_number}"));

    let content_lines = slide
        .shapes
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != title_index)
        .filter_map(|(_, shape)| shape.text_frame.as_ref())
        .flat_map(|frame| frame.paragraphs.iter())
        .map(|p| p.run_text().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    SlideRecord {
        slide_number,
        title,
        content_lines,
    }
}

/// Trim each line and join the non-empty ones with a space.
fn fold_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptx_reader::fixture::{PackageBuilder, SlideBuilder};

    fn parse(builder: PackageBuilder) -> Presentation {
        Presentation::from_bytes(&builder.build()).unwrap()
    }

    #[test]
    fn titles_and_lines_in_order() {
        let deck = parse(
            PackageBuilder::new()
                .slide(
                    SlideBuilder::new()
                        .title("  Roadmap  ")
                        .placeholder("body", &[&["Ship ", "v2"], &["   "], &["Hire"]])
                        .text_box(&[&["Footnote"]]),
                )
                .slide(SlideBuilder::new().centered_title("Closing")),
        );
        let slides = extract(&deck);
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].slide_number, 1);
        assert_eq!(slides[0].title, "Roadmap");
        assert_eq!(slides[0].content_lines, vec!["Ship v2", "Hire", "Footnote"]);
        assert_eq!(slides[1].title, "Closing");
        assert!(slides[1].content_lines.is_empty());
    }

    #[test]
    fn missing_or_blank_title_falls_back_to_slide_number() {
        let deck = parse(
            PackageBuilder::new()
                .slide(SlideBuilder::new().text_box(&[&["No title here"]]))
                .slide(SlideBuilder::new().title("   "))
                .slide(SlideBuilder::new().picture()),
        );
        let slides = extract(&deck);
        assert_eq!(slides[0].title, "Slide 1");
        assert_eq!(slides[0].content_lines, vec!["No title here"]);
        assert_eq!(slides[1].title, "Slide 2");
        assert_eq!(slides[2].title, "Slide 3");
        assert!(slides[2].content_lines.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let deck = parse(
            PackageBuilder::new()
                .slide(SlideBuilder::new().title("A").text_box(&[&["x"], &["y"]]))
                .slide(SlideBuilder::new().text_box(&[&["z"]])),
        );
        assert_eq!(extract(&deck), extract(&deck));
    }

    #[test]
    fn only_first_title_placeholder_is_the_title() {
        let deck = parse(
            PackageBuilder::new().slide(SlideBuilder::new().title("First").title("Second")),
        );
        let slides = extract(&deck);
        assert_eq!(slides[0].title, "First");
        assert_eq!(slides[0].content_lines, vec!["Second"]);
    }
}
