//! # pptx-reader
//!
//! Read the text model of a PowerPoint `.pptx` package: slides in
//! presentation order, the top-level shapes on each slide, and for every
//! shape that owns a text frame its paragraphs and runs.
//!
//! Only text is modelled. Pictures, tables, charts and media are reported as
//! shapes of the corresponding [`ShapeKind`] but carry no content.
//!
//! ## How it works
//!
//! 1. Opens the zip container from an in-memory buffer.
//! 2. Reads `ppt/presentation.xml` for the ordered slide-id list.
//! 3. Resolves each slide's relationship id through
//!    `ppt/_rels/presentation.xml.rels` to its part name.
//! 4. Parses each slide part's `p:spTree` into [`Shape`]s.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pptx_reader::Presentation;
//!
//! let bytes = std::fs::read("deck.pptx").unwrap();
//! let deck = Presentation::from_bytes(&bytes).unwrap();
//! for (idx, slide) in deck.slides.iter().enumerate() {
//!     let title = slide.title_shape().map(|s| s.text()).unwrap_or_default();
//!     println!("{}: {}", idx + 1, title);
//! }
//! ```

mod package;
mod slide;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned while reading a presentation package.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The bytes are not a readable zip archive.
    #[error("not a presentation package: {0}")]
    NotAPackage(String),

    /// A part the package cannot be read without is absent.
    #[error("package is missing required part '{0}'")]
    MissingPart(String),

    /// A slide listed in `presentation.xml` has no relationship target.
    #[error("slide relationship '{0}' has no target in presentation.xml.rels")]
    DanglingRelationship(String),

    /// An XML part could not be parsed.
    #[error("malformed XML in '{part}': {detail}")]
    Xml { part: String, detail: String },

    /// Reading a part out of the archive failed.
    #[error("failed to read part '{part}': {source}")]
    Io {
        part: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Model ────────────────────────────────────────────────────────────────────

/// A parsed presentation: slides in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Parse a `.pptx` package held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut pkg = package::Package::open(bytes)?;
        let part_names = pkg.slide_part_names()?;

        let mut slides = Vec::with_capacity(part_names.len());
        for part in &part_names {
            let xml = pkg.read_part(part)?;
            let shapes = slide::parse_shapes(part, &xml)?;
            slides.push(Slide { shapes });
        }

        Ok(Self { slides })
    }
}

/// One slide: its top-level shapes in z-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Index of the slide's title shape, if any.
    ///
    /// The title shape is the first placeholder whose `idx` is 0. An omitted
    /// `idx` counts as 0, so a bare `<p:ph/>` qualifies, while a `title`
    /// placeholder given a non-zero `idx` does not.
    pub fn title_index(&self) -> Option<usize> {
        self.shapes
            .iter()
            .position(|s| s.placeholder.is_some() && s.placeholder_idx.unwrap_or(0) == 0)
    }

    /// The slide's title shape, if any.
    pub fn title_shape(&self) -> Option<&Shape> {
        self.title_index().map(|i| &self.shapes[i])
    }
}

/// Broad category of a shape element in `p:spTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp`: auto shape, text box or placeholder.
    AutoShape,
    /// `p:grpSp`: group of shapes (children are not flattened).
    Group,
    /// `p:graphicFrame`: table, chart, diagram or OLE object.
    GraphicFrame,
    /// `p:cxnSp`: connector line.
    Connector,
    /// `p:pic`: picture or media.
    Picture,
    /// Anything else found directly under `p:spTree`.
    Other,
}

/// Placeholder role declared in `p:nvPr/p:ph@type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Title,
    CenteredTitle,
    Subtitle,
    Body,
    /// `type` omitted: generic content placeholder.
    Object,
    Other,
}

impl PlaceholderKind {
    pub(crate) fn from_type_attr(value: &str) -> Self {
        match value {
            "title" => PlaceholderKind::Title,
            "ctrTitle" => PlaceholderKind::CenteredTitle,
            "subTitle" => PlaceholderKind::Subtitle,
            "body" => PlaceholderKind::Body,
            "obj" => PlaceholderKind::Object,
            _ => PlaceholderKind::Other,
        }
    }

    /// `true` for the two placeholder types that hold a slide title.
    pub fn is_title(self) -> bool {
        matches!(self, PlaceholderKind::Title | PlaceholderKind::CenteredTitle)
    }
}

/// A top-level shape on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub id: Option<u32>,
    pub name: String,
    pub kind: ShapeKind,
    pub placeholder: Option<PlaceholderKind>,
    /// `p:ph@idx` as written; `None` when the attribute is omitted.
    pub placeholder_idx: Option<u32>,
    /// Present only for auto shapes that carry `p:txBody`.
    pub text_frame: Option<TextFrame>,
}

impl Shape {
    pub(crate) fn new(kind: ShapeKind) -> Self {
        Self {
            id: None,
            name: String::new(),
            kind,
            placeholder: None,
            placeholder_idx: None,
            text_frame: None,
        }
    }

    /// Full text of the shape: paragraphs joined by `\n`. Empty without a
    /// text frame.
    pub fn text(&self) -> String {
        self.text_frame
            .as_ref()
            .map(TextFrame::text)
            .unwrap_or_default()
    }
}

/// The `p:txBody` of a shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Inline content of an `a:p` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextElement {
    /// `a:r`: a run of text.
    Run(String),
    /// `a:fld`: a field such as a slide number or date, with its cached text.
    Field(String),
    /// `a:br`: a soft line break.
    LineBreak,
}

/// One paragraph of a text frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub elements: Vec<TextElement>,
}

impl Paragraph {
    /// Text of the `a:r` runs only, in order.
    pub fn runs(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            TextElement::Run(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Concatenation of the paragraph's runs.
    pub fn run_text(&self) -> String {
        self.runs().collect()
    }

    /// Everything visible in the paragraph: runs, fields, and line breaks
    /// rendered as `\n`.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .map(|e| match e {
                TextElement::Run(t) | TextElement::Field(t) => t.as_str(),
                TextElement::LineBreak => "\n",
            })
            .collect()
    }
}
