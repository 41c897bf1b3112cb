//! In-memory `.pptx` builder for tests.
//!
//! Produces the minimum set of parts [`crate::Presentation::from_bytes`]
//! reads: `ppt/presentation.xml`, its relationships, and one part per slide.
//! Available to other crates through the `fixtures` feature.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

/// Builds a whole package.
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    slides: Vec<SlideBuilder>,
    reverse_part_names: bool,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: SlideBuilder) -> Self {
        self.slides.push(slide);
        self
    }

    /// Store slide N (1-based, presentation order) as part
    /// `slide{count + 1 - N}.xml` so part names disagree with slide order.
    pub fn reverse_part_names(mut self, v: bool) -> Self {
        self.reverse_part_names = v;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.slides.len();
        let mut ids = String::new();
        let mut rels = String::new();
        let mut parts = Vec::with_capacity(count + 2);

        for (i, slide) in self.slides.iter().enumerate() {
            let file_no = if self.reverse_part_names { count - i } else { i + 1 };
            let rid = format!("rId{}", i + 10);
            ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{rid}"/>"#, 256 + i));
            rels.push_str(&format!(
                r#"<Relationship Id="{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{file_no}.xml"/>"#
            ));
            parts.push((format!("ppt/slides/slide{file_no}.xml"), slide.to_xml()));
        }

        parts.push((
            "ppt/presentation.xml".to_string(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
        ));
        parts.push((
            "ppt/_rels/presentation.xml.rels".to_string(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#),
        ));

        let borrowed: Vec<(&str, &str)> = parts
            .iter()
            .map(|(n, x)| (n.as_str(), x.as_str()))
            .collect();
        zip_with(&borrowed)
    }
}

/// Builds one slide's `p:spTree`.
#[derive(Debug, Clone, Default)]
pub struct SlideBuilder {
    shapes: Vec<String>,
}

impl SlideBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `title` placeholder holding one paragraph with one run.
    pub fn title(self, text: &str) -> Self {
        self.placeholder("title", &[&[text]])
    }

    /// A `ctrTitle` placeholder.
    pub fn centered_title(self, text: &str) -> Self {
        self.placeholder("ctrTitle", &[&[text]])
    }

    /// A placeholder of the given `type` with paragraphs of runs.
    ///
    /// Title types omit `idx` (index 0); every other type gets a non-zero
    /// `idx`, as PowerPoint writes them.
    pub fn placeholder(mut self, ph_type: &str, paragraphs: &[&[&str]]) -> Self {
        let id = self.next_id();
        let idx = match ph_type {
            "title" | "ctrTitle" => String::new(),
            _ => format!(r#" idx="{id}""#),
        };
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Placeholder {id}"/><p:cNvSpPr/><p:nvPr><p:ph type="{ph_type}"{idx}/></p:nvPr></p:nvSpPr><p:spPr/>{}</p:sp>"#,
            tx_body(paragraphs)
        ));
        self
    }

    /// A plain text box with paragraphs of runs.
    pub fn text_box(mut self, paragraphs: &[&[&str]]) -> Self {
        let id = self.next_id();
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/>{}</p:sp>"#,
            tx_body(paragraphs)
        ));
        self
    }

    /// A picture shape: no text frame.
    pub fn picture(mut self) -> Self {
        let id = self.next_id();
        self.shapes.push(format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#
        ));
        self
    }

    /// Arbitrary XML appended to the shape tree as-is.
    pub fn raw_shape(mut self, xml: &str) -> Self {
        self.shapes.push(xml.to_string());
        self
    }

    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
            self.shapes.concat()
        )
    }

    fn next_id(&self) -> usize {
        self.shapes.len() + 2
    }
}

fn tx_body(paragraphs: &[&[&str]]) -> String {
    let mut xml = String::from("<p:txBody><a:bodyPr/><a:lstStyle/>");
    for runs in paragraphs {
        xml.push_str("<a:p>");
        for run in runs.iter() {
            xml.push_str(&format!(r#"<a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r>"#, escape(*run)));
        }
        xml.push_str("</a:p>");
    }
    xml.push_str("</p:txBody>");
    xml
}

/// Zip the given `(name, contents)` pairs, stored uncompressed.
pub fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .expect("in-memory zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("in-memory zip write");
    }
    writer.finish().expect("in-memory zip finish").into_inner()
}
