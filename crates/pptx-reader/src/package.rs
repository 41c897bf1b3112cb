//! Zip container access and presentation-level relationship resolution.

use crate::ReadError;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// An opened `.pptx` zip container borrowing the caller's buffer.
pub(crate) struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    pub(crate) fn open(bytes: &'a [u8]) -> Result<Self, ReadError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ReadError::NotAPackage(e.to_string()))?;
        Ok(Self { archive })
    }

    /// Read a part as UTF-8 text.
    pub(crate) fn read_part(&mut self, name: &str) -> Result<String, ReadError> {
        let mut file = match self.archive.by_name(name) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => return Err(ReadError::MissingPart(name.to_string())),
            Err(e) => return Err(ReadError::NotAPackage(format!("{name}: {e}"))),
        };

        let mut xml = String::new();
        file.read_to_string(&mut xml)
            .map_err(|source| ReadError::Io {
                part: name.to_string(),
                source,
            })?;
        Ok(xml)
    }

    /// Part names of every slide, in presentation order.
    pub(crate) fn slide_part_names(&mut self) -> Result<Vec<String>, ReadError> {
        let presentation = self.read_part(PRESENTATION_PART)?;
        let slide_rel_ids = parse_slide_id_list(&presentation)?;
        if slide_rel_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rels_xml = self.read_part(PRESENTATION_RELS)?;
        let targets = parse_relationships(PRESENTATION_RELS, &rels_xml)?;

        slide_rel_ids
            .into_iter()
            .map(|rid| match targets.get(&rid) {
                Some(target) => Ok(resolve_target("ppt", target)),
                None => Err(ReadError::DanglingRelationship(rid)),
            })
            .collect()
    }
}

/// Relationship ids (`r:id`) of `p:sldIdLst/p:sldId`, in document order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>, ReadError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    let mut in_list = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if in_list && e.local_name().as_ref() == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    // `id` is the numeric slide id; the prefixed `r:id` is the relationship.
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr_value(PRESENTATION_PART, &attr)?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(PRESENTATION_PART, &reader, e)),
            _ => {}
        }
    }

    Ok(ids)
}

/// Map of relationship `Id` → `Target` for a `.rels` part.
fn parse_relationships(part: &str, xml: &str) -> Result<HashMap<String, String>, ReadError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(attr_value(part, &attr)?),
                        b"Target" => target = Some(attr_value(part, &attr)?),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, &reader, e)),
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets (`/ppt/slides/slide1.xml`) are taken from the package
/// root; relative ones are joined to `base_dir` with `.` and `..` folded.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("{base_dir}/{target}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

pub(crate) fn attr_value(part: &str, attr: &Attribute<'_>) -> Result<String, ReadError> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|e| ReadError::Xml {
            part: part.to_string(),
            detail: e.to_string(),
        })
}

pub(crate) fn xml_error(part: &str, reader: &Reader<&[u8]>, err: quick_xml::Error) -> ReadError {
    ReadError::Xml {
        part: part.to_string(),
        detail: format!("at byte {}: {}", reader.buffer_position(), err),
    }
}
