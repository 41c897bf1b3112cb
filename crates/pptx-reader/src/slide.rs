//! Slide part parsing: `p:spTree` → [`Shape`]s.
//!
//! Only direct children of `p:spTree` become shapes. Group shapes are kept as
//! a single opaque [`ShapeKind::Group`]; their children are skipped.

use crate::package::{attr_value, xml_error};
use crate::{Paragraph, PlaceholderKind, ReadError, Shape, ShapeKind, TextElement, TextFrame};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Where text content is currently being collected.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Run,
    Field,
}

struct ShapeState {
    shape: Shape,
    /// Element depth of the shape's own start tag.
    depth: usize,
    paragraph: Option<Paragraph>,
    inline: Capture,
    in_text: bool,
    buf: String,
}

impl ShapeState {
    fn new(kind: ShapeKind, depth: usize) -> Self {
        Self {
            shape: Shape::new(kind),
            depth,
            paragraph: None,
            inline: Capture::None,
            in_text: false,
            buf: String::new(),
        }
    }
}

pub(crate) fn parse_shapes(part: &str, xml: &str) -> Result<Vec<Shape>, ReadError> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside `a:t` is significant; leave text untrimmed.
    reader.config_mut().trim_text(false);

    let mut shapes = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<ShapeState> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                let parent_is_tree = stack.last().is_some_and(|p| p == b"spTree");
                stack.push(name.clone());

                if current.is_none() {
                    if parent_is_tree {
                        if let Some(kind) = shape_kind(&name) {
                            current = Some(ShapeState::new(kind, stack.len()));
                        }
                    }
                    continue;
                }
                if let Some(state) = current.as_mut() {
                    let parent = stack.get(stack.len().wrapping_sub(2)).map(Vec::as_slice);
                    on_open(part, state, &name, parent, stack.len(), &e)?;
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);
                match current.as_mut() {
                    Some(state) => {
                        on_open(part, state, &name, parent, stack.len() + 1, &e)?;
                        on_close(state, &name);
                    }
                    None => {
                        if parent == Some(b"spTree".as_slice()) {
                            if let Some(kind) = shape_kind(&name) {
                                shapes.push(Shape::new(kind));
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(state) = current.as_mut() {
                    if state.in_text {
                        let text = t.unescape().map_err(|e| xml_error(part, &reader, e))?;
                        state.buf.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(state) = current.as_mut() {
                    if state.in_text {
                        state.buf.push_str(&String::from_utf8_lossy(&t));
                    }
                }
            }
            Ok(Event::End(e)) => {
                let depth = stack.len();
                stack.pop();
                let finished = match current.as_mut() {
                    Some(state) if state.depth == depth => true,
                    Some(state) => {
                        on_close(state, e.local_name().as_ref());
                        false
                    }
                    None => false,
                };
                if finished {
                    if let Some(state) = current.take() {
                        shapes.push(state.shape);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, &reader, e)),
            _ => {}
        }
    }

    Ok(shapes)
}

fn shape_kind(local_name: &[u8]) -> Option<ShapeKind> {
    match local_name {
        b"sp" => Some(ShapeKind::AutoShape),
        b"grpSp" => Some(ShapeKind::Group),
        b"graphicFrame" => Some(ShapeKind::GraphicFrame),
        b"cxnSp" => Some(ShapeKind::Connector),
        b"pic" => Some(ShapeKind::Picture),
        b"contentPart" => Some(ShapeKind::Other),
        _ => None,
    }
}

fn on_open(
    part: &str,
    state: &mut ShapeState,
    name: &[u8],
    parent: Option<&[u8]>,
    depth: usize,
    e: &BytesStart<'_>,
) -> Result<(), ReadError> {
    // Non-visual properties apply to every kind, at their fixed depth below
    // the shape element (`nvSpPr/cNvPr`, `nvSpPr/nvPr/ph`); deeper matches
    // belong to group children. Text applies only to auto shapes.
    match name {
        b"cNvPr" if depth == state.depth + 2 => {
            for attr in e.attributes().flatten() {
                match attr.key.local_name().as_ref() {
                    b"id" => state.shape.id = attr_value(part, &attr)?.parse().ok(),
                    b"name" => state.shape.name = attr_value(part, &attr)?,
                    _ => {}
                }
            }
            return Ok(());
        }
        b"ph" if depth == state.depth + 3 => {
            let mut kind = PlaceholderKind::Object;
            for attr in e.attributes().flatten() {
                match attr.key.local_name().as_ref() {
                    b"type" => kind = PlaceholderKind::from_type_attr(&attr_value(part, &attr)?),
                    b"idx" => state.shape.placeholder_idx = attr_value(part, &attr)?.parse().ok(),
                    _ => {}
                }
            }
            state.shape.placeholder = Some(kind);
            return Ok(());
        }
        _ => {}
    }

    if state.shape.kind != ShapeKind::AutoShape {
        return Ok(());
    }

    match name {
        b"txBody" => {
            state.shape.text_frame.get_or_insert_with(TextFrame::default);
        }
        b"p" if parent == Some(b"txBody".as_slice()) => {
            state.paragraph = Some(Paragraph::default());
        }
        b"r" if state.paragraph.is_some() => {
            state.inline = Capture::Run;
            state.buf.clear();
        }
        b"fld" if state.paragraph.is_some() => {
            state.inline = Capture::Field;
            state.buf.clear();
        }
        b"br" => {
            if let Some(p) = state.paragraph.as_mut() {
                p.elements.push(TextElement::LineBreak);
            }
        }
        b"t" if state.inline != Capture::None => state.in_text = true,
        _ => {}
    }
    Ok(())
}

fn on_close(state: &mut ShapeState, name: &[u8]) {
    match name {
        b"t" => state.in_text = false,
        b"r" | b"fld" => {
            let text = std::mem::take(&mut state.buf);
            if let Some(p) = state.paragraph.as_mut() {
                match state.inline {
                    Capture::Run => p.elements.push(TextElement::Run(text)),
                    Capture::Field => p.elements.push(TextElement::Field(text)),
                    Capture::None => {}
                }
            }
            state.inline = Capture::None;
        }
        b"p" => {
            if let Some(paragraph) = state.paragraph.take() {
                if let Some(frame) = state.shape.text_frame.as_mut() {
                    frame.paragraphs.push(paragraph);
                }
            }
        }
        _ => {}
    }
}
