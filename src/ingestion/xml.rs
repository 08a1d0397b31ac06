//! XML (and HTML-as-XML) normalization.
//!
//! Documents are converted to the same JSON-shaped tree a JSON payload would produce:
//!
//! - the document becomes a mapping `{ <root element name>: <root element> }`
//! - an element with neither attributes nor child elements becomes its text (a string)
//! - otherwise an element becomes a mapping: attributes under `-name`, child elements under their
//!   tag name (repeated tags collect into a sequence, in document order) and any text under
//!   `#content`
//!
//! Text is never type-converted here.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{FramerError, FramerResult};
use crate::types::Value;

use super::detect::FormatKind;

const ATTR_PREFIX: char = '-';
const CONTENT_KEY: &str = "#content";

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Element {
    fn into_value(self) -> Value {
        if self.attrs.is_empty() && self.children.is_empty() {
            return Value::String(self.text);
        }

        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        for (k, v) in self.attrs {
            map.insert(format!("{ATTR_PREFIX}{k}"), Value::String(v));
        }

        let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for (name, v) in self.children {
            grouped.entry(name).or_default().push(v);
        }
        for (name, mut values) in grouped {
            let v = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Sequence(values)
            };
            map.insert(name, v);
        }

        if !self.text.is_empty() {
            map.insert(CONTENT_KEY.to_string(), Value::String(self.text));
        }
        Value::Mapping(map)
    }
}

/// Convert an XML document into a [`Value`] tree.
pub fn xml_to_value(input: &str) -> FramerResult<Value> {
    to_tree(input, FormatKind::Xml)
}

/// Convert an HTML document into a [`Value`] tree.
///
/// The markup must be well-formed (every element closed); attribute values may be unquoted or
/// missing.
pub fn html_to_value(input: &str) -> FramerResult<Value> {
    to_tree(input, FormatKind::Html)
}

fn to_tree(input: &str, kind: FormatKind) -> FramerResult<Value> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FramerError::malformed(
                kind,
                format!("error at position {}: {e}", reader.buffer_position()),
            )
        })?;
        match event {
            Event::Start(e) => stack.push(start_element(&e, kind)?),
            Event::Empty(e) => {
                let el = start_element(&e, kind)?;
                attach(&mut stack, &mut root, el, kind)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| FramerError::malformed(kind, "unbalanced closing tag"))?;
                attach(&mut stack, &mut root, el, kind)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        // HTML entities such as &nbsp; are not XML entities; keep the raw text.
                        Err(_) if kind == FormatKind::Html => String::from_utf8_lossy(&t).into_owned(),
                        Err(e) => return Err(FramerError::malformed(kind, e)),
                    };
                    top.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FramerError::malformed(
            kind,
            format!("element <{}> is never closed", open.name),
        ));
    }
    let (name, value) = root.ok_or_else(|| FramerError::malformed(kind, "no root element"))?;
    Ok(Value::Mapping(BTreeMap::from([(name, value)])))
}

fn start_element(e: &BytesStart<'_>, kind: FormatKind) -> FramerResult<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attributes = match kind {
        FormatKind::Html => e.html_attributes(),
        _ => e.attributes(),
    };
    let mut attrs = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(|err| FramerError::malformed(kind, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        ..Default::default()
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
    el: Element,
    kind: FormatKind,
) -> FramerResult<()> {
    let name = el.name.clone();
    let value = el.into_value();
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, value)),
        None if root.is_none() => *root = Some((name, value)),
        None => return Err(FramerError::malformed(kind, "multiple root elements")),
    }
    Ok(())
}
