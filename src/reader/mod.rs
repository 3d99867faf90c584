//! Streaming OSM XML reader.
//!
//! Yields every `node` and `way` at any depth, and every other element found
//! outside of one, once its closing tag has been read. Children of an open
//! element below the root stay attached to it. Only the currently open
//! element path is kept in memory.

use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::element::RawElement;

pub struct OsmXmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<RawElement>,
}

impl OsmXmlReader<BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("XML: Failed to open {:?}", path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> OsmXmlReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Read until the next top-level entity is complete.
    pub fn next_element(&mut self) -> Result<Option<RawElement>> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .with_context(|| format!("XML: Malformed document near byte {}", position))?;

            let completed = match event {
                Event::Start(start) => {
                    let element = build_element(&start)?;
                    self.open.push(element);
                    None
                }
                Event::Empty(start) => {
                    let element = build_element(&start)?;
                    close(&mut self.open, element)
                }
                Event::End(_) => {
                    let Some(element) = self.open.pop() else {
                        bail!("XML: Closing tag without matching start near byte {}", position);
                    };
                    close(&mut self.open, element)
                }
                Event::Eof => {
                    if let Some(element) = self.open.last() {
                        bail!("XML: Document ended inside <{}>", element.tag);
                    }
                    return Ok(None);
                }
                _ => None,
            };

            if completed.is_some() {
                return Ok(completed);
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmXmlReader<R> {
    type Item = Result<RawElement>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_element().transpose()
    }
}

/// Hand back a finished element when it is a `node`/`way`, or a root-level
/// element outside of one. Anything else is attached to its parent.
fn close(open: &mut Vec<RawElement>, element: RawElement) -> Option<RawElement> {
    let inside_entity = open.iter().any(RawElement::is_entity);
    if element.is_entity() || (open.len() <= 1 && !inside_entity) {
        return Some(element);
    }
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            None
        }
        None => Some(element),
    }
}

fn build_element(start: &BytesStart) -> Result<RawElement> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .context("XML: Element name is not valid UTF-8")?
        .to_string();

    let mut element = RawElement::new(tag);
    for attribute in start.attributes() {
        let attribute =
            attribute.with_context(|| format!("XML: Malformed attribute on <{}>", element.tag))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .with_context(|| format!("XML: Attribute name on <{}> is not valid UTF-8", element.tag))?
            .to_string();
        let value = attribute
            .unescape_value()
            .with_context(|| format!("XML: Invalid value for attribute {:?} on <{}>", key, element.tag))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}
