//! Raw-text conversion for word-processing documents.
//!
//! A DOCX file is a zip archive; the body text lives in `word/document.xml` as
//! WordprocessingML. Only the text runs are kept: styling, tables-as-layout and
//! embedded objects are dropped.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use cvtext_core::{BackendError, BoxFuture, DocxConverter};

const DOCUMENT_PART: &str = "word/document.xml";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// [`DocxConverter`] reading `word/document.xml` straight out of the archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTextConverter;

impl DocxTextConverter {
    pub fn new() -> Self {
        Self
    }

    /// Paragraph text of a DOCX file, separated by blank lines.
    pub fn convert(&self, bytes: &[u8]) -> Result<String, BackendError> {
        if bytes.starts_with(OLE2_MAGIC) {
            return Err(BackendError::Convert(
                "legacy binary .doc documents are not supported".into(),
            ));
        }
        if !bytes.starts_with(ZIP_MAGIC) {
            return Err(BackendError::Convert("not a zip-based DOCX document".into()));
        }

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| BackendError::Convert(format!("failed to read DOCX as zip: {e}")))?;
        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| BackendError::Convert(format!("{DOCUMENT_PART}: {e}")))?;

        let mut xml = String::new();
        part.read_to_string(&mut xml)?;

        let text = document_xml_to_text(&xml)?;
        tracing::debug!(
            xml_bytes = xml.len(),
            chars = text.len(),
            "converted DOCX to text"
        );
        Ok(text)
    }
}

impl DocxConverter for DocxTextConverter {
    fn extract_raw_text<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> BoxFuture<'a, Result<String, BackendError>> {
        Box::pin(async move { self.convert(bytes) })
    }
}

/// Flatten WordprocessingML into plain text.
///
/// `w:t` runs are concatenated within a paragraph, `w:tab` becomes a tab and
/// `w:br`/`w:cr` a newline. Paragraphs nested in text boxes keep their own
/// buffer and are emitted after the enclosing paragraph. The `mc:Fallback`
/// copy of alternate content is skipped. Paragraphs that end up blank are
/// dropped; the rest are joined with `"\n\n"`.
pub fn document_xml_to_text(xml: &str) -> Result<String, BackendError> {
    let mut reader = Reader::from_str(xml);

    // One slot per paragraph, in the order the paragraphs open.
    let mut slots: Vec<Option<String>> = Vec::new();
    let mut open: Vec<(usize, String)> = Vec::new();
    let mut fallback_depth = 0usize;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| BackendError::Convert(format!("XML parse error: {e}")))?;

        if fallback_depth > 0 {
            match &event {
                Event::Start(e) if e.local_name().as_ref() == b"Fallback" => fallback_depth += 1,
                Event::End(e) if e.local_name().as_ref() == b"Fallback" => fallback_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => {
                    open.push((slots.len(), String::new()));
                    slots.push(None);
                }
                b"Fallback" => fallback_depth = 1,
                _ => {}
            },
            Event::Empty(ref e) => {
                if let Some((_, current)) = open.last_mut() {
                    match e.local_name().as_ref() {
                        b"tab" => current.push('\t'),
                        b"br" | b"cr" => current.push('\n'),
                        _ => {}
                    }
                }
            }
            Event::Text(ref e) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| BackendError::Convert(format!("XML parse error: {e}")))?;
                if let Some((_, current)) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Event::CData(ref e) if in_text => {
                if let Some((_, current)) = open.last_mut() {
                    current.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some((slot, current)) = open.pop() {
                        let paragraph = current.trim();
                        if !paragraph.is_empty() {
                            slots[slot] = Some(paragraph.to_string());
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let paragraphs: Vec<String> = slots.into_iter().flatten().collect();
    Ok(paragraphs.join("\n\n"))
}
