//! Extraction strategies.
//!
//! Each [`ContentKind`] is served by one [`Extractor`]. The
//! [`ExtractorRegistry`] is the strategy table: new formats are supported by
//! registering another extractor rather than branching the pipeline.
//!
//! Extractors report failures as [`Error`] values; the registry turns them
//! into bracketed placeholder text so nothing escapes a per-file call.

use crate::{
    classify::{extension_of, ContentKind},
    entry::Outcome,
    error::{Error, Result},
};
use calamine::{open_workbook_auto, Reader as WorkbookReader};
use quick_xml::{events::Event, Reader};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};
use zip::ZipArchive;

/// Text emitted for files rejected by the extension filters.
pub const SKIPPED_PLACEHOLDER: &str = "[File skipped based on extension filters]";

/// Text emitted for unknown files that decode as UTF-8 but contain NUL bytes.
pub const BINARY_PLACEHOLDER: &str = "[Binary file - cannot extract text]";

/// Placeholder for unknown files that are neither office containers nor UTF-8.
#[must_use]
pub fn unsupported_placeholder(extension: &str) -> String {
    format!("[Unsupported file type: {extension}]")
}

/// Placeholder for a failed extraction.
#[must_use]
pub fn error_placeholder(label: &str, detail: &str) -> String {
    format!("[Error processing {label}: {detail}]")
}

/// A text extraction strategy for one content kind.
///
/// Implementations must be thread-safe; flat selections fan out across
/// worker threads sharing one registry.
pub trait Extractor: Send + Sync {
    /// Human-readable format name used in error placeholders.
    fn label(&self) -> &'static str;

    /// Extracts text from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed. The registry
    /// converts it into placeholder text.
    fn extract(&self, path: &Path) -> Result<String>;
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Reads files as UTF-8, replacing malformed sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn label(&self) -> &'static str {
        "Text"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Extracts the text layer of PDF documents with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn label(&self) -> &'static str {
        "PDF"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;

        // pdf-extract panics on some malformed inputs.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::extraction("PDF", e.to_string())),
            Err(_) => Err(Error::extraction(
                "PDF",
                "parser aborted on malformed document",
            )),
        }
    }
}

/// Extracts raw text from Word documents, discarding formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn label(&self) -> &'static str {
        "DOCX"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| Error::extraction("DOCX", format!("not an OOXML container: {e}")))?;
        let xml = read_part(&mut archive, "word/document.xml")?;
        markup_text(&xml, &WORD)
    }
}

/// Renders every worksheet as CSV under a sheet header, in workbook order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn label(&self) -> &'static str {
        "Spreadsheet"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| Error::extraction("Spreadsheet", e.to_string()))?;

        let mut output = String::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| Error::extraction("Spreadsheet", format!("sheet '{name}': {e}")))?;

            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!("--- Sheet: {name} ---\n"));

            for row in range.rows() {
                let line = row
                    .iter()
                    .map(|cell| csv_field(&cell.to_string()))
                    .collect::<Vec<_>>()
                    .join(",");
                output.push_str(&line);
                output.push('\n');
            }
        }

        Ok(output)
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Best-effort extraction for everything without a dedicated strategy.
///
/// Tries zip-based office containers first (Word, PowerPoint,
/// OpenDocument), then a strict UTF-8 decode. Decoded text containing a NUL
/// byte is reported as binary. This check is approximate and intentionally
/// no stronger than that.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericExtractor;

impl Extractor for GenericExtractor {
    fn label(&self) -> &'static str {
        "File"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;

        match office_container_text(&bytes) {
            Ok(text) => return Ok(text),
            Err(e) => trace!("No office text in {}: {}", path.display(), e),
        }

        Ok(match std::str::from_utf8(&bytes) {
            Ok(_) if memchr::memchr(0, &bytes).is_some() => BINARY_PLACEHOLDER.to_string(),
            Ok(text) => text.to_string(),
            Err(_) => unsupported_placeholder(&extension_of(path)),
        })
    }
}

/// Element names that carry text in one XML document dialect.
struct Markup {
    /// Text run element; `None` means all character data counts
    run: Option<&'static str>,
    /// Elements whose end starts a new line
    paragraphs: &'static [&'static str],
    tab: &'static str,
    line_break: &'static str,
}

const WORD: Markup = Markup {
    run: Some("w:t"),
    paragraphs: &["w:p"],
    tab: "w:tab",
    line_break: "w:br",
};

const SLIDE: Markup = Markup {
    run: Some("a:t"),
    paragraphs: &["a:p"],
    tab: "a:tab",
    line_break: "a:br",
};

const OPEN_DOCUMENT: Markup = Markup {
    run: None,
    paragraphs: &["text:p", "text:h"],
    tab: "text:tab",
    line_break: "text:line-break",
};

fn markup_text(xml: &str, markup: &Markup) -> Result<String> {
    let xml_error = |e: quick_xml::Error| Error::extraction("XML", e.to_string());

    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut output = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                if markup.run.is_some_and(|run| e.name().as_ref() == run.as_bytes()) {
                    in_run = true;
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                if name.as_ref() == markup.tab.as_bytes() {
                    output.push('\t');
                } else if name.as_ref() == markup.line_break.as_bytes() {
                    output.push('\n');
                }
            }
            Event::Text(e) => {
                if in_run || markup.run.is_none() {
                    output.push_str(&e.unescape().map_err(xml_error)?);
                }
            }
            Event::End(e) => {
                let name = e.name();
                if markup.run.is_some_and(|run| name.as_ref() == run.as_bytes()) {
                    in_run = false;
                } else if markup
                    .paragraphs
                    .iter()
                    .any(|p| name.as_ref() == p.as_bytes())
                {
                    output.push('\n');
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(output.trim_end().to_string())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| Error::extraction("ZIP", format!("missing part '{name}': {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| Error::extraction("ZIP", format!("unreadable part '{name}': {e}")))?;
    Ok(xml)
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Recovers text from zip-based office containers.
fn office_container_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    if archive.index_for_name("word/document.xml").is_some() {
        let xml = read_part(&mut archive, "word/document.xml")?;
        return markup_text(&xml, &WORD);
    }

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    if !slides.is_empty() {
        slides.sort_by_key(|(n, _)| *n);
        let mut texts = Vec::with_capacity(slides.len());
        for (_, name) in &slides {
            let xml = read_part(&mut archive, name)?;
            texts.push(markup_text(&xml, &SLIDE)?);
        }
        return Ok(texts.join("\n\n"));
    }

    if archive.index_for_name("content.xml").is_some() {
        let xml = read_part(&mut archive, "content.xml")?;
        return markup_text(&xml, &OPEN_DOCUMENT);
    }

    Err(Error::extraction("Office", "no text-bearing parts found"))
}

/// Strategy table mapping content kinds to extractors.
///
/// Kinds without a registered strategy use the fallback ([`GenericExtractor`]
/// unless replaced by registering [`ContentKind::Unknown`]).
#[derive(Clone)]
pub struct ExtractorRegistry {
    strategies: HashMap<ContentKind, Arc<dyn Extractor>>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    /// Creates a registry with every built-in strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::without_strategies()
            .register(ContentKind::Text, PlainTextExtractor)
            .register(ContentKind::Pdf, PdfExtractor)
            .register(ContentKind::Document, DocxExtractor)
            .register(ContentKind::Spreadsheet, SpreadsheetExtractor)
    }

    /// Creates a registry where every kind goes to the generic fallback.
    #[must_use]
    pub fn without_strategies() -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: Arc::new(GenericExtractor),
        }
    }

    /// Registers (or replaces) the strategy for a content kind.
    #[must_use]
    pub fn register(mut self, kind: ContentKind, extractor: impl Extractor + 'static) -> Self {
        let extractor: Arc<dyn Extractor> = Arc::new(extractor);
        if kind == ContentKind::Unknown {
            self.fallback = extractor;
        } else {
            self.strategies.insert(kind, extractor);
        }
        self
    }

    /// Removes the strategy for a kind so it is handled by the fallback.
    #[must_use]
    pub fn unregister(mut self, kind: ContentKind) -> Self {
        self.strategies.remove(&kind);
        self
    }

    /// Returns the strategy responsible for a kind.
    #[must_use]
    pub fn strategy(&self, kind: ContentKind) -> &dyn Extractor {
        self.strategies
            .get(&kind)
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    /// Extracts text, converting any failure into placeholder text.
    #[must_use]
    pub fn extract(&self, path: &Path, kind: ContentKind) -> String {
        self.extract_with_outcome(path, kind).0
    }

    /// Like [`extract`](Self::extract), also reporting whether the strategy
    /// failed.
    #[must_use]
    pub fn extract_with_outcome(&self, path: &Path, kind: ContentKind) -> (String, Outcome) {
        let strategy = self.strategy(kind);
        match strategy.extract(path) {
            Ok(text) => (text, Outcome::Extracted),
            Err(e) => {
                warn!("{} error ({}): {}", strategy.label(), path.display(), e);
                (error_placeholder(strategy.label(), &e.detail()), Outcome::Failed)
            }
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self
            .strategies
            .iter()
            .map(|(kind, e)| format!("{kind}={}", e.label()))
            .collect();
        kinds.sort();
        f.debug_struct("ExtractorRegistry")
            .field("strategies", &kinds)
            .field("fallback", &self.fallback.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, parts: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
<w:p><w:r><w:t>Tom &amp; Jerry</w:t></w:r></w:p>
</w:body>
</w:document>"#;

    #[test]
    fn test_plain_text_extraction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("a.py");
        file.write_str("x=1").unwrap();

        let text = PlainTextExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "x=1");
    }

    #[test]
    fn test_plain_text_replaces_malformed_utf8() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("latin.txt");
        file.write_binary(&[b'c', b'a', b'f', 0xe9]).unwrap();

        let text = PlainTextExtractor.extract(file.path()).unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn test_corrupt_pdf_yields_placeholder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("broken.pdf");
        file.write_str("this is not a pdf").unwrap();

        let registry = ExtractorRegistry::new();
        let text = registry.extract(file.path(), ContentKind::Pdf);
        assert!(text.starts_with("[Error processing PDF:"), "{text}");
    }

    #[test]
    fn test_docx_extraction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("letter.docx");
        write_zip(file.path(), &[("word/document.xml", DOCUMENT_XML)]);

        let text = DocxExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "Hello world\nTom & Jerry");
    }

    #[test]
    fn test_legacy_doc_yields_docx_placeholder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("old.doc");
        file.write_binary(&[0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1]).unwrap();

        let text = ExtractorRegistry::new().extract(file.path(), ContentKind::Document);
        assert!(text.starts_with("[Error processing DOCX:"), "{text}");
    }

    #[test]
    fn test_corrupt_spreadsheet_yields_placeholder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("numbers.xlsx");
        file.write_str("a,b,c").unwrap();

        let text = ExtractorRegistry::new().extract(file.path(), ContentKind::Spreadsheet);
        assert!(text.starts_with("[Error processing Spreadsheet:"), "{text}");
    }

    const ODS_CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2">
<office:body><office:spreadsheet>
<table:table table:name="First">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>a,b</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="2"><text:p>2</text:p></table:table-cell>
</table:table-row>
</table:table>
<table:table table:name="Second">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>z</text:p></table:table-cell>
</table:table-row>
</table:table>
</office:spreadsheet></office:body>
</office:document-content>"#;

    #[test]
    fn test_spreadsheet_renders_sheets_in_workbook_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("book.ods");
        write_zip(
            file.path(),
            &[
                ("mimetype", "application/vnd.oasis.opendocument.spreadsheet"),
                ("content.xml", ODS_CONTENT),
            ],
        );

        let (text, outcome) =
            ExtractorRegistry::new().extract_with_outcome(file.path(), ContentKind::Spreadsheet);
        assert_eq!(outcome, Outcome::Extracted);
        assert_eq!(
            text,
            "--- Sheet: First ---\n\"a,b\",2\n\n--- Sheet: Second ---\nz\n"
        );
    }

    #[test]
    fn test_failed_strategy_reports_failed_outcome() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("broken.pdf");
        file.write_str("this is not a pdf").unwrap();

        let (_, outcome) = ExtractorRegistry::new().extract_with_outcome(file.path(), ContentKind::Pdf);
        assert_eq!(outcome, Outcome::Failed);
    }

    #[test]
    fn test_spreadsheet_falls_back_to_generic_when_unregistered() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("numbers.xlsx");
        file.write_str("a,b,c").unwrap();

        let registry = ExtractorRegistry::new().unregister(ContentKind::Spreadsheet);
        assert_eq!(registry.extract(file.path(), ContentKind::Spreadsheet), "a,b,c");
    }

    #[test]
    fn test_generic_reads_clean_text() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("Makefile");
        file.write_str("all:\n\tcargo build\n").unwrap();

        let text = GenericExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "all:\n\tcargo build\n");
    }

    #[test]
    fn test_generic_flags_nul_bytes_as_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("blob.bin");
        file.write_binary(&[0u8; 100]).unwrap();

        let text = GenericExtractor.extract(file.path()).unwrap();
        assert_eq!(text, BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_generic_rejects_non_utf8() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("image.png");
        file.write_binary(&[0x89, b'P', b'N', b'G', 0xff, 0xfe]).unwrap();

        let text = GenericExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "[Unsupported file type: .png]");
    }

    #[test]
    fn test_generic_extracts_presentation_slides_in_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("deck.pptx");
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:a="a" xmlns:p="p"><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sld>"#
            )
        };
        let second = slide("Second");
        let tenth = slide("Tenth");
        let first = slide("First");
        write_zip(
            file.path(),
            &[
                ("ppt/slides/slide2.xml", second.as_str()),
                ("ppt/slides/slide10.xml", tenth.as_str()),
                ("ppt/slides/slide1.xml", first.as_str()),
            ],
        );

        let text = GenericExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "First\n\nSecond\n\nTenth");
    }

    #[test]
    fn test_generic_extracts_open_document_text() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("notes.odt");
        write_zip(
            file.path(),
            &[(
                "content.xml",
                r#"<office:document-content xmlns:office="o" xmlns:text="t"><office:body><office:text><text:h>Title</text:h><text:p>Body <text:span>text</text:span></text:p></office:text></office:body></office:document-content>"#,
            )],
        );

        let text = GenericExtractor.extract(file.path()).unwrap();
        assert_eq!(text, "Title\nBody text");
    }

    #[test]
    fn test_missing_file_yields_placeholder() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("gone.rs");

        let text = ExtractorRegistry::new().extract(&path, ContentKind::Text);
        assert!(text.starts_with("[Error processing Text:"), "{text}");
        assert!(text.ends_with(']'));
    }

    #[test]
    fn test_register_custom_strategy() {
        struct Shouting;

        impl Extractor for Shouting {
            fn label(&self) -> &'static str {
                "Shout"
            }

            fn extract(&self, path: &Path) -> Result<String> {
                Ok(fs::read_to_string(path)
                    .map_err(|e| Error::io(path, e))?
                    .to_uppercase())
            }
        }

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("quiet.txt");
        file.write_str("hello").unwrap();

        let registry = ExtractorRegistry::new().register(ContentKind::Text, Shouting);
        assert_eq!(registry.strategy(ContentKind::Text).label(), "Shout");
        assert_eq!(registry.extract(file.path(), ContentKind::Text), "HELLO");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_registry_debug_lists_strategies() {
        let debug = format!("{:?}", ExtractorRegistry::new());
        assert!(debug.contains("pdf=PDF"));
        assert!(debug.contains("fallback: \"File\""));
    }
}
