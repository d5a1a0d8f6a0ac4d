//! Built-in converter: extracts DOCX text and typesets it into a simple
//! PDF. No external tools required; layout fidelity is limited to plain
//! text. Legacy binary `.doc` files need the LibreOffice backend.

use std::io::Read;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, Stream};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::convert::{pdf_output_path, DocumentConverter};
use crate::error::ConversionError;

pub struct TextPdfConverter;

impl TextPdfConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextPdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for TextPdfConverter {
    fn convert(&self, source: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if extension == "doc" {
            return Err(ConversionError::Backend {
                path: source.to_path_buf(),
                message: "legacy .doc files require the LibreOffice backend".to_string(),
            });
        }

        let file = std::fs::File::open(source).map_err(|e| ConversionError::ReadDocument {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ConversionError::DocxProcessing(format!("Failed to open DOCX: {}", e)))?;

        let text = extract_docx_text(&mut archive)?;
        let pdf_bytes = create_text_pdf(&text)?;

        let output_path = pdf_output_path(source, output_dir);
        std::fs::write(&output_path, pdf_bytes).map_err(|e| ConversionError::ReadDocument {
            path: output_path.clone(),
            source: e,
        })?;

        Ok(output_path)
    }
}

fn extract_docx_text<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, ConversionError> {
    let mut document_xml = archive.by_name("word/document.xml").map_err(|e| {
        ConversionError::DocxProcessing(format!("Failed to find document.xml: {}", e))
    })?;

    let mut xml_content = String::new();
    document_xml.read_to_string(&mut xml_content).map_err(|e| {
        ConversionError::DocxProcessing(format!("Failed to read document.xml: {}", e))
    })?;

    parse_docx_xml(&xml_content)
}

fn parse_docx_xml(xml: &str) -> Result<String, ConversionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut in_text_element = false;
    let mut in_paragraph = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"t" => in_text_element = true,
                    b"p" => in_paragraph = true,
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"t" => in_text_element = false,
                    b"p" => {
                        if in_paragraph {
                            text.push('\n');
                            in_paragraph = false;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConversionError::DocxProcessing(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(text)
}

fn create_text_pdf(text: &str) -> Result<Vec<u8>, ConversionError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();

    // Font
    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        }),
    );

    // Resources
    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    // Split text into pages (roughly 50 lines per page)
    let lines: Vec<&str> = text.lines().collect();
    let lines_per_page = 50;
    let page_count = lines.len().div_ceil(lines_per_page).max(1);

    let mut page_ids = Vec::new();

    for page_num in 0..page_count {
        let start_line = page_num * lines_per_page;
        let end_line = ((page_num + 1) * lines_per_page).min(lines.len());
        let page_lines = if start_line < lines.len() {
            &lines[start_line..end_line]
        } else {
            &[]
        };

        let content_id = doc.new_object_id();
        let page_id = doc.new_object_id();

        // Content stream
        let content = format_text_for_pdf(page_lines);
        let content_stream = Stream::new(dictionary! {}, content.into_bytes());
        doc.objects
            .insert(content_id, Object::Stream(content_stream));

        // Page
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            }),
        );

        page_ids.push(page_id);
    }

    // Pages
    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    // Catalog
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConversionError::PdfProcessing(e.to_string()))?;

    Ok(buffer)
}

fn format_text_for_pdf(lines: &[&str]) -> String {
    let mut content = String::new();
    content.push_str("BT\n");
    content.push_str("/F1 11 Tf\n");
    content.push_str("50 742 Td\n");
    content.push_str("14 TL\n");

    for line in lines {
        let escaped = escape_pdf_string(line);
        content.push_str(&format!("({}) Tj T*\n", escaped));
    }

    content.push_str("ET\n");
    content
}

// Type1 Helvetica cannot encode CJK; non-ASCII falls back to a space so
// the layout survives even when the glyphs do not.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}
