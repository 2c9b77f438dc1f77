use crate::error::IngestError;
use crate::models::TextRecord;
use lopdf::Document;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// File formats the loader understands. Anything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Text,
    Markdown,
}

impl DocumentFormat {
    pub const EXTENSIONS: [&'static str; 5] = ["pdf", "docx", "doc", "txt", "md"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn load(self, path: &Path) -> Result<Vec<TextRecord>, IngestError> {
        match self {
            Self::Pdf => load_pdf(path),
            // Legacy .doc goes through the OOXML reader too; binary files fail
            // there and are skipped by the caller.
            Self::Docx | Self::Doc => load_docx(path),
            Self::Text | Self::Markdown => load_plain_text(path),
        }
    }
}

/// Loads one file into text records. Unsupported extensions yield no records.
pub fn load_file(path: &Path) -> Result<Vec<TextRecord>, IngestError> {
    match DocumentFormat::from_path(path) {
        Some(format) => format.load(path),
        None => Ok(Vec::new()),
    }
}

fn load_pdf(path: &Path) -> Result<Vec<TextRecord>, IngestError> {
    let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut records = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;
        records.push(TextRecord::new(text, path).with_page(page_no));
    }

    if records.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf has no pages: {}",
            path.display()
        )));
    }

    Ok(records)
}

fn load_docx(path: &Path) -> Result<Vec<TextRecord>, IngestError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let text = docx_xml_to_text(&xml)?;
    Ok(vec![TextRecord::new(text, path)])
}

fn load_plain_text(path: &Path) -> Result<Vec<TextRecord>, IngestError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|error| IngestError::Decode(format!("{}: {error}", path.display())))?;
    Ok(vec![TextRecord::new(text, path)])
}

/// Paragraph text of a WordprocessingML body, one paragraph per line.
pub fn docx_xml_to_text(xml: &str) -> Result<String, IngestError> {
    let properties_re = Regex::new(r"(?s)<w:pPr\b[^>]*?(?:/>|>.*?</w:pPr>)")?;
    let paragraph_re = Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)")?;
    let run_re = Regex::new(
        r"(?s)<w:t(?:\s[^>]*?)?(?:/>|>(.*?)</w:t>)|<w:tab\b[^>]*/>|<w:(?:br|cr)\b[^>]*/>",
    )?;
    let entity_re = Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);")?;

    let stripped = properties_re.replace_all(xml, "");
    let mut paragraphs = Vec::new();

    for paragraph in paragraph_re.captures_iter(&stripped) {
        let body = paragraph.get(1).map(|m| m.as_str()).unwrap_or_default();
        let mut line = String::new();
        for run in run_re.captures_iter(body) {
            let tag = &run[0];
            if tag.starts_with("<w:tab") {
                line.push('\t');
            } else if tag.starts_with("<w:br") || tag.starts_with("<w:cr") {
                line.push('\n');
            } else if let Some(text) = run.get(1) {
                line.push_str(&decode_xml_entities(&entity_re, text.as_str()));
            }
        }
        paragraphs.push(line);
    }

    Ok(paragraphs.join("\n"))
}

fn decode_xml_entities<'a>(entity_re: &Regex, text: &'a str) -> Cow<'a, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    entity_re.replace_all(text, |caps: &Captures| {
        let entity = &caps[1];
        let named = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => None,
        };
        let numeric = || {
            let code = match entity.strip_prefix("#x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => entity.trim_start_matches('#').parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        };

        named
            .or_else(numeric)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}
