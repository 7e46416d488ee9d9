// File Parser Service
// Extracts plain text from .txt, .pdf and .docx uploads and cleans it up

use regex::Regex;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Extracted text shorter than this is almost certainly a failed extraction.
pub const MIN_EXTRACTED_CHARS: usize = 50;
/// Uploads above 10 MB are rejected before parsing.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file format: {0} (supported: .txt, .pdf, .docx)")]
    Unsupported(String),
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("DOCX parse error: {0}")]
    Docx(String),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is too large ({kb} KB); the limit is 10 MB")]
    TooLarge { kb: usize },
    #[error("extracted text is too short ({chars} chars); does the file contain text?")]
    TooShort { chars: usize },
}

/// ISO-8859-2 code points for bytes 0xA0..=0xFF.
const LATIN2_HIGH: [char; 96] = [
    '\u{00A0}', 'Ą', '˘', 'Ł', '¤', 'Ľ', 'Ś', '§', '¨', 'Š', 'Ş', 'Ť', 'Ź', '\u{00AD}', 'Ž', 'Ż',
    '°', 'ą', '˛', 'ł', '´', 'ľ', 'ś', 'ˇ', '¸', 'š', 'ş', 'ť', 'ź', '˝', 'ž', 'ż',
    'Ŕ', 'Á', 'Â', 'Ă', 'Ä', 'Ĺ', 'Ć', 'Ç', 'Č', 'É', 'Ę', 'Ë', 'Ě', 'Í', 'Î', 'Ď',
    'Đ', 'Ń', 'Ň', 'Ó', 'Ô', 'Ő', 'Ö', '×', 'Ř', 'Ů', 'Ú', 'Ű', 'Ü', 'Ý', 'Ţ', 'ß',
    'ŕ', 'á', 'â', 'ă', 'ä', 'ĺ', 'ć', 'ç', 'č', 'é', 'ę', 'ë', 'ě', 'í', 'î', 'ď',
    'đ', 'ń', 'ň', 'ó', 'ô', 'ő', 'ö', '÷', 'ř', 'ů', 'ú', 'ű', 'ü', 'ý', 'ţ', '˙',
];

fn decode_latin2(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0xA0 {
                b as char
            } else {
                LATIN2_HIGH[(b - 0xA0) as usize]
            }
        })
        .collect()
}

/// UTF-8, falling back to ISO-8859-2 for legacy Polish files.
pub fn extract_text_from_txt(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{FEFF}').to_string(),
        Err(_) => {
            warn!(bytes = bytes.len(), "txt.not_utf8_decoding_latin2");
            decode_latin2(bytes)
        }
    }
}

pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:p(?:\s[^>]*)?(?:/>|>(.*?)</w:p>)").expect("docx paragraph regex")
    })
}

fn text_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("docx text regex"))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Non-empty paragraphs of `word/document.xml`, separated by blank lines.
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut entry) => {
            entry.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ExtractError::Docx("missing word/document.xml".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    let paragraphs: Vec<String> = paragraph_re()
        .captures_iter(&xml)
        .filter_map(|caps| caps.get(1))
        .map(|body| {
            text_run_re()
                .captures_iter(body.as_str())
                .filter_map(|c| c.get(1))
                .map(|t| unescape_xml(t.as_str()))
                .collect::<String>()
        })
        .filter(|p| !p.trim().is_empty())
        .collect();

    debug!(paragraphs = paragraphs.len(), "docx.extracted");
    Ok(paragraphs.join("\n\n"))
}

fn control_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").expect("control chars regex"))
}

fn broken_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\n([a-ząęóśłżźćń])").expect("broken word regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank lines regex"))
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("spaces regex"))
}

/// Strip control characters (keeping newline and tab), re-join words split
/// across lines, and collapse blank lines and runs of spaces.
pub fn clean_text(text: &str) -> String {
    let text = control_chars_re().replace_all(text, "");
    let text = broken_word_re().replace_all(&text, "$1");
    let text = blank_lines_re().replace_all(&text, "\n\n");
    let text = spaces_re().replace_all(&text, " ");
    text.trim().to_string()
}

/// Extract and clean text, dispatching on the file extension.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ExtractError::TooLarge { kb: bytes.len() / 1024 });
    }

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let raw = match ext.as_str() {
        "txt" => extract_text_from_txt(bytes),
        "pdf" => extract_text_from_pdf(bytes)?,
        "docx" | "doc" => extract_text_from_docx(bytes)?,
        _ => return Err(ExtractError::Unsupported(format!(".{}", ext))),
    };

    let text = clean_text(&raw);
    let chars = text.chars().count();
    if chars < MIN_EXTRACTED_CHARS {
        return Err(ExtractError::TooShort { chars });
    }
    debug!(file = file_name, chars, "file.extracted");
    Ok(text)
}

/// Read `path` from disk and extract its text.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    extract_text(&name, &bytes)
}
