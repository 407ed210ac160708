//! File type detection and text decoding for non-PDF uploads.

use docgrid_core::{Error, Result};

/// Supported file types for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Code,
    Json,
    Pdf,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" | "log" | "csv" | "tsv" => Self::PlainText,
            "md" | "mdx" | "rst" => Self::Markdown,
            "py" | "js" | "ts" | "tsx" | "jsx" | "rs" | "go" | "java" | "cpp" | "c" | "h"
            | "hpp" | "cs" | "rb" | "php" | "swift" | "kt" | "scala" | "sh" | "bash" | "zsh"
            | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" | "xml" | "html" | "css"
            | "scss" | "sql" => Self::Code,
            "json" => Self::Json,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Check if this is a text-based file type.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::PlainText | Self::Markdown | Self::Code | Self::Json
        )
    }
}

/// Decode a non-PDF upload to text.
///
/// Unknown extensions are accepted when the bytes are valid UTF-8 and not
/// dominated by control characters.
pub fn decode_text(bytes: &[u8], file_type: FileType) -> Result<String> {
    match file_type {
        FileType::PlainText | FileType::Markdown | FileType::Code | FileType::Json => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        FileType::Pdf => Err(Error::Extraction(
            "PDF bytes cannot be decoded as text".into(),
        )),
        FileType::Unknown => {
            let content = std::str::from_utf8(bytes)
                .map_err(|_| Error::Extraction("binary file of unknown type".into()))?;
            let control = content
                .chars()
                .filter(|c| c.is_control() && *c != '\n' && *c != '\r' && *c != '\t')
                .count();
            if control > content.len() / 10 {
                return Err(Error::Extraction("binary file of unknown type".into()));
            }
            Ok(content.to_string())
        }
    }
}
