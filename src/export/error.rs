use std::path::PathBuf;
use thiserror::Error;

/// Failures an export can surface to its caller. Decoration problems never
/// appear here; they are absorbed by the page decoration renderer.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data to export")]
    EmptyDataset,
    #[error("spreadsheet encoding failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("document encoding failed: {0}")]
    Document(String),
    #[error("failed to write {}: {source}", path.to_string_lossy())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bundle encoding failed: {0:#}")]
    Bundle(anyhow::Error),
}

impl ExportError {
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::EmptyDataset => "no_data",
            ExportError::Spreadsheet(_) => "xlsx_failed",
            ExportError::Document(_) => "pdf_failed",
            ExportError::Io { .. } => "io_failed",
            ExportError::Bundle(_) => "bundle_failed",
        }
    }
}

/// Logo resolution or drawing failed. Logged and swallowed by the renderer.
#[derive(Debug, Error)]
pub enum DecorationError {
    #[error("unsupported logo reference: {0}")]
    Unsupported(String),
    #[error("remote logo {0} is not available offline")]
    Remote(String),
    #[error("logo bytes are not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("failed to read logo {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode logo image: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExportError::EmptyDataset.code(), "no_data");
        assert_eq!(ExportError::Document("x".into()).code(), "pdf_failed");
        assert_eq!(ExportError::EmptyDataset.to_string(), "no data to export");
    }
}
