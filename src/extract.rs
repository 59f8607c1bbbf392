//! Text extraction for the source document.
//!
//! The service is specified against a single PDF, so PDF is the primary
//! path; anything without a `.pdf` extension is treated as UTF-8 plain
//! text, which keeps local development and tests off binary fixtures.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("{path} is not valid UTF-8 text")]
    NotText { path: String },
}

/// Extracts the full plain text of the document at `path`.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Read {
        path: path.display().to_string(),
        source: e,
    })?;

    if is_pdf(path, &bytes) {
        extract_pdf(&bytes)
    } else {
        String::from_utf8(bytes).map_err(|_| ExtractError::NotText {
            path: path.display().to_string(),
        })
    }
}

fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
        || bytes.starts_with(b"%PDF-")
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_read_error() {
        let err = extract_text(Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Read { .. }));
    }

    #[test]
    fn plain_text_passes_through() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, "Paris is the capital of France.").unwrap();
        let text = extract_text(&path).unwrap();
        assert_eq!(text, "Paris is the capital of France.");
    }

    #[test]
    fn invalid_pdf_returns_pdf_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.pdf");
        std::fs::write(&path, "not a pdf").unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn non_utf8_text_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::NotText { .. }));
    }
}
