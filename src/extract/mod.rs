//! Content extraction - turn uploaded bytes into searchable plain text.
//!
//! Dispatch is by declared MIME type only; the decoders never see the
//! record. All decoding is synchronous and CPU-bound - callers run it on
//! the blocking pool (see `worker`).

pub mod docx;
pub mod pdf;

use thiserror::Error;

/// MIME type of .docx Word documents
pub const WORD_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Typed extraction failure; always carries a human-readable message.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    #[error("word extraction failed: {0}")]
    Docx(String),
}

/// Extract plain text from raw bytes for the given declared MIME type.
///
/// Unrecognized types are not an error: they yield empty text and the
/// record stays searchable by name only.
pub fn extract_text(bytes: &[u8], declared_type: &str) -> Result<String, ExtractError> {
    match declared_type {
        t if t == "text/plain" || t.starts_with("text/") => Ok(decode_plain_text(bytes)),
        "application/pdf" => pdf::extract_pdf_text(bytes),
        WORD_MIME => docx::extract_docx_text(bytes),
        _ => Ok(String::new()),
    }
}

/// Decode text bytes: UTF-8 first, GB18030 as a legacy fallback.
///
/// Plain text never fails extraction; undecodable bytes degrade to
/// replacement characters.
fn decode_plain_text(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let (decoded, _, had_errors) = encoding_rs::GB18030.decode(bytes);
    if !had_errors {
        return decoded.to_string();
    }

    String::from_utf8_lossy(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_utf8() {
        let text = extract_text("This is a test.".as_bytes(), "text/plain").unwrap();
        assert_eq!(text, "This is a test.");
    }

    #[test]
    fn test_plain_text_never_errors() {
        // invalid UTF-8 degrades instead of failing
        let text = extract_text(&[0xff, 0xfe, 0xfd], "text/plain").unwrap();
        assert!(!text.is_empty());
    }

    #[test]
    fn test_gb18030_fallback() {
        // "测试" encoded as GB18030
        let bytes = [0xb2, 0xe2, 0xca, 0xd4];
        let text = extract_text(&bytes, "text/plain").unwrap();
        assert_eq!(text, "测试");
    }

    #[test]
    fn test_unknown_type_yields_empty() {
        let text = extract_text(&[0x01, 0x02, 0x03], "application/octet-stream").unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let err = extract_text(b"not a pdf at all", "application/pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_corrupt_docx_is_error() {
        let err = extract_text(b"not a zip container", WORD_MIME).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }
}
