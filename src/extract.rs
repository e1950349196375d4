use crate::error::RelayError;
use crate::spool::SpooledUpload;

/// Hard cap on uploaded file size. Larger uploads are rejected by the
/// gateway before anything is staged.
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

/// The two media types the relay accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
}

impl MediaType {
    /// Match a declared media type against the allowlist. Parameters such
    /// as `; charset=utf-8` are ignored.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let essence = declared.split(';').next().unwrap_or("").trim();
        match essence {
            "text/plain" => Some(Self::PlainText),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// One uploaded file, staged on disk for the duration of the request.
pub struct UploadedFile {
    pub spool: SpooledUpload,
    pub media_type: MediaType,
    pub size_bytes: u64,
    pub original_name: String,
}

/// Extract plain text from a staged upload.
///
/// Plain text decodes as strict UTF-8, verbatim. PDFs go through
/// `pdf-extract` on the blocking pool; extraction order is the parser's
/// reading order. The staged blob is left in place; the caller owns
/// cleanup so it happens on every path, not just this one.
pub async fn extract(file: &UploadedFile) -> Result<String, RelayError> {
    let data = file
        .spool
        .read()
        .await
        .map_err(|e| RelayError::ParseFailure(e.to_string()))?;

    match file.media_type {
        MediaType::PlainText => String::from_utf8(data)
            .map_err(|e| RelayError::ParseFailure(format!("invalid UTF-8 in text upload: {e}"))),
        MediaType::Pdf => {
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&data)
            })
            .await
            .map_err(|e| RelayError::ParseFailure(format!("extraction task failed: {e}")))?
            .map_err(|e| RelayError::ParseFailure(format!("failed to parse PDF: {e}")))?;
            Ok(text)
        }
    }
}
