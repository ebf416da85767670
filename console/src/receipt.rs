//! Receipt selection and preview
//!
//! A receipt is a single image (`.jpg`, `.jpeg`, `.png`) or PDF. When several
//! files are offered at once the first accepted one is taken.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use ticket_verifier_api::UploadFile;

/// Extensions accepted as receipts, lowercase
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// Errors raised while picking a receipt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// No file was offered
    #[error("Please upload a receipt")]
    Missing,

    /// None of the offered files has an accepted type
    #[error("Receipt must be an image (JPG, PNG) or a PDF")]
    UnsupportedType,

    /// The file could not be read from disk
    #[error("Could not read receipt {path}: {message}")]
    Unreadable {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        message: String,
    },
}

/// What kind of receipt was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    /// JPEG or PNG screenshot
    Image,
    /// PDF statement
    Pdf,
}

/// A selected receipt and its preview
#[derive(Clone, PartialEq, Eq)]
pub struct Receipt {
    /// File sent as the `receipt` multipart part
    pub file: UploadFile,
    /// Image or PDF
    pub kind: ReceiptKind,
    /// Inline `data:` URL for images; PDFs have none
    pub preview: Option<String>,
}

impl std::fmt::Debug for Receipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receipt")
            .field("file", &self.file)
            .field("kind", &self.kind)
            .field("preview", &self.preview.as_ref().map(String::len))
            .finish()
    }
}

impl Receipt {
    /// Accept a single file
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::UnsupportedType`] when the extension is not
    /// an accepted image or PDF type.
    pub fn from_file(file: UploadFile) -> Result<Self, ReceiptError> {
        let kind = kind_of(&file).ok_or(ReceiptError::UnsupportedType)?;
        let preview = match kind {
            ReceiptKind::Image => Some(format!(
                "data:{};base64,{}",
                mime_for(&file),
                STANDARD.encode(&file.bytes)
            )),
            ReceiptKind::Pdf => None,
        };
        Ok(Self {
            file,
            kind,
            preview,
        })
    }

    /// Take the first accepted file of a multi-file drop
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Missing`] for an empty selection, or
    /// [`ReceiptError::UnsupportedType`] when no file is accepted.
    pub fn pick(files: Vec<UploadFile>) -> Result<Self, ReceiptError> {
        if files.is_empty() {
            return Err(ReceiptError::Missing);
        }
        files
            .into_iter()
            .find(|file| kind_of(file).is_some())
            .ok_or(ReceiptError::UnsupportedType)
            .and_then(Self::from_file)
    }

    /// Read a receipt from disk
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Unreadable`] on I/O failure, or
    /// [`ReceiptError::UnsupportedType`] for other file types.
    pub fn load(path: &Path) -> Result<Self, ReceiptError> {
        let file = read_upload(path).map_err(|e| ReceiptError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_file(file)
    }

    /// File name shown next to the preview
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }
}

/// Read a file into an [`UploadFile`], guessing its content type from the
/// extension
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be read.
pub fn read_upload(path: &Path) -> std::io::Result<UploadFile> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let mut file = UploadFile::new(file_name, "application/octet-stream", bytes);
    file.content_type = mime_for(&file).to_string();
    Ok(file)
}

fn kind_of(file: &UploadFile) -> Option<ReceiptKind> {
    match file.extension()?.as_str() {
        "jpg" | "jpeg" | "png" => Some(ReceiptKind::Image),
        "pdf" => Some(ReceiptKind::Pdf),
        _ => None,
    }
}

fn mime_for(file: &UploadFile) -> &'static str {
    match file.extension().as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(name: &str) -> UploadFile {
        UploadFile::new(name, "application/octet-stream", b"abc".to_vec())
    }

    #[test]
    fn image_gets_inline_preview() {
        let receipt = Receipt::from_file(file("Venmo.PNG")).unwrap();
        assert_eq!(receipt.kind, ReceiptKind::Image);
        assert_eq!(receipt.preview.as_deref(), Some("data:image/png;base64,YWJj"));
    }

    #[test]
    fn pdf_has_no_preview() {
        let receipt = Receipt::from_file(file("statement.pdf")).unwrap();
        assert_eq!(receipt.kind, ReceiptKind::Pdf);
        assert!(receipt.preview.is_none());
    }

    #[test]
    fn pick_takes_first_accepted_file() {
        let receipt =
            Receipt::pick(vec![file("notes.txt"), file("a.jpeg"), file("b.png")]).unwrap();
        assert_eq!(receipt.file_name(), "a.jpeg");
    }

    #[test]
    fn pick_rejects_empty_and_unsupported() {
        assert_eq!(Receipt::pick(vec![]), Err(ReceiptError::Missing));
        assert_eq!(
            Receipt::pick(vec![file("receipt.heic"), file("README")]),
            Err(ReceiptError::UnsupportedType)
        );
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.jpg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"jpeg")
            .unwrap();

        let receipt = Receipt::load(&path).unwrap();
        assert_eq!(receipt.file.content_type, "image/jpeg");
        assert_eq!(receipt.file.bytes, b"jpeg");

        let missing = Receipt::load(&dir.path().join("missing.png"));
        assert!(matches!(missing, Err(ReceiptError::Unreadable { .. })));
    }
}
