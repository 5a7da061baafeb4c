use shared_pdf::PdfError;
use shared_types::SignErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("End-of-body marker {token} not found in document")]
    MarkerNotFound { token: String },

    #[error("Signer name {name:?} not found in document")]
    NameNotFound { name: String },

    #[error("Failed to extract text: {0}")]
    ExtractionFailed(#[source] PdfError),

    #[error("Failed to embed signature image: {0}")]
    EmbeddingFailed(#[source] PdfError),

    #[error("Unsupported signature image format (expected PNG or JPEG)")]
    UnsupportedImageFormat,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SignError {
    pub fn kind(&self) -> SignErrorKind {
        match self {
            SignError::MarkerNotFound { .. } => SignErrorKind::MarkerNotFound,
            SignError::NameNotFound { .. } => SignErrorKind::NameNotFound,
            SignError::ExtractionFailed(_) => SignErrorKind::ExtractionFailed,
            SignError::EmbeddingFailed(_) => SignErrorKind::EmbeddingFailed,
            SignError::UnsupportedImageFormat => SignErrorKind::UnsupportedImageFormat,
            SignError::InvalidRequest(_) => SignErrorKind::InvalidRequest,
        }
    }
}
