use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: u32, page_count: usize },

    #[error("Invalid signature image: {0}")]
    Image(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
