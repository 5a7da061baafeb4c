use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("Page numbers are 1-based, got 0")]
    ZeroPageNumber,

    #[error("Fragment {text:?} has non-finite geometry")]
    NonFiniteGeometry { text: String },

    #[error("Unknown signature kind: {0}")]
    UnknownSignatureKind(String),

    #[error("Page index {0} has no 1-based page number")]
    PageIndexOverflow(u32),
}

/// 1-based page number, the convention used by text extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(number: u32) -> Result<Self, TypesError> {
        if number == 0 {
            return Err(TypesError::ZeroPageNumber);
        }
        Ok(Self(number))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Convert to the 0-based index used when mutating a document
    pub fn to_index(self) -> PageIndex {
        PageIndex(self.0 - 1)
    }
}

impl TryFrom<u32> for PageNumber {
    type Error = TypesError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageNumber> for u32 {
    fn from(page: PageNumber) -> Self {
        page.0
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 0-based page index, the convention used by the document mutator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageIndex(u32);

impl PageIndex {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn to_number(self) -> Result<PageNumber, TypesError> {
        self.0
            .checked_add(1)
            .map(PageNumber)
            .ok_or(TypesError::PageIndexOverflow(self.0))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A positioned run of text as drawn by one string-showing operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// Translation of the text rendering matrix at the start of the run
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: PageNumber,
}

impl TextFragment {
    /// Build a fragment, rejecting NaN/infinite geometry.
    ///
    /// Width and height are stored as magnitudes; mirrored text matrices
    /// produce negative extents that mean nothing to placement.
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        page: PageNumber,
    ) -> Result<Self, TypesError> {
        let text = text.into();
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(TypesError::NonFiniteGeometry { text });
        }
        Ok(Self {
            text,
            x,
            y,
            width: width.abs(),
            height: height.abs(),
            page,
        })
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// All fragments of one page, in content-stream order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFragments {
    pub page: PageNumber,
    pub fragments: Vec<TextFragment>,
}

impl PageFragments {
    pub fn new(page: PageNumber, fragments: Vec<TextFragment>) -> Self {
        Self { page, fragments }
    }
}

/// Where the signer's printed name was found
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignaturePosition {
    pub x: f64,
    pub y: f64,
    pub page: PageNumber,
    pub matched_width: f64,
    pub matched_height: f64,
}

/// Target box for the signature image, in PDF user space (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: PageNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    /// Main signer, stamped above the printed name
    Primary,
    /// Initialing / counter signer, stamped to the right of the name
    Counter,
}

impl SignatureKind {
    /// Numeric form used by older clients: `1` is primary, anything else counter
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            SignatureKind::Primary
        } else {
            SignatureKind::Counter
        }
    }
}

impl FromStr for SignatureKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Ok(Self::from_code(code));
        }
        match s.to_ascii_lowercase().as_str() {
            "primary" | "main" => Ok(SignatureKind::Primary),
            "counter" | "initial" => Ok(SignatureKind::Counter),
            _ => Err(TypesError::UnknownSignatureKind(s.to_string())),
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureKind::Primary => write!(f, "primary"),
            SignatureKind::Counter => write!(f, "counter"),
        }
    }
}

/// Raster formats accepted for signature images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Unknown,
}

/// One signing request; owned by a single caller, never shared
#[derive(Clone)]
pub struct SignatureRequest {
    pub document: Vec<u8>,
    pub signature_image: Vec<u8>,
    pub signer_name: String,
    pub kind: SignatureKind,
}

impl fmt::Debug for SignatureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureRequest")
            .field("document_len", &self.document.len())
            .field("signature_image_len", &self.signature_image.len())
            .field("signer_name", &self.signer_name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Machine-readable failure reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignErrorKind {
    MarkerNotFound,
    NameNotFound,
    ExtractionFailed,
    EmbeddingFailed,
    UnsupportedImageFormat,
    InvalidRequest,
}

/// Uniform result of a signing request.
///
/// `data` holds the signed document on success and the untouched input
/// bytes on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignOutcome {
    pub success: bool,
    pub message: String,
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SignErrorKind>,
}

impl SignOutcome {
    pub fn signed(message: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
        }
    }

    pub fn failed(kind: SignErrorKind, message: impl Into<String>, original: Vec<u8>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: original,
            error: Some(kind),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: page number and page index conversions are inverse
        #[test]
        fn page_number_index_inverse(n in 1u32..100_000) {
            let page = PageNumber::new(n).unwrap();
            prop_assert_eq!(page.to_index().get(), n - 1);
            prop_assert_eq!(page.to_index().to_number(), Ok(page));
        }

        /// Property: numeric kind strings agree with the numeric code
        #[test]
        fn numeric_kind_matches_code(code in -1000i64..1000) {
            let parsed: SignatureKind = code.to_string().parse().unwrap();
            prop_assert_eq!(parsed, SignatureKind::from_code(code));
        }

        /// Property: finite geometry always yields non-negative extents
        #[test]
        fn fragment_extents_non_negative(
            w in -1000.0f64..1000.0,
            h in -1000.0f64..1000.0,
        ) {
            let frag = TextFragment::new("a", 0.0, 0.0, w, h, PageNumber::FIRST).unwrap();
            prop_assert!(frag.width >= 0.0);
            prop_assert!(frag.height >= 0.0);
        }
    }
}
