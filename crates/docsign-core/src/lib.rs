//! Name-anchored signature stamping
//!
//! Finds the signer's printed name below a document's end-of-body marker
//! and stamps a signature image relative to it:
//!
//! - [`marker`] detects the `./.` token that ends the body
//! - [`matcher`] stitches split text fragments into the signer's name
//! - [`placement`] turns the matched name into an image rectangle
//! - [`pipeline`] runs the whole request and never fails without
//!   returning the original document

pub mod config;
pub mod error;
pub mod marker;
pub mod matcher;
pub mod pipeline;
pub mod placement;

pub use config::{ConfigError, StampConfig};
pub use error::SignError;
pub use marker::{detect_end_marker, ends_body, EndMarker, DEFAULT_END_MARKER};
pub use matcher::{locate_signer, locate_signer_with, PendingRun, ScanState};
pub use pipeline::{sign_document, SignaturePipeline, SUCCESS_MESSAGE};
pub use placement::{compute_placement, PlacementConfig, StampSize};

// Re-export the data model so callers need a single dependency
pub use shared_types::{
    ImageFormat, PageFragments, PageIndex, PageNumber, PlacementRect, SignErrorKind,
    SignOutcome, SignatureKind, SignaturePosition, SignatureRequest, TextFragment,
};
