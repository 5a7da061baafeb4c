//! Shared data model for name-anchored signature stamping
//!
//! Types flow leaf to root: extracted [`TextFragment`]s are scanned into a
//! [`SignaturePosition`], which becomes a [`PlacementRect`] for the mutator.

pub mod types;

pub use types::{
    ImageFormat, PageFragments, PageIndex, PageNumber, PlacementRect, SignErrorKind,
    SignOutcome, SignatureKind, SignaturePosition, SignatureRequest, TextFragment, TypesError,
};
