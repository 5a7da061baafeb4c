//! PDF collaborators for signature stamping
//!
//! Positioned text extraction, image embedding and the coordinate helpers
//! both of them share. Everything here works on lopdf documents loaded from
//! bytes; nothing touches the filesystem.

pub mod coords;
pub mod error;
pub mod fonts;
pub mod fragments;
pub mod image;
pub mod stamp;

pub use coords::{flip_y, Matrix};
pub use error::PdfError;
pub use fragments::{FragmentPages, FragmentSource, LopdfFragmentSource};
pub use crate::image::identify_image_format;
pub use stamp::{DocumentMutator, LopdfStamper};
