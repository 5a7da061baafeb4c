//! Locating the signer's printed name after the end-of-body marker
//!
//! A name may be drawn by one text operator or split over several
//! consecutive ones (`"Ngu"` + `"yen Van A"`). [`ScanState`] stitches such
//! runs together one fragment at a time and remembers where the run started.
//! A run may continue onto the next page; the match is reported on the page
//! where it started.

use crate::error::SignError;
use crate::marker::EndMarker;
use shared_pdf::PdfError;
use shared_types::{PageFragments, PageNumber, SignaturePosition, TextFragment};
use tracing::debug;

/// A partially matched name spread over consecutive fragments
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRun {
    /// Concatenated text so far, left-trimmed at the run start
    pub prefix: String,
    pub start_x: f64,
    pub start_y: f64,
    pub start_page: PageNumber,
    /// Sum of the widths of the fragments in the run
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    /// Body text; names seen here are ignored
    #[default]
    SeekingMarker,
    SeekingName {
        pending: Option<PendingRun>,
    },
    Matched(SignaturePosition),
}

enum Extension {
    Matched(SignaturePosition),
    Pending(PendingRun),
    Broken,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the end-of-body marker has been seen. Never moves backwards.
    pub fn marker_found(&mut self) {
        if let ScanState::SeekingMarker = self {
            *self = ScanState::SeekingName { pending: None };
        }
    }

    pub fn marker_seen(&self) -> bool {
        !matches!(self, ScanState::SeekingMarker)
    }

    pub fn position(&self) -> Option<SignaturePosition> {
        match self {
            ScanState::Matched(position) => Some(*position),
            _ => None,
        }
    }

    /// Feed one fragment. Returns the position once the name is matched.
    ///
    /// `target` must already be trimmed. Fragments are ignored until
    /// [`marker_found`](Self::marker_found) and after a match.
    pub fn step(&mut self, fragment: &TextFragment, target: &str) -> Option<SignaturePosition> {
        let pending = match self {
            ScanState::SeekingMarker => return None,
            ScanState::Matched(position) => return Some(*position),
            ScanState::SeekingName { pending } => pending,
        };

        if fragment.trimmed() == target {
            let position = SignaturePosition {
                x: fragment.x,
                y: fragment.y,
                page: fragment.page,
                matched_width: fragment.width,
                matched_height: fragment.height,
            };
            *self = ScanState::Matched(position);
            return Some(position);
        }

        match extend(pending.take(), fragment, target) {
            Extension::Matched(position) => {
                *self = ScanState::Matched(position);
                Some(position)
            }
            Extension::Pending(run) => {
                *pending = Some(run);
                None
            }
            Extension::Broken => None,
        }
    }
}

/// Try to grow `run` (or start a new one) with `fragment`
fn extend(run: Option<PendingRun>, fragment: &TextFragment, target: &str) -> Extension {
    let continuing = run.is_some();
    let (candidate, start_x, start_y, start_page, width) = match run {
        Some(run) => (
            run.prefix + &fragment.text,
            run.start_x,
            run.start_y,
            run.start_page,
            run.width,
        ),
        None => (
            fragment.text.trim_start().to_string(),
            fragment.x,
            fragment.y,
            fragment.page,
            0.0,
        ),
    };

    let head = candidate.trim_end();
    if head.is_empty() || !target.starts_with(head) {
        if continuing {
            debug!("Partial name run broken at {:?}", fragment.text);
        }
        return Extension::Broken;
    }

    let width = width + fragment.width;
    if head == target {
        return Extension::Matched(SignaturePosition {
            x: start_x,
            y: start_y,
            page: start_page,
            matched_width: width,
            matched_height: fragment.height,
        });
    }

    Extension::Pending(PendingRun {
        prefix: candidate,
        start_x,
        start_y,
        start_page,
        width,
    })
}

/// Scan pages in order for the signer using the default `./.` marker
pub fn locate_signer<I>(pages: I, target: &str) -> Result<SignaturePosition, SignError>
where
    I: IntoIterator<Item = Result<PageFragments, PdfError>>,
{
    locate_signer_with(pages, target, &EndMarker::default())
}

/// Scan pages in order for the signer, stopping at the first page with a match.
///
/// Pages after the match are never pulled from `pages`.
pub fn locate_signer_with<I>(
    pages: I,
    target: &str,
    marker: &EndMarker,
) -> Result<SignaturePosition, SignError>
where
    I: IntoIterator<Item = Result<PageFragments, PdfError>>,
{
    let target = target.trim();
    if target.is_empty() {
        return Err(SignError::InvalidRequest(
            "signer name must not be empty".to_string(),
        ));
    }

    let mut state = ScanState::new();

    for page in pages {
        let page = page.map_err(SignError::ExtractionFailed)?;

        let start = if state.marker_seen() {
            0
        } else {
            match marker.detect(&page.fragments, 0) {
                Some(index) => {
                    debug!("End marker found on page {} at fragment {}", page.page, index);
                    state.marker_found();
                    index + 1
                }
                None => continue,
            }
        };

        for fragment in &page.fragments[start..] {
            if let Some(position) = state.step(fragment, target) {
                debug!(
                    "Matched signer on page {} at ({}, {})",
                    position.page, position.x, position.y
                );
                return Ok(position);
            }
        }
    }

    if state.marker_seen() {
        Err(SignError::NameNotFound {
            name: target.to_string(),
        })
    } else {
        Err(SignError::MarkerNotFound {
            token: marker.token().to_string(),
        })
    }
}
