//! Signing pipeline: validate, extract, locate, place, embed
//!
//! Every request ends in a [`SignOutcome`]. Failures carry the untouched
//! input document so callers can always return *something* to the user.

use crate::config::StampConfig;
use crate::error::SignError;
use crate::marker::EndMarker;
use crate::matcher::locate_signer_with;
use crate::placement::compute_placement;
use shared_pdf::{
    identify_image_format, DocumentMutator, FragmentSource, LopdfFragmentSource, LopdfStamper,
};
use shared_types::{ImageFormat, SignOutcome, SignatureRequest};
use tracing::{debug, info, warn};

pub const SUCCESS_MESSAGE: &str = "Signature image added successfully";

/// Runs signing requests against a text source and a document mutator
#[derive(Debug, Clone)]
pub struct SignaturePipeline<S, M> {
    source: S,
    mutator: M,
    config: StampConfig,
}

impl Default for SignaturePipeline<LopdfFragmentSource, LopdfStamper> {
    fn default() -> Self {
        Self::new(
            LopdfFragmentSource::new(),
            LopdfStamper::new(),
            StampConfig::default(),
        )
    }
}

impl<S: FragmentSource, M: DocumentMutator> SignaturePipeline<S, M> {
    pub fn new(source: S, mutator: M, config: StampConfig) -> Self {
        Self {
            source,
            mutator,
            config,
        }
    }

    pub fn with_config(mut self, config: StampConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    /// Stamp the signature image next to the signer's name.
    ///
    /// Never panics on bad input and never returns partially modified bytes.
    pub fn sign(&self, request: SignatureRequest) -> SignOutcome {
        info!(
            "Signing request: signer={:?} kind={} document={} bytes",
            request.signer_name,
            request.kind,
            request.document.len()
        );

        match self.try_sign(&request) {
            Ok(signed) => {
                info!("Signed document: {} bytes", signed.len());
                SignOutcome::signed(SUCCESS_MESSAGE, signed)
            }
            Err(e) => {
                warn!("Signing failed: {}", e);
                SignOutcome::failed(e.kind(), e.to_string(), request.document)
            }
        }
    }

    fn try_sign(&self, request: &SignatureRequest) -> Result<Vec<u8>, SignError> {
        self.config
            .validate()
            .map_err(|e| SignError::InvalidRequest(e.to_string()))?;

        let target = request.signer_name.trim();
        if target.is_empty() {
            return Err(SignError::InvalidRequest(
                "signer name must not be empty".to_string(),
            ));
        }

        let format = identify_image_format(&request.signature_image);
        if format == ImageFormat::Unknown {
            return Err(SignError::UnsupportedImageFormat);
        }
        debug!("Signature image format: {:?}", format);

        let pages = self
            .source
            .pages(&request.document)
            .map_err(SignError::ExtractionFailed)?;
        let marker = EndMarker::new(self.config.end_marker.as_str());
        let position = locate_signer_with(pages, target, &marker)?;

        let rect = compute_placement(&position, request.kind, &self.config.placement);
        debug!(
            "Placing {} stamp at ({}, {}) {}x{} on page {}",
            request.kind, rect.x, rect.y, rect.width, rect.height, rect.page
        );

        self.mutator
            .embed_image(
                &request.document,
                &request.signature_image,
                format,
                &rect,
                rect.page.to_index(),
            )
            .map_err(SignError::EmbeddingFailed)
    }
}

/// Sign with the lopdf-backed collaborators
pub fn sign_document(request: SignatureRequest, config: &StampConfig) -> SignOutcome {
    SignaturePipeline::default()
        .with_config(config.clone())
        .sign(request)
}
