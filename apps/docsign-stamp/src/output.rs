//! Output file naming and JSON rendering

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docsign_core::{SignErrorKind, SignOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Directory signed documents go to when `--output` is not given
pub const OUTPUT_DIR_ENV: &str = "DOCSIGN_OUTPUT_DIR";

/// `contract.pdf` becomes `contract-signed.pdf`
pub fn signed_file_name(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{}-signed.pdf", stem)
}

/// Pick the output path: explicit flag, then the output directory, then
/// next to the input document.
pub fn resolve_output_path(
    document: &Path,
    explicit: Option<&Path>,
    output_dir: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| document.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(signed_file_name(document))
}

/// [`SignOutcome`] as printed by `--json`, with the document base64-encoded
#[derive(Debug, Serialize)]
pub struct JsonOutcome {
    pub success: bool,
    pub message: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SignErrorKind>,
}

impl From<&SignOutcome> for JsonOutcome {
    fn from(outcome: &SignOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message.clone(),
            data: STANDARD.encode(&outcome.data),
            error: outcome.error,
        }
    }
}
