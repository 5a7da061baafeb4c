//! docsign-stamp: stamp a signature image onto a PDF
//!
//! Finds the signer's printed name below the document's `./.` marker and
//! draws the signature image above it (primary) or beside it (counter).

use anyhow::{Context, Result};
use clap::Parser;
use docsign_core::{sign_document, SignatureKind, SignatureRequest, StampConfig};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod output;

use output::{resolve_output_path, JsonOutcome, OUTPUT_DIR_ENV};

#[derive(Parser, Debug)]
#[command(name = "docsign-stamp")]
#[command(version, about = "Stamp a signature image next to the signer's name in a PDF")]
struct Args {
    /// PDF document to sign
    #[arg(short, long)]
    document: PathBuf,

    /// Signature image (PNG or JPEG)
    #[arg(short, long)]
    signature: PathBuf,

    /// Signer name exactly as printed in the document
    #[arg(short, long)]
    name: String,

    /// Signature kind: primary (above the name) or counter (right of it)
    #[arg(short, long, default_value = "primary")]
    kind: SignatureKind,

    /// Output path (default: <document>-signed.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with stamp sizes and the end marker
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON with the document base64-encoded
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docsign_stamp=info,docsign_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StampConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StampConfig::default(),
    };

    let document = fs::read(&args.document)
        .with_context(|| format!("Failed to read document {}", args.document.display()))?;
    let signature_image = fs::read(&args.signature)
        .with_context(|| format!("Failed to read signature {}", args.signature.display()))?;

    let output_dir = std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from);
    let output_path = resolve_output_path(
        &args.document,
        args.output.as_deref(),
        output_dir.as_deref(),
    );

    let outcome = sign_document(
        SignatureRequest {
            document,
            signature_image,
            signer_name: args.name.clone(),
            kind: args.kind,
        },
        &config,
    );

    if outcome.success {
        fs::write(&output_path, &outcome.data)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        info!("Wrote {}", output_path.display());
    }

    if args.json {
        let json = serde_json::to_string_pretty(&JsonOutcome::from(&outcome))?;
        println!("{}", json);
    } else if outcome.success {
        println!("{}: {}", outcome.message, output_path.display());
    } else {
        eprintln!("{}", outcome.message);
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
