//! Diagnosis pipeline: encodes a stored leaf image and submits it with
//! the user's prompt to a multimodal vision-language model.

pub mod client;
pub mod prompt;

pub use client::*;
pub use prompt::*;

use std::path::Path;

use base64::Engine as _;
use thiserror::Error;

use crate::pipeline::format::detect_image_mime;

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot reach the inference endpoint: {0}")]
    Connection(String),

    #[error("Inference request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Inference API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed inference response: {0}")]
    ResponseParsing(String),

    #[error("Inference response contained no text")]
    EmptyResponse,
}

impl DiagnosisError {
    /// User-facing rendering: the same shape the result panel has always
    /// shown, so the typed error changes nothing on screen.
    pub fn display_text(&self) -> String {
        format!("Error during analysis: {self}")
    }
}

/// Read the image at `path`, encode it, and ask the vision model for a
/// diagnosis. The returned text is the model's response verbatim.
pub fn diagnose(
    client: &dyn VisionClient,
    image_path: &Path,
    prompt: &str,
) -> Result<String, DiagnosisError> {
    let _span = tracing::info_span!(
        "diagnose",
        image = %image_path.display(),
        prompt_len = prompt.len(),
    )
    .entered();
    let start = std::time::Instant::now();

    let bytes = std::fs::read(image_path)?;
    let mime_type = detect_image_mime(&bytes);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

    let text = client.describe_image(prompt, mime_type, &encoded)?;

    tracing::info!(
        mime_type,
        image_size = bytes.len(),
        elapsed_ms = %start.elapsed().as_millis(),
        response_len = text.len(),
        "Diagnosis received"
    );
    Ok(text)
}
