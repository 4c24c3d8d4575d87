//! Error types for the planlens library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PlanError`] — **Fatal**: no document can be produced (missing or
//!   undecodable image, render failure, bad configuration). Returned as
//!   `Err(PlanError)` from the assembly and session entry points.
//!
//! * [`AnalysisError`] — **Non-fatal**: the PDF exists but the vision model
//!   could not describe it (missing key, empty prompt, quota, network).
//!   Stored inside [`crate::output::AnalysisResult`] so the generated PDF is
//!   still delivered and the caller decides how to present the failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`PlanError`], used by the shell to decide
/// whether analysis may proceed and how to word the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source image is missing, unreadable or not a JPEG/PNG raster.
    ImageDecode,
    /// Normalising, cropping, drawing or serialising the PDF failed.
    Render,
    /// Invalid builder settings.
    Config,
    /// Staging the upload or writing the output document failed.
    Io,
}

/// All fatal errors returned by the planlens library.
#[derive(Debug, Error)]
pub enum PlanError {
    // ── Image errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Input image file not found at '{path}'")]
    ImageNotFound { path: PathBuf },

    /// Process does not have read permission on the image.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Content sniffing found a raster format other than JPEG or PNG.
    #[error("Unsupported image format {detected} in '{path}': upload a JPEG or PNG plan")]
    UnsupportedFormat { path: PathBuf, detected: String },

    /// The bytes could not be decoded as an image.
    #[error("Error opening image '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// Decoding succeeded but produced an image with no pixels.
    #[error("Image '{path}' has zero size ({width}x{height})")]
    EmptyImage {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Drawing or serialising the PDF failed.
    #[error("Failed to render plan PDF: {detail}")]
    Render { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scratch directory I/O failed: creating it, staging the upload, or
    /// reading the generated PDF back.
    #[error("Scratch file I/O failed at '{path}': {source}")]
    ScratchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (runtime creation, panicked blocking task).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlanError {
    /// Classify the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            PlanError::ImageNotFound { .. }
            | PlanError::PermissionDenied { .. }
            | PlanError::UnsupportedFormat { .. }
            | PlanError::ImageDecode { .. }
            | PlanError::EmptyImage { .. } => FailureKind::ImageDecode,
            PlanError::Render { .. } | PlanError::Internal(_) => FailureKind::Render,
            PlanError::InvalidConfig(_) => FailureKind::Config,
            PlanError::OutputWriteFailed { .. } | PlanError::ScratchFailed { .. } => {
                FailureKind::Io
            }
        }
    }

    pub(crate) fn render(detail: impl std::fmt::Display) -> Self {
        PlanError::Render {
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal error describing why analysis could not be produced.
///
/// Precondition failures (`MissingApiKey`, `DocumentNotFound`, `EmptyPrompt`)
/// are detected before any network traffic; everything else comes back from
/// the analysis client.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum AnalysisError {
    // ── Precondition errors ───────────────────────────────────────────────
    #[error("Gemini API key not provided.")]
    MissingApiKey,

    #[error("PDF file not found at {path}")]
    DocumentNotFound { path: PathBuf },

    #[error("Prompt text cannot be empty.")]
    EmptyPrompt,

    #[error("Failed to read PDF '{path}': {detail}")]
    DocumentReadFailed { path: PathBuf, detail: String },

    // ── Client errors ─────────────────────────────────────────────────────
    /// 401/403 from the provider.
    #[error("Authentication error from provider '{provider}': {detail}. Check API key and model access.")]
    AuthError { provider: String, detail: String },

    /// 429 from the provider.
    #[error("Rate limit exceeded for provider '{provider}': {detail}{}", retry_hint(.retry_after_secs))]
    RateLimitExceeded {
        provider: String,
        detail: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Analysis request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Could not reach provider '{provider}': {detail}")]
    Connection { provider: String, detail: String },

    /// Any other non-success status or malformed body.
    #[error("Error interacting with {provider} API: {message}. Check API key and model access.")]
    ApiError {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The model answered without any text (safety block, empty candidate).
    #[error("{provider} returned no text{}", reason_hint(.reason))]
    EmptyResponse {
        provider: String,
        reason: Option<String>,
    },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!("; retry after {secs}s"),
        None => String::new(),
    }
}

fn reason_hint(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}

impl AnalysisError {
    /// `true` for failures detected before any network call.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingApiKey
                | AnalysisError::DocumentNotFound { .. }
                | AnalysisError::EmptyPrompt
        )
    }
}
