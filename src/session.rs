//! Submit action: uploaded bytes in, PDF bytes and analysis out.
//!
//! Each call stages the upload in its own scratch directory, assembles the
//! plan PDF there, reads it back for download and, for [`submit`], asks the
//! vision model about it. The scratch directory is dropped before the call
//! returns, whatever the outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use planlens::{submit, GeminiClient, PlanConfig, PlanType};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let upload = std::fs::read("plan.png")?;
//! let config = PlanConfig::default();
//! let client = GeminiClient::from_config(&config)?;
//! let outcome = submit(
//!     &upload,
//!     "my-api-key",
//!     PlanType::FloorPlan.default_prompt(),
//!     &client,
//!     &config,
//! )
//! .await?;
//! std::fs::write(&outcome.file_name, &outcome.pdf_bytes)?;
//! if let Some(analysis) = outcome.analysis {
//!     println!("{}", analysis.display_text());
//! }
//! # Ok(())
//! # }
//! ```

use crate::analyze::request_analysis;
use crate::assemble::assemble_plan_document;
use crate::config::{PlanConfig, DOWNLOAD_FILE_NAME};
use crate::error::PlanError;
use crate::output::SubmitOutcome;
use crate::pipeline::input::Scratch;
use crate::pipeline::llm::AnalysisClient;
use tracing::info;

/// Build the plan PDF for `upload` without analysing it.
pub async fn generate_pdf(upload: &[u8], config: &PlanConfig) -> Result<SubmitOutcome, PlanError> {
    let scratch = Scratch::stage(upload, config.scratch_root.as_deref())?;
    build_outcome(&scratch, config).await
}

/// Build the plan PDF for `upload` and request its analysis.
///
/// Returns `Err` only when no PDF could be produced. Analysis failures,
/// including a missing key or a blank prompt, are reported in
/// [`SubmitOutcome::analysis`] next to the PDF bytes.
pub async fn submit(
    upload: &[u8],
    api_key: &str,
    prompt: &str,
    client: &dyn AnalysisClient,
    config: &PlanConfig,
) -> Result<SubmitOutcome, PlanError> {
    let scratch = Scratch::stage(upload, config.scratch_root.as_deref())?;
    let mut outcome = build_outcome(&scratch, config).await?;

    let analysis =
        request_analysis(client, api_key, scratch.document_path(), prompt, config).await;
    info!(
        "Submit complete: {} byte PDF, analysis {}",
        outcome.pdf_bytes.len(),
        if analysis.is_success() { "ok" } else { "failed" }
    );
    outcome.analysis = Some(analysis);
    Ok(outcome)
}

async fn build_outcome(scratch: &Scratch, config: &PlanConfig) -> Result<SubmitOutcome, PlanError> {
    let doc = assemble_plan_document(scratch.image_path(), scratch.document_path(), config).await?;

    let pdf_bytes = tokio::fs::read(&doc.path)
        .await
        .map_err(|source| PlanError::ScratchFailed {
            path: doc.path.clone(),
            source,
        })?;

    Ok(SubmitOutcome {
        file_name: DOWNLOAD_FILE_NAME.to_string(),
        pdf_bytes,
        image_width: doc.image_width,
        image_height: doc.image_height,
        pages: doc.pages,
        analysis: None,
    })
}

/// Synchronous wrapper around [`generate_pdf`].
pub fn generate_pdf_sync(upload: &[u8], config: &PlanConfig) -> Result<SubmitOutcome, PlanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PlanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_pdf(upload, config))
}

/// Synchronous wrapper around [`submit`].
pub fn submit_sync(
    upload: &[u8],
    api_key: &str,
    prompt: &str,
    client: &dyn AnalysisClient,
    config: &PlanConfig,
) -> Result<SubmitOutcome, PlanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PlanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(submit(upload, api_key, prompt, client, config))
}
