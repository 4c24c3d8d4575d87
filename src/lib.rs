//! # planlens
//!
//! Turn a floor-plan or master-plan image into a five-page PDF and ask a
//! vision model to describe it.
//!
//! ## Why this crate?
//!
//! Vision models read small labels on a large plan poorly when the whole
//! sheet is downscaled into one image. This crate lays the plan out as an
//! overview page followed by four quadrant close-ups, each scaled to fill a
//! page, and sends that PDF to Gemini together with a sales-oriented prompt.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JPEG/PNG
//!  │
//!  ├─ 1. Input    sniff format from content, decode, stage in scratch dir
//!  ├─ 2. Layout   scale-to-fit placement + four quadrant rectangles
//!  ├─ 3. Render   5 captioned pages via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 4. Analyse  PDF + prompt → Gemini generateContent
//!  └─ 5. Output   PDF bytes + analysis text, scratch dir removed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use planlens::{assemble_plan_document, request_analysis, GeminiClient, PlanConfig, PlanType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlanConfig::default();
//!     let doc = assemble_plan_document("plan.jpg", "generated_plan.pdf", &config).await?;
//!     eprintln!("{} pages, {} bytes", doc.page_count(), doc.byte_len);
//!
//!     let client = GeminiClient::from_config(&config)?;
//!     let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
//!     let result = request_analysis(
//!         &client,
//!         &key,
//!         &doc.path,
//!         PlanType::MasterPlan.default_prompt(),
//!         &config,
//!     )
//!     .await;
//!     println!("{}", result.display_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `planlens` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! planlens = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod assemble;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{request_analysis, request_analysis_sync};
pub use assemble::{assemble_plan_document, assemble_plan_document_sync, render_plan_pdf, RenderedPlan};
pub use config::{resolve_api_key, PlanConfig, PlanConfigBuilder, DOWNLOAD_FILE_NAME};
pub use error::{AnalysisError, FailureKind, PlanError};
pub use output::{AnalysisResponse, AnalysisResult, GeneratedDocument, PageSummary, SubmitOutcome};
pub use pipeline::layout::{
    compute_full_page_layout, compute_quadrants, PageLayout, PageSize, PixelRect, Quadrant,
};
pub use pipeline::llm::{AnalysisClient, AnalysisRequest, GeminiClient};
pub use progress::{NoopProgressCallback, PlanProgressCallback, ProgressCallback};
pub use prompts::{AnalysisPrompt, PlanType};
pub use session::{generate_pdf, generate_pdf_sync, submit, submit_sync};
