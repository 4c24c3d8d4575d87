//! Result types produced by document assembly, analysis and submission.

use crate::error::AnalysisError;
use crate::pipeline::layout::{PageLayout, PixelRect};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What was drawn on one page of the generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    pub caption: String,
    /// Region of the source image shown on this page.
    pub source: PixelRect,
    pub layout: PageLayout,
}

/// A plan PDF written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub path: PathBuf,
    /// Source image dimensions in pixels.
    pub image_width: u32,
    pub image_height: u32,
    pub pages: Vec<PageSummary>,
    pub byte_len: usize,
    pub render_duration_ms: u64,
}

impl GeneratedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Text returned by an analysis client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Outcome of one analysis request.
///
/// Never an `Err`: failures are carried in `error` so the generated PDF can
/// still be offered when the model could not be reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Model output, verbatim. Empty on failure.
    pub text: String,
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<AnalysisError>,
}

impl AnalysisResult {
    pub fn success(model: impl Into<String>, response: AnalysisResponse, duration_ms: u64) -> Self {
        Self {
            text: response.text,
            model: model.into(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: AnalysisError, duration_ms: u64) -> Self {
        Self {
            text: String::new(),
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// What to show the user: the model's text, or `Error: …`.
    pub fn display_text(&self) -> String {
        match &self.error {
            Some(e) => format!("Error: {e}"),
            None => self.text.clone(),
        }
    }
}

/// Everything one submit action produced. The scratch files are gone by the
/// time the caller sees this; the PDF survives only as `pdf_bytes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// Suggested file name for the PDF download.
    pub file_name: String,
    #[serde(skip)]
    pub pdf_bytes: Vec<u8>,
    pub image_width: u32,
    pub image_height: u32,
    pub pages: Vec<PageSummary>,
    /// `None` when only the PDF was requested.
    pub analysis: Option<AnalysisResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_display_is_verbatim() {
        let r = AnalysisResult::success(
            "gemini-2.5-flash",
            AnalysisResponse {
                text: "  Spacious 3BHK.\n".into(),
                input_tokens: 10,
                output_tokens: 4,
            },
            12,
        );
        assert!(r.is_success());
        assert_eq!(r.display_text(), "  Spacious 3BHK.\n");
    }

    #[test]
    fn failure_display_is_prefixed() {
        let r = AnalysisResult::failure("gemini-2.5-flash", AnalysisError::EmptyPrompt, 0);
        assert!(!r.is_success());
        assert_eq!(r.display_text(), "Error: Prompt text cannot be empty.");
    }

    #[test]
    fn analysis_result_serialises_error() {
        let r = AnalysisResult::failure("m", AnalysisError::MissingApiKey, 0);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("MissingApiKey"), "got: {json}");
    }
}
