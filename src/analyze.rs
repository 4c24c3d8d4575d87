//! Analysis request: send a generated plan PDF to the vision model.
//!
//! [`request_analysis`] never fails. Preconditions (API key, document,
//! prompt) are checked first and short-circuit without touching the network;
//! every client failure is folded into [`AnalysisResult::error`].

use crate::config::PlanConfig;
use crate::error::{AnalysisError, PlanError};
use crate::output::AnalysisResult;
use crate::pipeline::llm::{AnalysisClient, AnalysisRequest, PDF_MIME_TYPE};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ask `client` to analyse the PDF at `document_path` using `prompt_text`.
///
/// # Arguments
/// * `client`        — the vision model client; see [`crate::GeminiClient`]
/// * `api_key`       — provider API key; surrounding whitespace is ignored
/// * `document_path` — the generated plan PDF
/// * `prompt_text`   — analysis instructions, sent verbatim
/// * `config`        — supplies the progress callback
pub async fn request_analysis(
    client: &dyn AnalysisClient,
    api_key: &str,
    document_path: impl AsRef<Path>,
    prompt_text: &str,
    config: &PlanConfig,
) -> AnalysisResult {
    let start = Instant::now();
    let model = client.model().to_string();
    let document_path = document_path.as_ref();

    // ── Preconditions: no network traffic on failure ─────────────────────
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return AnalysisResult::failure(model, AnalysisError::MissingApiKey, 0);
    }
    if !document_path.is_file() {
        return AnalysisResult::failure(
            model,
            AnalysisError::DocumentNotFound {
                path: document_path.to_path_buf(),
            },
            0,
        );
    }
    if prompt_text.trim().is_empty() {
        return AnalysisResult::failure(model, AnalysisError::EmptyPrompt, 0);
    }

    let document = match tokio::fs::read(document_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AnalysisResult::failure(
                model,
                AnalysisError::DocumentReadFailed {
                    path: document_path.to_path_buf(),
                    detail: e.to_string(),
                },
                start.elapsed().as_millis() as u64,
            )
        }
    };

    info!(
        "Requesting analysis from {} ({} byte PDF)",
        model,
        document.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(&model);
    }

    let outcome = client
        .analyze(AnalysisRequest {
            api_key,
            document: &document,
            mime_type: PDF_MIME_TYPE,
            prompt: prompt_text,
        })
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(outcome.is_ok());
    }

    match outcome {
        Ok(response) => {
            debug!(
                "Analysis: {} chars, {} in / {} out tokens, {}ms",
                response.text.len(),
                response.input_tokens,
                response.output_tokens,
                duration_ms
            );
            AnalysisResult::success(model, response, duration_ms)
        }
        Err(e) => {
            warn!("Analysis failed after {}ms: {}", duration_ms, e);
            AnalysisResult::failure(model, e, duration_ms)
        }
    }
}

/// Synchronous wrapper around [`request_analysis`].
///
/// Creates a temporary tokio runtime internally. Only runtime creation can
/// fail; analysis failures are inside the returned result.
pub fn request_analysis_sync(
    client: &dyn AnalysisClient,
    api_key: &str,
    document_path: impl AsRef<Path>,
    prompt_text: &str,
    config: &PlanConfig,
) -> Result<AnalysisResult, PlanError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| PlanError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(request_analysis(
        client,
        api_key,
        document_path,
        prompt_text,
        config,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AnalysisResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeClient {
        calls: AtomicUsize,
        seen_prompt: Mutex<Option<String>>,
        reply: Result<AnalysisResponse, AnalysisError>,
    }

    impl FakeClient {
        fn replying(reply: Result<AnalysisResponse, AnalysisError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen_prompt: Mutex::new(None),
                reply,
            }
        }

        fn ok(text: &str) -> Self {
            Self::replying(Ok(AnalysisResponse {
                text: text.to_string(),
                input_tokens: 5,
                output_tokens: 7,
            }))
        }
    }

    #[async_trait]
    impl AnalysisClient for FakeClient {
        fn provider(&self) -> &str {
            "fake"
        }

        fn model(&self) -> &str {
            "fake-vision"
        }

        async fn analyze(
            &self,
            request: AnalysisRequest<'_>,
        ) -> Result<AnalysisResponse, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.mime_type, "application/pdf");
            assert!(request.document.starts_with(b"%PDF"));
            *self.seen_prompt.lock().unwrap() = Some(request.prompt.to_string());
            self.reply.clone()
        }
    }

    fn fake_pdf() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"%PDF-1.5\n%%EOF\n").unwrap();
        file
    }

    #[tokio::test]
    async fn blank_prompt_never_calls_client() {
        let pdf = fake_pdf();
        let client = FakeClient::ok("unused");
        let result =
            request_analysis(&client, "key", pdf.path(), "  \n\t ", &PlanConfig::default()).await;

        assert_eq!(result.error, Some(AnalysisError::EmptyPrompt));
        assert_eq!(result.display_text(), "Error: Prompt text cannot be empty.");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_key_never_calls_client() {
        let pdf = fake_pdf();
        let client = FakeClient::ok("unused");
        let result = request_analysis(&client, " ", pdf.path(), "Describe", &PlanConfig::default()).await;

        assert_eq!(result.error, Some(AnalysisError::MissingApiKey));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_document_never_calls_client() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::ok("unused");
        let result = request_analysis(
            &client,
            "key",
            dir.path().join("generated_plan.pdf"),
            "Describe",
            &PlanConfig::default(),
        )
        .await;

        assert!(matches!(result.error, Some(AnalysisError::DocumentNotFound { .. })));
        assert!(result.display_text().starts_with("Error: PDF file not found at"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn success_text_is_returned_verbatim() {
        let pdf = fake_pdf();
        let client = FakeClient::ok("Spacious 3BHK with balcony.");
        let result = tokio_test::block_on(request_analysis(
            &client,
            "key",
            pdf.path(),
            "Describe this plan",
            &PlanConfig::default(),
        ));

        assert!(result.is_success());
        assert_eq!(result.display_text(), "Spacious 3BHK with balcony.");
        assert_eq!(result.model, "fake-vision");
        assert_eq!((result.input_tokens, result.output_tokens), (5, 7));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            client.seen_prompt.lock().unwrap().as_deref(),
            Some("Describe this plan")
        );
    }

    #[tokio::test]
    async fn client_error_becomes_result_error() {
        let pdf = fake_pdf();
        let client = FakeClient::replying(Err(AnalysisError::RateLimitExceeded {
            provider: "fake".into(),
            detail: "quota exhausted".into(),
            retry_after_secs: Some(30),
        }));
        let result =
            request_analysis(&client, "key", pdf.path(), "Describe", &PlanConfig::default()).await;

        assert!(!result.is_success());
        assert!(result.text.is_empty());
        assert!(result.display_text().starts_with("Error: Rate limit exceeded"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sync_wrapper_returns_result() {
        let pdf = fake_pdf();
        let client = FakeClient::ok("ok");
        let result =
            request_analysis_sync(&client, "key", pdf.path(), "Describe", &PlanConfig::default())
                .unwrap();
        assert_eq!(result.text, "ok");
    }
}
