//! Vision-model interaction: send the plan PDF and prompt, get text back.
//!
//! [`AnalysisClient`] is the seam between orchestration and the network. The
//! production implementation, [`GeminiClient`], speaks the Gemini
//! `generateContent` REST API directly with `reqwest`: the PDF travels as
//! base64 `inlineData` with MIME type `application/pdf`, followed by the
//! prompt as a text part, in a single user turn. Only text output is
//! requested.
//!
//! No retries and no streaming. Every failure is mapped to an
//! [`AnalysisError`] so callers never see a transport error type.

use crate::config::PlanConfig;
use crate::error::AnalysisError;
use crate::output::AnalysisResponse;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// MIME type of the attachment sent with every analysis request.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One analysis call: an attachment plus a prompt.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub api_key: &'a str,
    pub document: &'a [u8],
    pub mime_type: &'a str,
    pub prompt: &'a str,
}

/// Something that can turn a document and a prompt into text.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Provider name used in error messages.
    fn provider(&self) -> &str;

    /// Model identifier reported in results.
    fn model(&self) -> &str;

    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisResponse, AnalysisError>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
    temperature: Option<f32>,
    max_output_tokens: Option<usize>,
}

impl GeminiClient {
    pub fn from_config(config: &PlanConfig) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Connection {
                provider: "gemini".into(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.api_timeout_secs,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_body(&self, request: &AnalysisRequest<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type.to_string(),
                            data: STANDARD.encode(request.document),
                        },
                    },
                    Part::Text {
                        text: request.prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".into()],
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout {
                secs: self.timeout_secs,
            }
        } else if e.is_connect() || e.is_request() {
            AnalysisError::Connection {
                provider: self.provider().to_string(),
                detail: e.to_string(),
            }
        } else {
            AnalysisError::ApiError {
                provider: self.provider().to_string(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<AnalysisResponse, AnalysisError> {
        let body = self.build_body(&request);
        debug!(
            "POST {} ({} byte attachment, {} char prompt)",
            self.endpoint(),
            request.document.len(),
            request.prompt.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let err = status_error(self.provider(), status, &text, retry_after);
            warn!("Gemini returned {}: {}", status, err);
            return Err(err);
        }

        parse_response(self.provider(), &text)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Extract the concatenated text parts of the first candidate.
fn parse_response(provider: &str, body: &str) -> Result<AnalysisResponse, AnalysisError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::ApiError {
            provider: provider.to_string(),
            status: None,
            message: format!("malformed response: {e}"),
        })?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed.prompt_feedback.and_then(|f| f.block_reason);
        return Err(AnalysisError::EmptyResponse {
            provider: provider.to_string(),
            reason,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AnalysisError::EmptyResponse {
            provider: provider.to_string(),
            reason: candidate.finish_reason,
        });
    }

    let usage = parsed.usage_metadata;
    Ok(AnalysisResponse {
        text,
        input_tokens: usage.as_ref().map_or(0, |u| u.prompt_token_count),
        output_tokens: usage.as_ref().map_or(0, |u| u.candidates_token_count),
    })
}

/// Map a non-success HTTP status to an [`AnalysisError`].
fn status_error(
    provider: &str,
    status: StatusCode,
    body: &str,
    retry_after_secs: Option<u64>,
) -> AnalysisError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| match env.error.status {
            Some(s) => format!("{s}: {}", env.error.message),
            None => env.error.message,
        })
        .unwrap_or_else(|_| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AnalysisError::AuthError {
            provider: provider.to_string(),
            detail: message,
        },
        StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimitExceeded {
            provider: provider.to_string(),
            detail: message,
            retry_after_secs,
        },
        _ => AnalysisError::ApiError {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::AnalysisResult;

    fn client() -> GeminiClient {
        let config = PlanConfig::builder()
            .temperature(0.2)
            .api_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        GeminiClient::from_config(&config).unwrap()
    }

    #[test]
    fn request_body_carries_pdf_then_prompt() {
        let c = client();
        let body = c.build_body(&AnalysisRequest {
            api_key: "k",
            document: b"%PDF-1.5",
            mime_type: PDF_MIME_TYPE,
            prompt: "Describe it",
        });
        let json = serde_json::to_value(&body).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], STANDARD.encode(b"%PDF-1.5"));
        assert_eq!(parts[1]["text"], "Describe it");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "TEXT");
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn endpoint_includes_model() {
        assert_eq!(
            client().endpoint(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn parse_joins_text_parts() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "Spacious "}, {"text": "3BHK."}]},
                            "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 1200, "candidatesTokenCount": 80}
        }"#;
        let r = parse_response("gemini", body).unwrap();
        assert_eq!(r.text, "Spacious 3BHK.");
        assert_eq!(r.input_tokens, 1200);
        assert_eq!(r.output_tokens, 80);
    }

    #[test]
    fn parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response("gemini", body).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::EmptyResponse {
                provider: "gemini".into(),
                reason: Some("SAFETY".into()),
            }
        );
    }

    #[test]
    fn parse_candidate_without_text() {
        let body = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let err = parse_response("gemini", body).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"), "got: {err}");
    }

    #[test]
    fn parse_malformed_body() {
        let err = parse_response("gemini", "<html>").unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError { status: None, .. }));
    }

    #[test]
    fn status_mapping() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        match status_error("gemini", StatusCode::FORBIDDEN, body, None) {
            AnalysisError::AuthError { detail, .. } => {
                assert_eq!(detail, "PERMISSION_DENIED: API key not valid")
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            status_error("gemini", StatusCode::TOO_MANY_REQUESTS, "", Some(17)),
            AnalysisError::RateLimitExceeded {
                provider: "gemini".into(),
                detail: "HTTP 429 Too Many Requests".into(),
                retry_after_secs: Some(17),
            }
        );

        let quota = r#"{"error": {"code": 429, "message": "You exceeded your current quota, please check your plan and billing details.", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = status_error("gemini", StatusCode::TOO_MANY_REQUESTS, quota, None);
        let shown = AnalysisResult::failure("gemini-2.5-flash", err, 0).display_text();
        assert!(shown.starts_with("Error: Rate limit exceeded"), "got: {shown}");
        assert!(shown.contains("RESOURCE_EXHAUSTED: You exceeded your current quota"), "got: {shown}");

        match status_error("gemini", StatusCode::INTERNAL_SERVER_ERROR, "oops", None) {
            AnalysisError::ApiError { status, message, .. } => {
                assert_eq!(status, Some(500));
                assert!(message.contains("500"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
