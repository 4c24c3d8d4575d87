//! Configuration for plan document generation and analysis.
//!
//! All behaviour is controlled through [`PlanConfig`], built via its
//! [`PlanConfigBuilder`]. Callers set only what they care about and rely on
//! documented defaults for the rest; [`PlanConfigBuilder::build`] rejects
//! settings the renderer or client cannot honour.

use crate::error::PlanError;
use crate::pipeline::layout::PageSize;
use crate::pipeline::render::CaptionStyle;
use crate::progress::ProgressCallback;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variables consulted for the Gemini API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["UAT_GEMINI_API_KEY", "GEMINI_API_KEY"];

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Dotenv file consulted for API keys, relative to the working directory.
pub const ENV_FILE_NAME: &str = ".env";

/// File name offered for the generated PDF.
pub const DOWNLOAD_FILE_NAME: &str = "generated_plan.pdf";

/// Configuration for a plan PDF run.
///
/// # Example
/// ```rust
/// use planlens::{PageSize, PlanConfig};
///
/// let config = PlanConfig::builder()
///     .page_size(PageSize::LETTER)
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PlanConfig {
    /// Output page size. Default: A4 portrait.
    pub page_size: PageSize,

    /// Caption font size and baseline origin. Default: 12 pt at (40, 40).
    pub caption: CaptionStyle,

    /// Gemini model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Base URL of the Gemini REST API, without trailing slash.
    pub api_base_url: String,

    /// Per-request timeout for the analysis call in seconds. Default: 120.
    ///
    /// A five-page PDF is a large multimodal request; flash models usually
    /// answer within 20–40 s, pro models can take much longer.
    pub api_timeout_secs: u64,

    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Output token cap. `None` leaves the provider default.
    pub max_output_tokens: Option<usize>,

    /// Directory under which per-submission scratch directories are created.
    /// `None` uses the system temp dir.
    pub scratch_root: Option<PathBuf>,

    /// Receives document and analysis progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            caption: CaptionStyle::default(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout_secs: 120,
            temperature: None,
            max_output_tokens: None,
            scratch_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PlanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanConfig")
            .field("page_size", &self.page_size)
            .field("caption", &self.caption)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("scratch_root", &self.scratch_root)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PlanProgressCallback>"),
            )
            .finish()
    }
}

impl PlanConfig {
    pub fn builder() -> PlanConfigBuilder {
        PlanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PlanConfig`].
#[derive(Debug)]
pub struct PlanConfigBuilder {
    config: PlanConfig,
}

impl PlanConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn caption_font_size(mut self, pt: f32) -> Self {
        self.config.caption.font_size = pt;
        self
    }

    pub fn caption_origin(mut self, x: f32, y: f32) -> Self {
        self.config.caption.origin = (x, y);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PlanConfig, PlanError> {
        let c = &self.config;
        if !c.page_size.is_valid() {
            return Err(PlanError::InvalidConfig(format!(
                "page size must be positive, got {}x{} pt",
                c.page_size.width, c.page_size.height
            )));
        }
        if !(c.caption.font_size > 0.0) {
            return Err(PlanError::InvalidConfig(format!(
                "caption font size must be positive, got {}",
                c.caption.font_size
            )));
        }
        if c.model.trim().is_empty() {
            return Err(PlanError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(PlanError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(PlanError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if c.max_output_tokens == Some(0) {
            return Err(PlanError::InvalidConfig("max output tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Pick the API key: an explicit value first, then each of
/// [`API_KEY_ENV_VARS`]. Blank values are skipped.
///
/// Each variable is read from the process environment, falling back to a
/// `.env` file in the working directory. Process variables win, as with
/// `dotenvy::dotenv`.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    resolve_api_key_from(explicit, Path::new(ENV_FILE_NAME))
}

/// [`resolve_api_key`] with an explicit dotenv file path.
pub fn resolve_api_key_from(explicit: Option<&str>, env_file: &Path) -> Option<String> {
    let file_vars = read_env_file(env_file);
    resolve_api_key_with(explicit, |name| {
        std::env::var(name)
            .ok()
            .or_else(|| file_vars.get(name).cloned())
    })
}

/// Parse a dotenv file without touching the process environment. A missing
/// or malformed file yields no entries.
fn read_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(e) => {
            if !e.not_found() {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
            }
            HashMap::new()
        }
    }
}

fn resolve_api_key_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(API_KEY_ENV_VARS.iter().filter_map(|name| lookup(*name)))
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PlanConfig::default();
        assert_eq!(c.page_size, PageSize::A4);
        assert_eq!(c.model, "gemini-2.5-flash");
        assert_eq!(c.caption.origin, (40.0, 40.0));
        assert!(c.temperature.is_none());
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let c = PlanConfig::builder()
            .api_base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.api_base_url, "http://localhost:8080");
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(PlanConfig::builder()
            .page_size(PageSize::new(0.0, 842.0))
            .build()
            .is_err());
        assert!(PlanConfig::builder().caption_font_size(0.0).build().is_err());
        assert!(PlanConfig::builder().model("  ").build().is_err());
        assert!(PlanConfig::builder().api_base_url("ftp://x").build().is_err());
        assert!(PlanConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(PlanConfig::builder().max_output_tokens(0).build().is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = PlanConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }

    #[test]
    fn api_key_lookup_order() {
        let env = |name: &str| match name {
            "UAT_GEMINI_API_KEY" => Some("   ".to_string()),
            "GEMINI_API_KEY" => Some("from-env".to_string()),
            _ => None,
        };
        assert_eq!(resolve_api_key_with(Some("cli"), env).as_deref(), Some("cli"));
        assert_eq!(resolve_api_key_with(None, env).as_deref(), Some("from-env"));
        assert_eq!(resolve_api_key_with(Some(""), |_| None), None);
    }

    #[test]
    fn api_key_read_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# local secrets\nUAT_GEMINI_API_KEY=\"from-dotenv\"\nOTHER=1\n")
            .unwrap();

        let vars = read_env_file(&path);
        assert_eq!(vars.get("UAT_GEMINI_API_KEY").map(String::as_str), Some("from-dotenv"));
        assert_eq!(
            resolve_api_key_with(None, |name| vars.get(name).cloned()).as_deref(),
            Some("from-dotenv")
        );
        assert_eq!(
            resolve_api_key_from(Some("cli"), &path).as_deref(),
            Some("cli")
        );
    }

    #[test]
    fn missing_env_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(".env")).is_empty());
    }
}
