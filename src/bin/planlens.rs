//! CLI binary for planlens.
//!
//! A thin shim over the library crate that maps CLI flags to `PlanConfig`,
//! writes the generated PDF and prints the analysis.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use planlens::config::{DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use planlens::{
    assemble_plan_document, request_analysis, resolve_api_key, AnalysisPrompt, AnalysisResult,
    GeminiClient, GeneratedDocument, PageSize, PlanConfig, PlanProgressCallback, PlanType, ProgressCallback,
    DOWNLOAD_FILE_NAME,
};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Busy indicator shown while pages are drawn and while the model thinks.
struct CliSpinner {
    bar: ProgressBar,
}

impl CliSpinner {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Decoding image…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PlanProgressCallback for CliSpinner {
    fn on_document_start(&self, total_pages: usize) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!("0/{total_pages} pages"));
    }

    fn on_page_rendered(&self, page_num: usize, total_pages: usize, caption: &str) {
        self.bar.set_message(format!("{page_num}/{total_pages} pages"));
        self.bar.println(format!("  {} {}", green("✓"), dim(caption)));
    }

    fn on_document_complete(&self, total_pages: usize, byte_len: usize) {
        self.bar.println(format!(
            "{} {} pages, {} KiB",
            green("✔"),
            bold(&total_pages.to_string()),
            byte_len / 1024
        ));
        self.bar.set_prefix("Saving");
        self.bar.set_message("Writing PDF…");
    }

    fn on_analysis_start(&self, model: &str) {
        self.bar.reset_elapsed();
        self.bar.set_prefix("Analysing");
        self.bar.set_message(format!("waiting for {model}…"));
    }

    fn on_analysis_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Master plan with the default prompt (key from GEMINI_API_KEY)
  planlens site-plan.jpg

  # Floor plan, custom output path
  planlens --plan-type floor unit-3b.png -o unit-3b.pdf

  # Edit the default prompt, then use it
  planlens --plan-type floor --print-prompt > prompt.txt
  planlens --plan-type floor --prompt-file prompt.txt unit-3b.png

  # Only build the PDF, no API call
  planlens --pdf-only site-plan.jpg

  # US Letter pages, JSON report
  planlens --page-size letter --json site-plan.jpg

API KEY:
  Looked up in order: --api-key, UAT_GEMINI_API_KEY, GEMINI_API_KEY (process
  environment, then a .env file in the working directory), then a hidden
  interactive prompt when stdin is a terminal.
"#;

/// Split a plan image into a 5-page PDF and describe it with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "planlens",
    version,
    about = "Split a floor or master plan into a 5-page PDF and describe it with Gemini",
    long_about = "Lays a floor-plan or master-plan image out as a 5-page PDF (full overview plus \
four quadrant close-ups), writes it to disk and asks a Gemini vision model to describe the plan \
using a sales-oriented prompt.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JPEG or PNG plan image.
    #[arg(required_unless_present = "print_prompt")]
    image: Option<PathBuf>,

    /// Where to write the generated PDF.
    #[arg(short, long, env = "PLANLENS_OUTPUT", default_value = DOWNLOAD_FILE_NAME)]
    output: PathBuf,

    /// Kind of plan: selects the default prompt.
    #[arg(long, env = "PLANLENS_PLAN_TYPE", value_enum, default_value = "master")]
    plan_type: PlanTypeArg,

    /// Analysis prompt text, replacing the default template.
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the analysis prompt from a file.
    #[arg(long, env = "PLANLENS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Gemini API key. Falls back to UAT_GEMINI_API_KEY, then GEMINI_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Page size: a4, a3, letter, legal or WIDTHxHEIGHT in points.
    #[arg(long, env = "PLANLENS_PAGE_SIZE", default_value = "a4", value_parser = parse_page_size)]
    page_size: PageSize,

    /// Gemini model ID.
    #[arg(long, env = "PLANLENS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini REST API base URL.
    #[arg(long, env = "PLANLENS_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Analysis request timeout in seconds.
    #[arg(long, env = "PLANLENS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "PLANLENS_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens. Provider default when unset.
    #[arg(long, env = "PLANLENS_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Only build the PDF; skip analysis.
    #[arg(long)]
    pdf_only: bool,

    /// Print the default prompt for --plan-type and exit.
    #[arg(long)]
    print_prompt: bool,

    /// Print a JSON report (pages + analysis) instead of plain text.
    #[arg(long, env = "PLANLENS_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PLANLENS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PLANLENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the analysis.
    #[arg(short, long, env = "PLANLENS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PlanTypeArg {
    Master,
    Floor,
}

impl From<PlanTypeArg> for PlanType {
    fn from(v: PlanTypeArg) -> Self {
        match v {
            PlanTypeArg::Master => PlanType::MasterPlan,
            PlanTypeArg::Floor => PlanType::FloorPlan,
        }
    }
}

fn parse_page_size(s: &str) -> std::result::Result<PageSize, String> {
    PageSize::parse(s).ok_or_else(|| {
        format!("'{s}' is not a page size; use a4, a3, letter, legal or WIDTHxHEIGHT in points")
    })
}

/// JSON report printed by `--json`.
#[derive(Serialize)]
struct Report<'a> {
    document: &'a GeneratedDocument,
    plan_type: String,
    analysis: Option<&'a AnalysisResult>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let plan_type = PlanType::from(cli.plan_type);

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters, so library INFO logs
    // are suppressed while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Print-prompt mode ────────────────────────────────────────────────
    if cli.print_prompt {
        println!("{}", plan_type.default_prompt());
        return Ok(());
    }

    let Some(ref image) = cli.image else {
        bail!("no input image given");
    };

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliSpinner::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|s| s as Arc<dyn PlanProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Generate PDF ─────────────────────────────────────────────────────
    let doc = match assemble_plan_document(image, &cli.output, &config).await {
        Ok(doc) => doc,
        Err(e) => {
            if let Some(ref s) = spinner {
                s.bar.finish_and_clear();
            }
            return Err(e).context("Could not generate the plan PDF");
        }
    };

    if !cli.quiet && !cli.json {
        if let Some(ref s) = spinner {
            s.bar.println(format!(
                "{} {}",
                green("→"),
                bold(&doc.path.display().to_string())
            ));
        } else {
            eprintln!("Wrote {} ({} pages)", doc.path.display(), doc.page_count());
        }
    }

    if cli.pdf_only {
        if let Some(ref s) = spinner {
            s.bar.finish_and_clear();
        }
        if cli.json {
            print_json(&Report {
                document: &doc,
                plan_type: plan_type.label().to_string(),
                analysis: None,
            })?;
        }
        return Ok(());
    }

    // ── Analyse ──────────────────────────────────────────────────────────
    let prompt = resolve_prompt(&cli, plan_type).await?;
    if !prompt.is_default() {
        tracing::debug!("Using an edited {} prompt", prompt.plan_type().label());
    }
    let api_key = match resolve_api_key(cli.api_key.as_deref()) {
        Some(key) => key,
        None => {
            if let Some(ref s) = spinner {
                s.bar.suspend(prompt_for_key)?
            } else {
                prompt_for_key()?
            }
        }
    };

    let client = GeminiClient::from_config(&config).context("Failed to set up Gemini client")?;
    let result = request_analysis(&client, &api_key, &doc.path, prompt.text(), &config).await;
    if let Some(ref s) = spinner {
        s.bar.finish_and_clear();
    }

    if cli.json {
        print_json(&Report {
            document: &doc,
            plan_type: plan_type.label().to_string(),
            analysis: Some(&result),
        })?;
    }

    match result.error {
        None => {
            if !cli.json {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(result.text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !result.text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            if !cli.quiet && !cli.json {
                eprintln!(
                    "   {} tokens in  /  {} tokens out  —  {}ms",
                    dim(&result.input_tokens.to_string()),
                    dim(&result.output_tokens.to_string()),
                    result.duration_ms,
                );
            }
            Ok(())
        }
        // anyhow prints this as `Error: …` and exits non-zero.
        Some(e) => Err(e.into()),
    }
}

/// Map CLI args to `PlanConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PlanConfig> {
    let mut builder = PlanConfig::builder()
        .page_size(cli.page_size)
        .model(cli.model.clone())
        .api_base_url(cli.api_base_url.clone())
        .api_timeout_secs(cli.api_timeout);

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// The prompt to send: the plan type's template, replaced by `--prompt` or
/// the contents of `--prompt-file` when given.
async fn resolve_prompt(cli: &Cli, plan_type: PlanType) -> Result<AnalysisPrompt> {
    let replacement = match (&cli.prompt, &cli.prompt_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        ),
        (None, None) => None,
    };
    Ok(build_prompt(plan_type, replacement))
}

fn build_prompt(plan_type: PlanType, replacement: Option<String>) -> AnalysisPrompt {
    let mut prompt = AnalysisPrompt::new(plan_type);
    if let Some(text) = replacement {
        prompt.set_text(text);
    }
    prompt
}

/// Ask for the API key on the terminal without echoing it. Returns an empty
/// string when stdin is not interactive, which the analysis step reports as a
/// missing key.
fn prompt_for_key() -> Result<String> {
    if !io::stdin().is_terminal() {
        return Ok(String::new());
    }
    let key = rpassword::prompt_password("Gemini API key: ")
        .context("Failed to read API key from terminal")?;
    Ok(key.trim().to_string())
}

fn print_json(report: &Report<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
    println!("{json}");
    Ok(())
}
