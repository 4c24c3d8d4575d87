//! Plan document assembly: one image in, a five-page PDF out.
//!
//! Page 1 shows the whole plan scaled to fit. Pages 2–5 show the upper-left,
//! upper-right, lower-left and lower-right quadrants, each scaled to fit on
//! its own. Every page carries a fixed caption.
//!
//! Decoding and drawing are CPU-bound and run in `spawn_blocking`. The output
//! file is written to a uniquely named temp file beside the target and then
//! persisted over it. A failed run leaves neither a partial PDF at the
//! requested path nor a stray temp file.

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::output::{GeneratedDocument, PageSummary};
use crate::pipeline::layout::{
    compute_full_page_layout, compute_quadrants, PixelRect, FULL_PLAN_CAPTION, PLAN_PAGE_COUNT,
};
use crate::pipeline::render::PlanPdfWriter;
use crate::pipeline::{encode, input};
use image::DynamicImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// A serialised plan PDF and what was drawn on each page.
#[derive(Debug, Clone)]
pub struct RenderedPlan {
    pub bytes: Vec<u8>,
    pub image_width: u32,
    pub image_height: u32,
    pub pages: Vec<PageSummary>,
}

/// Draw the overview page and the four quadrant pages for `image`.
///
/// Synchronous and CPU-bound. Images narrower or shorter than two pixels are
/// rejected before anything is drawn, because at least one quadrant would be
/// empty.
pub fn render_plan_pdf(image: DynamicImage, config: &PlanConfig) -> Result<RenderedPlan, PlanError> {
    let rgb = encode::normalize_color(image);
    let (width, height) = rgb.dimensions();

    let quadrants = compute_quadrants(width, height);
    if let Some((q, rect)) = quadrants.iter().find(|(_, r)| r.is_empty()) {
        return Err(PlanError::render(format!(
            "{width}x{height} image is too small to split: {} quadrant would be {}x{} px",
            q.key(),
            rect.width(),
            rect.height()
        )));
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(PLAN_PAGE_COUNT);
    }

    let mut writer = PlanPdfWriter::new(config.page_size, config.caption);
    let mut pages = Vec::with_capacity(PLAN_PAGE_COUNT);

    // ── Page 1: full plan ────────────────────────────────────────────────
    let layout = compute_full_page_layout(width, height, config.page_size);
    writer.add_page(&rgb, &layout, FULL_PLAN_CAPTION)?;
    pages.push(PageSummary {
        page_num: 1,
        caption: FULL_PLAN_CAPTION.to_string(),
        source: PixelRect::new(0, 0, width, height),
        layout,
    });
    notify_page(config, 1, FULL_PLAN_CAPTION);

    // ── Pages 2–5: quadrants ─────────────────────────────────────────────
    for (quadrant, rect) in quadrants {
        let detail = encode::crop(&rgb, rect);
        let layout = compute_full_page_layout(detail.width(), detail.height(), config.page_size);
        writer.add_page(&detail, &layout, quadrant.caption())?;
        pages.push(PageSummary {
            page_num: quadrant.page_number(),
            caption: quadrant.caption().to_string(),
            source: rect,
            layout,
        });
        notify_page(config, quadrant.page_number(), quadrant.caption());
    }

    let bytes = writer.finish()?;
    debug!("Serialised {} pages into {} bytes", pages.len(), bytes.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(pages.len(), bytes.len());
    }

    Ok(RenderedPlan {
        bytes,
        image_width: width,
        image_height: height,
        pages,
    })
}

fn notify_page(config: &PlanConfig, page_num: usize, caption: &str) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_rendered(page_num, PLAN_PAGE_COUNT, caption);
    }
}

/// Build the plan PDF for the image at `image_path` and write it to
/// `output_path`.
///
/// # Errors
/// * image missing, unreadable, not JPEG/PNG or undecodable →
///   [`crate::error::FailureKind::ImageDecode`]
/// * anything failing while drawing or serialising → [`PlanError::Render`]
/// * the PDF could not be written → [`PlanError::OutputWriteFailed`]
///
/// Nothing is written to `output_path` unless every page was drawn.
pub async fn assemble_plan_document(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PlanConfig,
) -> Result<GeneratedDocument, PlanError> {
    let image_path = image_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    info!("Assembling plan document from {}", image_path.display());

    let start = Instant::now();
    let task_config = config.clone();
    let task_path = image_path.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        let image = input::load_image(&task_path)?;
        render_plan_pdf(image, &task_config)
    })
    .await
    .map_err(|e| PlanError::Internal(format!("Render task panicked: {e}")))??;
    let render_duration_ms = start.elapsed().as_millis() as u64;

    let byte_len = rendered.bytes.len();
    write_atomic(output_path.clone(), rendered.bytes).await?;

    info!(
        "Wrote {} ({} pages, {} bytes) in {}ms",
        output_path.display(),
        rendered.pages.len(),
        byte_len,
        render_duration_ms
    );

    Ok(GeneratedDocument {
        path: output_path,
        image_width: rendered.image_width,
        image_height: rendered.image_height,
        byte_len,
        pages: rendered.pages,
        render_duration_ms,
    })
}

/// Synchronous wrapper around [`assemble_plan_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn assemble_plan_document_sync(
    image_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PlanConfig,
) -> Result<GeneratedDocument, PlanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PlanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(assemble_plan_document(image_path, output_path, config))
}

async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> Result<(), PlanError> {
    tokio::task::spawn_blocking(move || persist_bytes(&path, &bytes))
        .await
        .map_err(|e| PlanError::Internal(format!("Write task panicked: {e}")))?
}

/// Write `bytes` to a temp file in the target directory, then move it into
/// place. The temp file is deleted on drop if either step fails.
fn persist_bytes(path: &Path, bytes: &[u8]) -> Result<(), PlanError> {
    let fail = |source: std::io::Error| PlanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(fail)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".planlens-")
        .suffix(".pdf.tmp")
        .tempfile_in(parent)
        .map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
