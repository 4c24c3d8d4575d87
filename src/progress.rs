//! Progress-callback trait for document and analysis events.
//!
//! Inject an [`Arc<dyn PlanProgressCallback>`] via
//! [`crate::config::PlanConfigBuilder::progress_callback`] to be told when
//! each page is drawn and when the analysis request starts and finishes. The
//! CLI uses this to drive its spinner; a GUI could forward the same events to
//! a status bar.
//!
//! # Example
//!
//! ```rust
//! use planlens::{PlanConfig, PlanProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl PlanProgressCallback for PageCounter {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize, caption: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{page_num}/{total_pages} {caption}");
//!     }
//! }
//!
//! let config = PlanConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the assembly and analysis steps as they progress.
///
/// Page events fire from the blocking render thread, so implementations must
/// be `Send + Sync`. All methods default to no-ops.
pub trait PlanProgressCallback: Send + Sync {
    /// Called once the source image is decoded, before the first page.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page is drawn.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in the document
    /// * `caption`     — caption stamped on the page
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, caption: &str) {
        let _ = (page_num, total_pages, caption);
    }

    /// Called after the PDF is serialised.
    fn on_document_complete(&self, total_pages: usize, byte_len: usize) {
        let _ = (total_pages, byte_len);
    }

    /// Called just before the analysis request is sent.
    fn on_analysis_start(&self, model: &str) {
        let _ = model;
    }

    /// Called when the analysis request returns, successfully or not.
    fn on_analysis_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PlanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PlanConfig`].
pub type ProgressCallback = Arc<dyn PlanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        captions: Mutex<Vec<String>>,
        analysis_ok: AtomicUsize,
        analysis_failed: AtomicUsize,
    }

    impl PlanProgressCallback for TrackingCallback {
        fn on_page_rendered(&self, _page_num: usize, _total_pages: usize, caption: &str) {
            self.pages.fetch_add(1, Ordering::SeqCst);
            self.captions.lock().unwrap().push(caption.to_string());
        }

        fn on_analysis_complete(&self, success: bool) {
            let counter = if success {
                &self.analysis_ok
            } else {
                &self.analysis_failed
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(5);
        cb.on_page_rendered(1, 5, "Page 1: Full Plan Overview");
        cb.on_document_complete(5, 1024);
        cb.on_analysis_start("gemini-2.5-flash");
        cb.on_analysis_complete(false);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_rendered(1, 5, "a");
        tracker.on_page_rendered(2, 5, "b");
        tracker.on_analysis_complete(true);
        tracker.on_analysis_complete(false);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.captions.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(tracker.analysis_ok.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.analysis_failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_document_start(5);
        cb.on_page_rendered(1, 5, "x");
    }
}
