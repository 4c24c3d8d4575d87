//! Pipeline stages for turning a plan image into an analysed PDF.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ layout ──▶ encode ──▶ render ──▶ llm
//! (sniff)   (geometry) (RGB/crop) (lopdf)    (Gemini)
//! ```
//!
//! 1. [`input`]  — sniff JPEG/PNG from content, decode, stage uploads in a
//!    scratch directory
//! 2. [`layout`] — pure geometry: scale-to-fit placement and the four
//!    quadrant rectangles
//! 3. [`encode`] — normalise to 8-bit RGB, crop quadrants, wrap pixels as PDF
//!    image XObjects
//! 4. [`render`] — write one captioned page per placed picture; runs in
//!    `spawn_blocking` because it is CPU-bound
//! 5. [`llm`]    — send the PDF and prompt to the vision model; the only
//!    stage with network I/O

pub mod encode;
pub mod input;
pub mod layout;
pub mod llm;
pub mod render;
