//! Page geometry: fit a raster onto a fixed page and split it into quadrants.
//!
//! Everything here is pure arithmetic. The renderer asks this module where
//! each of the five pictures goes; it never decides placement itself.
//!
//! ## Fitting rule
//!
//! An image is scaled uniformly until it touches the page on one axis and is
//! centered on the other. Whether width or height is the binding axis is
//! decided by comparing aspect ratios, with the width-constrained branch taken
//! only when the image is *strictly* wider than the page. On an exact tie both
//! branches describe the same rectangle, so the choice only needs to be
//! deterministic.
//!
//! ## Quadrant split
//!
//! The image is bisected at `W / 2` and `H / 2` using integer division. On odd
//! dimensions the right column and bottom row of quadrants are one pixel
//! larger than their neighbours. That asymmetry is intentional and kept.

use serde::{Deserialize, Serialize};

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// ISO A4 portrait, 210 × 297 mm.
    pub const A4: PageSize = PageSize::new(595.275_590_551_181_2, 841.889_763_779_527_7);
    /// ISO A3 portrait, 297 × 420 mm.
    pub const A3: PageSize = PageSize::new(841.889_763_779_527_7, 1_190.551_181_102_362_2);
    /// US Letter portrait, 8.5 × 11 in.
    pub const LETTER: PageSize = PageSize::new(612.0, 792.0);
    /// US Legal portrait, 8.5 × 14 in.
    pub const LEGAL: PageSize = PageSize::new(612.0, 1008.0);

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Both sides finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Parse a named format (`a4`, `a3`, `letter`, `legal`) or an explicit
    /// `WIDTHxHEIGHT` pair in points.
    pub fn parse(s: &str) -> Option<PageSize> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "a4" => return Some(Self::A4),
            "a3" => return Some(Self::A3),
            "letter" => return Some(Self::LETTER),
            "legal" => return Some(Self::LEGAL),
            _ => {}
        }
        let (w, h) = s.split_once('x')?;
        let size = PageSize::new(w.trim().parse().ok()?, h.trim().parse().ok()?);
        size.is_valid().then_some(size)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Placement of one picture on one page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub draw_width: f64,
    pub draw_height: f64,
    pub x_offset: f64,
    pub y_offset: f64,
}

/// Scale an `image_width × image_height` raster to fit `page`, preserving its
/// aspect ratio, and center it.
///
/// Both image dimensions must be non-zero; the decoder rejects empty images
/// before they reach this point.
pub fn compute_full_page_layout(image_width: u32, image_height: u32, page: PageSize) -> PageLayout {
    debug_assert!(image_width > 0 && image_height > 0, "empty image reached layout");

    let image_aspect = f64::from(image_width) / f64::from(image_height);

    let (draw_width, draw_height) = if image_aspect > page.aspect() {
        (page.width, page.width / image_aspect)
    } else {
        (page.height * image_aspect, page.height)
    };

    PageLayout {
        draw_width,
        draw_height,
        x_offset: (page.width - draw_width) / 2.0,
        y_offset: (page.height - draw_height) / 2.0,
    }
}

/// A half-open pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// One of the four close-up regions of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

type RectFn = fn(u32, u32) -> PixelRect;

/// Page order, rectangle function and caption for every quadrant.
const QUADRANT_TABLE: [(Quadrant, RectFn, &str); 4] = [
    (
        Quadrant::UpperLeft,
        |w, h| PixelRect::new(0, 0, w / 2, h / 2),
        "Page 2: Upper-Left Quadrant Detail",
    ),
    (
        Quadrant::UpperRight,
        |w, h| PixelRect::new(w / 2, 0, w, h / 2),
        "Page 3: Upper-Right Quadrant Detail",
    ),
    (
        Quadrant::LowerLeft,
        |w, h| PixelRect::new(0, h / 2, w / 2, h),
        "Page 4: Lower-Left Quadrant Detail",
    ),
    (
        Quadrant::LowerRight,
        |w, h| PixelRect::new(w / 2, h / 2, w, h),
        "Page 5: Lower-Right Quadrant Detail",
    ),
];

/// Caption stamped on the overview page.
pub const FULL_PLAN_CAPTION: &str = "Page 1: Full Plan Overview";

/// Pages in a generated plan document: the overview plus four quadrants.
pub const PLAN_PAGE_COUNT: usize = 1 + QUADRANT_TABLE.len();

impl Quadrant {
    /// All quadrants in page order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UpperLeft,
        Quadrant::UpperRight,
        Quadrant::LowerLeft,
        Quadrant::LowerRight,
    ];

    fn entry(self) -> &'static (Quadrant, RectFn, &'static str) {
        &QUADRANT_TABLE[self as usize]
    }

    /// Pixel rectangle of this quadrant inside a `width × height` image.
    pub fn rect(self, width: u32, height: u32) -> PixelRect {
        (self.entry().1)(width, height)
    }

    pub fn caption(self) -> &'static str {
        self.entry().2
    }

    /// 1-indexed page on which this quadrant is drawn.
    pub fn page_number(self) -> usize {
        self as usize + 2
    }

    /// Stable snake_case identifier, e.g. `upper_left`.
    pub fn key(self) -> &'static str {
        match self {
            Quadrant::UpperLeft => "upper_left",
            Quadrant::UpperRight => "upper_right",
            Quadrant::LowerLeft => "lower_left",
            Quadrant::LowerRight => "lower_right",
        }
    }
}

/// Split a `width × height` image into its four quadrants, in page order.
pub fn compute_quadrants(width: u32, height: u32) -> [(Quadrant, PixelRect); 4] {
    Quadrant::ALL.map(|q| (q, q.rect(width, height)))
}
