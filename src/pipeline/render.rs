//! PDF writing: one page per placed picture, built directly with `lopdf`.
//!
//! Each page gets its own image XObject, a content stream that maps the unit
//! square onto the computed [`PageLayout`] with a single `cm`, and a caption in
//! the built-in Helvetica face. Standard-14 fonts need no embedding, so the
//! writer carries no font files.
//!
//! Coordinates are PDF user space: points, origin at the bottom-left corner.

use crate::error::PlanError;
use crate::pipeline::encode;
use crate::pipeline::layout::{PageLayout, PageSize};
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Caption styling shared by every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    pub font_size: f32,
    /// Baseline origin in points from the bottom-left corner.
    pub origin: (f32, f32),
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            origin: (40.0, 40.0),
        }
    }
}

/// Accumulates pages and serialises them into a PDF byte buffer.
pub struct PlanPdfWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page_size: PageSize,
    caption: CaptionStyle,
}

impl PlanPdfWriter {
    pub fn new(page_size: PageSize, caption: CaptionStyle) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::with_capacity(5),
            page_size,
            caption,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Draw `image` at `layout` with `caption`, then start a new page.
    pub fn add_page(
        &mut self,
        image: &RgbImage,
        layout: &PageLayout,
        caption: &str,
    ) -> Result<(), PlanError> {
        let image_id = self.doc.add_object(encode::image_xobject(image));

        let content = page_content(layout, caption, &self.caption);
        let encoded = content.encode().map_err(PlanError::render)?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => dictionary! { "Im0" => image_id },
        };

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box(self.page_size),
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);

        debug!(
            "Page {}: {}x{} px drawn at ({:.1}, {:.1}) size {:.1}x{:.1} pt",
            self.page_ids.len(),
            image.width(),
            image.height(),
            layout.x_offset,
            layout.y_offset,
            layout.draw_width,
            layout.draw_height
        );
        Ok(())
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, PlanError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Plan Document"),
            "Producer" => Object::string_literal(concat!("planlens ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).map_err(PlanError::render)?;
        Ok(bytes)
    }
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn media_box(page: PageSize) -> Vec<Object> {
    vec![real(0.0), real(0.0), real(page.width), real(page.height)]
}

/// `q w 0 0 h x y cm /Im0 Do Q` followed by the caption text object.
fn page_content(layout: &PageLayout, caption: &str, style: &CaptionStyle) -> Content {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(layout.draw_width),
                    real(0.0),
                    real(0.0),
                    real(layout.draw_height),
                    real(layout.x_offset),
                    real(layout.y_offset),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Real(style.font_size)],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(style.origin.0), Object::Real(style.origin.1)],
            ),
            Operation::new("Tj", vec![Object::string_literal(caption)]),
            Operation::new("ET", vec![]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::compute_full_page_layout;
    use image::Rgb;

    fn sample_layout() -> PageLayout {
        compute_full_page_layout(20, 10, PageSize::A4)
    }

    #[test]
    fn content_places_image_and_caption() {
        let content = page_content(
            &sample_layout(),
            "Page 1: Full Plan Overview",
            &CaptionStyle::default(),
        );
        let ops: Vec<&str> = content.operations.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(ops, vec!["q", "cm", "Do", "Q", "BT", "Tf", "Td", "Tj", "ET"]);

        let encoded = String::from_utf8_lossy(&content.encode().unwrap()).to_string();
        assert!(encoded.contains("Page 1: Full Plan Overview"), "got: {encoded}");
        assert!(encoded.contains("/Im0 Do"), "got: {encoded}");
    }

    #[test]
    fn writer_produces_loadable_pdf() {
        let img = RgbImage::from_pixel(20, 10, Rgb([0, 128, 255]));
        let mut writer = PlanPdfWriter::new(PageSize::A4, CaptionStyle::default());
        writer.add_page(&img, &sample_layout(), "first").unwrap();
        writer.add_page(&img, &sample_layout(), "second").unwrap();
        assert_eq!(writer.page_count(), 2);

        let bytes = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).expect("lopdf should parse its own output");
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn media_box_matches_page_size() {
        let mb = media_box(PageSize::LETTER);
        assert_eq!(mb[2].as_float().unwrap(), 612.0);
        assert_eq!(mb[3].as_float().unwrap(), 792.0);
    }
}
