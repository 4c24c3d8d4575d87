//! Image encoding: `DynamicImage` → 8-bit RGB → PDF image XObject.
//!
//! PDF viewers and vision models both handle `DeviceRGB` at 8 bits per
//! component everywhere, so every source is flattened to that before it is
//! cropped or placed. Alpha is discarded rather than composited, grayscale is
//! expanded and 16-bit channels are narrowed.
//!
//! Raw samples go into the stream uncompressed; [`lopdf::Document::compress`]
//! applies `FlateDecode` to every stream when the document is finalised, which
//! keeps the pixels lossless.

use crate::pipeline::layout::PixelRect;
use image::{imageops, DynamicImage, RgbImage};
use lopdf::{dictionary, Stream};
use tracing::debug;

/// Convert any decoded colour mode to three-channel RGB.
pub fn normalize_color(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            debug!("Converting {:?} image to RGB8", other.color());
            other.into_rgb8()
        }
    }
}

/// Copy the pixels inside `rect` into a new image.
pub fn crop(img: &RgbImage, rect: PixelRect) -> RgbImage {
    imageops::crop_imm(img, rect.x0, rect.y0, rect.width(), rect.height()).to_image()
}

/// Wrap an RGB raster as a PDF image XObject stream.
pub fn image_xobject(img: &RgbImage) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(img.width()),
        "Height" => i64::from(img.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
    };
    debug!(
        "Encoded {}x{} image → {} bytes raw RGB",
        img.width(),
        img.height(),
        img.as_raw().len()
    );
    Stream::new(dict, img.as_raw().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};

    #[test]
    fn rgba_is_flattened_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 0])));
        let rgb = normalize_color(img);
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn grayscale_is_expanded() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([200])));
        let rgb = normalize_color(img);
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([200, 200, 200]));
    }

    #[test]
    fn crop_takes_the_requested_region() {
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(3, 2, Rgb([255, 0, 0]));
        let c = crop(&img, PixelRect::new(2, 2, 4, 4));
        assert_eq!(c.dimensions(), (2, 2));
        assert_eq!(c.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn xobject_dictionary_describes_the_raster() {
        let img = RgbImage::from_pixel(5, 7, Rgb([1, 2, 3]));
        let stream = image_xobject(&img);
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 5);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 7);
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), &b"DeviceRGB"[..]);
        assert_eq!(stream.content.len(), 5 * 7 * 3);
    }
}
