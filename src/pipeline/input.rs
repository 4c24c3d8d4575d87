//! Input handling: sniff, decode and stage the uploaded plan image.
//!
//! The file extension is never trusted. Format is detected from the leading
//! bytes and only JPEG and PNG are accepted, matching what the upload form
//! advertises. Everything else is rejected before any decoding work starts.
//!
//! Uploads arrive as bytes and are staged into a [`Scratch`] directory so the
//! rest of the pipeline can work with paths. The directory is removed when the
//! `Scratch` is dropped, on every exit path including panics.

use crate::error::PlanError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Formats a plan upload may use.
pub const ACCEPTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Open, sniff and decode the image at `path`.
pub fn load_image(path: &Path) -> Result<DynamicImage, PlanError> {
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PlanError::ImageNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => PlanError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PlanError::ImageDecode {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let reader = reader.with_guessed_format().map_err(|e| PlanError::ImageDecode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    check_format(path, reader.format())?;

    let image = reader.decode().map_err(|e| PlanError::ImageDecode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(PlanError::EmptyImage {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
        });
    }

    debug!(
        "Decoded {}: {}x{} {:?}",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

/// Detect the format of an in-memory upload, accepting only JPEG/PNG.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, PlanError> {
    check_format(Path::new("<upload>"), image::guess_format(bytes).ok())
}

fn check_format(path: &Path, format: Option<ImageFormat>) -> Result<ImageFormat, PlanError> {
    match format {
        Some(f) if ACCEPTED_FORMATS.contains(&f) => Ok(f),
        Some(other) => Err(PlanError::UnsupportedFormat {
            path: path.to_path_buf(),
            detected: format!("{other:?}"),
        }),
        None => Err(PlanError::ImageDecode {
            path: path.to_path_buf(),
            detail: "not a recognised raster image".into(),
        }),
    }
}

/// A per-submission scratch directory holding the staged image and the
/// generated document.
pub struct Scratch {
    dir: TempDir,
    image_path: PathBuf,
    document_path: PathBuf,
}

impl Scratch {
    /// Create a uniquely named directory under `root` (or the system temp
    /// dir) and write `upload` into it.
    pub fn stage(upload: &[u8], root: Option<&Path>) -> Result<Self, PlanError> {
        let format = sniff_format(upload)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("planlens-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| PlanError::ScratchFailed {
            path: root.map_or_else(std::env::temp_dir, Path::to_path_buf),
            source,
        })?;

        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let image_path = dir.path().join(format!("plan_image.{ext}"));
        let document_path = dir.path().join("plan.pdf");

        std::fs::write(&image_path, upload).map_err(|source| PlanError::ScratchFailed {
            path: image_path.clone(),
            source,
        })?;

        info!(
            "Staged {} byte {:?} upload in {}",
            upload.len(),
            format,
            dir.path().display()
        );

        Ok(Self {
            dir,
            image_path,
            document_path,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        debug!("Removing scratch dir {}", self.dir.path().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([9, 9, 9])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, PlanError::ImageNotFound { .. }), "got: {err:?}");
    }

    #[test]
    fn extension_is_ignored_when_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.jpg");
        std::fs::write(&path, png_bytes(3, 2)).unwrap();
        let img = load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, PlanError::ImageDecode { .. }), "got: {err:?}");
    }

    #[test]
    fn gif_is_rejected() {
        let err = sniff_format(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedFormat { .. }), "got: {err:?}");
    }

    #[test]
    fn missing_scratch_root_is_an_io_failure() {
        let root = tempfile::tempdir().unwrap();
        let gone = root.path().join("does-not-exist");
        let err = Scratch::stage(&png_bytes(4, 4), Some(&gone)).err().unwrap();
        assert!(matches!(err, PlanError::ScratchFailed { .. }), "got: {err:?}");
        assert_eq!(err.kind(), crate::error::FailureKind::Io);
    }

    #[test]
    fn scratch_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let scratch = Scratch::stage(&png_bytes(4, 4), Some(root.path())).unwrap();
        let dir = scratch.dir().to_path_buf();
        assert!(scratch.image_path().exists());
        assert_eq!(scratch.image_path().extension().unwrap(), "png");
        drop(scratch);
        assert!(!dir.exists());
    }
}
