//! Emoji catalog and face-rectangle compositing.
//!
//! The catalog loads once at startup and is shared read-only via `Arc`; each
//! worker job resizes a uniformly-chosen emoji to a detected face rectangle
//! and blends it over the source image with source-over compositing.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImage, ImageFormat};
use rand::seq::SliceRandom;

use crate::error::EmojimiseError;
use crate::model::Rectangle;

/// Immutable, preloaded set of decodable emoji rasters.
pub struct Compositor {
    emoji: Vec<DynamicImage>,
}

impl Compositor {
    /// Walks `dir`, decoding every file that parses as an image.
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut emoji = Vec::new();
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("reading emoji dir {}: {e}", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match image::open(entry.path()) {
                Ok(img) => emoji.push(img),
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), %err, "skipping undecodable emoji file");
                }
            }
        }

        if emoji.is_empty() {
            anyhow::bail!("no decodable emoji images found under {}", dir.display());
        }

        tracing::info!(count = emoji.len(), "loaded emoji catalog");
        Ok(Self { emoji })
    }

    /// Overlays a uniformly random emoji onto `base` at each rectangle,
    /// resized to that rectangle's width and height.
    pub fn composite(&self, base: &DynamicImage, faces: &[Rectangle]) -> DynamicImage {
        let mut out = base.to_rgba8();
        let mut rng = rand::thread_rng();

        for rect in faces {
            let (w, h) = (rect.width(), rect.height());
            if w == 0 || h == 0 {
                continue;
            }
            let Some(emoji) = self.emoji.choose(&mut rng) else {
                continue;
            };
            let resized = emoji.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();

            let mut canvas = DynamicImage::ImageRgba8(out);
            let _ = canvas.copy_from(&resized, rect.min.x, rect.min.y);
            out = canvas.to_rgba8();
        }

        DynamicImage::ImageRgba8(out)
    }

    /// Encodes `img` as JPEG at quality 60, matching the worker's output format.
    pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, EmojimiseError> {
        let mut buf = std::io::Cursor::new(Vec::new());
        let rgb = img.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 60);
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(EmojimiseError::internal)?;
        Ok(buf.into_inner())
    }

    /// Decodes raw bytes into a raster, failing the job on invalid input.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, EmojimiseError> {
        image::load_from_memory(bytes)
            .map_err(|e| EmojimiseError::InvalidArgument(format!("undecodable image: {e}")))
    }

    #[allow(dead_code)]
    fn format_hint(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;

    fn write_test_png(dir: &Path, name: &str) {
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let mut path = dir.to_path_buf();
        path.push(name);
        let mut f = std::fs::File::create(&path).unwrap();
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        f.write_all(&buf).unwrap();
    }

    #[test]
    fn loads_catalog_and_composites_without_panicking() {
        let dir = tempdir("catalog");
        write_test_png(&dir, "a.png");
        write_test_png(&dir, "b.png");

        let compositor = Compositor::load(&dir).unwrap();
        let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255])));
        let faces = vec![Rectangle {
            min: crate::model::Point { x: 10, y: 10 },
            max: crate::model::Point { x: 30, y: 40 },
        }];

        let out = compositor.composite(&base, &faces);
        assert_eq!(out.width(), 100);
        assert_eq!(out.height(), 100);
    }

    #[test]
    fn empty_dir_fails_to_load() {
        let dir = tempdir("empty");
        assert!(Compositor::load(&dir).is_err());
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        assert!(Compositor::decode(b"not an image").is_err());
    }

    fn tempdir(label: &str) -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("emojimise-test-{label}-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }
}
