use crate::collaborators::Thumbnailer;
use crate::error::{Error, Result};
use crate::importer::ImportConfig;
use crate::types::{Blob, Thumbnail};
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;
use tokio::task::spawn_blocking;

/// Thumbnailer backed by the `image` crate.
///
/// Decodes any format `image` supports, scales it to fit the bounding box while
/// keeping the aspect ratio, and encodes the result as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self::new(250, 350)
    }
}

impl ImageThumbnailer {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.thumbnail_max_width, config.thumbnail_max_height)
    }

    fn render(bytes: &[u8], max_width: u32, max_height: u32) -> Result<Thumbnail> {
        let failed = |e: image::ImageError| Error::ThumbnailGeneration(e.to_string());

        let source = image::load_from_memory(bytes).map_err(failed)?;
        // JPEG has no alpha channel
        let scaled = source.thumbnail(max_width, max_height).to_rgb8();
        let (width, height) = scaled.dimensions();

        let mut encoded = Cursor::new(Vec::new());
        scaled
            .write_to(&mut encoded, ImageFormat::Jpeg)
            .map_err(failed)?;

        Ok(Thumbnail {
            content: Blob::from(encoded.into_inner()),
            width,
            height,
        })
    }
}

#[async_trait]
impl Thumbnailer for ImageThumbnailer {
    async fn generate(&self, image: &Blob) -> Result<Thumbnail> {
        if image.is_empty() {
            return Err(Error::ThumbnailGeneration("image is empty".to_string()));
        }
        let content = image.clone();
        let (max_width, max_height) = (self.max_width, self.max_height);
        spawn_blocking(move || Self::render(content.bytes(), max_width, max_height))
            .await
            .map_err(|e| Error::AsyncTaskError(e.to_string()))?
    }
}
