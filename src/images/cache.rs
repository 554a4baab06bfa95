use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use super::{ImageError, ImageSize};

/// Disk cache of downscaled images, keyed by source and target size.
pub struct ImageCache {
    cache_dir: PathBuf,
}

impl ImageCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self, ImageError> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn get(&self, source: &str, size: ImageSize) -> Option<DynamicImage> {
        let cache_path = self.cache_dir.join(self.generate_cache_key(source, size));
        if !cache_path.exists() {
            return None;
        }
        let decoded = fs::read(&cache_path)
            .map_err(ImageError::from)
            .and_then(|bytes| Ok(image::load_from_memory(&bytes)?));
        match decoded {
            Ok(img) => {
                debug!("Serving cached image for {}", source);
                Some(img)
            }
            Err(e) => {
                error!("Failed to read cached image {:?}: {}", cache_path, e);
                None
            }
        }
    }

    /// Downscales `bytes` to fit `size` and stores the result. Returns the
    /// decoded, resized image.
    pub fn resize_and_store(
        &self,
        source: &str,
        bytes: &[u8],
        size: ImageSize,
    ) -> Result<DynamicImage, ImageError> {
        let format = image::guess_format(bytes)?;
        let img = image::load_from_memory_with_format(bytes, format)?;

        let (orig_width, orig_height) = img.dimensions();
        let resized = if orig_width <= size.width && orig_height <= size.height {
            img
        } else {
            img.resize(size.width, size.height, FilterType::Lanczos3)
        };

        let cache_key = self.generate_cache_key(source, size);
        match self.encode_image(&resized, format) {
            Ok(encoded) => {
                if let Err(e) = fs::write(self.cache_dir.join(&cache_key), &encoded) {
                    error!("Failed to write cache file {}: {}", cache_key, e);
                }
            }
            Err(e) => error!("Failed to encode image {}: {}", source, e),
        }

        Ok(resized)
    }

    fn encode_image(&self, img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());

        match format {
            ImageFormat::Jpeg => {
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 90);
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
            }
            _ => {
                img.write_to(&mut buffer, format)?;
            }
        }

        Ok(buffer.into_inner())
    }

    fn generate_cache_key(&self, source: &str, size: ImageSize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(size.width.to_le_bytes());
        hasher.update(size.height.to_le_bytes());
        let hash = hex::encode(hasher.finalize());

        let extension = Path::new(source.split(['?', '#']).next().unwrap_or(source))
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");

        format!("{}.{}", hash, extension)
    }

    pub fn clear_cache(&self) -> Result<(), ImageError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    pub fn cache_size(&self) -> Result<u64, ImageError> {
        let mut total_size = 0u64;

        if !self.cache_dir.exists() {
            return Ok(0);
        }

        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                }
            }
        }

        Ok(total_size)
    }
}
