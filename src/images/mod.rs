mod cache;
mod loader;

use std::sync::Arc;

use image::DynamicImage;

pub use cache::ImageCache;
pub use loader::CachingImageLoader;

pub type LoadedImage = Arc<DynamicImage>;

/// Completion callback for an image request. Receives the image (or `None`)
/// and the path that was requested, so concurrent requests for the same
/// record can be told apart.
pub type ImageCallback = Box<dyn FnOnce(Option<LoadedImage>, String) + Send + 'static>;

/// Bounding box for a downscaled image. Aspect ratio is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub trait ImageLoader: Send + Sync {
    /// Starts loading `path`. `completed` is called exactly once, possibly
    /// on another thread, with `None` when the image cannot be loaded.
    /// `placeholder` names the asset the caller shows while loading and on
    /// failure; the loader makes it available through `placeholder`.
    fn fetch_image(
        &self,
        path: Option<&str>,
        placeholder: &str,
        size: Option<ImageSize>,
        completed: ImageCallback,
    );

    /// The placeholder image for `asset`, if the loader can resolve it.
    fn placeholder(&self, _asset: &str) -> Option<LoadedImage> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No image path")]
    MissingPath,
    #[error("No async runtime available")]
    NoRuntime,
    #[error("Image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
