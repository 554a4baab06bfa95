use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{ImageCache, ImageCallback, ImageError, ImageLoader, ImageSize, LoadedImage};
use crate::config::ImagesConfig;

/// Loads images from `http(s)` URLs or local files, downscales them on
/// request and keeps the downscaled copies in an `ImageCache`.
pub struct CachingImageLoader {
    inner: Arc<LoaderInner>,
    runtime: Handle,
}

struct LoaderInner {
    cache: ImageCache,
    client: reqwest::Client,
    asset_dir: PathBuf,
    base_url: Option<String>,
    placeholders: Mutex<HashMap<String, Option<LoadedImage>>>,
}

impl CachingImageLoader {
    /// Must be called from within a tokio runtime; callbacks are run on it.
    pub fn new(config: &ImagesConfig) -> Result<Self, ImageError> {
        let runtime = Handle::try_current().map_err(|_| ImageError::NoRuntime)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            inner: Arc::new(LoaderInner {
                cache: ImageCache::new(PathBuf::from(&config.cachedir))?,
                client,
                asset_dir: PathBuf::from(&config.assetdir),
                base_url: config.baseurl.clone(),
                placeholders: Mutex::new(HashMap::new()),
            }),
            runtime,
        })
    }

    pub fn cache(&self) -> &ImageCache {
        &self.inner.cache
    }
}

impl LoaderInner {
    async fn load(self: Arc<Self>, path: String, size: Option<ImageSize>) -> Result<DynamicImage, ImageError> {
        if let Some(size) = size {
            let inner = Arc::clone(&self);
            let source = path.clone();
            let cached = tokio::task::spawn_blocking(move || inner.cache.get(&source, size)).await?;
            if let Some(img) = cached {
                return Ok(img);
            }
        }

        let bytes = self.fetch_bytes(&path).await?;

        // Decoding and resizing are CPU bound, keep them off the runtime workers.
        tokio::task::spawn_blocking(move || match size {
            Some(size) => self.cache.resize_and_store(&path, &bytes, size),
            None => Ok(image::load_from_memory(&bytes)?),
        })
        .await?
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ImageError> {
        let url = if is_remote(path) {
            Some(path.to_string())
        } else {
            self.base_url.as_ref().filter(|_| !path.starts_with('/')).map(|base| {
                format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches("./"))
            })
        };

        match url {
            Some(url) => {
                debug!("Downloading image {}", url);
                let response = self.client.get(&url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            None => {
                debug!("Reading image {}", path);
                Ok(tokio::fs::read(path).await?)
            }
        }
    }

    /// Loads `<assetdir>/<asset>.png` once and remembers the outcome.
    fn placeholder(&self, asset: &str) -> Option<LoadedImage> {
        let mut placeholders = self.placeholders.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(img) = placeholders.get(asset) {
            return img.clone();
        }

        let path = self.asset_dir.join(format!("{}.png", asset));
        let img = match image::open(&path) {
            Ok(img) => Some(Arc::new(img)),
            Err(e) => {
                warn!("Placeholder {:?} unavailable: {}", path, e);
                None
            }
        };
        placeholders.insert(asset.to_string(), img.clone());
        img
    }
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

impl ImageLoader for CachingImageLoader {
    fn fetch_image(
        &self,
        path: Option<&str>,
        placeholder: &str,
        size: Option<ImageSize>,
        completed: ImageCallback,
    ) {
        let inner = Arc::clone(&self.inner);
        let path = path.map(str::to_string);
        let placeholder = placeholder.to_string();

        self.runtime.spawn(async move {
            let source = path.clone().unwrap_or_default();
            let result = match path {
                Some(p) => Arc::clone(&inner).load(p, size).await,
                None => Err(ImageError::MissingPath),
            };

            let image = match result {
                Ok(img) => Some(Arc::new(img)),
                Err(e) => {
                    warn!("Failed to load image '{}': {}", source, e);
                    // Warm the placeholder so the caller's lookup is a cache hit.
                    let warm = tokio::task::spawn_blocking(move || inner.placeholder(&placeholder));
                    if let Err(e) = warm.await {
                        warn!("Placeholder task failed: {}", e);
                    }
                    None
                }
            };

            completed(image, source);
        });
    }

    fn placeholder(&self, asset: &str) -> Option<LoadedImage> {
        self.inner.placeholder(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::LoadedImage;
    use crate::model::{Movie, PLACEHOLDER_MOVIE_POSTER};
    use image::{GenericImageView, ImageBuffer, Rgb};
    use tokio::sync::oneshot;

    fn write_png(path: &std::path::Path, width: u32, height: u32) {
        ImageBuffer::from_pixel(width, height, Rgb::<u8>([0, 120, 200]))
            .save(path)
            .unwrap();
    }

    fn config(dir: &tempfile::TempDir) -> ImagesConfig {
        ImagesConfig {
            cachedir: dir.path().join("cache").to_string_lossy().to_string(),
            assetdir: dir.path().join("assets").to_string_lossy().to_string(),
            baseurl: None,
            timeout: 5,
        }
    }

    fn channel() -> (
        oneshot::Receiver<(Option<LoadedImage>, String)>,
        impl FnOnce(Option<LoadedImage>, String) + Send + 'static,
    ) {
        let (tx, rx) = oneshot::channel();
        (rx, move |img, path| {
            let _ = tx.send((img, path));
        })
    }

    #[tokio::test]
    async fn test_resized_poster_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let poster = dir.path().join("poster.png");
        write_png(&poster, 40, 60);

        let loader = CachingImageLoader::new(&config(&dir)).unwrap();
        let mut movie = Movie::new("m1", "vod");
        movie.poster_url = Some(poster.to_string_lossy().to_string());

        let (rx, cb) = channel();
        movie.fetch_resized_poster_image(&loader, ImageSize::new(20, 30), cb);
        let (img, path) = rx.await.unwrap();

        assert_eq!(img.unwrap().dimensions(), (20, 30));
        assert_eq!(path, poster.to_string_lossy());
        assert!(loader.cache().cache_size().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_full_size_large_image() {
        let dir = tempfile::tempdir().unwrap();
        let large = dir.path().join("large.png");
        write_png(&large, 64, 36);

        let loader = CachingImageLoader::new(&config(&dir)).unwrap();
        let mut movie = Movie::new("m1", "vod");
        movie.picture_large_url = Some(large.to_string_lossy().to_string());

        let (rx, cb) = channel();
        movie.fetch_large_image(&loader, cb);
        let (img, _) = rx.await.unwrap();
        assert_eq!(img.unwrap().dimensions(), (64, 36));
    }

    #[tokio::test]
    async fn test_failure_reports_none_and_placeholder_is_separate() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        std::fs::create_dir_all(&config.assetdir).unwrap();
        write_png(
            &PathBuf::from(&config.assetdir).join(format!("{}.png", PLACEHOLDER_MOVIE_POSTER)),
            2,
            3,
        );

        let loader = CachingImageLoader::new(&config).unwrap();
        let mut movie = Movie::new("m1", "vod");
        movie.poster_url = Some(dir.path().join("missing.png").to_string_lossy().to_string());

        let (rx, cb) = channel();
        movie.fetch_poster_image(&loader, cb);
        let (img, path) = rx.await.unwrap();
        assert!(img.is_none());
        assert!(path.ends_with("missing.png"));

        let placeholder = movie.placeholder_poster_image(&loader).unwrap();
        assert_eq!(placeholder.dimensions(), (2, 3));
        assert!(loader.placeholder("no-such-asset").is_none());
    }

    #[tokio::test]
    async fn test_missing_path_without_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let loader = CachingImageLoader::new(&config(&dir)).unwrap();
        let movie = Movie::new("m1", "vod");

        let (rx, cb) = channel();
        movie.fetch_poster_image(&loader, cb);
        let (img, path) = rx.await.unwrap();
        assert!(img.is_none());
        assert_eq!(path, "");
        assert!(movie.placeholder_poster_image(&loader).is_none());
    }

    #[tokio::test]
    async fn test_cached_resize_is_served_again() {
        let dir = tempfile::tempdir().unwrap();
        let poster = dir.path().join("poster.png");
        write_png(&poster, 80, 80);

        let loader = CachingImageLoader::new(&config(&dir)).unwrap();
        let mut movie = Movie::new("m1", "vod");
        movie.poster_url = Some(poster.to_string_lossy().to_string());

        let (rx, cb) = channel();
        movie.fetch_resized_poster_image(&loader, ImageSize::new(10, 10), cb);
        assert_eq!(rx.await.unwrap().0.unwrap().dimensions(), (10, 10));

        std::fs::remove_file(&poster).unwrap();
        let (rx, cb) = channel();
        movie.fetch_resized_poster_image(&loader, ImageSize::new(10, 10), cb);
        assert_eq!(rx.await.unwrap().0.unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn test_requires_runtime() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CachingImageLoader::new(&config(&dir)),
            Err(ImageError::NoRuntime)
        ));
    }
}
