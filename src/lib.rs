pub mod catalog;
pub mod config;
pub mod db;
pub mod images;
pub mod model;

use std::path::Path;
use tracing::info;

use crate::catalog::{CatalogError, MovieCatalog};
use crate::db::ContinueWatchingStore;
use crate::images::{CachingImageLoader, ImageError, ImageSize};
use crate::model::Movie;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Client error: {0}")]
    Client(String),
}

pub fn load_config(config_path: &str, debug_logs: bool) -> Result<config::Config, ClientError> {
    let mut config = if Path::new(config_path).exists() {
        info!("Using config file: {}", config_path);
        config::Config::from_file(config_path)?
    } else {
        info!("Config file {} not found, using defaults", config_path);
        config::Config::default()
    };
    config.debug_logs = debug_logs;
    Ok(config)
}

pub fn load_catalog(payload_path: &str) -> Result<(MovieCatalog, Vec<String>), ClientError> {
    let json = std::fs::read_to_string(payload_path)
        .map_err(|e| ClientError::Client(format!("Failed to read {}: {}", payload_path, e)))?;
    let mut catalog = MovieCatalog::new();
    let ids = catalog.ingest_json(&json)?;
    Ok((catalog, ids))
}

async fn open_store(config: &config::Config) -> Result<Option<db::SqliteRepository>, ClientError> {
    match config.get_database_path() {
        Some(db_path) => {
            info!("Opening database at {}", db_path);
            Ok(Some(db::SqliteRepository::new(&db_path).await?))
        }
        None => Ok(None),
    }
}

/// One line per record of the payload, plus the resume point when a
/// database is configured.
pub async fn show(config: &config::Config, payload_path: &str) -> Result<Vec<String>, ClientError> {
    let (mut catalog, ids) = load_catalog(payload_path)?;
    let store = open_store(config).await?;
    let barrier = config.continuewatching.barrier;

    let mut lines = Vec::new();
    for id in ids {
        if let (Some(store), Some(movie)) = (store.as_ref(), catalog.get_mut(&id)) {
            movie.load_continue_watching(store).await?;
        }
        let Some(movie) = catalog.get(&id) else {
            continue;
        };
        lines.push(describe(&catalog, movie, barrier));
    }
    Ok(lines)
}

fn describe(catalog: &MovieCatalog, movie: &Movie, barrier: i64) -> String {
    let mut line = movie.analytics_title();
    if movie.is_series() {
        line.push_str(&format!(" [{}]", movie.short_episodes_name()));
        if let Some(season) = movie.active_season() {
            line.push_str(&format!(" season {}", season));
        }
        if let Some(next) = catalog.next_episode(movie) {
            line.push_str(&format!(" next {}", next.short_episodes_name()));
        }
    }
    if movie.is_free() {
        line.push_str(" free");
    } else if let Some(price) = movie.price {
        line.push_str(&format!(" price {}", price));
    }
    if !movie.languages.is_empty() {
        let labels = movie.languages.iter().map(|l| l.label()).collect::<Vec<_>>();
        line.push_str(&format!(" languages {}", labels.join(",")));
    }
    if !movie.subtitles.is_empty() {
        let labels = movie.subtitles.iter().map(|s| s.label()).collect::<Vec<_>>();
        line.push_str(&format!(" subtitles {}", labels.join(",")));
    }
    if movie.has_continue_watching_time(barrier) {
        line.push_str(&format!(" resume at {}s", movie.continue_watching_time));
    }
    line
}

/// Applies a new resume point to record `id` and persists it.
pub async fn resume(
    config: &config::Config,
    payload_path: &str,
    id: &str,
    seconds: i64,
) -> Result<i64, ClientError> {
    let (mut catalog, _) = load_catalog(payload_path)?;
    let store = open_store(config)
        .await?
        .ok_or_else(|| ClientError::Client("No database path configured".to_string()))?;
    let movie = catalog
        .get_mut(id)
        .ok_or_else(|| ClientError::Client(format!("No record with id {}", id)))?;

    movie
        .save_continue_watching(&store, config.continuewatching.barrier, seconds)
        .await?;
    info!("{}: resume point now {}s", movie.analytics_title(), movie.continue_watching_time);

    let recent = store.list_continue_watching(Some(5)).await?;
    for entry in recent {
        info!("Recently watched: {} ({}) at {}s", entry.id, entry.content_type, entry.seconds);
    }

    Ok(movie.continue_watching_time)
}

/// Fetches the poster (or large picture) of record `id` and writes it to `out`.
pub async fn poster(
    config: &config::Config,
    payload_path: &str,
    id: &str,
    large: bool,
    size: Option<ImageSize>,
    out: &str,
) -> Result<(), ClientError> {
    let (catalog, _) = load_catalog(payload_path)?;
    let movie = catalog
        .get(id)
        .ok_or_else(|| ClientError::Client(format!("No record with id {}", id)))?;
    let loader = CachingImageLoader::new(&config.images)?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let completed = move |img: Option<images::LoadedImage>, path: String| {
        let _ = tx.send((img, path));
    };
    match (large, size) {
        (false, None) => movie.fetch_poster_image(&loader, completed),
        (true, None) => movie.fetch_large_image(&loader, completed),
        (false, Some(size)) => movie.fetch_resized_poster_image(&loader, size, completed),
        (true, Some(size)) => movie.fetch_resized_large_image(&loader, size, completed),
    }

    let (img, source) = rx
        .await
        .map_err(|_| ClientError::Client("Image loader dropped the request".to_string()))?;
    let img = img.ok_or_else(|| ClientError::Client(format!("No image for '{}'", source)))?;
    img.save(out).map_err(ImageError::from)?;
    info!("Wrote {} ({}x{}) to {}", source, img.width(), img.height(), out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_show_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("payload.json");
        std::fs::write(
            &payload,
            r#"[{"id": "m1", "type": "vod", "title": "One", "is-subscription": true, "price": 3.5,
                 "language": [{"code": "en"}, {"code": "lv"}]},
                {"id": "e1", "type": "vod", "title": "Ep", "series-id": "s", "season-nr": 1, "episode-nr": 2,
                 "subtitles": [{"code": "lv", "name": "Latviski"}, {"code": "ru"}]}]"#,
        )
        .unwrap();
        let payload = payload.to_string_lossy().to_string();

        let mut config = config::Config::default();
        config.dbdir = Some(dir.path().to_string_lossy().to_string());

        let saved = resume(&config, &payload, "m1", 600).await.unwrap();
        assert_eq!(saved, 600);

        let lines = show(&config, &payload).await.unwrap();
        assert_eq!(
            lines[0],
            "Title: One, VOD ID: m1 price 3.5 languages en,lv resume at 600s"
        );
        assert_eq!(lines[1], "Title: Ep, VOD ID: e1 [S01E02] season 1 free subtitles Latviski,ru");

        assert_eq!(resume(&config, &payload, "m1", 5).await.unwrap(), 0);
        assert!(resume(&config, &payload, "nope", 100).await.is_err());
    }

    #[tokio::test]
    async fn test_poster_fails_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let payload = dir.path().join("payload.json");
        std::fs::write(
            &payload,
            r#"{"id": "m1", "title": "One", "poster-url": "gone.png"}"#,
        )
        .unwrap();
        let payload = payload.to_string_lossy().to_string();

        let assets = dir.path().join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        image::RgbImage::new(2, 3)
            .save(assets.join(format!("{}.png", model::PLACEHOLDER_MOVIE_POSTER)))
            .unwrap();

        let mut config = config::Config::default();
        config.images.cachedir = dir.path().join("cache").to_string_lossy().to_string();
        config.images.assetdir = assets.to_string_lossy().to_string();

        let out = dir.path().join("out.png");
        let result = poster(&config, &payload, "m1", false, None, &out.to_string_lossy()).await;
        assert!(matches!(result, Err(ClientError::Client(_))));
        assert!(!out.exists());
    }
}
