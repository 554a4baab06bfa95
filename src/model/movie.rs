use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::content::ContentObject;
use super::stream::{StreamLanguage, StreamQuality, StreamSubtitle};
use super::wire::{MovieRecord, MOVIE_FIELD_MAPPING};
use crate::db::{ContinueWatchingStore, DbResult};
use crate::images::{ImageLoader, ImageSize, LoadedImage};

/// Asset name of the poster shown while loading or when a fetch fails.
pub const PLACEHOLDER_MOVIE_POSTER: &str = "placeholder_movie_poster";

/// Non-owning link to another record. The catalog that ingested the
/// payload owns the episode itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub id: String,
}

impl EpisodeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A movie or a series episode.
///
/// Equality only looks at `id`, `is_subscription`, `poster_url` and `title`,
/// which is what list refreshes need to decide whether a row changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "MovieRecord", into = "MovieRecord")]
pub struct Movie {
    pub content: ContentObject,

    pub title: Option<String>,
    pub title_localized: Option<String>,
    pub annotation: Option<String>,
    pub genre: Option<String>,
    pub genres: Option<Vec<String>>,
    pub year: Option<String>,
    pub length: Option<String>,
    pub imdb_rating: Option<String>,
    pub imdb_link: Option<String>,
    pub trailer_url: Option<String>,

    pub poster_url: Option<String>,
    /// Full resolution picture.
    pub picture_large_url: Option<String>,
    pub price: Option<Decimal>,
    pub is_paid: bool,
    pub is_subscription: bool,
    pub is_premiere: bool,

    pub directors: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,

    pub subtitles: Vec<StreamSubtitle>,
    pub languages: Vec<StreamLanguage>,
    pub selected_language: Option<StreamLanguage>,
    pub selected_subtitle: Option<StreamSubtitle>,
    pub(super) default_language: Option<StreamLanguage>,
    pub(super) default_subtitle_language: Option<StreamSubtitle>,
    pub default_quality: Option<StreamQuality>,

    pub series_id: Option<String>,
    pub(super) season_nr: i32,
    pub episode_nr: i32,
    pub series_name: Option<String>,
    pub episode_name: Option<String>,
    /// Last watched episode of the series.
    pub actual_episode: Option<EpisodeRef>,
    pub next_episode: Option<EpisodeRef>,
    pub(super) seasons: Option<Vec<i32>>,
    pub(super) active_season: Option<i32>,

    pub user_likes: Option<bool>,
    pub like_count: i64,
    pub dislike_count: i64,

    /// Resume point in seconds.
    pub continue_watching_time: i64,
    pub is_watch_later: bool,
}

impl Movie {
    pub fn new(id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content: ContentObject::new(id, content_type),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.content.id
    }

    pub fn content_type(&self) -> &str {
        &self.content.content_type
    }

    /// Wire key -> field name table used when decoding catalog payloads.
    pub fn mapping() -> &'static [(&'static str, &'static str)] {
        MOVIE_FIELD_MAPPING
    }

    pub fn is_series(&self) -> bool {
        self.series_id.is_some()
    }

    pub fn is_free(&self) -> bool {
        !self.is_subscription && !self.is_premiere
    }

    pub fn season_nr(&self) -> i32 {
        self.season_nr
    }

    /// Sets the season number and makes it the active season as well.
    pub fn set_season_nr(&mut self, season_nr: i32) {
        self.season_nr = season_nr;
        self.active_season = Some(season_nr);
    }

    pub fn seasons(&self) -> Option<&[i32]> {
        self.seasons.as_deref()
    }

    /// Stores the available seasons in ascending order.
    pub fn set_seasons(&mut self, seasons: Option<Vec<i32>>) {
        self.seasons = seasons.map(|mut s| {
            s.sort_unstable();
            s
        });
    }

    /// The season to show by default: the last one picked, otherwise the
    /// lowest season available.
    pub fn active_season(&self) -> Option<i32> {
        self.active_season
            .or_else(|| self.seasons.as_ref().and_then(|s| s.first().copied()))
    }

    pub fn set_active_season(&mut self, season: Option<i32>) {
        self.active_season = season;
    }

    pub(super) fn explicit_active_season(&self) -> Option<i32> {
        self.active_season
    }

    pub fn default_language(&self) -> Option<&StreamLanguage> {
        self.default_language.as_ref()
    }

    /// Sets the default audio track and selects it.
    pub fn set_default_language(&mut self, language: Option<StreamLanguage>) {
        self.selected_language = language.clone();
        self.default_language = language;
    }

    pub fn default_subtitle_language(&self) -> Option<&StreamSubtitle> {
        self.default_subtitle_language.as_ref()
    }

    /// Sets the default subtitle track and selects it.
    pub fn set_default_subtitle_language(&mut self, subtitle: Option<StreamSubtitle>) {
        self.selected_subtitle = subtitle.clone();
        self.default_subtitle_language = subtitle;
    }

    /// Episode code such as `S02E07`.
    pub fn short_episodes_name(&self) -> String {
        format!("S{:02}E{:02}", self.season_nr, self.episode_nr)
    }

    pub fn analytics_title(&self) -> String {
        format!(
            "Title: {}, VOD ID: {}",
            self.title.as_deref().unwrap_or_default(),
            self.content.id
        )
    }

    pub fn language_by_position(&self, index: usize) -> Option<&StreamLanguage> {
        self.languages.get(index)
    }

    pub fn language_by_code(&self, code: &str) -> Option<&StreamLanguage> {
        self.languages.iter().find(|l| l.code == code)
    }

    pub fn has_continue_watching_time(&self, barrier: i64) -> bool {
        self.continue_watching_time > barrier
    }

    /// Records a new resume point. Anything at or below `barrier` is not
    /// worth resuming and clears the stored position instead.
    ///
    /// The in-memory value is updated before the store is called and is not
    /// rolled back if the store fails.
    pub async fn save_continue_watching<S>(
        &mut self,
        store: &S,
        barrier: i64,
        seconds: i64,
    ) -> DbResult<()>
    where
        S: ContinueWatchingStore + ?Sized,
    {
        if seconds > barrier {
            self.continue_watching_time = seconds;
            debug!("Saving resume point {}s for {}", seconds, self.content.id);
            store
                .set_continue_watching(&self.content.id, seconds, &self.content.content_type)
                .await
        } else {
            self.reset_continue_watching(store).await
        }
    }

    pub async fn reset_continue_watching<S>(&mut self, store: &S) -> DbResult<()>
    where
        S: ContinueWatchingStore + ?Sized,
    {
        self.continue_watching_time = 0;
        debug!("Resetting resume point for {}", self.content.id);
        store
            .reset_continue_watching(&self.content.id, &self.content.content_type)
            .await
    }

    /// Pulls the stored resume point into this record, if there is one.
    pub async fn load_continue_watching<S>(&mut self, store: &S) -> DbResult<bool>
    where
        S: ContinueWatchingStore + ?Sized,
    {
        match store
            .get_continue_watching(&self.content.id, &self.content.content_type)
            .await?
        {
            Some(seconds) => {
                self.continue_watching_time = seconds;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn fetch_poster_image<L, F>(&self, loader: &L, completed: F)
    where
        L: ImageLoader + ?Sized,
        F: FnOnce(Option<LoadedImage>, String) + Send + 'static,
    {
        loader.fetch_image(
            self.poster_url.as_deref(),
            PLACEHOLDER_MOVIE_POSTER,
            None,
            Box::new(completed),
        );
    }

    pub fn fetch_large_image<L, F>(&self, loader: &L, completed: F)
    where
        L: ImageLoader + ?Sized,
        F: FnOnce(Option<LoadedImage>, String) + Send + 'static,
    {
        loader.fetch_image(
            self.picture_large_url.as_deref(),
            PLACEHOLDER_MOVIE_POSTER,
            None,
            Box::new(completed),
        );
    }

    /// Like `fetch_poster_image`, downscaled to fit `size`.
    pub fn fetch_resized_poster_image<L, F>(&self, loader: &L, size: ImageSize, completed: F)
    where
        L: ImageLoader + ?Sized,
        F: FnOnce(Option<LoadedImage>, String) + Send + 'static,
    {
        loader.fetch_image(
            self.poster_url.as_deref(),
            PLACEHOLDER_MOVIE_POSTER,
            Some(size),
            Box::new(completed),
        );
    }

    pub fn fetch_resized_large_image<L, F>(&self, loader: &L, size: ImageSize, completed: F)
    where
        L: ImageLoader + ?Sized,
        F: FnOnce(Option<LoadedImage>, String) + Send + 'static,
    {
        loader.fetch_image(
            self.picture_large_url.as_deref(),
            PLACEHOLDER_MOVIE_POSTER,
            Some(size),
            Box::new(completed),
        );
    }

    /// Image to show while a poster is loading or after a fetch reported `None`.
    pub fn placeholder_poster_image<L>(&self, loader: &L) -> Option<LoadedImage>
    where
        L: ImageLoader + ?Sized,
    {
        loader.placeholder(PLACEHOLDER_MOVIE_POSTER)
    }
}

impl PartialEq for Movie {
    fn eq(&self, other: &Self) -> bool {
        self.content.id == other.content.id
            && self.is_subscription == other.is_subscription
            && self.poster_url == other.poster_url
            && self.title == other.title
    }
}
