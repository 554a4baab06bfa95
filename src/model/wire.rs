use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::content::ContentObject;
use super::movie::{EpisodeRef, Movie};
use super::stream::{StreamLanguage, StreamQuality, StreamSubtitle};

/// Wire key -> field name, for every field whose wire key differs from its
/// camelCase field name. Must stay in sync with the renames on `MovieRecord`.
pub const MOVIE_FIELD_MAPPING: &[(&str, &str)] = &[
    ("poster-url", "posterUrl"),
    ("poster-large-url", "pictureLargeUrl"),
    ("title-localized", "titleLocalized"),
    ("imdb-rating", "imdbRating"),
    ("imdb-link", "imdbLink"),
    ("is-subscription", "isSubscription"),
    ("is-premium", "isPremiere"),
    ("language", "languages"),
    ("series-id", "seriesId"),
    ("season-nr", "seasonNr"),
    ("episode-nr", "episodeNr"),
    ("series-name", "seriesName"),
    ("episode-name", "episodeName"),
    ("like", "likeCount"),
    ("dislike", "dislikeCount"),
    ("continue-watching-time", "continueWatchingTime"),
    ("is-watch-later", "isWatchLater"),
    ("current-episode", "actualEpisode"),
    ("next", "nextEpisode"),
    ("default-language", "defaultLanguage"),
    ("default-subtitle-language", "defaultSubtitleLanguage"),
    ("default-quality", "defaultQuality"),
    ("description", "annotation"),
    ("is-paid", "isPaid"),
];

/// A `current-episode` / `next` value as the catalog service sends it:
/// either just the episode id or the whole episode record inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeLink {
    Id(String),
    Record(Box<MovieRecord>),
}

impl EpisodeLink {
    pub fn id(&self) -> &str {
        match self {
            EpisodeLink::Id(id) => id,
            EpisodeLink::Record(record) => &record.content.id,
        }
    }
}

/// The movie record exactly as it appears on the wire.
///
/// Decoding a `Movie` goes through this type so the cascading setters run
/// after the raw fields are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovieRecord {
    #[serde(flatten)]
    pub content: ContentObject,
    pub title: Option<String>,
    #[serde(rename = "title-localized")]
    pub title_localized: Option<String>,
    #[serde(rename = "description")]
    pub annotation: Option<String>,
    pub genre: Option<String>,
    pub genres: Option<Vec<String>>,
    pub year: Option<String>,
    pub length: Option<String>,
    #[serde(rename = "imdb-rating")]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdb-link")]
    pub imdb_link: Option<String>,
    #[serde(alias = "trailer")]
    pub trailer_url: Option<String>,

    #[serde(rename = "poster-url")]
    pub poster_url: Option<String>,
    #[serde(rename = "poster-large-url")]
    pub picture_large_url: Option<String>,
    pub price: Option<Decimal>,
    #[serde(rename = "is-paid")]
    pub is_paid: bool,
    #[serde(rename = "is-subscription")]
    pub is_subscription: bool,
    #[serde(rename = "is-premium")]
    pub is_premiere: bool,

    pub directors: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,

    pub subtitles: Vec<StreamSubtitle>,
    #[serde(rename = "language")]
    pub languages: Vec<StreamLanguage>,
    pub selected_language: Option<StreamLanguage>,
    pub selected_subtitle: Option<StreamSubtitle>,
    #[serde(rename = "default-language")]
    pub default_language: Option<StreamLanguage>,
    #[serde(rename = "default-subtitle-language")]
    pub default_subtitle_language: Option<StreamSubtitle>,
    #[serde(rename = "default-quality")]
    pub default_quality: Option<StreamQuality>,

    #[serde(rename = "series-id")]
    pub series_id: Option<String>,
    #[serde(rename = "season-nr")]
    pub season_nr: Option<i32>,
    #[serde(rename = "episode-nr")]
    pub episode_nr: i32,
    #[serde(rename = "series-name")]
    pub series_name: Option<String>,
    #[serde(rename = "episode-name")]
    pub episode_name: Option<String>,
    #[serde(rename = "current-episode")]
    pub actual_episode: Option<EpisodeLink>,
    #[serde(rename = "next")]
    pub next_episode: Option<EpisodeLink>,
    pub seasons: Option<Vec<i32>>,
    pub active_season: Option<i32>,

    pub user_likes: Option<bool>,
    #[serde(rename = "like")]
    pub like_count: i64,
    #[serde(rename = "dislike")]
    pub dislike_count: i64,

    #[serde(rename = "continue-watching-time")]
    pub continue_watching_time: i64,
    #[serde(rename = "is-watch-later")]
    pub is_watch_later: bool,
}

impl MovieRecord {
    /// Splits the record into the movie and any episode records that were
    /// sent inline under `current-episode` / `next`. The movie keeps only
    /// references to them.
    pub fn into_parts(self) -> (Movie, Vec<MovieRecord>) {
        let mut detached = Vec::new();
        let actual_episode = self.actual_episode.map(|link| detach(link, &mut detached));
        let next_episode = self.next_episode.map(|link| detach(link, &mut detached));

        let mut movie = Movie {
            content: self.content,
            title: self.title,
            title_localized: self.title_localized,
            annotation: self.annotation,
            genre: self.genre,
            genres: self.genres,
            year: self.year,
            length: self.length,
            imdb_rating: self.imdb_rating,
            imdb_link: self.imdb_link,
            trailer_url: self.trailer_url,
            poster_url: self.poster_url,
            picture_large_url: self.picture_large_url,
            price: self.price,
            is_paid: self.is_paid,
            is_subscription: self.is_subscription,
            is_premiere: self.is_premiere,
            directors: self.directors,
            actors: self.actors,
            subtitles: self.subtitles,
            languages: self.languages,
            default_quality: self.default_quality,
            series_id: self.series_id,
            episode_nr: self.episode_nr,
            series_name: self.series_name,
            episode_name: self.episode_name,
            actual_episode,
            next_episode,
            user_likes: self.user_likes,
            like_count: self.like_count,
            dislike_count: self.dislike_count,
            continue_watching_time: self.continue_watching_time,
            is_watch_later: self.is_watch_later,
            ..Movie::default()
        };

        movie.set_seasons(self.seasons);
        if let Some(season_nr) = self.season_nr {
            movie.set_season_nr(season_nr);
        }
        // An explicit active season wins over the season-nr cascade.
        if self.active_season.is_some() {
            movie.set_active_season(self.active_season);
        }
        if self.default_language.is_some() {
            movie.set_default_language(self.default_language);
        }
        if self.default_subtitle_language.is_some() {
            movie.set_default_subtitle_language(self.default_subtitle_language);
        }
        // Same for a track the user picked after the defaults were set.
        if self.selected_language.is_some() {
            movie.selected_language = self.selected_language;
        }
        if self.selected_subtitle.is_some() {
            movie.selected_subtitle = self.selected_subtitle;
        }

        (movie, detached)
    }
}

fn detach(link: EpisodeLink, detached: &mut Vec<MovieRecord>) -> EpisodeRef {
    let episode = EpisodeRef::new(link.id());
    if let EpisodeLink::Record(record) = link {
        detached.push(*record);
    }
    episode
}

impl From<MovieRecord> for Movie {
    fn from(record: MovieRecord) -> Self {
        record.into_parts().0
    }
}

impl From<Movie> for MovieRecord {
    fn from(movie: Movie) -> Self {
        let season_nr = movie.season_nr();
        let active_season = movie.explicit_active_season();
        let seasons = movie.seasons().map(|s| s.to_vec());
        let default_language = movie.default_language().cloned();
        let default_subtitle_language = movie.default_subtitle_language().cloned();

        MovieRecord {
            content: movie.content,
            title: movie.title,
            title_localized: movie.title_localized,
            annotation: movie.annotation,
            genre: movie.genre,
            genres: movie.genres,
            year: movie.year,
            length: movie.length,
            imdb_rating: movie.imdb_rating,
            imdb_link: movie.imdb_link,
            trailer_url: movie.trailer_url,
            poster_url: movie.poster_url,
            picture_large_url: movie.picture_large_url,
            price: movie.price,
            is_paid: movie.is_paid,
            is_subscription: movie.is_subscription,
            is_premiere: movie.is_premiere,
            directors: movie.directors,
            actors: movie.actors,
            subtitles: movie.subtitles,
            languages: movie.languages,
            selected_language: movie.selected_language,
            selected_subtitle: movie.selected_subtitle,
            default_language,
            default_subtitle_language,
            default_quality: movie.default_quality,
            series_id: movie.series_id,
            season_nr: (season_nr != 0).then_some(season_nr),
            episode_nr: movie.episode_nr,
            series_name: movie.series_name,
            episode_name: movie.episode_name,
            actual_episode: movie.actual_episode.map(|e| EpisodeLink::Id(e.id)),
            next_episode: movie.next_episode.map(|e| EpisodeLink::Id(e.id)),
            seasons,
            active_season,
            user_likes: movie.user_likes,
            like_count: movie.like_count,
            dislike_count: movie.dislike_count,
            continue_watching_time: movie.continue_watching_time,
            is_watch_later: movie.is_watch_later,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_matches_serialized_keys() {
        let value = serde_json::to_value(MovieRecord::default()).unwrap();
        let object = value.as_object().unwrap();
        for (wire, _) in MOVIE_FIELD_MAPPING {
            assert!(object.contains_key(*wire), "missing wire key {}", wire);
        }
        assert!(object.contains_key("id"));
        assert!(object.contains_key("type"));
        assert!(object.contains_key("isLandscape"));
        assert!(object.contains_key("trailerUrl"));
        assert!(object.contains_key("userLikes"));
    }

    #[test]
    fn test_nested_episode_is_detached() {
        let json = r#"{
            "id": "s1",
            "series-id": "show",
            "current-episode": {"id": "e4", "title": "Four", "season-nr": 1, "episode-nr": 4},
            "next": "e5"
        }"#;
        let record: MovieRecord = serde_json::from_str(json).unwrap();
        let (movie, detached) = record.into_parts();
        assert_eq!(movie.actual_episode.as_ref().map(|e| e.id.as_str()), Some("e4"));
        assert_eq!(movie.next_episode.as_ref().map(|e| e.id.as_str()), Some("e5"));
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].title.as_deref(), Some("Four"));
    }

    #[test]
    fn test_trailer_alias() {
        let record: MovieRecord =
            serde_json::from_str(r#"{"id": "m1", "trailer": "https://t/1.m3u8"}"#).unwrap();
        assert_eq!(record.trailer_url.as_deref(), Some("https://t/1.m3u8"));
    }
}
