use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use tracing::{debug, info};

use crate::model::{EpisodeRef, Movie, MovieRecord};

/// Owns every record decoded from catalog payloads. Records point at each
/// other through `EpisodeRef`s that are resolved here.
#[derive(Debug, Default)]
pub struct MovieCatalog {
    movies: HashMap<String, Movie>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Many(Vec<MovieRecord>),
    One(Box<MovieRecord>),
}

impl MovieCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a single record or an array of records and stores them,
    /// including episodes sent inline. Returns the ids of the top-level
    /// records in payload order.
    pub fn ingest_json(&mut self, json: &str) -> Result<Vec<String>, CatalogError> {
        let payload: Payload = serde_json::from_str(json)?;
        let records = match payload {
            Payload::Many(records) => records,
            Payload::One(record) => vec![*record],
        };

        let ids = records
            .into_iter()
            .map(|record| self.ingest(record))
            .collect::<Vec<_>>();
        info!("Ingested {} records, catalog holds {}", ids.len(), self.movies.len());
        Ok(ids)
    }

    /// Stores `record` and any records nested in it. A top-level record that
    /// is already present is replaced. Inline episodes are often partial, so
    /// they only fill in records the catalog does not have yet.
    pub fn ingest(&mut self, record: MovieRecord) -> String {
        let id = record.content.id.clone();
        self.store(record, true);
        id
    }

    fn store(&mut self, record: MovieRecord, replace: bool) {
        let (movie, detached) = record.into_parts();

        for nested in detached {
            if nested.content.id.is_empty() {
                debug!("Skipping inline episode without id in {}", movie.id());
                continue;
            }
            self.store(nested, false);
        }

        if replace || !self.movies.contains_key(movie.id()) {
            self.insert(movie);
        } else {
            debug!("Keeping stored record {} over inline copy", movie.id());
        }
    }

    pub fn insert(&mut self, movie: Movie) -> Option<Movie> {
        self.movies.insert(movie.id().to_string(), movie)
    }

    pub fn get(&self, id: &str) -> Option<&Movie> {
        self.movies.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Movie> {
        self.movies.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn resolve(&self, episode: &EpisodeRef) -> Option<&Movie> {
        self.movies.get(&episode.id)
    }

    /// Last watched episode of a series record.
    pub fn actual_episode(&self, movie: &Movie) -> Option<&Movie> {
        movie.actual_episode.as_ref().and_then(|e| self.resolve(e))
    }

    pub fn next_episode(&self, movie: &Movie) -> Option<&Movie> {
        movie.next_episode.as_ref().and_then(|e| self.resolve(e))
    }

    /// Episodes of `series_id`, ordered by season then episode number.
    pub fn episodes(&self, series_id: &str) -> Vec<&Movie> {
        let mut episodes = self
            .movies
            .values()
            .filter(|m| m.series_id.as_deref() == Some(series_id))
            .collect::<Vec<_>>();
        episodes.sort_by_key(|m| (m.season_nr(), m.episode_nr));
        episodes
    }

    /// Distinct season numbers of `series_id` found in the catalog, ascending.
    pub fn seasons(&self, series_id: &str) -> Vec<i32> {
        self.movies
            .values()
            .filter(|m| m.series_id.as_deref() == Some(series_id))
            .map(|m| m.season_nr())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid payload: {0}")]
    Parse(#[from] serde_json::Error),
}
