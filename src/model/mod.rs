pub mod content;
pub mod movie;
pub mod stream;
pub mod wire;

pub use content::ContentObject;
pub use movie::{EpisodeRef, Movie, PLACEHOLDER_MOVIE_POSTER};
pub use stream::{StreamLanguage, StreamQuality, StreamSubtitle};
pub use wire::{EpisodeLink, MovieRecord, MOVIE_FIELD_MAPPING};
