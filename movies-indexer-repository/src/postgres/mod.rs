//! PostgreSQL implementation of the movie source.

mod movie_source;
mod queries;

pub use movie_source::PostgresMovieSource;
