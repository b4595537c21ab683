//! Error types for mipcal-core.

use thiserror::Error;

/// Result type alias for mipcal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by a [`HitSource`](crate::HitSource) or
/// [`TrackSink`](crate::TrackSink) implementation.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error types for mipcal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent tracking configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unrecognized detector section name or id.
    #[error("unknown section: {0}")]
    UnknownSection(String),

    /// The hit source failed to produce the next event.
    #[error("hit source error: {0}")]
    Source(#[source] BoxedError),

    /// The track sink failed to accept an event.
    #[error("track sink error: {0}")]
    Sink(#[source] BoxedError),
}

impl Error {
    /// Wraps a hit source failure.
    pub fn from_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Box::new(err))
    }

    /// Wraps a track sink failure.
    pub fn from_sink<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Sink(Box::new(err))
    }
}
