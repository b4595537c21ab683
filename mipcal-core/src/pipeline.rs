//! Capability interfaces between the track finder and its collaborators.
//!
//! The engine never depends on a concrete reader or writer: hits come in
//! through [`HitSource`] and tracks leave through [`TrackSink`].

use std::convert::Infallible;

use crate::{EventHits, EventTracks};

/// Supplies events one at a time.
pub trait HitSource {
    /// Failure type of the underlying reader.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the next event, or `None` once the source is drained.
    ///
    /// # Errors
    /// Returns the reader's error if the next event cannot be produced.
    fn next_event(&mut self) -> Result<Option<EventHits>, Self::Error>;
}

/// Receives reconstructed events in order.
pub trait TrackSink {
    /// Failure type of the underlying writer.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stores one event's tracks.
    ///
    /// # Errors
    /// Returns the writer's error if the event cannot be stored.
    fn write_event(&mut self, event: &EventTracks) -> Result<(), Self::Error>;

    /// Flushes buffered output. The default does nothing.
    ///
    /// # Errors
    /// Returns the writer's error if flushing fails.
    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl HitSource for std::vec::IntoIter<EventHits> {
    type Error = Infallible;

    fn next_event(&mut self) -> Result<Option<EventHits>, Self::Error> {
        Ok(self.next())
    }
}

impl TrackSink for Vec<EventTracks> {
    type Error = Infallible;

    fn write_event(&mut self, event: &EventTracks) -> Result<(), Self::Error> {
        self.push(event.clone());
        Ok(())
    }
}
