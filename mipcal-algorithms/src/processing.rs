//! Batch helpers that run the track finder over many events.

use log::{debug, info};
use mipcal_core::{Error, EventHits, EventTracks, HitSource, Result, RunStatistics, TrackSink};
use rayon::prelude::*;

use crate::TrackFinder;

/// Reconstructs independent events in parallel.
///
/// Results come back in input order and match what sequential calls to
/// [`TrackFinder::reconstruct`] would produce.
pub fn reconstruct_events(finder: &TrackFinder, events: Vec<EventHits>) -> Vec<EventTracks> {
    events
        .into_par_iter()
        .map(|event| finder.reconstruct(event))
        .collect()
}

/// Streams events from `source` to `sink` in batches of `batch_size`.
///
/// Each batch is reconstructed in parallel and written in order. The sink is
/// finished once the source is drained.
///
/// # Errors
/// Returns [`Error::Source`] or [`Error::Sink`] wrapping the first reader or
/// writer failure.
pub fn run_pipeline<S, K>(
    finder: &TrackFinder,
    source: &mut S,
    sink: &mut K,
    batch_size: usize,
) -> Result<RunStatistics>
where
    S: HitSource + ?Sized,
    K: TrackSink + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut stats = RunStatistics::new();
    let mut batch = Vec::with_capacity(batch_size);

    loop {
        while batch.len() < batch_size {
            match source.next_event().map_err(Error::from_source)? {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        let drained = batch.len() < batch_size;
        debug!("Reconstructing batch of {} events", batch.len());
        for event in reconstruct_events(finder, std::mem::take(&mut batch)) {
            stats.absorb(&event.stats);
            sink.write_event(&event).map_err(Error::from_sink)?;
        }
        if drained {
            break;
        }
    }

    sink.finish().map_err(Error::from_sink)?;
    info!(
        "Processed {} events, {} tracks",
        stats.events, stats.totals.tracks_found
    );
    Ok(stats)
}
