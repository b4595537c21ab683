//! mipcal-core: Core types for calorimeter MIP track finding.
//!
//! This crate provides the data model shared by the track finder and its
//! collaborators: hit records and the event arena, the composite key scheme,
//! MIP clusters, tracks, configuration, statistics and the source/sink
//! interfaces.
//!

pub mod cluster;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod key;
pub mod pipeline;
pub mod statistics;
pub mod track;

pub use cluster::{MipCluster, MAX_MIP_HITS};
pub use config::{AmbiguityPolicy, SeedPolicy, TrackingConfig};
pub use error::{Error, Result};
pub use geometry::{BoundingBox, Ray};
pub use hit::{EventHits, HitArena, HitId, HitRecord, Position, Section};
pub use key::{HitKey, KeyScheme};
pub use pipeline::{HitSource, TrackSink};
pub use statistics::{EventStatistics, RunStatistics};
pub use track::{EventTracks, Track};
