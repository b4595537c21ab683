//! mipcal-algorithms: MIP track finding for segmented calorimeters.
//!
//! The engine is built from small pieces, leaves first:
//! - **HitIndex** - ordered key map over one section's hits
//! - **MipClusterBuilder** - isolated one or two strip deposits in a layer
//! - **SeedFinder** - first usable cluster in the current seed layer
//! - **ConeSearch** - triangular strip window around the seed
//! - **TrackExtender** - layer-by-layer linear extrapolation
//! - **AcceptanceEvaluator** - layer-count rule plus optional gates
//! - **TrackFinder** - the per-event search state machine
//!
#![warn(missing_docs)]

mod acceptance;
mod cone;
mod driver;
mod extend;
pub mod index;
mod mip;
mod processing;
mod seed;

pub use acceptance::{AcceptanceEvaluator, FiducialGate, TrackGate, Verdict};
pub use cone::{Cone, ConeSearch};
pub use driver::TrackFinder;
pub use extend::{ExtensionSummary, TrackExtender};
pub use index::HitIndex;
pub use mip::MipClusterBuilder;
pub use processing::{reconstruct_events, run_pipeline};
pub use seed::{Seed, SeedFinder, SeedSearch, SeedState};

// Re-export core configuration
pub use mipcal_core::config::{AmbiguityPolicy, SeedPolicy, TrackingConfig};
