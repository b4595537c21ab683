//! mipcal-io: File I/O for mipcal.
//!
//! Hit files are read through memory-mapped views via memmap2 and streamed
//! event by event; reconstructed tracks are written as CSV or compact
//! little-endian records.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{CsvHitReader, MappedFileReader};
pub use writer::{OutputFormat, TrackFileWriter, CSV_HEADER};
