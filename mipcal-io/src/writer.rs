//! Track file writers.

use crate::{Error, Result};
use mipcal_core::{EventTracks, TrackSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header row of CSV track files.
pub const CSV_HEADER: &str =
    "event,track,section,seed_layer,seed_strip,n_hits,n_layers,layer,strip,energy,pe";

/// On-disk layout of a track file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One CSV row per member hit.
    Csv,
    /// Little-endian records.
    ///
    /// Per track: u64 (event) + u32 (track) + u8 (section) + u32 (n_hits) +
    /// u32 (n_layers), 21 bytes. Per member hit: u32 (layer) + u32 (strip) +
    /// f32 (energy) + f32 (pe), 16 bytes.
    Binary,
}

impl OutputFormat {
    /// Picks CSV for a `.csv` extension and binary otherwise.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Binary,
        }
    }
}

/// Writes reconstructed tracks to a file.
pub struct TrackFileWriter {
    writer: BufWriter<File>,
    format: OutputFormat,
    tracks_written: usize,
}

impl TrackFileWriter {
    /// Creates a writer whose format follows the file extension.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = OutputFormat::from_path(path.as_ref());
        Self::with_format(path, format)
    }

    /// Creates a writer with an explicit format.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn with_format<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        if format == OutputFormat::Csv {
            writeln!(writer, "{CSV_HEADER}")?;
        }
        Ok(Self {
            writer,
            format,
            tracks_written: 0,
        })
    }

    /// Output format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Number of tracks written so far.
    #[must_use]
    pub fn tracks_written(&self) -> usize {
        self.tracks_written
    }

    /// Writes every track of one event.
    ///
    /// # Errors
    /// Returns an error if writing fails or a count does not fit the binary
    /// layout.
    pub fn write_tracks(&mut self, event: &EventTracks) -> Result<()> {
        for (index, (track, hits)) in event.iter_resolved().enumerate() {
            match self.format {
                OutputFormat::Csv => {
                    for hit in hits {
                        writeln!(
                            self.writer,
                            "{},{},{},{},{},{},{},{},{},{},{}",
                            event.event_id,
                            index,
                            track.section(),
                            track.seed_layer(),
                            track.seed_strip(),
                            track.len(),
                            track.num_layers_hit(),
                            hit.layer,
                            hit.strip,
                            hit.energy,
                            hit.pe
                        )?;
                    }
                }
                OutputFormat::Binary => {
                    self.writer.write_all(&event.event_id.to_le_bytes())?;
                    self.writer.write_all(&to_u32(index, "track index")?.to_le_bytes())?;
                    self.writer.write_all(&[track.section().id()])?;
                    self.writer.write_all(&to_u32(track.len(), "hit count")?.to_le_bytes())?;
                    self.writer
                        .write_all(&to_u32(track.num_layers_hit(), "layer count")?.to_le_bytes())?;
                    for hit in hits {
                        self.writer.write_all(&hit.layer.to_le_bytes())?;
                        self.writer.write_all(&hit.strip.to_le_bytes())?;
                        self.writer.write_all(&hit.energy.to_le_bytes())?;
                        self.writer.write_all(&hit.pe.to_le_bytes())?;
                    }
                }
            }
            self.tracks_written += 1;
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidFormat(format!("{what} {value} does not fit in 32 bits")))
}

impl TrackSink for TrackFileWriter {
    type Error = Error;

    fn write_event(&mut self, event: &EventTracks) -> Result<()> {
        self.write_tracks(event)
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}
