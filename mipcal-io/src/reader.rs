//! Memory-mapped hit file readers.
//!

use crate::{Error, Result};
use log::debug;
use memmap2::Mmap;
use mipcal_core::{EventHits, HitRecord, HitSource, Position, Section};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|err| Error::MmapError(format!("{}: {err}", path.display())))?;
        Ok(Self { mmap, path })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

const REQUIRED_COLUMNS: [&str; 6] = ["event", "section", "layer", "strip", "energy", "pe"];
const POSITION_COLUMNS: [&str; 3] = ["x", "y", "z"];

/// One parsed row with the line it came from.
struct Row {
    line: usize,
    event_id: u64,
    hit: HitRecord,
}

/// Streams events out of a CSV hit file.
///
/// The file starts with the header `event,section,layer,strip,energy,pe`,
/// optionally followed by `x,y,z` position columns. Blank lines and lines
/// starting with `#` are ignored. Sections may be given by name or number.
/// All rows of one event must be contiguous.
///
/// Event ids need not be sorted, so the reader keeps every id it has emitted
/// to catch an event that resumes later in the file. This costs one `u64` per
/// event for the life of the reader.
pub struct CsvHitReader {
    reader: MappedFileReader,
    offset: usize,
    line: usize,
    with_position: bool,
    pending: Option<Row>,
    /// Ids of every event already returned.
    finished: HashSet<u64>,
}

impl CsvHitReader {
    /// Opens a hit file and checks its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or the header is missing
    /// or malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = Self {
            reader: MappedFileReader::open(path)?,
            offset: 0,
            line: 0,
            with_position: false,
            pending: None,
            finished: HashSet::new(),
        };
        reader.read_header()?;
        Ok(reader)
    }

    /// Reads every remaining event.
    ///
    /// # Errors
    /// Returns the first parse error.
    pub fn read_all(mut self) -> Result<Vec<EventHits>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event()? {
            events.push(event);
        }
        debug!(
            "Read {} events from {}",
            events.len(),
            self.reader.path().display()
        );
        Ok(events)
    }

    /// Returns true if the file carries position columns.
    #[must_use]
    pub fn has_positions(&self) -> bool {
        self.with_position
    }

    /// Size of the underlying file in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    fn read_header(&mut self) -> Result<()> {
        let (line, header) = match self.next_line()? {
            Some((line, text)) => (line, text.to_ascii_lowercase()),
            None => return Err(Error::InvalidFormat("missing header".to_string())),
        };
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        if columns.len() == REQUIRED_COLUMNS.len() && columns == REQUIRED_COLUMNS {
            self.with_position = false;
        } else if columns.len() == REQUIRED_COLUMNS.len() + POSITION_COLUMNS.len()
            && columns[..6] == REQUIRED_COLUMNS
            && columns[6..] == POSITION_COLUMNS
        {
            self.with_position = true;
        } else {
            return Err(Error::at_line(
                line,
                format!("unexpected header '{header}', expected event,section,layer,strip,energy,pe[,x,y,z]"),
            ));
        }
        Ok(())
    }

    /// Next non-blank, non-comment line with its 1-based number.
    fn next_line(&mut self) -> Result<Option<(usize, &str)>> {
        let bytes = self.reader.as_bytes();
        while self.offset < bytes.len() {
            let rest = &bytes[self.offset..];
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            self.offset += end + 1;
            self.line += 1;

            let text = std::str::from_utf8(&rest[..end])
                .map_err(|err| Error::at_line(self.line, err))?
                .trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return Ok(Some((self.line, text)));
        }
        Ok(None)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let with_position = self.with_position;
        match self.next_line()? {
            Some((line, text)) => parse_row(line, text, with_position).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_field<T>(line: usize, name: &str, field: Option<&str>) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let field = field.ok_or_else(|| Error::at_line(line, format!("missing {name} column")))?;
    field
        .trim()
        .parse()
        .map_err(|err| Error::at_line(line, format!("bad {name} '{}': {err}", field.trim())))
}

fn parse_row(line: usize, text: &str, with_position: bool) -> Result<Row> {
    let mut fields = text.split(',');
    let event_id = parse_field(line, "event", fields.next())?;
    let section: Section = parse_field(line, "section", fields.next())?;
    let layer = parse_field(line, "layer", fields.next())?;
    let strip = parse_field(line, "strip", fields.next())?;
    let energy = parse_field(line, "energy", fields.next())?;
    let pe = parse_field(line, "pe", fields.next())?;

    let mut hit = HitRecord::new(section, layer, strip, energy, pe);
    if with_position {
        let x = parse_field(line, "x", fields.next())?;
        let y = parse_field(line, "y", fields.next())?;
        let z = parse_field(line, "z", fields.next())?;
        hit = hit.with_position(Position::new(x, y, z));
    }
    if fields.next().is_some() {
        return Err(Error::at_line(line, "too many columns"));
    }

    Ok(Row {
        line,
        event_id,
        hit,
    })
}

impl HitSource for CsvHitReader {
    type Error = Error;

    fn next_event(&mut self) -> Result<Option<EventHits>> {
        let first = match self.pending.take() {
            Some(row) => row,
            None => match self.next_row()? {
                Some(row) => row,
                None => return Ok(None),
            },
        };
        if self.finished.contains(&first.event_id) {
            return Err(Error::at_line(
                first.line,
                format!("rows of event {} are not contiguous", first.event_id),
            ));
        }

        let event_id = first.event_id;
        let mut hits = vec![first.hit];
        while let Some(row) = self.next_row()? {
            if row.event_id == event_id {
                hits.push(row.hit);
            } else {
                self.pending = Some(row);
                break;
            }
        }

        self.finished.insert(event_id);
        Ok(Some(EventHits::new(event_id, hits)))
    }
}
