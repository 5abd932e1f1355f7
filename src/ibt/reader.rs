//! Disk telemetry reader
//!
//! A disk file is a telemetry image with a [`DiskSubHeader`] after the main header and every
//! recorded row appended after the session document:
//!
//! ```text
//! +--------+------------+-------------+---------+-------+-------+-----
//! | Header | SubHeader  | descriptors | session | row 0 | row 1 | ...
//! +--------+------------+-------------+---------+-------+-------+-----
//! ```
//!
//! Rows start at the latest slot's `buf_offset` and are `buf_len` bytes each. The sub-header's
//! record count is not trusted; reading stops at the first row that is not fully present.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use irtelem::DiskReader;
//!
//! fn dump() -> irtelem::Result<()> {
//!     let mut reader = DiskReader::open("session.ibt")?;
//!     println!("{} Hz, {} rows", reader.tick_rate(), reader.record_count());
//!
//!     for record in reader.records() {
//!         let record = record?;
//!         println!("{:?}", record.f32("Speed"));
//!     }
//!     Ok(())
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::extract::decode_row;
use crate::schema::{
    DISK_SUB_HEADER_SIZE, DiskSubHeader, HEADER_SIZE, Header, IRSDK_VER, SessionCache,
    SessionData, VAR_HEADER_SIZE, decode_var_descriptor_array, frame_session_info,
};
use crate::types::{TelemetryRecord, VarDescriptor, VariableSchema};
use crate::{Result, TelemetryError};

/// Tick rate assumed when a file records a non-positive one.
const FALLBACK_TICK_RATE: f64 = 60.0;

/// Sequential reader over a recorded telemetry file.
pub struct DiskReader<R> {
    source: R,
    path: Option<PathBuf>,
    header: Header,
    sub_header: DiskSubHeader,
    schema: VariableSchema,
    session_bytes: Vec<u8>,
    sessions: SessionCache,
    rows_start: u64,
    row_len: usize,
    record_count: usize,
    next_record: usize,
}

impl DiskReader<BufReader<File>> {
    /// Open a telemetry file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        let mut reader = Self::new(BufReader::new(file)).map_err(|e| match e {
            TelemetryError::File { source, .. } => {
                TelemetryError::file_error(path.to_path_buf(), source)
            }
            other => other,
        })?;
        debug!(path = %path.display(), records = reader.record_count, "Opened telemetry file");
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl DiskReader<Cursor<Vec<u8>>> {
    /// Reader over an image already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> DiskReader<R> {
    /// Read the header, sub-header, descriptors and session document from `source`.
    pub fn new(mut source: R) -> Result<Self> {
        let header = Header::decode(&read_block(&mut source, 0, HEADER_SIZE, "disk header")?)?;
        header.validate(IRSDK_VER)?;
        let sub_header = DiskSubHeader::decode(&read_block(
            &mut source,
            HEADER_SIZE as u64,
            DISK_SUB_HEADER_SIZE,
            "disk sub-header",
        )?)?;

        let count = usize::try_from(header.num_vars).unwrap_or_default();
        let table = read_block(
            &mut source,
            u64::try_from(header.var_header_offset).unwrap_or_default(),
            count.saturating_mul(VAR_HEADER_SIZE),
            "variable descriptor array",
        )?;
        let row_len = header.row_len()?;
        let schema = VariableSchema::new(decode_var_descriptor_array(&table, count)?, row_len);
        for descriptor in schema.out_of_bounds() {
            warn!(field = %descriptor.name, end = descriptor.end(), row_len, "Variable extends past the row");
        }

        let session_range = header.session_info_range()?;
        let session_bytes =
            read_block(&mut source, session_range.start as u64, session_range.len(), "session info")?;

        let rows_start = header.row_range(header.latest_slot())?.start as u64;
        let file_len = source.seek(SeekFrom::End(0))?;
        let record_count = rows_in(file_len, rows_start, row_len);
        if i64::try_from(record_count).ok() != Some(i64::from(sub_header.session_record_count)) {
            warn!(
                recorded = sub_header.session_record_count,
                present = record_count,
                "Record count in sub-header does not match file length"
            );
        }

        Ok(Self {
            source,
            path: None,
            header,
            sub_header,
            schema,
            session_bytes,
            sessions: SessionCache::new(),
            rows_start,
            row_len,
            record_count,
            next_record: 0,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn sub_header(&self) -> &DiskSubHeader {
        &self.sub_header
    }

    pub fn schema(&self) -> &VariableSchema {
        &self.schema
    }

    pub fn descriptors(&self) -> &[VarDescriptor] {
        self.schema.descriptors()
    }

    /// File the reader was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Recording frequency in Hz.
    pub fn tick_rate(&self) -> f64 {
        if self.header.tick_rate > 0 {
            f64::from(self.header.tick_rate)
        } else {
            FALLBACK_TICK_RATE
        }
    }

    /// Complete rows present in the file.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Index of the row the next read returns.
    pub fn position(&self) -> usize {
        self.next_record
    }

    /// Framed session document.
    pub fn session_info(&self) -> Result<String> {
        frame_session_info(&self.session_bytes)
    }

    /// Parsed session document, parsed on first use.
    pub fn session_data(&mut self) -> Result<&SessionData> {
        let bytes = &self.session_bytes;
        self.sessions
            .get_or_parse(self.header.session_info_update, || frame_session_info(bytes))
    }

    /// Move to row `index`. Seeking to [`record_count`](Self::record_count) is allowed and
    /// leaves the reader at the end.
    pub fn seek_to_record(&mut self, index: usize) -> Result<()> {
        if index > self.record_count {
            return Err(TelemetryError::parse(
                "record seek",
                format!("row {index} out of range (0..={})", self.record_count),
            ));
        }
        self.next_record = index;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.next_record = 0;
    }

    /// Next complete row, undecoded.
    ///
    /// `None` once the next row is missing or cut short.
    pub fn next_row(&mut self) -> Result<Option<Vec<u8>>> {
        if self.row_len == 0 {
            return Ok(None);
        }
        if self.next_record >= self.record_count {
            // the file may have grown since it was opened
            self.record_count = self.count_rows()?;
            if self.next_record >= self.record_count {
                return Ok(None);
            }
        }
        let offset = self.rows_start + (self.next_record as u64) * (self.row_len as u64);
        self.source.seek(SeekFrom::Start(offset))?;

        let mut row = vec![0u8; self.row_len];
        match self.source.read_exact(&mut row) {
            Ok(()) => {
                trace!(record = self.next_record, "Read disk row");
                self.next_record += 1;
                Ok(Some(row))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!(record = self.next_record, "End of recorded rows");
                Ok(None)
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Next complete row, decoded. The record's tick is the row index.
    pub fn next_record(&mut self) -> Result<Option<TelemetryRecord>> {
        let index = self.next_record;
        let Some(row) = self.next_row()? else {
            return Ok(None);
        };
        let tick = i32::try_from(index).unwrap_or(i32::MAX);
        Ok(Some(decode_row(self.schema.descriptors(), &row, tick)))
    }

    /// Iterate over the remaining rows.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self, done: false }
    }

    fn count_rows(&mut self) -> Result<usize> {
        let file_len = self.source.seek(SeekFrom::End(0)).map_err(|e| self.io_error(e))?;
        Ok(rows_in(file_len, self.rows_start, self.row_len))
    }

    fn io_error(&self, source: std::io::Error) -> TelemetryError {
        let path = self.path.clone().unwrap_or_else(|| PathBuf::from("<memory>"));
        TelemetryError::file_error(path, source)
    }
}

/// Iterator returned by [`DiskReader::records`].
///
/// Ends after the last complete row or after the first error.
pub struct Records<'a, R> {
    reader: &'a mut DiskReader<R>,
    done: bool,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<TelemetryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Complete rows of `row_len` bytes between `rows_start` and the end of the file.
fn rows_in(file_len: u64, rows_start: u64, row_len: usize) -> usize {
    match row_len {
        0 => 0,
        len => usize::try_from(file_len.saturating_sub(rows_start) / len as u64)
            .unwrap_or(usize::MAX),
    }
}

/// Read exactly `len` bytes at `offset`; a short read is [`TelemetryError::Truncated`].
fn read_block<R: Read + Seek>(
    source: &mut R,
    offset: u64,
    len: usize,
    what: &'static str,
) -> Result<Vec<u8>> {
    // sizes come from the header; check them against the file before allocating
    let file_len = source.seek(SeekFrom::End(0))?;
    let available = usize::try_from(file_len.saturating_sub(offset)).unwrap_or(usize::MAX);
    if available < len {
        return Err(TelemetryError::truncated(what, len, available));
    }

    source.seek(SeekFrom::Start(offset))?;
    let mut block = Vec::with_capacity(len);
    let read = source.by_ref().take(len as u64).read_to_end(&mut block)?;
    if read < len {
        return Err(TelemetryError::truncated(what, len, read));
    }
    Ok(block)
}
