//! Bounds-checked byte access over a telemetry image.
//!
//! Live reads go through a mapped view of shared memory, tests and disk tooling through plain
//! buffers. Both are a [`ByteSource`]: a fixed-length region that is copied out of, never
//! borrowed from, since the producer may rewrite it at any moment.

use crate::{Result, TelemetryError};

/// Read-only, fixed-length byte region.
pub trait ByteSource {
    /// Length of the region in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// Fails with [`TelemetryError::Truncated`] if the range does not lie inside the region.
    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()>;

    /// Copy `len` bytes at `offset` into a new buffer.
    ///
    /// The range is checked against [`len`](Self::len) before anything is allocated, so a
    /// corrupt size field in the header fails with [`TelemetryError::Truncated`] naming `what`.
    fn read_vec(&self, offset: usize, len: usize, what: &'static str) -> Result<Vec<u8>> {
        let available = self.len().saturating_sub(offset);
        if len > available {
            return Err(TelemetryError::truncated(what, len, available));
        }
        let mut buf = vec![0u8; len];
        self.read_into(offset, &mut buf)?;
        Ok(buf)
    }

    /// Read one little-endian `i32`.
    fn read_i32(&self, offset: usize) -> Result<i32> {
        let mut bytes = [0u8; 4];
        self.read_into(offset, &mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }
}

/// Range check shared by every implementation.
pub(crate) fn check_range(offset: usize, len: usize, available: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(()),
        Some(end) => Err(TelemetryError::truncated("byte source read", end, available)),
        None => Err(TelemetryError::truncated("byte source read", usize::MAX, available)),
    }
}

impl ByteSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        check_range(offset, dst.len(), <[u8]>::len(self))?;
        dst.copy_from_slice(&self[offset..offset + dst.len()]);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.as_slice().read_into(offset, dst)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        (**self).read_into(offset, dst)
    }
}
