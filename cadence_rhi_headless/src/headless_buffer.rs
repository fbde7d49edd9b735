/// Buffer - CPU memory implementation of a backend buffer

use cadence_rhi::cadence::{Error, Result};
use cadence_rhi::cadence::backend::{BufferDesc, BufferKind};

/// Host-memory buffer
#[derive(Debug, Clone)]
pub struct HeadlessBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

impl HeadlessBuffer {
    pub fn new(desc: BufferDesc) -> Self {
        Self { desc, data: vec![0; desc.size as usize] }
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Check an upload of `len` bytes at `offset` for the given record type
    pub(crate) fn check_write(&self, offset: u64, len: usize, dynamic: bool) -> Result<()> {
        let kind_ok = match self.desc.kind {
            BufferKind::Immutable | BufferKind::Static => !dynamic,
            BufferKind::Dynamic => dynamic,
        };
        if !kind_ok {
            let expected = if dynamic { "dynamic update" } else { "static upload" };
            return Err(Error::InvalidResource(format!(
                "{:?} buffer does not accept a {}",
                self.desc.kind, expected
            )));
        }
        self.check_range(offset, len as u64)
    }

    pub(crate) fn check_range(&self, offset: u64, len: u64) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.desc.size => Ok(()),
            _ => Err(Error::InvalidResource(format!(
                "range {}..{} outside buffer of {} bytes",
                offset,
                offset.saturating_add(len),
                self.desc.size
            ))),
        }
    }

    /// Copy `data` at `offset`; the range must have been checked
    pub(crate) fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
    }

    pub(crate) fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        self.check_range(offset, size)?;
        let start = offset as usize;
        Ok(self.data[start..start + size as usize].to_vec())
    }
}
