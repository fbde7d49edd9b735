//! Resource update batches
//!
//! A batch collects buffer uploads, dynamic buffer updates, texture uploads,
//! mip generation requests and readbacks. Nothing happens until the batch is
//! handed to a pass-begin, a pass-end or `CommandBuffer::resource_update`; the
//! backend then applies every write in insertion order before resolving the
//! readbacks of the same batch, so that boundary acts as a visibility fence.
//!
//! Ownership moves with the batch: once attached to a pass, the caller no
//! longer has it.

use std::fmt;
use bytemuck::Pod;
use crate::backend::{BufferId, SwapchainId, TextureDesc, TextureId};

/// Completion callback of a readback
///
/// Called exactly once with the requested bytes. The slice only lives for the
/// duration of the call.
pub type ReadbackCallback = Box<dyn FnOnce(&[u8]) + Send>;

/// Region read back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackSource {
    /// Whole mip level of a texture
    Texture { texture: TextureId, mip_level: u32 },
    /// Byte range of a buffer
    Buffer { buffer: BufferId, offset: u64, size: u64 },
    /// Current presentable buffer of a swapchain
    Swapchain(SwapchainId),
}

impl ReadbackSource {
    /// Byte size of the region given the texture's descriptor (ignored for buffers)
    ///
    /// `None` when the size depends on backend state: a texture source without
    /// its descriptor, or a swapchain.
    pub fn byte_size(&self, texture: Option<&TextureDesc>) -> Option<u64> {
        match (self, texture) {
            (ReadbackSource::Buffer { size, .. }, _) => Some(*size),
            (ReadbackSource::Texture { mip_level, .. }, Some(desc)) => Some(desc.level_byte_size(*mip_level)),
            (ReadbackSource::Texture { .. }, None) | (ReadbackSource::Swapchain(_), _) => None,
        }
    }
}

/// Pending readback
pub struct ReadbackRequest {
    pub source: ReadbackSource,
    pub on_complete: ReadbackCallback,
}

impl ReadbackRequest {
    /// Deliver the data, consuming the callback
    pub fn complete(self, data: &[u8]) {
        (self.on_complete)(data)
    }
}

impl fmt::Debug for ReadbackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadbackRequest").field("source", &self.source).finish_non_exhaustive()
    }
}

/// One queued operation
#[derive(Debug)]
pub enum UploadRecord {
    /// Upload into an immutable or static buffer
    StaticUpload { buffer: BufferId, offset: u64, data: Vec<u8> },
    /// Update of a dynamic buffer
    DynamicUpdate { buffer: BufferId, offset: u64, data: Vec<u8> },
    /// Full mip level upload
    TextureUpload { texture: TextureId, mip_level: u32, data: Vec<u8> },
    /// Regenerate mip levels 1.. from level 0
    MipGeneration { texture: TextureId },
    Readback(ReadbackRequest),
}

impl UploadRecord {
    /// True for every record except readbacks
    pub fn is_write(&self) -> bool {
        !matches!(self, UploadRecord::Readback(_))
    }
}

/// Batch of resource updates
#[derive(Debug, Default)]
pub struct ResourceUpdateBatch {
    records: Vec<UploadRecord>,
}

impl ResourceUpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_static_upload(&mut self, buffer: BufferId, offset: u64, data: impl Into<Vec<u8>>) {
        self.records.push(UploadRecord::StaticUpload { buffer, offset, data: data.into() });
    }

    /// Typed form of `add_static_upload`
    pub fn add_static_upload_pod<T: Pod>(&mut self, buffer: BufferId, offset: u64, data: &[T]) {
        self.add_static_upload(buffer, offset, bytemuck::cast_slice::<T, u8>(data).to_vec());
    }

    pub fn add_dynamic_update(&mut self, buffer: BufferId, offset: u64, data: impl Into<Vec<u8>>) {
        self.records.push(UploadRecord::DynamicUpdate { buffer, offset, data: data.into() });
    }

    /// Typed form of `add_dynamic_update`
    pub fn add_dynamic_update_pod<T: Pod>(&mut self, buffer: BufferId, offset: u64, data: &[T]) {
        self.add_dynamic_update(buffer, offset, bytemuck::cast_slice::<T, u8>(data).to_vec());
    }

    pub fn add_texture_upload(&mut self, texture: TextureId, mip_level: u32, data: impl Into<Vec<u8>>) {
        self.records.push(UploadRecord::TextureUpload { texture, mip_level, data: data.into() });
    }

    pub fn add_mip_generation(&mut self, texture: TextureId) {
        self.records.push(UploadRecord::MipGeneration { texture });
    }

    /// Queue a readback; `on_complete` runs once the backend has the data
    pub fn add_readback<F>(&mut self, source: ReadbackSource, on_complete: F)
    where
        F: FnOnce(&[u8]) + Send + 'static,
    {
        self.records.push(UploadRecord::Readback(ReadbackRequest {
            source,
            on_complete: Box::new(on_complete),
        }));
    }

    /// Append every record of a later batch (coalescing before a pass boundary)
    pub fn merge(&mut self, mut other: ResourceUpdateBatch) {
        self.records.append(&mut other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    pub fn readback_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_write()).count()
    }

    /// `None` for an empty batch, so callers can skip attaching it
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Split into writes (insertion order) and readbacks (insertion order)
    ///
    /// Backends apply all writes before resolving any readback.
    pub fn into_writes_and_readbacks(self) -> (Vec<UploadRecord>, Vec<ReadbackRequest>) {
        let mut writes = Vec::with_capacity(self.records.len());
        let mut readbacks = Vec::new();
        for record in self.records {
            match record {
                UploadRecord::Readback(request) => readbacks.push(request),
                write => writes.push(write),
            }
        }
        (writes, readbacks)
    }
}

#[cfg(test)]
#[path = "update_batch_tests.rs"]
mod tests;
