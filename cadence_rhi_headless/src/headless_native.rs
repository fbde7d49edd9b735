/// Native command access for the headless backend
///
/// Exposed through `CommandBuffer::native_handles()` between
/// `begin_external` and `end_external`. Work queued here is resolved when the
/// external section ends.

use cadence_rhi::cadence::backend::BufferId;

#[derive(Debug, Default)]
pub struct HeadlessNativeCommands {
    pub(crate) indirect: Vec<(BufferId, u64)>,
}

impl HeadlessNativeCommands {
    /// Dispatch with workgroup counts read from an INDIRECT buffer
    ///
    /// The buffer holds three little-endian `u32` values `{x, y, z}` at `offset`.
    pub fn dispatch_indirect(&mut self, buffer: BufferId, offset: u64) {
        self.indirect.push((buffer, offset));
    }

    /// Commands queued since the external section began
    pub fn queued(&self) -> usize {
        self.indirect.len()
    }
}
