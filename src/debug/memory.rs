/// Reconstruction of the VM memory image from the sparse per-step writes the
/// execution engine reports. Only used while formatting a single transaction
/// trace and never shared between traces.
#[derive(Debug, Default)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    pub fn new() -> MemoryImage {
        MemoryImage::default()
    }

    /// Set the logical length. New bytes are zeroed, shrinking truncates,
    /// the overlapping prefix is preserved.
    pub fn resize(&mut self, new_size: u64) {
        self.data.resize(new_size as usize, 0);
    }

    /// Copy `size` bytes of `data` into `[offset, offset + size)`.
    ///
    /// Callers must have resized the image to cover the written range; an
    /// out-of-bounds write is a caller bug and panics.
    pub fn write(&mut self, offset: u64, size: u64, data: &[u8]) {
        if size == 0 {
            return;
        }
        let offset = offset as usize;
        let size = size as usize;
        self.data[offset..offset + size].copy_from_slice(&data[..size]);
    }

    pub fn snapshot(&self) -> &[u8] {
        &self.data
    }
}
