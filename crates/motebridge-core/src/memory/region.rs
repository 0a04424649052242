//! Node memory region
//!
//! Owns the bytes backing a node's cells. The buffer is allocated once and
//! never resized, so its base address is stable for the region's lifetime.

use super::layout::MemoryLayout;

/// Fixed-size memory owned by one node
#[derive(Debug)]
pub struct MemoryRegion {
    /// Raw cell storage
    bytes: Box<[u8]>,
}

impl MemoryRegion {
    /// Allocate a region holding the layout's initial image
    pub fn from_layout(layout: &MemoryLayout) -> Self {
        Self {
            bytes: layout.initial_image().into_boxed_slice(),
        }
    }

    /// Real address of the first byte
    pub fn base_address(&self) -> i64 {
        self.bytes.as_ptr() as usize as i64
    }

    /// Region size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a zero-sized region
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Map a real address range to a region offset, if it lies inside
    pub fn offset_of(&self, real: i64, length: usize) -> Option<usize> {
        let start = usize::try_from(real.checked_sub(self.base_address())?).ok()?;
        let end = start.checked_add(length)?;
        (end <= self.bytes.len()).then_some(start)
    }

    /// Restore the layout's initial image in place
    pub fn reload(&mut self, layout: &MemoryLayout) {
        let image = layout.initial_image();
        if image.len() == self.bytes.len() {
            self.bytes.copy_from_slice(&image);
        } else {
            self.bytes = image.into_boxed_slice();
        }
    }

    /// Entire region contents
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
