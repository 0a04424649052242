//! Memory bridge between the host's relative address space and node memory
//!
//! The host refers to node memory through relative addresses taken from the
//! node's symbol map. Once it tells the bridge which relative address belongs
//! to the anchor cell, every other relative address is translated with one
//! additive offset:
//!
//! ```text
//! offset = real_address(anchor) - relative_address(anchor)
//! real   = relative + offset
//! ```

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, LayoutError};
use crate::memory::{
    read_value, write_value, Cell, CellType, CellValue, MemoryLayout, MemoryRegion, Section,
};
use std::ops::Range;
use tracing::{debug, trace, warn};

/// Registration state of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No reference address yet; reads and writes are refused
    Unregistered,
    /// Offset known; translated accesses are allowed
    Registered,
}

/// Access policy of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Validate translated ranges against the region before copying
    pub bounds_check: bool,
    /// Allow the reference address to be set more than once
    pub allow_reregistration: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            bounds_check: true,
            allow_reregistration: true,
        }
    }
}

impl From<&BridgeConfig> for BridgeOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            bounds_check: config.bounds_check,
            allow_reregistration: config.allow_reregistration,
        }
    }
}

/// One node's memory plus the offset that maps host addresses onto it
#[derive(Debug)]
pub struct MemoryBridge {
    layout: MemoryLayout,
    region: MemoryRegion,
    /// Reference offset, `None` until registration
    offset: Option<i64>,
    options: BridgeOptions,
    observable_counter: Cell,
    internal_counter: Cell,
}

impl MemoryBridge {
    /// Create a bridge from configuration
    pub fn new(config: &BridgeConfig) -> Result<Self, LayoutError> {
        let layout = config.build_layout()?;
        Self::with_layout(
            layout,
            &config.observable_counter,
            &config.internal_counter,
            BridgeOptions::from(config),
        )
    }

    /// Create a bridge over an explicit layout
    pub fn with_layout(
        layout: MemoryLayout,
        observable_counter: &str,
        internal_counter: &str,
        options: BridgeOptions,
    ) -> Result<Self, LayoutError> {
        let counter = |name: &str| {
            layout
                .cell(name)
                .filter(|c| c.count == 1 && c.ty != CellType::Pointer)
                .cloned()
                .ok_or_else(|| LayoutError::InvalidCounter(name.to_string()))
        };
        let observable_counter = counter(observable_counter)?;
        let internal_counter = counter(internal_counter)?;
        let region = MemoryRegion::from_layout(&layout);

        Ok(Self {
            layout,
            region,
            offset: None,
            options,
            observable_counter,
            internal_counter,
        })
    }

    /// Per-instance setup hook; there is nothing to set up
    pub fn init(&self) {
        trace!("init");
    }

    /// Current registration state
    pub fn state(&self) -> BridgeState {
        match self.offset {
            Some(_) => BridgeState::Registered,
            None => BridgeState::Unregistered,
        }
    }

    /// Reference offset, if registered
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Access policy in effect
    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    /// Memory layout
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Symbol table in region order
    pub fn symbols(&self) -> &[Cell] {
        self.layout.cells()
    }

    /// Raw region contents
    pub fn memory(&self) -> &[u8] {
        self.region.as_slice()
    }

    /// Bind the host's address for the anchor cell and compute the offset
    ///
    /// Returns the new offset. The offset is also stored in the anchor cell.
    pub fn set_reference_address(&mut self, addr: i64) -> BridgeResult<i64> {
        if let Some(previous) = self.offset {
            if !self.options.allow_reregistration {
                warn!(addr, previous, "rejected second reference address");
                return Err(BridgeError::AlreadyRegistered { offset: previous });
            }
            warn!(addr, previous, "reference address set again, recomputing offset");
        }

        let anchor = self.layout.anchor();
        let real = self.region.base_address() + anchor.offset as i64;
        let offset = real.wrapping_sub(addr);

        let range = anchor.range();
        write_value(CellValue::Pointer(offset), &mut self.region.as_mut_slice()[range]);
        self.offset = Some(offset);

        debug!(addr, offset, "reference address set");
        Ok(offset)
    }

    /// Copy `length` bytes at a relative address into `out`
    pub fn read(&self, rel_addr: i64, length: i32, out: &mut [u8]) -> BridgeResult<()> {
        trace!(rel_addr, length, "read");
        let range = self.translate(rel_addr, length, out.len())?;
        out.copy_from_slice(&self.region.as_slice()[range]);
        Ok(())
    }

    /// Read `length` bytes at a relative address into a new buffer
    pub fn read_vec(&self, rel_addr: i64, length: i32) -> BridgeResult<Vec<u8>> {
        let len = usize::try_from(length).map_err(|_| BridgeError::InvalidLength(length))?;
        let mut out = vec![0u8; len];
        self.read(rel_addr, length, &mut out)?;
        Ok(out)
    }

    /// Copy `length` bytes from `data` to a relative address
    pub fn write(&mut self, rel_addr: i64, length: i32, data: &[u8]) -> BridgeResult<()> {
        trace!(rel_addr, length, "write");
        let range = self.translate(rel_addr, length, data.len())?;
        self.region.as_mut_slice()[range].copy_from_slice(data);
        Ok(())
    }

    /// Advance both counters by one
    pub fn tick(&mut self) {
        let observable = self.observable_counter.range();
        let internal = self.internal_counter.range();
        increment(&mut self.region.as_mut_slice()[observable], self.observable_counter.ty);
        increment(&mut self.region.as_mut_slice()[internal], self.internal_counter.ty);
        trace!("tick");
    }

    /// Forget the offset and restore every cell to its initial value
    pub fn reset(&mut self) {
        self.region.reload(&self.layout);
        self.offset = None;
        debug!("bridge reset");
    }

    /// Real in-process address of a symbol
    pub fn real_address_of(&self, symbol: &str) -> BridgeResult<i64> {
        let cell = self.cell(symbol)?;
        Ok(self.region.base_address() + cell.offset as i64)
    }

    /// Address the host uses for a symbol under the current offset
    pub fn relative_address_of(&self, symbol: &str) -> BridgeResult<i64> {
        let offset = self.offset.ok_or(BridgeError::NotRegistered)?;
        Ok(self.real_address_of(symbol)?.wrapping_sub(offset))
    }

    /// Region offsets covered by a section
    pub fn section_range(&self, section: Section) -> Range<usize> {
        self.layout.section_range(section)
    }

    /// Read one element of a cell
    pub fn read_cell(&self, symbol: &str, index: usize) -> BridgeResult<CellValue> {
        let cell = self.cell(symbol)?;
        let range = element(cell, index)?;
        read_value(cell.ty, &self.region.as_slice()[range]).ok_or_else(|| {
            BridgeError::IndexOutOfRange {
                symbol: symbol.to_string(),
                index,
                count: cell.count,
            }
        })
    }

    /// Write one element of a cell; the value type must match the cell
    pub fn write_cell(&mut self, symbol: &str, index: usize, value: CellValue) -> BridgeResult<()> {
        let cell = self.cell(symbol)?;
        if cell.ty != value.cell_type() {
            return Err(BridgeError::TypeMismatch {
                symbol: symbol.to_string(),
                actual: cell.ty.name(),
                requested: value.cell_type().name(),
            });
        }
        let range = element(cell, index)?;
        write_value(value, &mut self.region.as_mut_slice()[range]);
        Ok(())
    }

    /// Read an element of an i32 cell
    pub fn read_i32(&self, symbol: &str, index: usize) -> BridgeResult<i32> {
        let value = self.read_cell(symbol, index)?;
        value.as_i32().ok_or_else(|| self.mismatch(symbol, "i32"))
    }

    /// Read an element of a u32 cell
    pub fn read_u32(&self, symbol: &str, index: usize) -> BridgeResult<u32> {
        let value = self.read_cell(symbol, index)?;
        value.as_u32().ok_or_else(|| self.mismatch(symbol, "u32"))
    }

    /// Read an element of a pointer-sized cell
    pub fn read_isize(&self, symbol: &str, index: usize) -> BridgeResult<isize> {
        match self.read_cell(symbol, index)? {
            value @ CellValue::Pointer(_) => Ok(value.as_i64() as isize),
            _ => Err(self.mismatch(symbol, "pointer")),
        }
    }

    /// Write an element of an i32 cell
    pub fn write_i32(&mut self, symbol: &str, index: usize, value: i32) -> BridgeResult<()> {
        self.write_cell(symbol, index, CellValue::I32(value))
    }

    /// Write an element of a u32 cell
    pub fn write_u32(&mut self, symbol: &str, index: usize, value: u32) -> BridgeResult<()> {
        self.write_cell(symbol, index, CellValue::U32(value))
    }

    fn cell(&self, symbol: &str) -> BridgeResult<&Cell> {
        self.layout
            .cell(symbol)
            .ok_or_else(|| BridgeError::UnknownSymbol(symbol.to_string()))
    }

    fn mismatch(&self, symbol: &str, requested: &'static str) -> BridgeError {
        BridgeError::TypeMismatch {
            symbol: symbol.to_string(),
            actual: self.layout.cell(symbol).map(|c| c.ty.name()).unwrap_or("?"),
            requested,
        }
    }

    /// Map a relative range to a region range
    fn translate(&self, rel_addr: i64, length: i32, buffer_len: usize) -> BridgeResult<Range<usize>> {
        let offset = self.offset.ok_or(BridgeError::NotRegistered)?;
        let len = usize::try_from(length).map_err(|_| BridgeError::InvalidLength(length))?;
        if buffer_len != len {
            return Err(BridgeError::BufferMismatch {
                expected: len,
                actual: buffer_len,
            });
        }

        let real = rel_addr.wrapping_add(offset);
        if self.options.bounds_check {
            let start = self.region.offset_of(real, len).ok_or_else(|| {
                warn!(rel_addr, length, "access outside node memory");
                BridgeError::OutOfBounds {
                    relative: rel_addr,
                    length: len,
                    region_len: self.region.len(),
                }
            })?;
            Ok(start..start + len)
        } else {
            // Slice indexing still panics on a bad range.
            let start = real.wrapping_sub(self.region.base_address()) as usize;
            Ok(start..start.wrapping_add(len))
        }
    }
}

fn element(cell: &Cell, index: usize) -> BridgeResult<Range<usize>> {
    cell.element_range(index)
        .ok_or_else(|| BridgeError::IndexOutOfRange {
            symbol: cell.name.clone(),
            index,
            count: cell.count,
        })
}

fn increment(bytes: &mut [u8], ty: CellType) {
    let next = match read_value(ty, bytes) {
        Some(CellValue::I32(v)) => CellValue::I32(v.wrapping_add(1)),
        Some(CellValue::U32(v)) => CellValue::U32(v.wrapping_add(1)),
        Some(CellValue::Pointer(v)) => CellValue::Pointer(v.wrapping_add(1)),
        None => return,
    };
    write_value(next, bytes);
}
