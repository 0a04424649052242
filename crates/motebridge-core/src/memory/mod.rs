//! Node Memory Model
//!
//! Layout of the cells a node exposes and the region that backs them.

mod layout;
mod region;
mod values;

pub use layout::{
    Cell, CellSpec, CellType, MemoryLayout, Section, DEFAULT_ANCHOR, MAX_REGION_SIZE,
};
pub use region::MemoryRegion;
pub use values::{read_value, write_value, CellValue};
