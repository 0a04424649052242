//! Memory layout
//!
//! Declares the named cells a node exposes to the host and assigns each one
//! an aligned offset inside the node's memory region. Initialized cells go
//! into the data section, zeroed cells into the bss section, in that order.

use crate::error::LayoutError;
use byteorder::{ByteOrder, NativeEndian};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Element type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Signed 32-bit integer (`int`)
    I32,
    /// Unsigned 32-bit integer (`unsigned int`)
    U32,
    /// Pointer-sized signed integer (`intptr_t`)
    Pointer,
}

impl CellType {
    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            CellType::I32 | CellType::U32 => 4,
            CellType::Pointer => std::mem::size_of::<isize>(),
        }
    }

    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            CellType::I32 => "i32",
            CellType::U32 => "u32",
            CellType::Pointer => "pointer",
        }
    }

    fn fits(self, value: i64) -> bool {
        match self {
            CellType::I32 => i32::try_from(value).is_ok(),
            CellType::U32 => u32::try_from(value).is_ok(),
            CellType::Pointer => isize::try_from(value).is_ok(),
        }
    }

    fn encode(self, value: i64, out: &mut [u8]) {
        match self {
            CellType::I32 => NativeEndian::write_i32(out, value as i32),
            CellType::U32 => NativeEndian::write_u32(out, value as u32),
            CellType::Pointer => {
                if std::mem::size_of::<isize>() == 8 {
                    NativeEndian::write_i64(out, value)
                } else {
                    NativeEndian::write_i32(out, value as i32)
                }
            }
        }
    }
}

/// Section a cell is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Cells with an initial value
    Data,
    /// Zero-initialized cells
    Bss,
}

/// Declaration of a cell, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpec {
    /// Symbol name
    pub name: String,
    /// Element type
    #[serde(rename = "type")]
    pub ty: CellType,
    /// Number of elements (1 for scalars)
    #[serde(default = "default_count")]
    pub count: usize,
    /// Section the cell lives in
    pub section: Section,
    /// Initial element values, remaining elements are zero
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init: Vec<i64>,
}

fn default_count() -> usize {
    1
}

impl CellSpec {
    /// Initialized scalar in the data section
    pub fn data(name: &str, ty: CellType, value: i64) -> Self {
        Self {
            name: name.to_string(),
            ty,
            count: 1,
            section: Section::Data,
            init: vec![value],
        }
    }

    /// Zeroed cell (scalar when `count == 1`) in the bss section
    pub fn bss(name: &str, ty: CellType, count: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            count,
            section: Section::Bss,
            init: Vec::new(),
        }
    }
}

/// A placed cell: its declaration plus its offset in the region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Symbol name
    pub name: String,
    /// Element type
    #[serde(rename = "type")]
    pub ty: CellType,
    /// Number of elements
    pub count: usize,
    /// Section the cell lives in
    pub section: Section,
    /// Byte offset from the start of the region
    pub offset: usize,
    /// Initial element values
    #[serde(skip)]
    init: Vec<i64>,
}

impl Cell {
    /// Total size in bytes
    pub fn size(&self) -> usize {
        self.ty.size() * self.count
    }

    /// Byte range of the cell inside the region
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size()
    }

    /// Byte range of one element inside the region
    pub fn element_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.count {
            return None;
        }
        let start = self.offset + index * self.ty.size();
        Some(start..start + self.ty.size())
    }
}

/// Largest region a layout may describe
pub const MAX_REGION_SIZE: usize = 64 * 1024 * 1024;

/// Name of the anchor cell in the default layout
pub const DEFAULT_ANCHOR: &str = "referenceVar";

/// Validated placement of every cell in a node's memory region
#[derive(Debug, Clone)]
pub struct MemoryLayout {
    cells: Vec<Cell>,
    by_name: HashMap<String, usize>,
    anchor: usize,
    data: Range<usize>,
    bss: Range<usize>,
}

impl MemoryLayout {
    /// Validate cell declarations and compute their offsets
    pub fn new(specs: Vec<CellSpec>, anchor: &str) -> Result<Self, LayoutError> {
        if specs.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(LayoutError::DuplicateCell(spec.name.clone()));
            }
            if spec.count == 0 {
                return Err(LayoutError::ZeroCount(spec.name.clone()));
            }
            if spec.init.len() > spec.count {
                return Err(LayoutError::TooManyInitializers {
                    name: spec.name.clone(),
                    init: spec.init.len(),
                    count: spec.count,
                });
            }
            if spec.section == Section::Bss && spec.init.iter().any(|v| *v != 0) {
                return Err(LayoutError::InitializedBss(spec.name.clone()));
            }
            if let Some(value) = spec.init.iter().find(|v| !spec.ty.fits(**v)) {
                return Err(LayoutError::InitializerOutOfRange {
                    name: spec.name.clone(),
                    value: *value,
                });
            }
        }

        let mut cells = Vec::with_capacity(specs.len());
        let mut cursor = 0usize;
        let data = place_section(&specs, Section::Data, &mut cursor, &mut cells)?;
        let bss = place_section(&specs, Section::Bss, &mut cursor, &mut cells)?;

        let by_name: HashMap<String, usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let anchor_idx = *by_name
            .get(anchor)
            .ok_or_else(|| LayoutError::MissingAnchor(anchor.to_string()))?;
        let anchor_cell = &cells[anchor_idx];
        if anchor_cell.ty != CellType::Pointer || anchor_cell.count != 1 {
            return Err(LayoutError::InvalidAnchor(anchor.to_string()));
        }

        Ok(Self {
            cells,
            by_name,
            anchor: anchor_idx,
            data,
            bss,
        })
    }

    /// Layout of the Cooja mote configuration wizard test program
    pub fn cooja_default() -> Self {
        let specs = vec![
            CellSpec::bss(DEFAULT_ANCHOR, CellType::Pointer, 1),
            CellSpec::data("var1", CellType::I32, 1),
            CellSpec::data("var2", CellType::I32, 2),
            CellSpec::data("var3", CellType::I32, 2),
            CellSpec::bss("arr1", CellType::I32, 10),
            CellSpec::bss("arr2", CellType::I32, 10),
            CellSpec::bss("uvar1", CellType::U32, 1),
            CellSpec::bss("uvar2", CellType::U32, 1),
        ];
        match Self::new(specs, DEFAULT_ANCHOR) {
            Ok(layout) => layout,
            Err(e) => unreachable!("built-in layout is valid: {e}"),
        }
    }

    /// All cells in region order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Look up a cell by symbol name
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.by_name.get(name).map(|i| &self.cells[*i])
    }

    /// The anchor cell
    pub fn anchor(&self) -> &Cell {
        &self.cells[self.anchor]
    }

    /// Total region size in bytes
    pub fn size(&self) -> usize {
        // Placement keeps the aligned end within MAX_REGION_SIZE.
        align_up(self.bss.end, std::mem::align_of::<usize>()).unwrap_or(MAX_REGION_SIZE)
    }

    /// Offset range covered by a section
    pub fn section_range(&self, section: Section) -> Range<usize> {
        match section {
            Section::Data => self.data.clone(),
            Section::Bss => self.bss.clone(),
        }
    }

    /// Region contents at load time
    pub fn initial_image(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.size()];
        for cell in &self.cells {
            for (i, value) in cell.init.iter().enumerate() {
                if let Some(range) = cell.element_range(i) {
                    cell.ty.encode(*value, &mut image[range]);
                }
            }
        }
        image
    }

    /// Symbol table as JSON, in the shape the host parses from a map file
    pub fn symbols_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.cells)
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::cooja_default()
    }
}

fn place_section(
    specs: &[CellSpec],
    section: Section,
    cursor: &mut usize,
    cells: &mut Vec<Cell>,
) -> Result<Range<usize>, LayoutError> {
    let start = *cursor;
    for spec in specs.iter().filter(|s| s.section == section) {
        let too_large = || LayoutError::TooLarge {
            name: spec.name.clone(),
        };
        let offset = align_up(*cursor, spec.ty.size()).ok_or_else(too_large)?;
        let end = spec
            .ty
            .size()
            .checked_mul(spec.count)
            .and_then(|size| offset.checked_add(size))
            .filter(|end| {
                align_up(*end, std::mem::align_of::<usize>())
                    .is_some_and(|aligned| aligned <= MAX_REGION_SIZE)
            })
            .ok_or_else(too_large)?;
        cells.push(Cell {
            name: spec.name.clone(),
            ty: spec.ty,
            count: spec.count,
            section,
            offset,
            init: spec.init.clone(),
        });
        *cursor = end;
    }
    Ok(start..*cursor)
}

fn align_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? / align * align)
}
