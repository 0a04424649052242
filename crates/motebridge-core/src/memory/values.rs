//! Typed cell values
//!
//! Decodes and encodes cell elements in native byte order, which is what the
//! host sees when it reads this process's memory directly.

use super::layout::CellType;
use byteorder::{ByteOrder, NativeEndian};
use serde::{Deserialize, Serialize};

/// A typed value read from a cell element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    /// Signed 32-bit value
    I32(i32),
    /// Unsigned 32-bit value
    U32(u32),
    /// Pointer-sized value, widened
    Pointer(i64),
}

impl CellValue {
    /// Get as i32, returning None for other types
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            CellValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as u32, returning None for other types
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            CellValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen to i64 regardless of type
    pub fn as_i64(&self) -> i64 {
        match self {
            CellValue::I32(v) => *v as i64,
            CellValue::U32(v) => *v as i64,
            CellValue::Pointer(v) => *v,
        }
    }

    /// Element type of this value
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::I32(_) => CellType::I32,
            CellValue::U32(_) => CellType::U32,
            CellValue::Pointer(_) => CellType::Pointer,
        }
    }
}

/// Decode one element of the given type
pub fn read_value(ty: CellType, bytes: &[u8]) -> Option<CellValue> {
    if bytes.len() < ty.size() {
        return None;
    }
    let value = match ty {
        CellType::I32 => CellValue::I32(NativeEndian::read_i32(bytes)),
        CellType::U32 => CellValue::U32(NativeEndian::read_u32(bytes)),
        CellType::Pointer if ty.size() == 8 => CellValue::Pointer(NativeEndian::read_i64(bytes)),
        CellType::Pointer => CellValue::Pointer(NativeEndian::read_i32(bytes) as i64),
    };
    Some(value)
}

/// Encode one element into `out`, which must hold at least one element
pub fn write_value(value: CellValue, out: &mut [u8]) -> bool {
    let ty = value.cell_type();
    if out.len() < ty.size() {
        return false;
    }
    match value {
        CellValue::I32(v) => NativeEndian::write_i32(out, v),
        CellValue::U32(v) => NativeEndian::write_u32(out, v),
        CellValue::Pointer(v) if ty.size() == 8 => NativeEndian::write_i64(out, v),
        CellValue::Pointer(v) => NativeEndian::write_i32(out, v as i32),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_value() {
        let bytes = 42i32.to_ne_bytes();
        let value = read_value(CellType::I32, &bytes).unwrap();
        assert_eq!(value.as_i32(), Some(42));
        assert_eq!(value.as_u32(), None);
    }

    #[test]
    fn test_pointer_width() {
        let mut out = [0u8; 8];
        assert!(write_value(CellValue::Pointer(-16), &mut out));
        let value = read_value(CellType::Pointer, &out).unwrap();
        assert_eq!(value.as_i64(), -16);
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(read_value(CellType::U32, &[1, 2]), None);
        assert!(!write_value(CellValue::U32(1), &mut [0u8; 3]));
    }
}
