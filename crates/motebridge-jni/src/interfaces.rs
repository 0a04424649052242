//! Simulation interface table
//!
//! The host looks up `simInterfaces` in every node library. The wizard
//! library registers no interfaces, so the table holds only its terminator.

use std::ffi::c_void;
use std::ptr;

/// Null-terminated table of interface descriptors
#[repr(transparent)]
pub struct SimInterfaceTable([*const c_void; 1]);

// The table is immutable and only ever holds null pointers.
unsafe impl Sync for SimInterfaceTable {}

impl SimInterfaceTable {
    /// Number of interfaces before the terminator
    pub fn len(&self) -> usize {
        self.0.iter().take_while(|p| !p.is_null()).count()
    }

    /// True when no interface is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exported interface table
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static simInterfaces: SimInterfaceTable = SimInterfaceTable([ptr::null()]);
