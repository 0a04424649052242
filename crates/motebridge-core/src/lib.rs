//! # MoteBridge Core Library
//!
//! Memory model and address translation behind the native library the Cooja
//! simulator loads for each emulated node type.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Declarative node memory layouts (data and bss cells)
//! - The memory bridge: reference offset, translated reads and writes, tick
//! - A registry with one bridge per node type
//! - JSON configuration and tracing setup
//!
//! ## Example
//!
//! ```rust
//! use motebridge_core::{BridgeConfig, MemoryBridge};
//!
//! let mut bridge = MemoryBridge::new(&BridgeConfig::default()).unwrap();
//! bridge.set_reference_address(0x1000).unwrap();
//!
//! let var1 = bridge.relative_address_of("var1").unwrap();
//! assert_eq!(bridge.read_vec(var1, 4).unwrap(), 1i32.to_ne_bytes());
//!
//! bridge.tick();
//! assert_eq!(bridge.read_vec(var1, 4).unwrap(), 2i32.to_ne_bytes());
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod registry;

pub use bridge::{BridgeOptions, BridgeState, MemoryBridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult, ConfigError, LayoutError};
pub use registry::{lock_bridge, BridgeHandle, BridgeRegistry, NodeTypeId};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bridge::{BridgeOptions, BridgeState, MemoryBridge};
    pub use crate::config::BridgeConfig;
    pub use crate::error::{BridgeError, BridgeResult};
    pub use crate::memory::{Cell, CellSpec, CellType, CellValue, MemoryLayout, Section};
    pub use crate::registry::{BridgeHandle, BridgeRegistry, NodeTypeId};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
