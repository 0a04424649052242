//! Error types for the memory bridge

use thiserror::Error;

/// Errors that can occur while accessing bridged memory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Access before the host set the reference address
    #[error("Reference address not set")]
    NotRegistered,

    /// Second reference address in strict mode
    #[error("Reference address already set (offset {offset:#x})")]
    AlreadyRegistered {
        /// Offset kept from the first registration
        offset: i64,
    },

    /// Negative length from the host
    #[error("Invalid length: {0}")]
    InvalidLength(i32),

    /// Caller buffer does not match the requested length
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferMismatch {
        /// Requested length
        expected: usize,
        /// Buffer length
        actual: usize,
    },

    /// Translated range falls outside node memory
    #[error(
        "Address out of bounds: relative {relative:#x} (+{length}) maps outside region of {region_len} bytes"
    )]
    OutOfBounds {
        /// Host address relative to the reference
        relative: i64,
        /// Bytes requested
        length: usize,
        /// Size of node memory
        region_len: usize,
    },

    /// No cell with this name
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Element index past the end of a cell
    #[error("Index {index} out of range for '{symbol}' ({count} elements)")]
    IndexOutOfRange {
        /// Cell name
        symbol: String,
        /// Requested element
        index: usize,
        /// Elements in the cell
        count: usize,
    },

    /// Typed access does not match the cell type
    #[error("Type mismatch for '{symbol}': cell is {actual}, requested {requested}")]
    TypeMismatch {
        /// Cell name
        symbol: String,
        /// Declared cell type
        actual: &'static str,
        /// Type the caller asked for
        requested: &'static str,
    },

    /// Layout could not be built
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

impl BridgeError {
    /// True for errors caused by an address or length the host supplied
    pub fn is_access_violation(&self) -> bool {
        matches!(
            self,
            BridgeError::OutOfBounds { .. }
                | BridgeError::InvalidLength(_)
                | BridgeError::BufferMismatch { .. }
                | BridgeError::IndexOutOfRange { .. }
        )
    }
}

/// Errors raised while validating a memory layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// No cells declared
    #[error("Layout has no cells")]
    Empty,

    /// Two cells share a name
    #[error("Duplicate cell name: {0}")]
    DuplicateCell(String),

    /// Cell declared with `count = 0`
    #[error("Cell '{0}' has zero elements")]
    ZeroCount(String),

    /// More initial values than elements
    #[error("Cell '{name}' has {init} initial values but only {count} elements")]
    TooManyInitializers {
        /// Cell name
        name: String,
        /// Initial values given
        init: usize,
        /// Elements in the cell
        count: usize,
    },

    /// Non-zero initializer on a bss cell
    #[error("Cell '{0}' is in the bss section but has a non-zero initializer")]
    InitializedBss(String),

    /// Initial value outside the cell type's range
    #[error("Initial value {value} does not fit cell '{name}'")]
    InitializerOutOfRange {
        /// Cell name
        name: String,
        /// Offending value
        value: i64,
    },

    /// Placement overflows the maximum region size
    #[error("Cell '{name}' does not fit in a node memory region")]
    TooLarge {
        /// First cell that does not fit
        name: String,
    },

    /// Anchor cell missing from the layout
    #[error("Anchor cell not found: {0}")]
    MissingAnchor(String),

    /// Anchor cell is not a single pointer
    #[error("Anchor cell '{0}' must be a single pointer-sized cell")]
    InvalidAnchor(String),

    /// Tick counter is not a 32-bit scalar
    #[error("Counter cell '{0}' must be a 32-bit scalar")]
    InvalidCounter(String),
}

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid JSON for `BridgeConfig`
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configured layout is invalid
    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

/// Convenience alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
