//! Registry of bridges, one per simulated node type
//!
//! Each node type the host compiles gets its own Java class and its own
//! memory. Bridges are created on first registration and shared afterwards.

use crate::bridge::MemoryBridge;
use crate::config::BridgeConfig;
use crate::error::LayoutError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

/// Identifier of a node type: its Java class name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeTypeId(String);

impl NodeTypeId {
    /// Wrap a class name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Class name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeTypeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Shared bridge; the lock serializes every operation on one node's memory
pub type BridgeHandle = Arc<Mutex<MemoryBridge>>;

/// Lock a bridge, recovering the guard if a previous holder panicked
pub fn lock_bridge(handle: &BridgeHandle) -> MutexGuard<'_, MemoryBridge> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds the bridge for a node type
pub type BridgeFactory = Box<dyn Fn(&NodeTypeId) -> Result<MemoryBridge, LayoutError> + Send + Sync>;

/// Node type to bridge map
pub struct BridgeRegistry {
    bridges: RwLock<HashMap<NodeTypeId, BridgeHandle>>,
    factory: BridgeFactory,
}

impl BridgeRegistry {
    /// Registry whose bridges are all built from one configuration
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_factory(Box::new(move |_| MemoryBridge::new(&config)))
    }

    /// Registry with a custom per-type factory
    pub fn with_factory(factory: BridgeFactory) -> Self {
        Self {
            bridges: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Get the bridge for a node type, creating it on first use
    pub fn register(&self, id: NodeTypeId) -> Result<BridgeHandle, LayoutError> {
        if let Some(handle) = self.get(&id) {
            return Ok(handle);
        }

        let mut bridges = self.bridges.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = bridges.get(&id) {
            return Ok(Arc::clone(handle));
        }

        let bridge = (self.factory)(&id)?;
        debug!(node_type = %id, size = bridge.memory().len(), "registered node type");
        let handle = Arc::new(Mutex::new(bridge));
        bridges.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Bridge for a node type, if registered
    pub fn get(&self, id: &NodeTypeId) -> Option<BridgeHandle> {
        self.bridges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Drop a node type's bridge
    pub fn remove(&self, id: &NodeTypeId) -> bool {
        self.bridges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Registered node types, sorted
    pub fn ids(&self) -> Vec<NodeTypeId> {
        let mut ids: Vec<NodeTypeId> = self
            .bridges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Number of registered node types
    pub fn len(&self) -> usize {
        self.bridges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BridgeRegistry {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}
