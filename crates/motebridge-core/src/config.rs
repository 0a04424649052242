//! Bridge configuration
//!
//! Loaded from a JSON file named by `MOTEBRIDGE_CONFIG`; every field has a
//! default so an absent file yields the behavior of the stock wizard library.

use crate::error::{ConfigError, LayoutError};
use crate::memory::{CellSpec, CellType, MemoryLayout, DEFAULT_ANCHOR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable holding the path of the configuration file
pub const CONFIG_ENV: &str = "MOTEBRIDGE_CONFIG";

/// Environment variable with extra comma-separated node classes
pub const CLASSES_ENV: &str = "MOTEBRIDGE_CLASSES";

/// Package that generated node classes live in
pub const NODE_CLASS_PACKAGE: &str = "org/contikios/cooja/corecomm";

/// Configuration shared by every bridge in the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Validate addresses before every read and write
    pub bounds_check: bool,

    /// Recompute the offset when the reference address is set again
    pub allow_reregistration: bool,

    /// Cell incremented by tick that the host observes
    pub observable_counter: String,

    /// Cell incremented by tick that the host does not observe
    pub internal_counter: String,

    /// Cell declarations, `None` for the wizard layout
    pub layout: Option<Vec<CellSpec>>,

    /// Anchor cell name
    pub anchor: String,

    /// Node classes whose native methods are registered at load
    pub node_classes: Vec<String>,

    /// Tracing filter directive (e.g. "motebridge=debug")
    pub log_filter: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bounds_check: true,
            allow_reregistration: true,
            observable_counter: "var1".to_string(),
            internal_counter: "uvar1".to_string(),
            layout: None,
            anchor: DEFAULT_ANCHOR.to_string(),
            node_classes: Vec::new(),
            log_filter: None,
        }
    }
}

impl BridgeConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(content)?;
        config.build_layout()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load from `MOTEBRIDGE_CONFIG` if set, then append `MOTEBRIDGE_CLASSES`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(classes) = std::env::var(CLASSES_ENV) {
            config.add_classes(&classes);
        }
        Ok(config)
    }

    /// Append comma-separated class names, skipping blanks and duplicates
    pub fn add_classes(&mut self, list: &str) {
        for class in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if !self.node_classes.iter().any(|c| c == class) {
                self.node_classes.push(class.to_string());
            }
        }
    }

    /// Build and validate the memory layout this config describes
    pub fn build_layout(&self) -> Result<MemoryLayout, LayoutError> {
        let layout = match &self.layout {
            Some(specs) => MemoryLayout::new(specs.clone(), &self.anchor)?,
            None if self.anchor == DEFAULT_ANCHOR => MemoryLayout::cooja_default(),
            None => return Err(LayoutError::MissingAnchor(self.anchor.clone())),
        };

        for name in [&self.observable_counter, &self.internal_counter] {
            match layout.cell(name) {
                Some(cell) if cell.count == 1 && cell.ty != CellType::Pointer => {}
                _ => return Err(LayoutError::InvalidCounter(name.clone())),
            }
        }

        Ok(layout)
    }
}

/// JNI path of a node class: simple names are placed in the corecomm package
pub fn class_path(class: &str) -> String {
    let class = class.replace('.', "/");
    if class.contains('/') {
        class
    } else {
        format!("{}/{}", NODE_CLASS_PACKAGE, class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(config.bounds_check);
        assert!(config.allow_reregistration);
    }

    #[test]
    fn test_partial_json() {
        let config =
            BridgeConfig::from_json(r#"{"bounds_check": false, "node_classes": ["Lib1"]}"#)
                .unwrap();
        assert!(!config.bounds_check);
        assert_eq!(config.node_classes, vec!["Lib1".to_string()]);
        assert_eq!(config.observable_counter, "var1");
    }

    #[test]
    fn test_invalid_counter_rejected() {
        let result = BridgeConfig::from_json(r#"{"internal_counter": "arr1"}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Layout(LayoutError::InvalidCounter(name))) if name == "arr1"
        ));
    }

    #[test]
    fn test_huge_cell_count_rejected() {
        let json = r#"{
            "layout": [
                { "name": "referenceVar", "type": "pointer", "section": "bss" },
                { "name": "var1", "type": "i32", "section": "data", "init": [1] },
                { "name": "uvar1", "type": "u32", "section": "bss" },
                { "name": "big", "type": "i32", "count": 4611686018427387904, "section": "bss" }
            ]
        }"#;
        let result = BridgeConfig::from_json(json);
        assert!(matches!(
            result,
            Err(ConfigError::Layout(LayoutError::TooLarge { name })) if name == "big"
        ));
    }

    #[test]
    fn test_add_classes() {
        let mut config = BridgeConfig::default();
        config.add_classes("Lib1, Lib2,,Lib1");
        assert_eq!(config.node_classes, vec!["Lib1", "Lib2"]);
    }

    #[test]
    fn test_class_path() {
        assert_eq!(class_path("Lib3"), "org/contikios/cooja/corecomm/Lib3");
        assert_eq!(class_path("a.b.Mote"), "a/b/Mote");
        assert_eq!(class_path("a/b/Mote"), "a/b/Mote");
    }
}
