//! Process-wide bridge state
//!
//! Created on library load. Maps each registered Java class to the node
//! type whose bridge serves its native calls.

use crate::error::JniBridgeError;
use crate::natives;
use jni::objects::{GlobalRef, JClass, JObject};
use jni::JNIEnv;
use motebridge_core::config::class_path;
use motebridge_core::{BridgeConfig, BridgeHandle, BridgeRegistry, NodeTypeId};
use std::sync::{OnceLock, PoisonError, RwLock};
use tracing::{debug, info, warn};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Outcome of attaching one node class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// Native methods registered
    Attached,
    /// Class not loaded in this JVM
    Missing,
}

/// Attach every class; fails on a hard error or when none was found
///
/// Returns the number of attached classes.
pub fn attach_all<F>(classes: &[String], mut attach: F) -> Result<usize, JniBridgeError>
where
    F: FnMut(&str) -> Result<Attach, JniBridgeError>,
{
    let mut attached = 0;
    for class in classes {
        if attach(class)? == Attach::Attached {
            attached += 1;
        }
    }
    if attached == 0 && !classes.is_empty() {
        return Err(JniBridgeError::NoClassAttached(classes.join(", ")));
    }
    Ok(attached)
}

/// Configuration, registry and the class bindings of this library
pub struct Runtime {
    config: BridgeConfig,
    registry: BridgeRegistry,
    classes: RwLock<Vec<(GlobalRef, NodeTypeId)>>,
}

impl Runtime {
    fn new(config: BridgeConfig) -> Self {
        Self {
            registry: BridgeRegistry::new(config.clone()),
            config,
            classes: RwLock::new(Vec::new()),
        }
    }

    /// Install the runtime; a second load reuses the first one
    pub fn install(config: BridgeConfig) -> &'static Runtime {
        RUNTIME.get_or_init(|| Runtime::new(config))
    }

    /// The installed runtime
    pub fn get() -> Result<&'static Runtime, JniBridgeError> {
        RUNTIME.get().ok_or(JniBridgeError::NotLoaded)
    }

    /// Configuration in effect
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bridge registry
    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    /// Register native methods on a node class and create its bridge
    ///
    /// A class the JVM cannot find yet is skipped: the host loads one node
    /// library per node type, so other configured types may not exist.
    pub fn attach(&self, env: &mut JNIEnv, class_name: &str) -> Result<Attach, JniBridgeError> {
        let id = NodeTypeId::new(class_name);
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        if classes.iter().any(|(_, bound)| *bound == id) {
            debug!(class = class_name, "class already attached");
            return Ok(Attach::Attached);
        }

        let path = class_path(class_name);
        let class = match env.find_class(&path) {
            Ok(class) => class,
            Err(jni::errors::Error::JavaException) => {
                env.exception_clear()?;
                warn!(class = %path, "node class not found, skipping");
                return Ok(Attach::Missing);
            }
            Err(e) => return Err(e.into()),
        };
        env.register_native_methods(&class, &natives::native_methods())?;
        let global = env.new_global_ref(&class)?;
        self.registry.register(id.clone())?;

        info!(class = %path, "registered native methods");
        classes.push((global, id));
        Ok(Attach::Attached)
    }

    /// Bridge serving calls made on `this`
    pub fn resolve(&self, env: &mut JNIEnv, this: &JObject) -> Result<BridgeHandle, JniBridgeError> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        for (class, id) in classes.iter() {
            let class: &JClass = class.as_obj().into();
            if env.is_instance_of(this, class)? {
                return self.registry.get(id).ok_or(JniBridgeError::UnknownClass);
            }
        }
        Err(JniBridgeError::UnknownClass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motebridge_core::BridgeError;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_missing_classes_are_skipped() {
        let listed = classes(&["Lib1", "Lib2", "Lib3"]);
        let attached = attach_all(&listed, |class| {
            Ok(if class == "Lib2" {
                Attach::Attached
            } else {
                Attach::Missing
            })
        })
        .unwrap();
        assert_eq!(attached, 1);
    }

    #[test]
    fn test_no_class_found_fails() {
        let listed = classes(&["Lib1", "Lib2"]);
        let err = attach_all(&listed, |_| Ok(Attach::Missing)).unwrap_err();
        assert!(matches!(err, JniBridgeError::NoClassAttached(names) if names == "Lib1, Lib2"));
    }

    #[test]
    fn test_hard_error_stops_loading() {
        let listed = classes(&["Lib1", "Lib2"]);
        let mut seen = Vec::new();
        let err = attach_all(&listed, |class| {
            seen.push(class.to_string());
            Err(JniBridgeError::Bridge(BridgeError::NotRegistered))
        })
        .unwrap_err();
        assert!(matches!(err, JniBridgeError::Bridge(_)));
        assert_eq!(seen, vec!["Lib1"]);
    }

    #[test]
    fn test_empty_class_list_loads() {
        assert_eq!(attach_all(&[], |_| Ok(Attach::Missing)).unwrap(), 0);
    }
}
