//! # MoteBridge JNI Library
//!
//! The native library the Cooja simulator loads for a node type. On load it
//! reads the bridge configuration, installs logging and registers the
//! memory-access native methods on every configured node class.

use anyhow::Context;
use jni::sys::{jint, JNI_ERR};
use jni::JavaVM;
use motebridge_core::logging::init_logging;
use motebridge_core::BridgeConfig;
use std::ffi::c_void;
use tracing::{error, info, warn};

pub mod error;
pub mod interfaces;
pub mod natives;
pub mod runtime;

pub use error::JniBridgeError;
pub use interfaces::{simInterfaces, SimInterfaceTable};
pub use runtime::{attach_all, Attach, Runtime};

/// JNI version reported to the JVM (Java 10 interface, oldest supported host is Java 11)
pub const JNI_VERSION_10: jint = 0x000a_0000;

/// Library load hook
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    load_status(on_load(vm))
}

/// Version code handed back to the JVM for a load outcome
fn load_status(outcome: anyhow::Result<()>) -> jint {
    match outcome {
        Ok(()) => JNI_VERSION_10,
        Err(e) => {
            error!("failed to load node library: {e:#}");
            JNI_ERR
        }
    }
}

fn on_load(raw: *mut jni::sys::JavaVM) -> anyhow::Result<()> {
    // SAFETY: the JVM passes a valid JavaVM pointer to JNI_OnLoad.
    let vm = unsafe { JavaVM::from_raw(raw) }.context("invalid JavaVM pointer")?;
    let mut env = vm.get_env().context("no JNI environment on loading thread")?;

    let config = BridgeConfig::from_env().context("loading bridge configuration")?;
    init_logging(config.log_filter.as_deref());

    let runtime = Runtime::install(config);
    let classes = runtime.config().node_classes.clone();
    if classes.is_empty() {
        warn!("no node classes configured, set MOTEBRIDGE_CLASSES");
    }
    attach_all(&classes, |class| runtime.attach(&mut env, class))
        .context("attaching node classes")?;

    info!(
        version = motebridge_core::VERSION,
        node_types = runtime.registry().len(),
        "node library loaded"
    );
    Ok(())
}
