//! Native methods of a node class
//!
//! | Method | Signature |
//! |---|---|
//! | `init` | `()V` |
//! | `getMemory` | `(JI[B)V` |
//! | `setMemory` | `(JI[B)V` |
//! | `tick` | `()V` |
//! | `setReferenceAddress` | `(J)V` |

use crate::error::JniBridgeError;
use crate::runtime::Runtime;
use jni::objects::{JByteArray, JObject};
use jni::sys::{jint, jlong};
use jni::{JNIEnv, NativeMethod};
use motebridge_core::{lock_bridge, BridgeError};
use std::any::Any;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

/// Method names and JNI signatures, in registration order
pub const METHODS: [(&str, &str); 5] = [
    ("init", "()V"),
    ("getMemory", "(JI[B)V"),
    ("setMemory", "(JI[B)V"),
    ("tick", "()V"),
    ("setReferenceAddress", "(J)V"),
];

/// Method table handed to `RegisterNatives`
pub fn native_methods() -> Vec<NativeMethod> {
    let pointers: [*mut c_void; 5] = [
        init as *mut c_void,
        get_memory as *mut c_void,
        set_memory as *mut c_void,
        tick as *mut c_void,
        set_reference_address as *mut c_void,
    ];
    METHODS
        .iter()
        .zip(pointers)
        .map(|((name, sig), fn_ptr)| NativeMethod {
            name: (*name).into(),
            sig: (*sig).into(),
            fn_ptr,
        })
        .collect()
}

extern "system" fn init<'local>(mut env: JNIEnv<'local>, this: JObject<'local>) {
    guard(&mut env, |env| {
        let handle = Runtime::get()?.resolve(env, &this)?;
        lock_bridge(&handle).init();
        Ok(())
    });
}

extern "system" fn get_memory<'local>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    rel_addr: jlong,
    length: jint,
    mem_arr: JByteArray<'local>,
) {
    guard(&mut env, |env| {
        let handle = Runtime::get()?.resolve(env, &this)?;
        let len = array_span(env, &mem_arr, length)?;

        let mut bytes = vec![0u8; len];
        lock_bridge(&handle).read(rel_addr, length, &mut bytes)?;

        let bytes: Vec<i8> = bytes.into_iter().map(|b| b as i8).collect();
        env.set_byte_array_region(&mem_arr, 0, &bytes)?;
        Ok(())
    });
}

extern "system" fn set_memory<'local>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    rel_addr: jlong,
    length: jint,
    mem_arr: JByteArray<'local>,
) {
    guard(&mut env, |env| {
        let handle = Runtime::get()?.resolve(env, &this)?;
        let len = array_span(env, &mem_arr, length)?;

        let mut bytes = vec![0i8; len];
        env.get_byte_array_region(&mem_arr, 0, &mut bytes)?;
        let bytes: Vec<u8> = bytes.into_iter().map(|b| b as u8).collect();

        lock_bridge(&handle).write(rel_addr, length, &bytes)?;
        Ok(())
    });
}

extern "system" fn tick<'local>(mut env: JNIEnv<'local>, this: JObject<'local>) {
    guard(&mut env, |env| {
        let handle = Runtime::get()?.resolve(env, &this)?;
        lock_bridge(&handle).tick();
        Ok(())
    });
}

extern "system" fn set_reference_address<'local>(
    mut env: JNIEnv<'local>,
    this: JObject<'local>,
    addr: jlong,
) {
    guard(&mut env, |env| {
        let handle = Runtime::get()?.resolve(env, &this)?;
        lock_bridge(&handle).set_reference_address(addr)?;
        Ok(())
    });
}

/// Validate `length` against the Java array before copying
fn array_span(env: &mut JNIEnv, array: &JByteArray, length: jint) -> Result<usize, JniBridgeError> {
    let actual = env.get_array_length(array)?;
    span(length, actual)
}

/// Bytes to copy for a requested length and the array's length
fn span(length: jint, array_len: jint) -> Result<usize, JniBridgeError> {
    let requested = usize::try_from(length).map_err(|_| BridgeError::InvalidLength(length))?;
    let actual = usize::try_from(array_len).unwrap_or(0);
    if actual < requested {
        return Err(JniBridgeError::ArrayTooShort { requested, actual });
    }
    Ok(requested)
}

/// Run a native call, turning errors and panics into Java exceptions
fn guard<'local, F>(env: &mut JNIEnv<'local>, f: F)
where
    F: FnOnce(&mut JNIEnv<'local>) -> Result<(), JniBridgeError>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(env)));
    if let Some((class, message)) = exception_for(outcome) {
        throw(env, class, &message);
    }
}

/// Java exception to raise for a native call outcome, `None` when nothing is thrown
fn exception_for(
    outcome: std::thread::Result<Result<(), JniBridgeError>>,
) -> Option<(&'static str, String)> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) if e.is_pending_exception() => None,
        Ok(Err(e)) => {
            warn!("native call failed: {e}");
            Some((e.exception_class(), e.to_string()))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("native call panicked: {message}");
            Some(("java/lang/RuntimeException", message))
        }
    }
}

fn throw(env: &mut JNIEnv, class: &str, message: &str) {
    if let Err(e) = env.throw_new(class, message) {
        error!("could not raise {class}: {e}");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "native code panicked".to_string()
    }
}
