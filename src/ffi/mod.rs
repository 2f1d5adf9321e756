//! Foreign Function Interface
//!
//! C entry points (`c_api.rs`) and the FORTRAN-callable shim
//! (`fortran.rs`). Both run on one process-wide `Bridge` over the launcher
//! this build was compiled with; the bridge is created on first use and
//! serializes every call through a mutex.

pub mod c_api;
pub mod fortran;

pub use c_api::{find_raw, print_raw, RawFindArgs};

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::logging;
use crate::runtime::DefaultLauncher;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ffi::CStr;
use std::os::raw::c_char;
use tracing::warn;

static BRIDGE: Lazy<Mutex<Bridge<DefaultLauncher>>> = Lazy::new(|| {
    let config = match BridgeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init();
            warn!(error = %e, "configuration rejected, using defaults");
            BridgeConfig::default()
        }
    };
    logging::init_with_config(config.log_config());
    Mutex::new(crate::default_bridge(config))
});

/// Run `f` on the process-wide bridge
pub(crate) fn with_bridge<T>(f: impl FnOnce(&mut Bridge<DefaultLauncher>) -> T) -> T {
    let mut bridge = BRIDGE.lock();
    f(&mut bridge)
}

/// Copy a C string; null reads as empty
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn text_arg(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
