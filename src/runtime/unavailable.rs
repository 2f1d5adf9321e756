//! Launcher for builds without a managed-runtime backend

use super::{LaunchOptions, ManagedRuntime, RuntimeLauncher};
use crate::error::{BridgeError, StartFailure};
use crate::interop::RemoteEnv;

/// Always fails to launch; used when the crate is built without `jvm`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLauncher;

/// Never constructed
#[derive(Debug)]
pub enum NoRuntime {}

impl ManagedRuntime for NoRuntime {
    fn attach(&mut self) -> Result<Box<dyn RemoteEnv + '_>, BridgeError> {
        match *self {}
    }

    fn shutdown(&mut self) {
        match *self {}
    }
}

impl RuntimeLauncher for UnavailableLauncher {
    type Runtime = NoRuntime;

    fn launch(&mut self, _options: &LaunchOptions) -> Result<NoRuntime, StartFailure> {
        Err(StartFailure::Unavailable(
            "built without managed-runtime support (enable the `jvm` feature)".into(),
        ))
    }
}
