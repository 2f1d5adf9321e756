//! JVM launcher over the JNI invocation API

use super::{LaunchOptions, ManagedRuntime, RuntimeLauncher};
use crate::error::{BridgeError, StartFailure};
use crate::interop::{JniEnv, RemoteEnv};
use jni::{InitArgsBuilder, JNIVersion, JavaVM};
use tracing::{debug, warn};

/// Launches the process-wide JVM
///
/// A process can host one JVM and cannot create another after destroying
/// it, so restarts are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct JvmLauncher;

impl RuntimeLauncher for JvmLauncher {
    type Runtime = JvmRuntime;

    fn launch(&mut self, options: &LaunchOptions) -> Result<JvmRuntime, StartFailure> {
        let option_strings = options.to_vec();
        let mut builder = InitArgsBuilder::new()
            .version(JNIVersion::V2)
            .ignore_unrecognized(options.ignore_unrecognized);
        for option in &option_strings {
            debug!(option = %option, "JVM option");
            builder = builder.option(option.as_str());
        }
        let args = builder
            .build()
            .map_err(|e| StartFailure::InitFailed(e.to_string()))?;
        let vm = JavaVM::new(args).map_err(|e| StartFailure::InitFailed(e.to_string()))?;
        Ok(JvmRuntime { vm })
    }
}

/// A running JVM
pub struct JvmRuntime {
    vm: JavaVM,
}

impl JvmRuntime {
    pub fn vm(&self) -> &JavaVM {
        &self.vm
    }
}

impl ManagedRuntime for JvmRuntime {
    fn attach(&mut self) -> Result<Box<dyn RemoteEnv + '_>, BridgeError> {
        let guard = self.vm.attach_current_thread().map_err(|e| {
            BridgeError::RuntimeStart(StartFailure::InitFailed(format!(
                "unable to attach thread: {}",
                e
            )))
        })?;
        Ok(Box::new(JniEnv::new(guard)))
    }

    fn shutdown(&mut self) {
        // SAFETY: the manager drops every environment before shutdown and
        // never uses this runtime afterwards.
        if let Err(err) = unsafe { self.vm.destroy() } {
            warn!(%err, "error destroying Java Virtual Machine");
        }
    }
}
