//! Runtime lifecycle - start, stop and hand out the managed runtime
//!
//! Architecture:
//! - `classpath.rs` - `LaunchOptions` and class-path assembly
//! - `jvm.rs` - JVM launcher (feature `jvm`)
//! - `unavailable.rs` - launcher for builds without a runtime backend
//!
//! `RuntimeManager` owns at most one live runtime. The symbol cache lives in
//! the runtime handle and dies with it.

mod classpath;
mod unavailable;

#[cfg(feature = "jvm")]
mod jvm;

pub use classpath::{LaunchOptions, CLASSPATH_OPTION, CLASSPATH_VAR, PATH_SEPARATOR};
pub use unavailable::UnavailableLauncher;

#[cfg(feature = "jvm")]
pub use jvm::{JvmLauncher, JvmRuntime};

use crate::config::RuntimeConfig;
use crate::error::{BridgeError, StartFailure};
use crate::interop::{RemoteEnv, SymbolCache};
use crate::logging::{log_runtime_start, log_runtime_stop};
use tracing::warn;

/// Launcher used by the C entry points
#[cfg(feature = "jvm")]
pub type DefaultLauncher = JvmLauncher;
#[cfg(not(feature = "jvm"))]
pub type DefaultLauncher = UnavailableLauncher;

/// A live managed runtime
pub trait ManagedRuntime {
    /// Attach the calling thread and return its environment
    fn attach(&mut self) -> Result<Box<dyn RemoteEnv + '_>, BridgeError>;

    /// Tear the runtime down; called at most once
    fn shutdown(&mut self);
}

/// Creates managed runtimes
pub trait RuntimeLauncher {
    type Runtime: ManagedRuntime;

    fn launch(&mut self, options: &LaunchOptions) -> Result<Self::Runtime, StartFailure>;

    /// Whether a runtime can be launched again after one was shut down
    fn supports_restart(&self) -> bool {
        false
    }
}

/// Lifecycle state of the managed runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RuntimeState {
    #[default]
    NotStarted,
    Running,
    Stopped,
}

/// A started runtime together with its symbol cache
pub struct RuntimeHandle<R> {
    runtime: R,
    symbols: SymbolCache,
    options: LaunchOptions,
    generation: u64,
}

impl<R: ManagedRuntime> RuntimeHandle<R> {
    /// Start generation this handle belongs to (1 for the first start)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    pub fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Attach and run `f` with the environment and symbol cache
    pub fn with_env<T, F>(&mut self, f: F) -> Result<T, BridgeError>
    where
        F: FnOnce(&mut dyn RemoteEnv, &mut SymbolCache) -> Result<T, BridgeError>,
    {
        let mut env = self.runtime.attach()?;
        f(&mut *env, &mut self.symbols)
    }
}

/// Owns the managed runtime's lifecycle
pub struct RuntimeManager<L: RuntimeLauncher> {
    launcher: L,
    config: RuntimeConfig,
    state: RuntimeState,
    handle: Option<RuntimeHandle<L::Runtime>>,
    generation: u64,
}

impl<L: RuntimeLauncher> RuntimeManager<L> {
    pub fn new(launcher: L, config: RuntimeConfig) -> Self {
        Self {
            launcher,
            config,
            state: RuntimeState::NotStarted,
            handle: None,
            generation: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == RuntimeState::Running
    }

    /// Number of successful starts so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn current_handle(&self) -> Option<&RuntimeHandle<L::Runtime>> {
        self.handle.as_ref()
    }

    pub fn current_handle_mut(&mut self) -> Option<&mut RuntimeHandle<L::Runtime>> {
        self.handle.as_mut()
    }

    /// Start the runtime with options assembled from the process environment
    pub fn start(&mut self) -> Result<(), StartFailure> {
        let options = LaunchOptions::from_env(&self.config);
        self.start_with(options)
    }

    /// Start the runtime with explicit options
    ///
    /// A running runtime is replaced when the launcher supports restarts;
    /// otherwise starting again (running or stopped) is refused and the
    /// current state is kept.
    pub fn start_with(&mut self, options: LaunchOptions) -> Result<(), StartFailure> {
        if self.state != RuntimeState::NotStarted {
            if !self.launcher.supports_restart() {
                warn!(state = ?self.state, "runtime restart refused");
                return Err(StartFailure::RestartRefused);
            }
            self.stop();
        }

        let runtime = self.launcher.launch(&options)?;
        self.generation += 1;
        log_runtime_start(self.generation, options.len());
        self.handle = Some(RuntimeHandle {
            runtime,
            symbols: SymbolCache::new(),
            options,
            generation: self.generation,
        });
        self.state = RuntimeState::Running;
        Ok(())
    }

    /// Start unless already running
    pub fn ensure_running(&mut self) -> Result<&mut RuntimeHandle<L::Runtime>, StartFailure> {
        if !self.is_running() {
            self.start()?;
        }
        self.handle
            .as_mut()
            .ok_or_else(|| StartFailure::InitFailed("runtime handle missing".into()))
    }

    /// Stop the runtime; a no-op unless running
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.symbols.clear();
            handle.runtime.shutdown();
            log_runtime_stop(handle.generation);
            self.state = RuntimeState::Stopped;
        }
    }
}

impl<L: RuntimeLauncher> Drop for RuntimeManager<L> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests;
