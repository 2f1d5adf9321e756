//! Bridge context - runtime lifecycle, operations and the status channel
//!
//! Every failing operation latches its code and message into the bridge's
//! `ErrorStatus` before returning the error.

use crate::config::BridgeConfig;
use crate::error::{codes, BridgeError};
use crate::interop::{self, FindRequest, OutputFormat};
use crate::response::ResponseList;
use crate::runtime::{LaunchOptions, RuntimeLauncher, RuntimeManager, RuntimeState};
use crate::status::ErrorStatus;

/// Bridge to the remote response component
pub struct Bridge<L: RuntimeLauncher> {
    runtime: RuntimeManager<L>,
    status: ErrorStatus,
    config: BridgeConfig,
}

impl<L: RuntimeLauncher> Bridge<L> {
    pub fn new(launcher: L, config: BridgeConfig) -> Self {
        Self {
            runtime: RuntimeManager::new(launcher, config.runtime.clone()),
            status: ErrorStatus::new(),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeManager<L> {
        &self.runtime
    }

    pub fn status(&self) -> &ErrorStatus {
        &self.status
    }

    /// Latched exit status of the last failing operation
    pub fn exit_code(&self) -> i32 {
        self.status.code()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_running()
    }

    pub fn state(&self) -> RuntimeState {
        self.runtime.state()
    }

    /// Start the runtime with options from the environment
    pub fn start(&mut self) -> Result<(), BridgeError> {
        let result = self.runtime.start().map_err(BridgeError::from);
        self.latch(result)
    }

    /// Start the runtime with explicit options
    pub fn start_with(&mut self, options: LaunchOptions) -> Result<(), BridgeError> {
        let result = self.runtime.start_with(options).map_err(BridgeError::from);
        self.latch(result)
    }

    /// Stop the runtime; a no-op unless running
    pub fn stop(&mut self) {
        self.runtime.stop();
    }

    /// Look up responses, starting the runtime if needed
    pub fn find_responses(&mut self, request: &FindRequest) -> Result<ResponseList, BridgeError> {
        let result = self.run_find(request);
        self.latch(result)
    }

    fn run_find(&mut self, request: &FindRequest) -> Result<ResponseList, BridgeError> {
        request.validate()?;
        let handle = self.runtime.ensure_running()?;
        handle.with_env(|env, cache| interop::find_responses(env, cache, request))
    }

    /// Send responses to the remote writer, starting the runtime if needed
    ///
    /// On success the runner's (zero) exit status is latched.
    pub fn write_responses(
        &mut self,
        list: &ResponseList,
        format: OutputFormat,
        to_stdout: bool,
    ) -> Result<(), BridgeError> {
        let result = self.run_write(list, format, to_stdout);
        if result.is_ok() {
            self.status.latch_remote_code(codes::SUCCESS);
        }
        self.latch(result)
    }

    fn run_write(
        &mut self,
        list: &ResponseList,
        format: OutputFormat,
        to_stdout: bool,
    ) -> Result<(), BridgeError> {
        interop::validate_list(list)?;
        let handle = self.runtime.ensure_running()?;
        handle.with_env(|env, cache| interop::write_responses(env, cache, list, format, to_stdout))
    }

    /// Latch a failure into the status channel; pass the result through
    fn latch<T>(&mut self, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        if let Err(err) = &result {
            self.status.latch_error(err);
        }
        result
    }

    /// Latch a failure raised outside an operation (e.g. by the C layer)
    pub fn record_failure(&mut self, err: &BridgeError) {
        self.status.latch_error(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interop::memory::{FindBehavior, MemoryLauncher, MemoryScript};
    use crate::response::ChannelId;

    fn bridge(script: &MemoryScript) -> Bridge<MemoryLauncher> {
        Bridge::new(MemoryLauncher::new(script.clone()), BridgeConfig::default())
    }

    #[test]
    fn test_find_starts_runtime_lazily() {
        let script = MemoryScript::new()
            .with_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "00")]));
        let mut bridge = bridge(&script);
        assert!(!bridge.is_running());

        let list = bridge.find_responses(&FindRequest::new(vec![1.0, 2.0])).unwrap();
        assert_eq!(list.len(), 1);
        assert!(bridge.is_running());
        assert_eq!(bridge.exit_code(), 0);
    }

    #[test]
    fn test_parameter_error_latched_before_start() {
        let script = MemoryScript::new();
        let mut bridge = bridge(&script);
        let err = bridge.find_responses(&FindRequest::new(vec![])).unwrap_err();
        assert_eq!(err.code(), 1);
        assert_eq!(bridge.exit_code(), 1);
        assert!(!bridge.is_running());
        assert_eq!(script.log().launches, 0);
    }

    #[test]
    fn test_write_success_latches_zero() {
        let script = MemoryScript::new()
            .with_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "00")]));
        let mut bridge = bridge(&script);
        let list = bridge.find_responses(&FindRequest::new(vec![1.0])).unwrap();

        bridge.record_failure(&BridgeError::parameter("earlier failure"));
        assert_eq!(bridge.exit_code(), 1);
        bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap();
        assert_eq!(bridge.exit_code(), 0);
    }

    #[test]
    fn test_start_failure_latched() {
        let script = MemoryScript::new();
        script.fail_launch(Some("no libjvm"));
        let mut bridge = bridge(&script);
        let err = bridge.start().unwrap_err();
        assert_eq!(err.code(), 2);
        assert_eq!(bridge.exit_code(), 2);
        assert!(bridge.status().message().contains("no libjvm"));
    }
}
