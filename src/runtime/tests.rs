//! Tests for the runtime lifecycle manager

use super::*;
use crate::interop::memory::{MemoryLauncher, MemoryRuntime, MemoryScript};

/// Memory runtime that behaves like a JVM: one launch per process
struct SingleShot(MemoryLauncher);

impl RuntimeLauncher for SingleShot {
    type Runtime = MemoryRuntime;

    fn launch(&mut self, options: &LaunchOptions) -> Result<MemoryRuntime, StartFailure> {
        self.0.launch(options)
    }
}

fn manager() -> (MemoryScript, RuntimeManager<MemoryLauncher>) {
    let script = MemoryScript::new();
    let manager = RuntimeManager::new(MemoryLauncher::new(script.clone()), RuntimeConfig::default());
    (script, manager)
}

#[test]
fn test_initial_state() {
    let (_script, manager) = manager();
    assert_eq!(manager.state(), RuntimeState::NotStarted);
    assert!(!manager.is_running());
    assert!(manager.current_handle().is_none());
    assert_eq!(manager.generation(), 0);
}

#[test]
fn test_start_and_stop() {
    let (script, mut manager) = manager();
    manager.start_with(LaunchOptions::default()).unwrap();
    assert!(manager.is_running());
    assert_eq!(manager.current_handle().map(|h| h.generation()), Some(1));

    manager.stop();
    assert_eq!(manager.state(), RuntimeState::Stopped);
    assert!(manager.current_handle().is_none());

    let log = script.log();
    assert_eq!(log.launches, 1);
    assert_eq!(log.shutdowns, 1);
}

#[test]
fn test_stop_is_idempotent() {
    let (script, mut manager) = manager();
    manager.stop();
    assert_eq!(manager.state(), RuntimeState::NotStarted);

    manager.start_with(LaunchOptions::default()).unwrap();
    manager.stop();
    manager.stop();
    assert_eq!(manager.state(), RuntimeState::Stopped);
    assert_eq!(script.log().shutdowns, 1);
}

#[test]
fn test_restart_replaces_handle() {
    let (script, mut manager) = manager();
    manager.start_with(LaunchOptions::default()).unwrap();
    manager.start_with(LaunchOptions::default()).unwrap();

    assert!(manager.is_running());
    assert_eq!(manager.current_handle().map(|h| h.generation()), Some(2));
    let log = script.log();
    assert_eq!(log.launches, 2);
    assert_eq!(log.shutdowns, 1);
}

#[test]
fn test_restart_refused_without_support() {
    let script = MemoryScript::new();
    let launcher = SingleShot(MemoryLauncher::new(script.clone()));
    let mut manager = RuntimeManager::new(launcher, RuntimeConfig::default());

    manager.start_with(LaunchOptions::default()).unwrap();
    let err = manager.start_with(LaunchOptions::default()).unwrap_err();
    assert_eq!(err, StartFailure::RestartRefused);
    assert!(manager.is_running());
    assert_eq!(manager.generation(), 1);

    manager.stop();
    let err = manager.start_with(LaunchOptions::default()).unwrap_err();
    assert_eq!(BridgeError::from(err).code(), 2);
    assert_eq!(manager.state(), RuntimeState::Stopped);
    assert_eq!(script.log().launches, 1);
}

#[test]
fn test_launch_failure_leaves_state() {
    let (script, mut manager) = manager();
    script.fail_launch(Some("libjvm not found"));
    let err = manager.start_with(LaunchOptions::default()).unwrap_err();
    assert!(matches!(err, StartFailure::InitFailed(_)));
    assert_eq!(manager.state(), RuntimeState::NotStarted);
    assert_eq!(manager.generation(), 0);
}

#[test]
fn test_ensure_running_starts_once() {
    let (script, mut manager) = manager();
    manager.ensure_running().unwrap();
    manager.ensure_running().unwrap();
    assert_eq!(script.log().launches, 1);
}

#[test]
fn test_launch_options_are_forwarded() {
    let (script, mut manager) = manager();
    let options = LaunchOptions {
        class_path: Some("-Djava.class.path=/opt/j.jar".into()),
        property: Some("-DSEEDRESP=/data".into()),
        extra: vec![],
        ignore_unrecognized: true,
    };
    manager.start_with(options.clone()).unwrap();
    assert_eq!(script.log().launch_options, vec![options.to_vec()]);
    assert_eq!(manager.current_handle().map(|h| h.options().clone()), Some(options));
}

#[test]
fn test_unavailable_launcher() {
    let mut manager = RuntimeManager::new(UnavailableLauncher, RuntimeConfig::default());
    let err = manager.start_with(LaunchOptions::default()).unwrap_err();
    assert!(matches!(err, StartFailure::Unavailable(_)));
    assert!(!manager.is_running());
}

#[test]
fn test_drop_shuts_down() {
    let (script, mut manager) = manager();
    manager.start_with(LaunchOptions::default()).unwrap();
    drop(manager);
    assert_eq!(script.log().shutdowns, 1);
}
