//! Response lookup - `rBlksEvresp` on a freshly constructed runner

use super::env::{with_frame, Arg, ObjRef, RemoteEnv, Ret, ReturnKind};
use super::marshal::{decode_list, encode_doubles, encode_text};
use super::symbols::{
    FindSymbols, Resolver, RunnerSymbols, SymbolCache, EXIT_STATUS_METHOD, FIND_METHOD, RUNNER_CLASS,
};
use crate::error::{BridgeError, RemoteFault};
use crate::logging::{log_remote_call, log_remote_fault, log_remote_return, perf};
use crate::response::ResponseList;
use serde::Serialize;
use tracing::warn;

/// Unit conversion codes understood by the remote side (empty = default)
pub const UNIT_CODES: [&str; 4] = ["def", "dis", "vel", "acc"];

/// Parameters of one response lookup
///
/// Empty patterns match everything. Identifier patterns may hold several
/// comma- or space-separated entries and the `*`/`?` wildcards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindRequest {
    pub stations: String,
    pub channels: String,
    pub networks: String,
    pub locations: String,
    /// Date/time of interest; empty means the current time
    pub date: String,
    /// Output units code (see `UNIT_CODES`)
    pub units: String,
    /// Response file or directory name; empty searches the working directory
    pub file: String,
    pub frequencies: Vec<f64>,
    pub verbose: bool,
    pub start_stage: i32,
    pub stop_stage: i32,
    /// Read responses from standard input instead of files
    pub use_stdio: bool,
}

impl FindRequest {
    /// All-wildcard request over `frequencies`
    pub fn new(frequencies: Vec<f64>) -> Self {
        Self {
            stations: "*".into(),
            channels: "*".into(),
            networks: "*".into(),
            locations: "*".into(),
            date: String::new(),
            units: String::new(),
            file: String::new(),
            frequencies,
            verbose: false,
            start_stage: 0,
            stop_stage: 0,
            use_stdio: false,
        }
    }

    pub fn stations(mut self, pattern: impl Into<String>) -> Self {
        self.stations = pattern.into();
        self
    }

    pub fn channels(mut self, pattern: impl Into<String>) -> Self {
        self.channels = pattern.into();
        self
    }

    pub fn networks(mut self, pattern: impl Into<String>) -> Self {
        self.networks = pattern.into();
        self
    }

    pub fn locations(mut self, pattern: impl Into<String>) -> Self {
        self.locations = pattern.into();
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn stages(mut self, start: i32, stop: i32) -> Self {
        self.start_stage = start;
        self.stop_stage = stop;
        self
    }

    pub fn use_stdio(mut self, use_stdio: bool) -> Self {
        self.use_stdio = use_stdio;
        self
    }

    /// Local precondition check; runs before any remote interaction
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.frequencies.is_empty() {
            return Err(BridgeError::parameter(
                "Error in 'evresp' parameters: empty frequency list",
            ));
        }
        Ok(())
    }
}

/// Look up responses through the remote runner
///
/// Symbols are resolved before anything is allocated. All remote
/// references live in one local frame that is popped on every path.
pub fn find_responses<E: RemoteEnv + ?Sized>(
    env: &mut E,
    cache: &mut SymbolCache,
    request: &FindRequest,
) -> Result<ResponseList, BridgeError> {
    let _guard = perf::track("find_responses");
    request.validate()?;

    cache.begin_operation();
    let symbols = FindSymbols::resolve(&mut Resolver::new(cache, env))?;

    with_frame(env, 16, |env| {
        let mut args = Vec::with_capacity(12);
        for text in [
            &request.stations,
            &request.channels,
            &request.networks,
            &request.locations,
            &request.date,
            &request.units,
            &request.file,
        ] {
            args.push(Arg::Object(encode_text(env, text)?));
        }
        args.push(Arg::Object(encode_doubles(env, &request.frequencies)?));
        args.push(Arg::Bool(request.verbose));
        args.push(Arg::Int(request.start_stage));
        args.push(Arg::Int(request.stop_stage));
        args.push(Arg::Bool(request.use_stdio));

        let runner = construct_runner(env, &symbols.runner)?;

        log_remote_call(FIND_METHOD, args.len());
        let returned = env.call_method(runner, symbols.find, ReturnKind::Object, &args);
        log_remote_return(FIND_METHOD, returned.is_ok());
        let result = match returned {
            Ok(ret) => ret.object(),
            Err(fault) => {
                log_remote_fault(FIND_METHOD, &fault.description);
                return Err(fault.into());
            }
        };

        match result {
            Some(array) => Ok(decode_list(env, &symbols.decode, array)?),
            None => {
                let status = read_exit_status(env, &symbols.runner, runner)?;
                Err(BridgeError::NoResponses(status))
            }
        }
    })
}

/// Construct a runner instance
pub(super) fn construct_runner<E: RemoteEnv + ?Sized>(
    env: &mut E,
    runner: &RunnerSymbols,
) -> Result<ObjRef, BridgeError> {
    env.new_object(runner.class, runner.ctor, &[]).ok_or_else(|| {
        if let Some(fault) = env.take_fault() {
            log_remote_fault("<init>", &fault.description);
        }
        BridgeError::construction(RUNNER_CLASS)
    })
}

/// Read the runner's exit status
pub(super) fn read_exit_status<E: RemoteEnv + ?Sized>(
    env: &mut E,
    runner: &RunnerSymbols,
    instance: ObjRef,
) -> Result<i32, BridgeError> {
    let ret = env.call_method(instance, runner.exit_status, ReturnKind::Int, &[])?;
    exit_status_value(ret)
}

/// Integer carried by an exit-status return; anything else is a remote fault
pub(super) fn exit_status_value(ret: Ret) -> Result<i32, BridgeError> {
    ret.int().ok_or_else(|| {
        warn!(method = EXIT_STATUS_METHOD, returned = ?ret, "exit status is not an integer");
        RemoteFault::new(format!("'{}' returned {:?} instead of an integer", EXIT_STATUS_METHOD, ret))
            .into()
    })
}
