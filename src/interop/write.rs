//! Response output - `rBlksWriteResponse` on a freshly constructed runner

use super::env::{with_frame, Arg, RemoteEnv, ReturnKind};
use super::find::{construct_runner, read_exit_status};
use super::marshal::{encode_list, encode_text};
use super::symbols::{Resolver, SymbolCache, WriteSymbols, WRITE_METHOD};
use crate::error::{codes, BridgeError};
use crate::logging::{log_remote_call, log_remote_fault, log_remote_return, perf};
use crate::response::ResponseList;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Output format requested from the remote writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Separate amplitude and phase outputs ("ap")
    #[default]
    #[serde(rename = "ap")]
    AmpPhase,
    /// Complex spectra output ("cs")
    #[serde(rename = "cs")]
    ComplexSpectra,
}

impl OutputFormat {
    pub fn code(self) -> &'static str {
        match self {
            Self::AmpPhase => "ap",
            Self::ComplexSpectra => "cs",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OutputFormat {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ap" => Ok(Self::AmpPhase),
            "cs" => Ok(Self::ComplexSpectra),
            other => Err(BridgeError::parameter(format!(
                "Invalid response output type '{}' (expected \"ap\" or \"cs\")",
                other
            ))),
        }
    }
}

/// Local precondition check; runs before any remote interaction
pub fn validate_list(list: &ResponseList) -> Result<(), BridgeError> {
    if list.is_empty() {
        return Err(BridgeError::parameter("Empty list of responses send to 'print_resp'"));
    }
    Ok(())
}

/// Send a response list to the remote writer
///
/// The runner's exit status is read on every path that reached the remote
/// call and decides the outcome: a fault is described and cleared, then a
/// zero status is success and anything else is `RemoteStatus`.
pub fn write_responses<E: RemoteEnv + ?Sized>(
    env: &mut E,
    cache: &mut SymbolCache,
    list: &ResponseList,
    format: OutputFormat,
    to_stdout: bool,
) -> Result<(), BridgeError> {
    let _guard = perf::track("write_responses");
    validate_list(list)?;

    cache.begin_operation();
    let symbols = WriteSymbols::resolve(&mut Resolver::new(cache, env))?;

    with_frame(env, 16 + list.len(), |env| {
        let array = encode_list(env, &symbols.encode, list)?;
        let format_code = encode_text(env, format.code())?;
        let runner = construct_runner(env, &symbols.runner)?;

        let args = [Arg::Object(array), Arg::Object(format_code), Arg::Bool(to_stdout)];
        log_remote_call(WRITE_METHOD, args.len());
        let returned = env.call_method(runner, symbols.write, ReturnKind::Bool, &args);
        log_remote_return(WRITE_METHOD, returned.is_ok());

        match returned {
            Ok(ret) => {
                if ret.boolean() == Some(false) {
                    warn!(method = WRITE_METHOD, "remote writer reported failure");
                }
            }
            Err(fault) => log_remote_fault(WRITE_METHOD, &fault.description),
        }

        // the runner's status is final, even after a fault
        match read_exit_status(env, &symbols.runner, runner)? {
            codes::SUCCESS => Ok(()),
            status => Err(BridgeError::RemoteStatus(status)),
        }
    })
}
