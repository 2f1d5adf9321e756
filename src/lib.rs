//! jevresp - native bridge to the JEvalResp instrument-response component
//!
//! Looks up instrument responses (complex spectra over caller-chosen
//! frequencies) through an embedded managed runtime and asks that runtime
//! to write them out, exposing both as a Rust API and a C ABI.
//!
//! Architecture:
//! - `runtime` - managed-runtime lifecycle (start/stop, launch options)
//! - `interop` - remote environment, symbol cache, marshaling, operations
//! - `response` - native response list model and its C layout
//! - `status` - last-error code/message channel
//! - `bridge` - `Bridge` context tying the above together
//! - `ffi` - C and FORTRAN entry points

pub mod bridge;
pub mod config;
pub mod error;
pub mod ffi;
pub mod interop;
pub mod logging;
pub mod response;
pub mod runtime;
pub mod status;

// Re-export commonly used items
pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError, LoggingConfig, RuntimeConfig};
pub use error::{codes, BridgeError, DecodeError, RemoteFault, StartFailure, SymbolError, SymbolKind};
pub use interop::{FindRequest, OutputFormat, RemoteEnv};
pub use response::{ChannelId, ComplexValue, ResponseList, ResponseRecord};
pub use runtime::{
    DefaultLauncher, LaunchOptions, ManagedRuntime, RuntimeLauncher, RuntimeManager, RuntimeState,
};
pub use status::ErrorStatus;

/// Bridge over the launcher this build was compiled with
pub fn default_bridge(config: BridgeConfig) -> Bridge<DefaultLauncher> {
    Bridge::new(DefaultLauncher::default(), config)
}
