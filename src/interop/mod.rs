//! Interop - calls into the managed runtime
//!
//! Design: every operation resolves its symbols, marshals its arguments,
//! calls the runner and converts the result, all against a `RemoteEnv`.
//!
//! Architecture:
//! - `env.rs` - `RemoteEnv` trait, opaque handles, calling convention
//! - `symbols.rs` - exact remote names and the per-runtime symbol cache
//! - `marshal.rs` - native ↔ remote conversions
//! - `find.rs` - response lookup (`FindRequest`, `find_responses`)
//! - `write.rs` - response output (`OutputFormat`, `write_responses`)
//! - `memory.rs` - in-process managed runtime
//! - `jni_env.rs` - JNI-backed environment (feature `jvm`)

mod env;
mod find;
mod marshal;
pub mod memory;
mod symbols;
mod write;

#[cfg(feature = "jvm")]
mod jni_env;

pub use env::{with_frame, Arg, ClassRef, FieldRef, MethodRef, ObjRef, RemoteEnv, Ret, ReturnKind};
pub use find::{find_responses, FindRequest, UNIT_CODES};
pub use marshal::{
    decode_doubles, decode_list, decode_record, decode_spectrum, decode_text, encode_doubles,
    encode_list, encode_record, encode_spectrum, encode_text,
};
pub use symbols::{
    ComplexFields, DecodeSymbols, EncodeSymbols, FindSymbols, RecordFields, Resolver,
    RunnerSymbols, SymbolCache, SymbolStats, WriteSymbols,
};
pub use write::{validate_list, write_responses, OutputFormat};

#[cfg(feature = "jvm")]
pub use jni_env::JniEnv;

/// Exact remote class, member and signature names
pub mod names {
    pub use super::symbols::{
        CHANNEL_FIELD, COMPLEX_ARRAY_SIG, COMPLEX_CLASS, COMPLEX_CTOR_SIG, CTOR_NAME,
        DOUBLE_ARRAY_CLASS, DOUBLE_ARRAY_SIG, DOUBLE_SIG, EXIT_STATUS_METHOD, EXIT_STATUS_SIG,
        FIND_METHOD, FIND_SIG, FREQS_FIELD, IMAG_FIELD, NETWORK_FIELD, OBJECT_ARRAY_CLASS,
        OBJECT_CLASS, REAL_FIELD, RECORD_CLASS, RECORD_CTOR_SIG, RUNNER_CLASS, RUNNER_CTOR_SIG,
        SITE_FIELD, SPECTRA_FIELD, STATION_FIELD, STRING_CLASS, STRING_SIG, WRITE_METHOD,
        WRITE_SIG,
    };
}
