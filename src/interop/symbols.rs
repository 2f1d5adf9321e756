//! Remote symbol names and the per-runtime symbol cache
//!
//! Class, field and method handles are resolved by exact name and type
//! signature. A cached handle is reused only within the operation that
//! resolved it; each new operation revalidates against the runtime.

use super::env::{ClassRef, FieldRef, MethodRef, RemoteEnv};
use crate::error::{SymbolError, SymbolKind};
use crate::logging::log_symbol_miss;
use std::collections::HashMap;

pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";
pub const DOUBLE_ARRAY_CLASS: &str = "[D";
pub const OBJECT_ARRAY_CLASS: &str = "[Ljava/lang/Object;";

pub const RUNNER_CLASS: &str = "com/isti/jevalresp/RunBlks";
pub const RECORD_CLASS: &str = "com/isti/jevalresp/RespInfoBlk";
pub const COMPLEX_CLASS: &str = "com/isti/jevalresp/ComplexBlk";

pub const CTOR_NAME: &str = "<init>";
pub const RUNNER_CTOR_SIG: &str = "()V";
pub const RECORD_CTOR_SIG: &str = "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;\
Ljava/lang/String;[Lcom/isti/jevalresp/ComplexBlk;[D)V";
pub const COMPLEX_CTOR_SIG: &str = "(DD)V";

pub const FIND_METHOD: &str = "rBlksEvresp";
pub const FIND_SIG: &str = "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;\
Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;[DZIIZ)\
[Lcom/isti/jevalresp/RespInfoBlk;";
pub const WRITE_METHOD: &str = "rBlksWriteResponse";
pub const WRITE_SIG: &str = "([Lcom/isti/jevalresp/RespInfoBlk;Ljava/lang/String;Z)Z";
pub const EXIT_STATUS_METHOD: &str = "getExitStatusValue";
pub const EXIT_STATUS_SIG: &str = "()I";

pub const STRING_SIG: &str = "Ljava/lang/String;";
pub const DOUBLE_ARRAY_SIG: &str = "[D";
pub const COMPLEX_ARRAY_SIG: &str = "[Lcom/isti/jevalresp/ComplexBlk;";
pub const DOUBLE_SIG: &str = "D";

pub const STATION_FIELD: &str = "stationName";
pub const CHANNEL_FIELD: &str = "channelName";
pub const NETWORK_FIELD: &str = "networkName";
pub const SITE_FIELD: &str = "siteName";
pub const SPECTRA_FIELD: &str = "cSpectraArray";
pub const FREQS_FIELD: &str = "freqArr";
pub const REAL_FIELD: &str = "real";
pub const IMAG_FIELD: &str = "imag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SymbolKey {
    kind: SymbolKind,
    owner: &'static str,
    name: &'static str,
    signature: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Resolved {
    Class(ClassRef),
    Field(FieldRef),
    Method(MethodRef),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    resolved: Resolved,
    epoch: u64,
}

/// Resolution counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolStats {
    /// Lookups answered by the runtime
    pub resolved: u64,
    /// Lookups answered from the cache
    pub reused: u64,
}

/// Symbol cache owned by one runtime generation
#[derive(Debug, Default)]
pub struct SymbolCache {
    entries: HashMap<SymbolKey, Entry>,
    epoch: u64,
    stats: SymbolStats,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation; handles from earlier operations become stale
    pub fn begin_operation(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Entries valid in the current operation
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.epoch == self.epoch).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SymbolStats {
        self.stats
    }

    /// Drop every entry (runtime teardown)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn lookup(&mut self, key: &SymbolKey) -> Option<Resolved> {
        let entry = self.entries.get(key)?;
        if entry.epoch != self.epoch {
            return None;
        }
        self.stats.reused += 1;
        Some(entry.resolved)
    }

    fn store(&mut self, key: SymbolKey, resolved: Resolved) {
        self.stats.resolved += 1;
        self.entries.insert(key, Entry { resolved, epoch: self.epoch });
    }
}

/// Resolves symbols through a cache against one environment
pub struct Resolver<'a, E: RemoteEnv + ?Sized> {
    cache: &'a mut SymbolCache,
    env: &'a mut E,
}

impl<'a, E: RemoteEnv + ?Sized> Resolver<'a, E> {
    pub fn new(cache: &'a mut SymbolCache, env: &'a mut E) -> Self {
        Self { cache, env }
    }

    pub fn class(&mut self, name: &'static str) -> Result<ClassRef, SymbolError> {
        let key = SymbolKey { kind: SymbolKind::Class, owner: name, name, signature: "" };
        if let Some(Resolved::Class(class)) = self.cache.lookup(&key) {
            return Ok(class);
        }
        match self.env.find_class(name) {
            Some(class) => {
                self.cache.store(key, Resolved::Class(class));
                Ok(class)
            }
            None => {
                self.env.take_fault();
                log_symbol_miss(name, name, "");
                Err(SymbolError::class(name))
            }
        }
    }

    pub fn field(
        &mut self,
        owner: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<FieldRef, SymbolError> {
        let key = SymbolKey { kind: SymbolKind::Field, owner, name, signature };
        if let Some(Resolved::Field(field)) = self.cache.lookup(&key) {
            return Ok(field);
        }
        let class = self.class(owner)?;
        match self.env.field_id(class, name, signature) {
            Some(field) => {
                self.cache.store(key, Resolved::Field(field));
                Ok(field)
            }
            None => Err(self.miss(key)),
        }
    }

    pub fn method(
        &mut self,
        owner: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<MethodRef, SymbolError> {
        let kind = if name == CTOR_NAME { SymbolKind::Constructor } else { SymbolKind::Method };
        let key = SymbolKey { kind, owner, name, signature };
        if let Some(Resolved::Method(method)) = self.cache.lookup(&key) {
            return Ok(method);
        }
        let class = self.class(owner)?;
        match self.env.method_id(class, name, signature) {
            Some(method) => {
                self.cache.store(key, Resolved::Method(method));
                Ok(method)
            }
            None => Err(self.miss(key)),
        }
    }

    pub fn constructor(
        &mut self,
        owner: &'static str,
        signature: &'static str,
    ) -> Result<MethodRef, SymbolError> {
        self.method(owner, CTOR_NAME, signature)
    }

    fn miss(&mut self, key: SymbolKey) -> SymbolError {
        self.env.take_fault();
        log_symbol_miss(key.owner, key.name, key.signature);
        SymbolError {
            kind: key.kind,
            owner: key.owner.to_string(),
            name: key.name.to_string(),
            signature: key.signature.to_string(),
        }
    }
}

/// Field handles of the response record class
#[derive(Debug, Clone, Copy)]
pub struct RecordFields {
    pub class: ClassRef,
    pub station: FieldRef,
    pub channel: FieldRef,
    pub network: FieldRef,
    pub site: FieldRef,
    pub spectra: FieldRef,
    pub freqs: FieldRef,
}

impl RecordFields {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        Ok(Self {
            class: r.class(RECORD_CLASS)?,
            station: r.field(RECORD_CLASS, STATION_FIELD, STRING_SIG)?,
            channel: r.field(RECORD_CLASS, CHANNEL_FIELD, STRING_SIG)?,
            network: r.field(RECORD_CLASS, NETWORK_FIELD, STRING_SIG)?,
            site: r.field(RECORD_CLASS, SITE_FIELD, STRING_SIG)?,
            spectra: r.field(RECORD_CLASS, SPECTRA_FIELD, COMPLEX_ARRAY_SIG)?,
            freqs: r.field(RECORD_CLASS, FREQS_FIELD, DOUBLE_ARRAY_SIG)?,
        })
    }
}

/// Field handles of the complex value class
#[derive(Debug, Clone, Copy)]
pub struct ComplexFields {
    pub class: ClassRef,
    pub real: FieldRef,
    pub imag: FieldRef,
}

impl ComplexFields {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        Ok(Self {
            class: r.class(COMPLEX_CLASS)?,
            real: r.field(COMPLEX_CLASS, REAL_FIELD, DOUBLE_SIG)?,
            imag: r.field(COMPLEX_CLASS, IMAG_FIELD, DOUBLE_SIG)?,
        })
    }
}

/// Everything needed to turn a returned record array into native records
#[derive(Debug, Clone, Copy)]
pub struct DecodeSymbols {
    pub string_class: ClassRef,
    pub double_array_class: ClassRef,
    pub object_array_class: ClassRef,
    pub record: RecordFields,
    pub complex: ComplexFields,
}

impl DecodeSymbols {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        Ok(Self {
            string_class: r.class(STRING_CLASS)?,
            double_array_class: r.class(DOUBLE_ARRAY_CLASS)?,
            object_array_class: r.class(OBJECT_ARRAY_CLASS)?,
            complex: ComplexFields::resolve(r)?,
            record: RecordFields::resolve(r)?,
        })
    }
}

/// Everything needed to build remote records from native ones
#[derive(Debug, Clone, Copy)]
pub struct EncodeSymbols {
    pub record_class: ClassRef,
    pub record_ctor: MethodRef,
    pub complex_class: ClassRef,
    pub complex_ctor: MethodRef,
}

impl EncodeSymbols {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        Ok(Self {
            record_class: r.class(RECORD_CLASS)?,
            record_ctor: r.constructor(RECORD_CLASS, RECORD_CTOR_SIG)?,
            complex_class: r.class(COMPLEX_CLASS)?,
            complex_ctor: r.constructor(COMPLEX_CLASS, COMPLEX_CTOR_SIG)?,
        })
    }
}

/// Runner class with its constructor and exit-status accessor
#[derive(Debug, Clone, Copy)]
pub struct RunnerSymbols {
    pub class: ClassRef,
    pub ctor: MethodRef,
    pub exit_status: MethodRef,
}

impl RunnerSymbols {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        Ok(Self {
            class: r.class(RUNNER_CLASS)?,
            ctor: r.constructor(RUNNER_CLASS, RUNNER_CTOR_SIG)?,
            exit_status: r.method(RUNNER_CLASS, EXIT_STATUS_METHOD, EXIT_STATUS_SIG)?,
        })
    }
}

/// Symbols used by the find operation
#[derive(Debug, Clone, Copy)]
pub struct FindSymbols {
    pub runner: RunnerSymbols,
    pub find: MethodRef,
    pub decode: DecodeSymbols,
}

impl FindSymbols {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        // the root class first: its absence means no class path at all
        r.class(OBJECT_CLASS)?;
        let decode = DecodeSymbols::resolve(r)?;
        let runner = RunnerSymbols::resolve(r)?;
        let find = r.method(RUNNER_CLASS, FIND_METHOD, FIND_SIG)?;
        Ok(Self { runner, find, decode })
    }
}

/// Symbols used by the write operation
#[derive(Debug, Clone, Copy)]
pub struct WriteSymbols {
    pub runner: RunnerSymbols,
    pub write: MethodRef,
    pub encode: EncodeSymbols,
}

impl WriteSymbols {
    pub fn resolve<E: RemoteEnv + ?Sized>(r: &mut Resolver<'_, E>) -> Result<Self, SymbolError> {
        r.class(OBJECT_CLASS)?;
        let encode = EncodeSymbols::resolve(r)?;
        let runner = RunnerSymbols::resolve(r)?;
        let write = r.method(RUNNER_CLASS, WRITE_METHOD, WRITE_SIG)?;
        Ok(Self { runner, write, encode })
    }
}
