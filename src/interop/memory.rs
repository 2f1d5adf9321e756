//! In-process managed runtime
//!
//! Hosts the runner, record and complex classes on a small object heap so
//! the bridge can run without a JVM. Behaviour of the runner's find and
//! write methods is scripted through a shared `MemoryScript`, which also
//! records every call for inspection.
//!
//! Local references are tracked per frame. References still live when an
//! environment is detached are counted in `CallLog::leaked_refs`.

use super::env::{Arg, ClassRef, FieldRef, MethodRef, ObjRef, RemoteEnv, Ret, ReturnKind};
use super::find::FindRequest;
use super::symbols::{
    CHANNEL_FIELD, COMPLEX_ARRAY_SIG, COMPLEX_CLASS, COMPLEX_CTOR_SIG, CTOR_NAME,
    DOUBLE_ARRAY_CLASS, DOUBLE_ARRAY_SIG, DOUBLE_SIG, EXIT_STATUS_METHOD, EXIT_STATUS_SIG,
    FIND_METHOD, FIND_SIG, FREQS_FIELD, IMAG_FIELD, NETWORK_FIELD, OBJECT_ARRAY_CLASS,
    OBJECT_CLASS, REAL_FIELD, RECORD_CLASS, RECORD_CTOR_SIG, RUNNER_CLASS, RUNNER_CTOR_SIG,
    SITE_FIELD, SPECTRA_FIELD, STATION_FIELD, STRING_CLASS, STRING_SIG, WRITE_METHOD, WRITE_SIG,
};
use crate::error::{BridgeError, RemoteFault, StartFailure};
use crate::response::{ChannelId, ComplexValue, ResponseRecord};
use crate::runtime::{LaunchOptions, ManagedRuntime, RuntimeLauncher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

// ============================================================================
// Scripted data
// ============================================================================

/// Plain contents of one remote response record
///
/// `None` fields are stored as remote nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordData {
    pub station: Option<String>,
    pub channel: Option<String>,
    pub network: Option<String>,
    pub site: Option<String>,
    pub spectrum: Option<Vec<(f64, f64)>>,
    pub frequencies: Option<Vec<f64>>,
}

impl RecordData {
    pub fn new(
        id: &ChannelId,
        frequencies: Vec<f64>,
        spectrum: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            station: Some(id.station().to_string()),
            channel: Some(id.channel().to_string()),
            network: Some(id.network().to_string()),
            site: Some(id.location().to_string()),
            spectrum: Some(spectrum),
            frequencies: Some(frequencies),
        }
    }

    /// Single-pole low-pass response evaluated at `frequencies`
    pub fn synthetic(id: &ChannelId, frequencies: &[f64], corner: f64) -> Self {
        let spectrum = frequencies
            .iter()
            .map(|&f| {
                let x = f / corner;
                let d = 1.0 + x * x;
                (1.0 / d, -x / d)
            })
            .collect();
        Self::new(id, frequencies.to_vec(), spectrum)
    }

    fn label(&self) -> String {
        let part = |p: &Option<String>| p.clone().unwrap_or_default();
        format!(
            "{}.{}.{}.{}",
            part(&self.network),
            part(&self.station),
            part(&self.site),
            part(&self.channel)
        )
    }
}

impl From<&ResponseRecord> for RecordData {
    fn from(record: &ResponseRecord) -> Self {
        let spectrum = record.spectrum().iter().map(|v| (v.real(), v.imag())).collect();
        Self::new(record.id(), record.frequencies().to_vec(), spectrum)
    }
}

/// One element of a scripted result array
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedElement {
    Record(RecordData),
    Null,
    /// An element of the wrong class
    Text(String),
}

/// Behaviour of the runner's find method
#[derive(Debug, Clone, PartialEq)]
pub enum FindBehavior {
    /// Return exactly these elements
    Respond(Vec<ScriptedElement>),
    /// One synthetic record per channel, evaluated at the requested frequencies
    Synthetic(Vec<ChannelId>),
    /// Return null and report `exit_status`
    NoMatch { exit_status: i32 },
    /// Return a zero-length array
    EmptyArray,
    /// Return a string instead of an array
    NotAnArray,
    /// Raise an exception
    Fault(String),
    /// Return the records received by the last write
    EchoWritten,
}

/// Behaviour of the runner's write method
#[derive(Debug, Clone, PartialEq)]
pub enum WriteBehavior {
    Accept,
    /// Return false and report `exit_status`
    Reject { exit_status: i32 },
    /// Raise an exception after setting `exit_status`
    Fault { message: String, exit_status: i32 },
    /// Write response files into a directory (or to stdout when requested)
    Render(PathBuf),
}

/// Arguments received by one write call
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub records: Vec<RecordData>,
    pub format: String,
    pub to_stdout: bool,
}

/// Everything the runtime observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallLog {
    pub launches: usize,
    pub launch_options: Vec<Vec<String>>,
    pub shutdowns: usize,
    pub attaches: usize,
    pub finds: Vec<FindRequest>,
    pub writes: Vec<WriteCall>,
    pub exit_status_reads: usize,
    pub runners_constructed: usize,
    pub faults_cleared: usize,
    pub leaked_refs: usize,
}

impl CallLog {
    /// Calls to the runner's find and write methods
    pub fn remote_calls(&self) -> usize {
        self.finds.len() + self.writes.len()
    }
}

#[derive(Debug)]
struct ScriptState {
    find: FindBehavior,
    write: WriteBehavior,
    hidden: HashSet<String>,
    launch_failure: Option<String>,
    fail_allocations: bool,
    fail_constructions: bool,
    written: Vec<RecordData>,
    log: CallLog,
}

/// Shared, cloneable script for the in-process runtime
#[derive(Debug, Clone)]
pub struct MemoryScript {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for MemoryScript {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScript {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                find: FindBehavior::NoMatch { exit_status: 0 },
                write: WriteBehavior::Accept,
                hidden: HashSet::new(),
                launch_failure: None,
                fail_allocations: false,
                fail_constructions: false,
                written: Vec::new(),
                log: CallLog::default(),
            })),
        }
    }

    pub fn with_find(self, behavior: FindBehavior) -> Self {
        self.set_find(behavior);
        self
    }

    pub fn with_write(self, behavior: WriteBehavior) -> Self {
        self.set_write(behavior);
        self
    }

    pub fn set_find(&self, behavior: FindBehavior) {
        self.state.lock().find = behavior;
    }

    pub fn set_write(&self, behavior: WriteBehavior) {
        self.state.lock().write = behavior;
    }

    /// Hide a class (`"pkg/Class"`) or member (`"pkg/Class.member"`)
    pub fn hide(&self, symbol: &str) {
        self.state.lock().hidden.insert(symbol.to_string());
    }

    pub fn unhide_all(&self) {
        self.state.lock().hidden.clear();
    }

    pub fn fail_launch(&self, message: Option<&str>) {
        self.state.lock().launch_failure = message.map(str::to_string);
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.state.lock().fail_allocations = fail;
    }

    pub fn fail_constructions(&self, fail: bool) {
        self.state.lock().fail_constructions = fail;
    }

    /// Snapshot of the call log
    pub fn log(&self) -> CallLog {
        self.state.lock().log.clone()
    }

    /// Records received by the last write
    pub fn written(&self) -> Vec<RecordData> {
        self.state.lock().written.clone()
    }
}

// ============================================================================
// Launcher and runtime
// ============================================================================

/// Launcher for the in-process runtime
#[derive(Debug, Clone, Default)]
pub struct MemoryLauncher {
    script: MemoryScript,
}

impl MemoryLauncher {
    pub fn new(script: MemoryScript) -> Self {
        Self { script }
    }

    pub fn script(&self) -> &MemoryScript {
        &self.script
    }
}

impl RuntimeLauncher for MemoryLauncher {
    type Runtime = MemoryRuntime;

    fn launch(&mut self, options: &LaunchOptions) -> Result<MemoryRuntime, StartFailure> {
        let mut state = self.script.state.lock();
        if let Some(message) = state.launch_failure.clone() {
            return Err(StartFailure::InitFailed(message));
        }
        state.log.launches += 1;
        state.log.launch_options.push(options.to_vec());
        Ok(MemoryRuntime { script: self.script.clone() })
    }

    fn supports_restart(&self) -> bool {
        true
    }
}

/// A launched in-process runtime
#[derive(Debug)]
pub struct MemoryRuntime {
    script: MemoryScript,
}

impl ManagedRuntime for MemoryRuntime {
    fn attach(&mut self) -> Result<Box<dyn RemoteEnv + '_>, BridgeError> {
        self.script.state.lock().log.attaches += 1;
        Ok(Box::new(MemoryEnv::new(self.script.clone())))
    }

    fn shutdown(&mut self) {
        self.script.state.lock().log.shutdowns += 1;
    }
}

// ============================================================================
// Symbol tables
// ============================================================================

const CLASSES: [&str; 7] = [
    OBJECT_CLASS,
    STRING_CLASS,
    DOUBLE_ARRAY_CLASS,
    OBJECT_ARRAY_CLASS,
    RUNNER_CLASS,
    RECORD_CLASS,
    COMPLEX_CLASS,
];
const C_OBJECT: u32 = 0;
const C_STRING: u32 = 1;
const C_DOUBLES: u32 = 2;
const C_OBJECTS: u32 = 3;
const C_RUNNER: u32 = 4;
const C_RECORD: u32 = 5;
const C_COMPLEX: u32 = 6;

const FIELDS: [(u32, &str, &str); 8] = [
    (C_RECORD, STATION_FIELD, STRING_SIG),
    (C_RECORD, CHANNEL_FIELD, STRING_SIG),
    (C_RECORD, NETWORK_FIELD, STRING_SIG),
    (C_RECORD, SITE_FIELD, STRING_SIG),
    (C_RECORD, SPECTRA_FIELD, COMPLEX_ARRAY_SIG),
    (C_RECORD, FREQS_FIELD, DOUBLE_ARRAY_SIG),
    (C_COMPLEX, REAL_FIELD, DOUBLE_SIG),
    (C_COMPLEX, IMAG_FIELD, DOUBLE_SIG),
];
const F_SPECTRA: u32 = 4;
const F_FREQS: u32 = 5;
const F_REAL: u32 = 6;
const F_IMAG: u32 = 7;

const METHODS: [(u32, &str, &str); 6] = [
    (C_RUNNER, CTOR_NAME, RUNNER_CTOR_SIG),
    (C_RUNNER, FIND_METHOD, FIND_SIG),
    (C_RUNNER, WRITE_METHOD, WRITE_SIG),
    (C_RUNNER, EXIT_STATUS_METHOD, EXIT_STATUS_SIG),
    (C_RECORD, CTOR_NAME, RECORD_CTOR_SIG),
    (C_COMPLEX, CTOR_NAME, COMPLEX_CTOR_SIG),
];
const M_RUNNER_CTOR: u32 = 0;
const M_FIND: u32 = 1;
const M_WRITE: u32 = 2;
const M_EXIT_STATUS: u32 = 3;
const M_RECORD_CTOR: u32 = 4;
const M_COMPLEX_CTOR: u32 = 5;

// ============================================================================
// Heap
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Slot {
    Obj(Option<usize>),
    Double(f64),
}

#[derive(Debug)]
enum Value {
    Str(String),
    Doubles(Vec<f64>),
    Array { items: Vec<Option<usize>> },
    Instance { class: u32, fields: HashMap<u32, Slot> },
    Runner { exit_status: i32 },
}

/// Remote environment over the in-process heap
pub struct MemoryEnv {
    script: MemoryScript,
    objects: Vec<Value>,
    refs: Vec<Option<usize>>,
    frames: Vec<Vec<u32>>,
    pending: Option<String>,
}

impl MemoryEnv {
    fn new(script: MemoryScript) -> Self {
        Self {
            script,
            objects: Vec::new(),
            refs: Vec::new(),
            frames: vec![Vec::new()],
            pending: None,
        }
    }

    /// Local references currently alive
    pub fn live_refs(&self) -> usize {
        self.refs.iter().filter(|r| r.is_some()).count()
    }

    fn new_ref(&mut self, object: usize) -> ObjRef {
        let id = self.refs.len() as u32;
        self.refs.push(Some(object));
        if let Some(frame) = self.frames.last_mut() {
            frame.push(id);
        }
        ObjRef::from_index(id)
    }

    fn alloc(&mut self, value: Value) -> ObjRef {
        self.objects.push(value);
        self.new_ref(self.objects.len() - 1)
    }

    fn alloc_object(&mut self, value: Value) -> usize {
        self.objects.push(value);
        self.objects.len() - 1
    }

    fn deref(&self, obj: ObjRef) -> Option<usize> {
        self.refs.get(obj.index() as usize).copied().flatten()
    }

    fn value(&self, obj: ObjRef) -> Option<&Value> {
        self.deref(obj).and_then(|i| self.objects.get(i))
    }

    fn hidden(&self, symbol: &str) -> bool {
        self.script.state.lock().hidden.contains(symbol)
    }

    fn raise(&mut self, message: impl Into<String>) {
        self.pending = Some(message.into());
    }

    fn arg_object(&self, arg: Option<&Arg>) -> Result<Option<usize>, String> {
        match arg {
            Some(Arg::Object(obj)) => self
                .deref(*obj)
                .map(Some)
                .ok_or_else(|| "java.lang.IllegalArgumentException: stale reference".to_string()),
            Some(Arg::Null) => Ok(None),
            _ => Err("java.lang.IllegalArgumentException: object argument expected".into()),
        }
    }

    fn arg_text(&self, arg: Option<&Arg>) -> Result<String, String> {
        match self.arg_object(arg)?.map(|i| &self.objects[i]) {
            None => Ok(String::new()),
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(_) => Err("java.lang.ClassCastException: java.lang.String expected".into()),
        }
    }

    fn store_text(&mut self, text: &Option<String>) -> Slot {
        Slot::Obj(text.clone().map(|t| self.alloc_object(Value::Str(t))))
    }

    fn store_record(&mut self, data: &RecordData) -> usize {
        let mut fields = HashMap::new();
        fields.insert(0, self.store_text(&data.station));
        fields.insert(1, self.store_text(&data.channel));
        fields.insert(2, self.store_text(&data.network));
        fields.insert(3, self.store_text(&data.site));

        let spectra = data.spectrum.as_ref().map(|values| {
            let items = values
                .iter()
                .map(|&(re, im)| {
                    let mut parts = HashMap::new();
                    parts.insert(F_REAL, Slot::Double(re));
                    parts.insert(F_IMAG, Slot::Double(im));
                    Some(self.alloc_object(Value::Instance { class: C_COMPLEX, fields: parts }))
                })
                .collect();
            self.alloc_object(Value::Array { items })
        });
        fields.insert(F_SPECTRA, Slot::Obj(spectra));

        let freqs = data.frequencies.clone().map(|f| self.alloc_object(Value::Doubles(f)));
        fields.insert(F_FREQS, Slot::Obj(freqs));

        self.alloc_object(Value::Instance { class: C_RECORD, fields })
    }

    fn load_text(&self, fields: &HashMap<u32, Slot>, index: u32) -> Option<String> {
        match fields.get(&index) {
            Some(Slot::Obj(Some(i))) => match &self.objects[*i] {
                Value::Str(s) => Some(s.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    fn load_record(&self, object: usize) -> Option<RecordData> {
        let Value::Instance { class: C_RECORD, fields } = &self.objects[object] else {
            return None;
        };
        let spectrum = match fields.get(&F_SPECTRA) {
            Some(Slot::Obj(Some(i))) => match &self.objects[*i] {
                Value::Array { items } => items
                    .iter()
                    .map(|item| match item.map(|j| &self.objects[j]) {
                        Some(Value::Instance { class: C_COMPLEX, fields }) => {
                            match (fields.get(&F_REAL), fields.get(&F_IMAG)) {
                                (Some(Slot::Double(re)), Some(Slot::Double(im))) => Some((*re, *im)),
                                _ => None,
                            }
                        }
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>(),
                _ => None,
            },
            _ => None,
        };
        let frequencies = match fields.get(&F_FREQS) {
            Some(Slot::Obj(Some(i))) => match &self.objects[*i] {
                Value::Doubles(v) => Some(v.clone()),
                _ => None,
            },
            _ => None,
        };
        Some(RecordData {
            station: self.load_text(fields, 0),
            channel: self.load_text(fields, 1),
            network: self.load_text(fields, 2),
            site: self.load_text(fields, 3),
            spectrum,
            frequencies,
        })
    }

    fn set_exit_status(&mut self, runner: ObjRef, status: i32) {
        if let Some(i) = self.deref(runner) {
            if let Value::Runner { exit_status } = &mut self.objects[i] {
                *exit_status = status;
            }
        }
    }

    fn run_find(&mut self, runner: ObjRef, args: &[Arg]) -> Result<Ret, String> {
        if args.len() != 12 {
            return Err("java.lang.IllegalArgumentException: wrong number of arguments".into());
        }
        let mut texts = Vec::with_capacity(7);
        for arg in &args[..7] {
            texts.push(self.arg_text(Some(arg))?);
        }
        let frequencies = match self.arg_object(args.get(7))?.map(|i| &self.objects[i]) {
            Some(Value::Doubles(v)) => v.clone(),
            _ => return Err("java.lang.NullPointerException: frequency array".into()),
        };
        let (verbose, start_stage, stop_stage, use_stdio) =
            match (args[8], args[9], args[10], args[11]) {
                (Arg::Bool(v), Arg::Int(a), Arg::Int(b), Arg::Bool(s)) => (v, a, b, s),
                _ => return Err("java.lang.IllegalArgumentException: argument type".into()),
            };

        let mut texts = texts.into_iter();
        let mut next = || texts.next().unwrap_or_default();
        let request = FindRequest {
            stations: next(),
            channels: next(),
            networks: next(),
            locations: next(),
            date: next(),
            units: next(),
            file: next(),
            frequencies,
            verbose,
            start_stage,
            stop_stage,
            use_stdio,
        };

        let (behavior, written) = {
            let mut state = self.script.state.lock();
            state.log.finds.push(request.clone());
            (state.find.clone(), state.written.clone())
        };

        let elements = match behavior {
            FindBehavior::Respond(elements) => elements,
            FindBehavior::Synthetic(ids) => ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let corner = 5.0 * (i + 1) as f64;
                    ScriptedElement::Record(RecordData::synthetic(id, &request.frequencies, corner))
                })
                .collect(),
            FindBehavior::EchoWritten => written.into_iter().map(ScriptedElement::Record).collect(),
            FindBehavior::EmptyArray => Vec::new(),
            FindBehavior::NoMatch { exit_status } => {
                self.set_exit_status(runner, exit_status);
                return Ok(Ret::Object(None));
            }
            FindBehavior::NotAnArray => {
                let text = self.alloc(Value::Str("no responses".into()));
                return Ok(Ret::Object(Some(text)));
            }
            FindBehavior::Fault(message) => return Err(message),
        };

        let items = elements
            .iter()
            .map(|element| match element {
                ScriptedElement::Record(data) => Some(self.store_record(data)),
                ScriptedElement::Null => None,
                ScriptedElement::Text(text) => Some(self.alloc_object(Value::Str(text.clone()))),
            })
            .collect();
        Ok(Ret::Object(Some(self.alloc(Value::Array { items }))))
    }

    fn run_write(&mut self, runner: ObjRef, args: &[Arg]) -> Result<Ret, String> {
        let (records, format, to_stdout) = match args {
            [array, format, Arg::Bool(to_stdout)] => {
                let records = match self.arg_object(Some(array))?.map(|i| &self.objects[i]) {
                    Some(Value::Array { items }) => items
                        .iter()
                        .map(|item| item.and_then(|i| self.load_record(i)))
                        .collect::<Option<Vec<_>>>()
                        .ok_or("java.lang.NullPointerException: response element")?,
                    _ => return Err("java.lang.NullPointerException: response array".into()),
                };
                (records, self.arg_text(Some(format))?, *to_stdout)
            }
            _ => return Err("java.lang.IllegalArgumentException: wrong number of arguments".into()),
        };

        let behavior = {
            let mut state = self.script.state.lock();
            state.written = records.clone();
            state.log.writes.push(WriteCall {
                records: records.clone(),
                format: format.clone(),
                to_stdout,
            });
            state.write.clone()
        };

        match behavior {
            WriteBehavior::Accept => Ok(Ret::Bool(true)),
            WriteBehavior::Reject { exit_status } => {
                self.set_exit_status(runner, exit_status);
                Ok(Ret::Bool(false))
            }
            WriteBehavior::Fault { message, exit_status } => {
                self.set_exit_status(runner, exit_status);
                Err(message)
            }
            WriteBehavior::Render(directory) => {
                match render(&records, &format, to_stdout, &directory) {
                    Ok(()) => Ok(Ret::Bool(true)),
                    Err(err) => {
                        error!(target: "jevresp::memory", %err, "unable to write response output");
                        self.set_exit_status(runner, 1);
                        Ok(Ret::Bool(false))
                    }
                }
            }
        }
    }

    fn describe(&mut self, message: String) -> RemoteFault {
        error!(target: "jevresp::memory", exception = %message, "exception raised in runner");
        self.script.state.lock().log.faults_cleared += 1;
        RemoteFault::new(message)
    }
}

impl Drop for MemoryEnv {
    fn drop(&mut self) {
        let live = self.live_refs();
        if live > 0 {
            debug!(target: "jevresp::memory", live, "local references alive at detach");
        }
        self.script.state.lock().log.leaked_refs += live;
    }
}

impl RemoteEnv for MemoryEnv {
    fn find_class(&mut self, name: &str) -> Option<ClassRef> {
        if self.hidden(name) {
            return None;
        }
        CLASSES
            .iter()
            .position(|&c| c == name)
            .map(|i| ClassRef::from_index(i as u32))
    }

    fn field_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<FieldRef> {
        let owner = *CLASSES.get(class.index() as usize)?;
        if self.hidden(&format!("{}.{}", owner, name)) {
            return None;
        }
        FIELDS
            .iter()
            .position(|&(c, n, s)| c == class.index() && n == name && s == signature)
            .map(|i| FieldRef::from_index(i as u32))
    }

    fn method_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<MethodRef> {
        let owner = *CLASSES.get(class.index() as usize)?;
        if self.hidden(&format!("{}.{}", owner, name)) {
            return None;
        }
        METHODS
            .iter()
            .position(|&(c, n, s)| c == class.index() && n == name && s == signature)
            .map(|i| MethodRef::from_index(i as u32))
    }

    fn push_frame(&mut self, _capacity: usize) -> bool {
        self.frames.push(Vec::new());
        true
    }

    fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                for id in frame {
                    self.refs[id as usize] = None;
                }
            }
        }
    }

    fn new_string(&mut self, text: &str) -> Option<ObjRef> {
        if self.script.state.lock().fail_allocations {
            self.raise("java.lang.OutOfMemoryError");
            return None;
        }
        Some(self.alloc(Value::Str(text.to_string())))
    }

    fn new_double_array(&mut self, values: &[f64]) -> Option<ObjRef> {
        if self.script.state.lock().fail_allocations {
            self.raise("java.lang.OutOfMemoryError");
            return None;
        }
        Some(self.alloc(Value::Doubles(values.to_vec())))
    }

    fn new_object_array(&mut self, _element: ClassRef, len: usize) -> Option<ObjRef> {
        if self.script.state.lock().fail_allocations {
            self.raise("java.lang.OutOfMemoryError");
            return None;
        }
        Some(self.alloc(Value::Array { items: vec![None; len] }))
    }

    fn set_array_element(&mut self, array: ObjRef, index: usize, value: ObjRef) -> bool {
        let Some(element) = self.deref(value) else {
            return false;
        };
        let stored = match self.deref(array).and_then(|i| self.objects.get_mut(i)) {
            Some(Value::Array { items }) if index < items.len() => {
                items[index] = Some(element);
                true
            }
            _ => false,
        };
        if !stored {
            self.raise("java.lang.ArrayIndexOutOfBoundsException");
        }
        stored
    }

    fn new_object(&mut self, class: ClassRef, ctor: MethodRef, args: &[Arg]) -> Option<ObjRef> {
        if self.script.state.lock().fail_constructions {
            self.raise("java.lang.InstantiationException");
            return None;
        }
        match (class.index(), ctor.index(), args) {
            (C_RUNNER, M_RUNNER_CTOR, []) => {
                self.script.state.lock().log.runners_constructed += 1;
                Some(self.alloc(Value::Runner { exit_status: 0 }))
            }
            (C_COMPLEX, M_COMPLEX_CTOR, [Arg::Double(re), Arg::Double(im)]) => {
                let mut fields = HashMap::new();
                fields.insert(F_REAL, Slot::Double(*re));
                fields.insert(F_IMAG, Slot::Double(*im));
                Some(self.alloc(Value::Instance { class: C_COMPLEX, fields }))
            }
            (C_RECORD, M_RECORD_CTOR, [_, _, _, _, _, _]) => {
                let mut fields = HashMap::new();
                for (i, arg) in args.iter().enumerate() {
                    match self.arg_object(Some(arg)) {
                        Ok(obj) => fields.insert(i as u32, Slot::Obj(obj)),
                        Err(message) => {
                            self.raise(message);
                            return None;
                        }
                    };
                }
                Some(self.alloc(Value::Instance { class: C_RECORD, fields }))
            }
            _ => {
                self.raise("java.lang.IllegalArgumentException: constructor mismatch");
                None
            }
        }
    }

    fn call_method(
        &mut self,
        target: ObjRef,
        method: MethodRef,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Ret, RemoteFault> {
        if !matches!(self.value(target), Some(Value::Runner { .. })) {
            let fault = self.describe("java.lang.NullPointerException: runner".into());
            return Err(fault);
        }
        let outcome = match (method.index(), ret) {
            (M_FIND, ReturnKind::Object) => self.run_find(target, args),
            (M_WRITE, ReturnKind::Bool) => self.run_write(target, args),
            (M_EXIT_STATUS, ReturnKind::Int) => {
                self.script.state.lock().log.exit_status_reads += 1;
                match self.value(target) {
                    Some(Value::Runner { exit_status }) => Ok(Ret::Int(*exit_status)),
                    _ => Ok(Ret::Int(0)),
                }
            }
            _ => Err("java.lang.NoSuchMethodError".into()),
        };
        match outcome {
            Ok(value) => Ok(value),
            Err(message) => Err(self.describe(message)),
        }
    }

    fn take_fault(&mut self) -> Option<RemoteFault> {
        let message = self.pending.take()?;
        Some(self.describe(message))
    }

    fn is_instance_of(&mut self, obj: ObjRef, class: ClassRef) -> bool {
        match (self.value(obj), class.index()) {
            (None, _) => false,
            (Some(_), C_OBJECT) => true,
            (Some(Value::Str(_)), C_STRING) => true,
            (Some(Value::Doubles(_)), C_DOUBLES) => true,
            (Some(Value::Array { .. }), C_OBJECTS) => true,
            (Some(Value::Runner { .. }), C_RUNNER) => true,
            (Some(Value::Instance { class: c, .. }), wanted) => *c == wanted,
            _ => false,
        }
    }

    fn object_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<ObjRef> {
        let target = match self.value(obj)? {
            Value::Instance { fields, .. } => match fields.get(&field.index()) {
                Some(Slot::Obj(target)) => *target,
                _ => None,
            },
            _ => None,
        }?;
        Some(self.new_ref(target))
    }

    fn double_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<f64> {
        match self.value(obj)? {
            Value::Instance { fields, .. } => match fields.get(&field.index()) {
                Some(Slot::Double(v)) => Some(*v),
                _ => None,
            },
            _ => None,
        }
    }

    fn string_value(&mut self, obj: ObjRef) -> Option<String> {
        match self.value(obj)? {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn double_array_value(&mut self, obj: ObjRef) -> Option<Vec<f64>> {
        match self.value(obj)? {
            Value::Doubles(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn array_length(&mut self, array: ObjRef) -> Option<usize> {
        match self.value(array)? {
            Value::Array { items } => Some(items.len()),
            Value::Doubles(v) => Some(v.len()),
            _ => None,
        }
    }

    fn array_element(&mut self, array: ObjRef, index: usize) -> Option<ObjRef> {
        let element = match self.value(array)? {
            Value::Array { items } => items.get(index).copied().flatten(),
            _ => None,
        }?;
        Some(self.new_ref(element))
    }

    fn release(&mut self, obj: ObjRef) {
        if let Some(slot) = self.refs.get_mut(obj.index() as usize) {
            *slot = None;
        }
    }
}

// ============================================================================
// Output rendering
// ============================================================================

type LineFn = fn(f64, (f64, f64)) -> String;

fn amp_line(freq: f64, (re, im): (f64, f64)) -> String {
    format!("{:.6E} {:.6E}", freq, ComplexValue::new(re, im).amplitude())
}

fn phase_line(freq: f64, (re, im): (f64, f64)) -> String {
    format!("{:.6E} {:.6E}", freq, ComplexValue::new(re, im).phase_degrees())
}

fn spectra_line(freq: f64, (re, im): (f64, f64)) -> String {
    format!("{:.6E} {:.6E} {:.6E}", freq, re, im)
}

fn render(records: &[RecordData], format: &str, to_stdout: bool, dir: &Path) -> io::Result<()> {
    let outputs: Vec<(&str, LineFn)> = match format {
        "ap" => vec![("AMP", amp_line as LineFn), ("PHASE", phase_line as LineFn)],
        "cs" => vec![("SPECTRA", spectra_line as LineFn)],
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown output type '{}'", other),
            ))
        }
    };

    let stdout = io::stdout();
    for record in records {
        let freqs = record.frequencies.as_deref().unwrap_or_default();
        let spectrum = record.spectrum.as_deref().unwrap_or_default();
        for (prefix, line) in &outputs {
            let name = format!("{}.{}", prefix, record.label());
            let body: String = freqs
                .iter()
                .zip(spectrum)
                .map(|(&f, &v)| line(f, v) + "\n")
                .collect();
            if to_stdout {
                let mut out = stdout.lock();
                writeln!(out, " --------------------------------------------------")?;
                writeln!(out, " {}", name)?;
                writeln!(out, " --------------------------------------------------")?;
                out.write_all(body.as_bytes())?;
            } else {
                fs::write(dir.join(&name), body)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> (MemoryScript, MemoryEnv) {
        let script = MemoryScript::new();
        let env = MemoryEnv::new(script.clone());
        (script, env)
    }

    #[test]
    fn test_symbol_lookup_and_hiding() {
        let (script, mut env) = env();
        let runner = env.find_class(RUNNER_CLASS).unwrap();
        assert!(env.method_id(runner, EXIT_STATUS_METHOD, EXIT_STATUS_SIG).is_some());
        assert!(env.method_id(runner, EXIT_STATUS_METHOD, "()J").is_none());

        script.hide(&format!("{}.{}", RUNNER_CLASS, EXIT_STATUS_METHOD));
        assert!(env.method_id(runner, EXIT_STATUS_METHOD, EXIT_STATUS_SIG).is_none());
        script.hide(RECORD_CLASS);
        assert!(env.find_class(RECORD_CLASS).is_none());
    }

    #[test]
    fn test_frames_release_references() {
        let (script, mut env) = env();
        env.push_frame(4);
        env.new_string("ANMO").unwrap();
        env.new_double_array(&[1.0, 2.0]).unwrap();
        assert_eq!(env.live_refs(), 2);
        env.pop_frame();
        assert_eq!(env.live_refs(), 0);
        drop(env);
        assert_eq!(script.log().leaked_refs, 0);
    }

    #[test]
    fn test_leak_is_counted_at_detach() {
        let (script, mut env) = env();
        env.new_string("left behind").unwrap();
        drop(env);
        assert_eq!(script.log().leaked_refs, 1);
    }

    #[test]
    fn test_instance_checks() {
        let (_script, mut env) = env();
        let text = env.new_string("x").unwrap();
        let string = ClassRef::from_index(C_STRING);
        let doubles = ClassRef::from_index(C_DOUBLES);
        let object = ClassRef::from_index(C_OBJECT);
        assert!(env.is_instance_of(text, string));
        assert!(env.is_instance_of(text, object));
        assert!(!env.is_instance_of(text, doubles));
    }

    #[test]
    fn test_render_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let id = ChannelId::new("ANMO", "BHZ", "IU", "00");
        let data = RecordData::synthetic(&id, &[1.0, 2.0], 5.0);

        render(&[data.clone()], "ap", false, dir.path()).unwrap();
        let amp = fs::read_to_string(dir.path().join("AMP.IU.ANMO.00.BHZ")).unwrap();
        assert_eq!(amp.lines().count(), 2);
        assert!(dir.path().join("PHASE.IU.ANMO.00.BHZ").exists());

        render(&[data], "cs", false, dir.path()).unwrap();
        let spectra = fs::read_to_string(dir.path().join("SPECTRA.IU.ANMO.00.BHZ")).unwrap();
        assert_eq!(spectra.lines().next().map(|l| l.split(' ').count()), Some(3));

        assert!(render(&[], "xx", false, dir.path()).is_err());
    }
}
