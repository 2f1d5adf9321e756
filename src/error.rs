//! Error taxonomy for the bridge
//!
//! Every failure maps onto a fixed exit-status code so C and FORTRAN callers
//! can read the outcome through `getexitcode()`.

use std::fmt;

/// Exit-status codes latched into the error channel
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const PARAMETER: i32 = 1;
    pub const RUNTIME_START: i32 = 2;
    pub const SYMBOL: i32 = 3;
    pub const ALLOCATION: i32 = 4;
    pub const CONSTRUCTION: i32 = 5;
    pub const EMPTY_RESULT: i32 = 6;
    pub const ELEMENT_TYPE: i32 = 7;
    pub const FIELD_CONTENTS: i32 = 8;
    pub const REMOTE_FAULT: i32 = 9;
}

/// Category of a remote symbol that failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Field,
    Method,
    Constructor,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Field => write!(f, "field"),
            Self::Method => write!(f, "method"),
            Self::Constructor => write!(f, "constructor"),
        }
    }
}

/// A named remote symbol that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    pub kind: SymbolKind,
    pub owner: String,
    pub name: String,
    pub signature: String,
}

impl SymbolError {
    pub fn class(name: &str) -> Self {
        Self {
            kind: SymbolKind::Class,
            owner: name.to_string(),
            name: name.to_string(),
            signature: String::new(),
        }
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SymbolKind::Class => write!(f, "Unable to locate Java class \"{}\"", self.owner),
            SymbolKind::Constructor => write!(
                f,
                "Unable to locate constructor {} for Java class \"{}\"",
                self.signature, self.owner
            ),
            SymbolKind::Field => write!(
                f,
                "Unable to locate field \"{}\" ({}) in Java class \"{}\"",
                self.name, self.signature, self.owner
            ),
            SymbolKind::Method => write!(
                f,
                "Unable to locate method \"{}\" {} in Java class \"{}\"",
                self.name, self.signature, self.owner
            ),
        }
    }
}

impl std::error::Error for SymbolError {}

/// Why the managed runtime could not be brought up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartFailure {
    /// The runtime rejected its options or its library could not be loaded
    InitFailed(String),
    /// The runtime cannot be started again once it has been stopped
    RestartRefused,
    /// This build carries no managed-runtime backend
    Unavailable(String),
}

impl fmt::Display for StartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(msg) => write!(f, "Error starting Java Virtual Machine: {}", msg),
            Self::RestartRefused => write!(
                f,
                "Error starting Java Virtual Machine: runtime cannot be restarted after being stopped"
            ),
            Self::Unavailable(msg) => write!(f, "Error starting Java Virtual Machine: {}", msg),
        }
    }
}

impl std::error::Error for StartFailure {}

/// An exception raised on the remote side, already described and cleared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    pub description: String,
}

impl RemoteFault {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into() }
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Java exception raised: {}", self.description)
    }
}

impl std::error::Error for RemoteFault {}

/// Result data came back with an unexpected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    NotAnArray,
    EmptyResult,
    ElementType { index: usize },
    FieldContents { index: usize, field: &'static str },
    LengthMismatch { index: usize, spectrum: usize, frequencies: usize },
}

impl DecodeError {
    pub fn code(&self) -> i32 {
        match self {
            Self::NotAnArray | Self::EmptyResult => codes::EMPTY_RESULT,
            Self::ElementType { .. } => codes::ELEMENT_TYPE,
            Self::FieldContents { .. } | Self::LengthMismatch { .. } => codes::FIELD_CONTENTS,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnArray => write!(f, "Returned object is not an array of response elements"),
            Self::EmptyResult => write!(f, "No response elements in returned array"),
            Self::ElementType { index } => {
                write!(f, "Unable to fetch 'RespInfoBlk' array element {}", index)
            }
            Self::FieldContents { index, field } => write!(
                f,
                "Error fetching field '{}' of Java 'RespInfoBlk' object {}",
                field, index
            ),
            Self::LengthMismatch { index, spectrum, frequencies } => write!(
                f,
                "Response element {} has {} spectrum values for {} frequencies",
                index, spectrum, frequencies
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Top-level bridge error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    Parameter(String),
    RuntimeStart(StartFailure),
    Symbol(SymbolError),
    Allocation(String),
    Construction(String),
    RemoteFault(RemoteFault),
    Decode(DecodeError),
    /// The remote lookup produced no result; carries the runner's exit status
    NoResponses(i32),
    /// The remote runner reported failure through its exit status
    RemoteStatus(i32),
}

impl BridgeError {
    /// Exit-status code for this failure class
    pub fn code(&self) -> i32 {
        match self {
            Self::Parameter(_) => codes::PARAMETER,
            Self::RuntimeStart(_) => codes::RUNTIME_START,
            Self::Symbol(_) => codes::SYMBOL,
            Self::Allocation(_) => codes::ALLOCATION,
            Self::Construction(_) => codes::CONSTRUCTION,
            Self::RemoteFault(_) => codes::REMOTE_FAULT,
            Self::Decode(err) => err.code(),
            Self::NoResponses(code) | Self::RemoteStatus(code) => *code,
        }
    }

    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    pub fn allocation(what: impl fmt::Display) -> Self {
        Self::Allocation(format!("Unable to create {} (out of memory)", what))
    }

    pub fn construction(class: &str) -> Self {
        Self::Construction(format!("Unable to construct instance of Java class \"{}\"", class))
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(msg) | Self::Allocation(msg) | Self::Construction(msg) => {
                write!(f, "{}", msg)
            }
            Self::RuntimeStart(err) => write!(f, "{}", err),
            Self::Symbol(err) => write!(f, "{}", err),
            Self::RemoteFault(err) => write!(f, "{}", err),
            Self::Decode(err) => write!(f, "{}", err),
            Self::NoResponses(code) => {
                write!(f, "No matching responses found (exit status {})", code)
            }
            Self::RemoteStatus(code) => write!(f, "Remote runner exited with status {}", code),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RuntimeStart(err) => Some(err),
            Self::Symbol(err) => Some(err),
            Self::RemoteFault(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StartFailure> for BridgeError {
    fn from(err: StartFailure) -> Self {
        Self::RuntimeStart(err)
    }
}

impl From<SymbolError> for BridgeError {
    fn from(err: SymbolError) -> Self {
        Self::Symbol(err)
    }
}

impl From<RemoteFault> for BridgeError {
    fn from(err: RemoteFault) -> Self {
        Self::RemoteFault(err)
    }
}

impl From<DecodeError> for BridgeError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_per_failure_class() {
        assert_eq!(BridgeError::parameter("x").code(), 1);
        assert_eq!(BridgeError::from(StartFailure::RestartRefused).code(), 2);
        assert_eq!(BridgeError::from(SymbolError::class("a/B")).code(), 3);
        assert_eq!(BridgeError::allocation("frequency array").code(), 4);
        assert_eq!(BridgeError::construction("a/B").code(), 5);
        assert_eq!(BridgeError::from(DecodeError::EmptyResult).code(), 6);
        assert_eq!(BridgeError::from(DecodeError::ElementType { index: 0 }).code(), 7);
        assert_eq!(
            BridgeError::from(DecodeError::LengthMismatch { index: 0, spectrum: 2, frequencies: 3 }).code(),
            8
        );
        assert_eq!(BridgeError::from(RemoteFault::new("boom")).code(), 9);
        assert_eq!(BridgeError::RemoteStatus(14).code(), 14);
        assert_eq!(BridgeError::NoResponses(0).code(), 0);
    }

    #[test]
    fn test_symbol_message_names_symbol() {
        let err = SymbolError {
            kind: SymbolKind::Method,
            owner: "com/isti/jevalresp/RunBlks".into(),
            name: "getExitStatusValue".into(),
            signature: "()I".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("getExitStatusValue"));
        assert!(msg.contains("RunBlks"));
    }
}
