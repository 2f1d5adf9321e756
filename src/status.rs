//! Error/status channel - last-error code and message
//!
//! The latched value is overwritten by every failing operation and never
//! reset automatically; callers read it through `code()` / `getexitcode()`.

use crate::error::{codes, BridgeError};
use tracing::error;

/// Latched exit status and last diagnostic message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorStatus {
    code: i32,
    message: String,
}

impl ErrorStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a code and message, sending the message to the diagnostic stream
    pub fn latch(&mut self, code: i32, message: impl Into<String>) {
        self.message = message.into();
        self.code = code;
        error!(target: "status", code, message = %self.message, "status latched");
    }

    /// Latch the code and message carried by a bridge error
    pub fn latch_error(&mut self, err: &BridgeError) {
        self.latch(err.code(), err.to_string());
    }

    /// Latch an exit status reported by the remote runner (no local message)
    pub fn latch_remote_code(&mut self, code: i32) {
        self.code = code;
        if code != codes::SUCCESS {
            self.message = format!("Remote runner exited with status {}", code);
        }
    }

    #[inline]
    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.code != codes::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_overwrites() {
        let mut status = ErrorStatus::new();
        assert_eq!(status.code(), 0);
        assert!(!status.is_error());

        status.latch(3, "missing class");
        assert_eq!(status.code(), 3);
        assert_eq!(status.message(), "missing class");

        status.latch_error(&BridgeError::parameter("Error in 'evresp' parameters"));
        assert_eq!(status.code(), 1);
        assert_eq!(status.message(), "Error in 'evresp' parameters");
    }

    #[test]
    fn test_remote_zero_keeps_last_message() {
        let mut status = ErrorStatus::new();
        status.latch(9, "fault");
        status.latch_remote_code(0);
        assert_eq!(status.code(), 0);
        assert_eq!(status.message(), "fault");
    }
}
