// ── Core error types ──
//
// Errors raised by the pure computation layer. Data access and
// configuration failures live in their own crates and wrap these.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Result set is missing required columns: {}", missing.join(", "))]
    InvalidInput { missing: Vec<String> },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
