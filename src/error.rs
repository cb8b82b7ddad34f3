//! Process-boundary error type.
//!
//! `AppError` carries a message plus the exit code `main` should return.
//! Exit codes:
//!
//! - 2: input/configuration error (bad CSV schema, invalid flag values)
//! - 3: dataset unusable (no wells, malformed plate)
//! - 4: internal/output error (export or plot write failures)
//!
//! Per-well fit failures are *not* `AppError`s; they are
//! [`crate::domain::FitFailure`] values carried in the result rows so the
//! batch can keep going.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
