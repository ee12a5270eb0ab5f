//! Stream failure classes.
//!
//! Every fallible operation returns `Result<_, StreamError>`; the variant
//! is the sentinel distinguishing the failure class. Callers disambiguate
//! "clean end of data" from "I/O error" either by matching
//! [`StreamError::EndOfStream`] or by inspecting the sticky stream flags.

use std::io;

use thiserror::Error;

/// Failure classes for stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The mode string is not one of `r`, `r+`, `w`, `w+`, `a`, `a+`.
    #[error("unsupported open mode `{0}`")]
    InvalidMode(String),

    /// open(2) failed; no stream record was constructed.
    #[error("open failed: {0}")]
    Open(#[source] io::Error),

    /// The read side is exhausted. The sticky end-of-file flag is set.
    #[error("end of stream")]
    EndOfStream,

    /// An underlying read, write, or reposition call failed. The sticky
    /// error flag is set.
    #[error("stream I/O failed: {0}")]
    Io(#[source] io::Error),

    /// Flushing or releasing the handle failed at close time. The handle
    /// is released exactly once regardless.
    #[error("close failed: {0}")]
    Close(#[source] io::Error),

    /// Pipe creation or process spawn failed; no descriptor or child
    /// process was leaked.
    #[error("spawn failed: {0}")]
    Spawn(#[source] io::Error),

    /// Waiting on the stored child process failed.
    #[error("wait failed: {0}")]
    Wait(#[source] io::Error),
}

impl StreamError {
    /// True for the clean end-of-data sentinel.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamError::EndOfStream)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
