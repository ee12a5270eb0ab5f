//! Process-pipe streams.
//!
//! A pipe stream wraps one end of an OS pipe whose other end is the
//! standard input or output of a spawned `/bin/sh -c` child. The child's
//! pid is stored on the stream; [`Stream::close_pipe`] reaps exactly that
//! pid, so simultaneously-open pipe streams never cross-reap.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd};

use rustdio_core::OpenFlags;
use rustdio_core::process::decode_exit_status;
use tracing::debug;

use crate::error::StreamError;
use crate::stream::Stream;
use crate::sys;

/// Which side of the pipe the parent keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeDirection {
    /// The parent reads what the child writes to its standard output.
    ParentReads,
    /// The parent writes to the child's standard input.
    ParentWrites,
}

/// Exit status of a child whose shell exec failed.
const EXEC_FAILURE_STATUS: i32 = 127;

impl Stream {
    /// Spawn `/bin/sh -c command` with one end of a fresh pipe wired to
    /// the child's stdout (`ParentReads`) or stdin (`ParentWrites`); the
    /// retained end becomes this stream's handle.
    ///
    /// Pipe or fork failure returns [`StreamError::Spawn`] with both pipe
    /// ends closed and no child left running. In the child, an exec
    /// failure terminates with status 127 without returning to caller
    /// logic.
    pub fn spawn(command: &str, direction: PipeDirection) -> Result<Stream, StreamError> {
        let cmd = CString::new(command)
            .map_err(|_| StreamError::Spawn(io::ErrorKind::InvalidInput.into()))?;
        let (read_end, write_end) = sys::pipe().map_err(StreamError::Spawn)?;

        match sys::fork() {
            Err(e) => {
                // OwnedFd drops close both ends; nothing is running.
                Err(StreamError::Spawn(e))
            }
            Ok(sys::Fork::Child) => {
                // Async-signal-safe territory: dup2/close/exec/_exit only.
                match direction {
                    PipeDirection::ParentReads => {
                        redirect_onto(write_end, libc::STDOUT_FILENO);
                        drop(read_end);
                    }
                    PipeDirection::ParentWrites => {
                        redirect_onto(read_end, libc::STDIN_FILENO);
                        drop(write_end);
                    }
                }
                let _exec_err = sys::exec_shell(&cmd);
                sys::exit_now(EXEC_FAILURE_STATUS)
            }
            Ok(sys::Fork::Parent(pid)) => {
                let (kept, unused) = match direction {
                    PipeDirection::ParentReads => (read_end, write_end),
                    PipeDirection::ParentWrites => (write_end, read_end),
                };
                drop(unused);
                let flags = match direction {
                    PipeDirection::ParentReads => OpenFlags {
                        readable: true,
                        ..OpenFlags::default()
                    },
                    PipeDirection::ParentWrites => OpenFlags {
                        writable: true,
                        ..OpenFlags::default()
                    },
                };
                debug!(pid, ?direction, command, fd = kept.as_raw_fd(), "pipe stream spawned");
                Ok(Stream::from_owned_fd(kept, flags, Some(pid)))
            }
        }
    }

    /// Close the stream, then wait for exactly the stored child and
    /// return its decoded exit status (exit code, or `128 + signal`).
    ///
    /// A close failure is propagated without waiting on the child; a wait
    /// failure is reported as [`StreamError::Wait`], distinct from the
    /// close failure class.
    pub fn close_pipe(mut self) -> Result<i32, StreamError> {
        let Some(pid) = self.take_child_pid() else {
            return Err(StreamError::Wait(io::Error::other(
                "stream has no attached child process",
            )));
        };
        self.close_inner()?;
        match sys::waitpid(pid) {
            Ok(status) => {
                let code = decode_exit_status(status);
                debug!(pid, code, "pipe child reaped");
                Ok(code)
            }
            Err(e) => Err(StreamError::Wait(e)),
        }
    }
}

/// In the child: point `target` (stdin or stdout) at the pipe end, then
/// release the original descriptor. If the pipe end already *is* the
/// target, leak it instead so the exec inherits it open.
fn redirect_onto(end: std::os::fd::OwnedFd, target: std::os::fd::RawFd) {
    let raw = end.as_raw_fd();
    if raw != target {
        let _ = sys::dup2(raw, target);
        drop(end);
    } else {
        let _ = end.into_raw_fd();
    }
}
