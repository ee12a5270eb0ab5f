//! Buffered streams over owned file descriptors.
//!
//! [`Stream`] pairs an `OwnedFd` with the sans-I/O engine from
//! `rustdio-core`: the engine decides what to buffer, flush, or refill,
//! and this module performs the actual syscalls through the veneer.
//!
//! Direction changes follow the engine's lane rules: a read after
//! buffered writes flushes them first; a write or seek after buffered
//! reads throws the unconsumed bytes away. Failure is reported through
//! [`StreamError`] and mirrored in the stream's sticky eof/error flags.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use rustdio_core::{OpenFlags, PushOutcome, StreamCore, Whence, flags_to_oflags, parse_mode};
use tracing::trace;

use crate::error::StreamError;
use crate::sys;

/// Creation mode bits for files opened with a creating mode.
const CREATE_MODE: libc::mode_t = 0o666;

/// A buffered byte stream over a POSIX file descriptor.
///
/// Created by [`Stream::open`] for regular files or [`Stream::spawn`]
/// for process pipes. The descriptor is owned exclusively and released
/// exactly once: by [`Stream::close`], [`Stream::close_pipe`], or drop.
#[derive(Debug)]
pub struct Stream {
    fd: Option<OwnedFd>,
    core: StreamCore,
    flags: OpenFlags,
    child: Option<libc::pid_t>,
}

impl Stream {
    /// Open `path` with an fopen-style mode: `r`, `r+`, `w`, `w+`, `a`,
    /// or `a+`.
    ///
    /// Files created by the `w`/`a` families get mode bits `0o666`
    /// (moderated by the umask). Any other mode string fails with
    /// [`StreamError::InvalidMode`] before touching the OS.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Stream, StreamError> {
        let path = path.as_ref();
        let flags =
            parse_mode(mode).ok_or_else(|| StreamError::InvalidMode(mode.to_string()))?;
        let cpath = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| StreamError::Open(io::ErrorKind::InvalidInput.into()))?;
        let fd = sys::open(&cpath, flags_to_oflags(&flags), CREATE_MODE)
            .map_err(StreamError::Open)?;
        trace!(path = %path.display(), mode, fd = fd.as_raw_fd(), "stream opened");
        Ok(Self::from_owned_fd(fd, flags, None))
    }

    pub(crate) fn from_owned_fd(
        fd: OwnedFd,
        flags: OpenFlags,
        child: Option<libc::pid_t>,
    ) -> Self {
        Self {
            fd: Some(fd),
            core: StreamCore::default(),
            flags,
            child,
        }
    }

    pub(crate) fn take_child_pid(&mut self) -> Option<libc::pid_t> {
        self.child.take()
    }

    fn raw_fd(&self) -> RawFd {
        self.fd.as_ref().map(|fd| fd.as_raw_fd()).unwrap_or(-1)
    }

    // -----------------------------------------------------------------------
    // Sticky flags / position
    // -----------------------------------------------------------------------

    /// Check if a read has hit end-of-file. Sticky until a successful seek.
    pub fn is_eof(&self) -> bool {
        self.core.is_eof()
    }

    /// Check if any underlying call has failed. Sticky for the stream's
    /// lifetime.
    pub fn is_error(&self) -> bool {
        self.core.is_error()
    }

    /// The logical position cursor, or `None` while the end-of-file flag
    /// is set.
    pub fn tell(&self) -> Option<u64> {
        if self.core.is_eof() {
            None
        } else {
            Some(self.core.position())
        }
    }

    // -----------------------------------------------------------------------
    // Byte primitives
    // -----------------------------------------------------------------------

    /// Read one byte.
    ///
    /// With the end-of-file flag set this fails immediately without a
    /// syscall. An exhausted buffer triggers exactly one refill of up to
    /// the buffer capacity; a zero-byte refill sets the end-of-file flag,
    /// a failed one sets the error flag.
    pub fn read_byte(&mut self) -> Result<u8, StreamError> {
        if self.core.is_eof() {
            return Err(StreamError::EndOfStream);
        }
        if !self.flags.readable {
            self.core.set_error();
            return Err(StreamError::Io(io::ErrorKind::PermissionDenied.into()));
        }
        // Lane switch: pending writes reach the handle before any read.
        if self.core.write_pending() > 0 {
            self.flush_pending().map_err(StreamError::Io)?;
            self.core.reset_lane();
        }
        if let Some(byte) = self.core.buffered_byte() {
            self.core.advance(1);
            return Ok(byte);
        }
        let fd = self.raw_fd();
        let n = match sys::read(fd, self.core.refill_space()) {
            Ok(n) => n,
            Err(e) => {
                self.core.set_error();
                return Err(StreamError::Io(e));
            }
        };
        if n == 0 {
            self.core.set_eof();
            return Err(StreamError::EndOfStream);
        }
        self.core.complete_refill(n);
        let Some(byte) = self.core.buffered_byte() else {
            self.core.set_error();
            return Err(StreamError::Io(io::Error::other("refill produced no data")));
        };
        self.core.advance(1);
        Ok(byte)
    }

    /// Write one byte, returning it.
    ///
    /// A full buffer is flushed first; if that flush fails the byte is
    /// not stored and the error flag is set.
    pub fn write_byte(&mut self, byte: u8) -> Result<u8, StreamError> {
        if !self.flags.writable {
            self.core.set_error();
            return Err(StreamError::Io(io::ErrorKind::PermissionDenied.into()));
        }
        if let PushOutcome::Full = self.core.push_byte(byte) {
            trace!(pending = self.core.write_pending(), "implicit flush");
            self.flush_pending().map_err(StreamError::Io)?;
            let stored = self.core.push_byte(byte);
            debug_assert_eq!(stored, PushOutcome::Stored);
        }
        self.core.advance(1);
        Ok(byte)
    }

    // -----------------------------------------------------------------------
    // Block operations
    // -----------------------------------------------------------------------

    /// fread-style block read: gather up to `size * count` bytes into
    /// `dest` (clamped to `dest.len()`), returning the number of
    /// **complete** elements read. A partial trailing element's bytes are
    /// delivered but not counted.
    ///
    /// With the end-of-file flag already set, returns 0 with no side
    /// effects.
    pub fn read_records(&mut self, dest: &mut [u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        if self.core.is_eof() {
            return 0;
        }
        let total = size.saturating_mul(count).min(dest.len());
        let mut gathered = 0usize;
        while gathered < total {
            match self.read_byte() {
                Ok(byte) => {
                    dest[gathered] = byte;
                    gathered += 1;
                }
                Err(_) => break,
            }
        }
        gathered / size
    }

    /// fwrite-style block write: buffer up to `size * count` bytes from
    /// `src` (clamped to `src.len()`), returning the number of complete
    /// elements written.
    ///
    /// Stops at the first failure; bytes already buffered or flushed are
    /// not rolled back.
    pub fn write_records(&mut self, src: &[u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let total = size.saturating_mul(count).min(src.len());
        let mut written = 0usize;
        while written < total {
            match self.write_byte(src[written]) {
                Ok(_) => written += 1,
                Err(_) => break,
            }
        }
        written / size
    }

    // -----------------------------------------------------------------------
    // Flush / seek
    // -----------------------------------------------------------------------

    /// Drain all pending write bytes to the handle.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.flush_pending().map_err(StreamError::Io)
    }

    /// Drain loop: one write(2) is never assumed sufficient. On failure
    /// the error flag is set and the buffer is left as-is (bytes already
    /// transferred are not restored).
    fn flush_pending(&mut self) -> Result<(), io::Error> {
        if self.core.write_pending() == 0 {
            return Ok(());
        }
        let fd = self.raw_fd();
        let failure = {
            let pending = self.core.pending_write_data();
            let mut transferred = 0usize;
            let mut failure = None;
            while transferred < pending.len() {
                match sys::write(fd, &pending[transferred..]) {
                    Ok(0) => {
                        failure = Some(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "handle accepted zero bytes",
                        ));
                        break;
                    }
                    Ok(n) => transferred += n,
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            failure
        };
        match failure {
            None => {
                self.core.mark_flushed();
                Ok(())
            }
            Some(e) => {
                self.core.set_error();
                Err(e)
            }
        }
    }

    /// Reposition the stream.
    ///
    /// Pending writes are flushed first (a flush failure aborts the
    /// seek); buffered read bytes are discarded permanently. On success
    /// the logical position becomes the returned absolute offset and the
    /// end-of-file flag is cleared.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, StreamError> {
        if self.core.write_pending() > 0 {
            self.flush_pending().map_err(StreamError::Io)?;
        }
        self.core.discard_read_buffer();
        self.core.reset_lane();
        let fd = self.raw_fd();
        match sys::lseek(fd, offset, whence.to_raw()) {
            Ok(absolute) => {
                self.core.set_position(absolute);
                self.core.clear_eof();
                Ok(absolute)
            }
            Err(e) => {
                self.core.set_error();
                Err(StreamError::Io(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Flush (if write-dirty) and release the descriptor.
    ///
    /// The descriptor is released exactly once even when the flush or the
    /// release itself fails; either failure is reported as
    /// [`StreamError::Close`].
    pub fn close(mut self) -> Result<(), StreamError> {
        self.close_inner()
    }

    pub(crate) fn close_inner(&mut self) -> Result<(), StreamError> {
        let mut failure: Option<io::Error> = None;
        if self.core.write_pending() > 0 {
            if let Err(e) = self.flush_pending() {
                failure = Some(e);
            }
        }
        if let Some(fd) = self.fd.take() {
            trace!(fd = fd.as_raw_fd(), "stream closed");
            if let Err(e) = sys::close(fd) {
                failure.get_or_insert(e);
            }
        }
        match failure {
            None => Ok(()),
            Some(e) => Err(StreamError::Close(e)),
        }
    }
}

impl Drop for Stream {
    /// Last-resort cleanup: flush best-effort, release the fd once, and
    /// reap an unclosed pipe child so no zombie is left behind.
    fn drop(&mut self) {
        if self.fd.is_some() {
            let _ = self.close_inner();
        }
        if let Some(pid) = self.child.take() {
            let _ = sys::waitpid(pid);
        }
    }
}

impl AsRawFd for Stream {
    /// The native handle, for interop (the `fileno` escape hatch).
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

// ---------------------------------------------------------------------------
// std::io interop
// ---------------------------------------------------------------------------

fn to_io_error(err: StreamError) -> io::Error {
    match err {
        StreamError::Io(e) | StreamError::Open(e) | StreamError::Close(e) => e,
        StreamError::EndOfStream => io::ErrorKind::UnexpectedEof.into(),
        other => io::Error::other(other),
    }
}

impl io::Read for Stream {
    /// fread-style: gathers until `buf` is full or the stream ends.
    /// End-of-file is `Ok(0)`, as the trait requires.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0usize;
        while n < buf.len() {
            match self.read_byte() {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(StreamError::EndOfStream) => break,
                Err(e) if n == 0 => return Err(to_io_error(e)),
                Err(_) => break,
            }
        }
        Ok(n)
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut n = 0usize;
        for &byte in buf {
            match self.write_byte(byte) {
                Ok(_) => n += 1,
                Err(e) if n == 0 => return Err(to_io_error(e)),
                Err(_) => break,
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending()
    }
}

impl io::Seek for Stream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(o) => (o as i64, Whence::Start),
            io::SeekFrom::Current(o) => (o, Whence::Current),
            io::SeekFrom::End(o) => (o, Whence::End),
        };
        Stream::seek(self, offset, whence).map_err(to_io_error)
    }
}
