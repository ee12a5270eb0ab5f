//! Typed syscall veneer.
//!
//! One wrapper per syscall the stream layer needs, each converting the raw
//! `libc` return into `io::Result` with errno captured via
//! `io::Error::last_os_error()`. All fd ownership above this module is
//! `OwnedFd`; raw fds appear only at the call boundary.

use std::ffi::CStr;
use std::io;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd, RawFd};

/// Result of a fork, seen from each side.
#[derive(Debug, Clone, Copy)]
pub enum Fork {
    /// This process is the child.
    Child,
    /// This process is the parent; the child's pid is attached.
    Parent(libc::pid_t),
}

/// `open(2)` with creation mode bits.
pub fn open(path: &CStr, oflags: i32, mode: libc::mode_t) -> io::Result<OwnedFd> {
    // SAFETY: `path` is a valid NUL-terminated string for the duration of
    // the call; open is variadic and reads `mode` only with O_CREAT.
    let fd = unsafe { libc::open(path.as_ptr(), oflags, mode as libc::c_uint) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `fd` is a freshly-opened descriptor owned by no one else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// `read(2)` into `buf`. Returns the byte count; 0 means end-of-file.
pub fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `buf` is a live writable region of exactly `buf.len()` bytes.
    let rc = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as usize)
}

/// `write(2)` from `buf`. May transfer fewer bytes than requested.
pub fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    // SAFETY: `buf` is a live readable region of exactly `buf.len()` bytes.
    let rc = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as usize)
}

/// `lseek(2)`. Returns the resulting absolute offset.
pub fn lseek(fd: RawFd, offset: i64, whence: i32) -> io::Result<u64> {
    // SAFETY: no pointers cross the boundary.
    let rc = unsafe { libc::lseek(fd, offset as libc::off_t, whence) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as u64)
}

/// `close(2)`, consuming ownership so the fd cannot be released twice.
pub fn close(fd: OwnedFd) -> io::Result<()> {
    let raw = fd.into_raw_fd();
    // SAFETY: `raw` was just detached from an OwnedFd; this is the single
    // release of that descriptor.
    let rc = unsafe { libc::close(raw) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `pipe(2)`. Returns `(read_end, write_end)`.
pub fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` is a writable array of two c_ints.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: both descriptors are freshly created and owned by no one else.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

/// `fork(2)`.
///
/// # Safety contract
///
/// Callers must restrict the child side to async-signal-safe work
/// (`dup2`/`close`/`exec`/`_exit`). This library forks only to exec.
pub fn fork() -> io::Result<Fork> {
    // SAFETY: see contract above; enforced by the single call site.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        Err(io::Error::last_os_error())
    } else if pid == 0 {
        Ok(Fork::Child)
    } else {
        Ok(Fork::Parent(pid))
    }
}

/// `dup2(2)` — duplicate `oldfd` onto `newfd`.
pub fn dup2(oldfd: RawFd, newfd: RawFd) -> io::Result<()> {
    // SAFETY: no pointers cross the boundary.
    let rc = unsafe { libc::dup2(oldfd, newfd) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Replace the process image with `/bin/sh -c command`.
///
/// Returns only on failure, carrying the exec errno.
pub fn exec_shell(command: &CStr) -> io::Error {
    let shell = c"/bin/sh";
    let argv: [*const libc::c_char; 4] = [
        c"sh".as_ptr(),
        c"-c".as_ptr(),
        command.as_ptr(),
        std::ptr::null(),
    ];
    // SAFETY: argv is NULL-terminated and every element points to a live
    // NUL-terminated string.
    unsafe { libc::execv(shell.as_ptr(), argv.as_ptr()) };
    io::Error::last_os_error()
}

/// `_exit(2)` — terminate immediately without running any caller logic.
pub fn exit_now(status: i32) -> ! {
    // SAFETY: _exit never returns and runs no atexit handlers.
    unsafe { libc::_exit(status) }
}

/// `waitpid(2)` on exactly `pid`, blocking. Returns the raw wait status.
pub fn waitpid(pid: libc::pid_t) -> io::Result<i32> {
    let mut status: libc::c_int = 0;
    // SAFETY: `status` is a live writable c_int.
    let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;

    use super::*;

    #[test]
    fn pipe_roundtrip() {
        let (rx, tx) = pipe().expect("pipe");
        let n = write(tx.as_raw_fd(), b"hello").expect("write");
        assert_eq!(n, 5);
        let mut buf = [0u8; 16];
        let n = read(rx.as_raw_fd(), &mut buf).expect("read");
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn pipe_eof_after_writer_closes() {
        let (rx, tx) = pipe().expect("pipe");
        write(tx.as_raw_fd(), b"x").expect("write");
        close(tx).expect("close");
        let mut buf = [0u8; 4];
        assert_eq!(read(rx.as_raw_fd(), &mut buf).expect("read"), 1);
        assert_eq!(read(rx.as_raw_fd(), &mut buf).expect("read"), 0);
    }

    #[test]
    fn lseek_rejects_bad_fd() {
        let err = lseek(-1, 0, rustdio_core::seek::SEEK_SET).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn lseek_rejects_pipes() {
        let (rx, _tx) = pipe().expect("pipe");
        let err = lseek(rx.as_raw_fd(), 0, rustdio_core::seek::SEEK_SET).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ESPIPE));
    }
}
