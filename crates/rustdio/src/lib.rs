//! # rustdio
//!
//! Buffered stream I/O over POSIX file descriptors.
//!
//! A [`Stream`] owns one descriptor and a fixed-capacity buffer with an
//! explicit direction state, giving fopen-family semantics: byte and
//! block reads and writes, flush, seek/tell, and sticky eof/error flags.
//! A popen-style variant makes the descriptor one end of a pipe to a
//! spawned `/bin/sh -c` child.
//!
//! Everything is synchronous and blocking; a stream is single-owner and
//! carries no internal locking. The descriptor (and, for pipe streams,
//! the child pid) is released exactly once: on close, or on drop as a
//! last resort.
//!
//! ```no_run
//! use rustdio::{Stream, Whence};
//!
//! # fn main() -> Result<(), rustdio::StreamError> {
//! let mut f = Stream::open("data.bin", "w+")?;
//! f.write_records(b"hello", 1, 5);
//! f.seek(0, Whence::Start)?;
//! let mut buf = [0u8; 5];
//! f.read_records(&mut buf, 1, 5);
//! f.close()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pipe;
pub mod stream;
mod sys;

pub use error::StreamError;
pub use pipe::PipeDirection;
pub use rustdio_core::{STREAM_BUF_LEN, Whence};
pub use stream::Stream;
