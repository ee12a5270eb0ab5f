//! # rustdio-core
//!
//! Sans-I/O engine for buffered stream I/O.
//!
//! This crate holds everything about a buffered stream that does not touch
//! the operating system: open-mode parsing, the buffer cursor/flag state
//! machine, seek whence mapping, and child wait-status decoding. The
//! `rustdio` crate owns the file descriptor and drives this engine with
//! real syscalls. No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod buffer;
pub mod mode;
pub mod process;
pub mod seek;

pub use buffer::{Lane, PushOutcome, STREAM_BUF_LEN, StreamCore};
pub use mode::{OpenFlags, flags_to_oflags, parse_mode};
pub use seek::Whence;
