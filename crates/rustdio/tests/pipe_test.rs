//! Integration test: process-pipe streams.
//!
//! Spawns real `/bin/sh -c` children and checks both pipe directions,
//! exit-status reporting, and that concurrent pipe streams reap only
//! their own child.
//!
//! Run: cargo test -p rustdio --test pipe_test

use std::fs;

use rustdio::{PipeDirection, Stream, StreamError};
use tempfile::TempDir;

// -----------------------------------------------------------------
// 1. Parent reads the child's stdout
// -----------------------------------------------------------------

#[test]
fn parent_reads_child_output_byte_by_byte() {
    let mut p = Stream::spawn("printf abc", PipeDirection::ParentReads).expect("spawn");
    assert_eq!(p.read_byte().expect("a"), b'a');
    assert_eq!(p.read_byte().expect("b"), b'b');
    assert_eq!(p.read_byte().expect("c"), b'c');
    assert!(matches!(p.read_byte(), Err(StreamError::EndOfStream)));
    assert!(p.is_eof());
    assert_eq!(p.close_pipe().expect("close_pipe"), 0);
}

#[test]
fn parent_reads_via_block_read() {
    let mut p = Stream::spawn("printf 0123456789", PipeDirection::ParentReads).expect("spawn");
    let mut buf = [0u8; 16];
    assert_eq!(p.read_records(&mut buf, 1, 16), 10);
    assert_eq!(&buf[..10], b"0123456789");
    assert_eq!(p.close_pipe().expect("close_pipe"), 0);
}

// -----------------------------------------------------------------
// 2. Parent writes the child's stdin
// -----------------------------------------------------------------

#[test]
fn parent_writes_reach_the_child() {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("sink");
    let cmd = format!("cat > {}", out.display());

    let mut p = Stream::spawn(&cmd, PipeDirection::ParentWrites).expect("spawn");
    assert_eq!(p.write_records(b"hello pipe", 1, 10), 10);
    // close_pipe flushes, closes the write end (EOF for cat), then reaps.
    assert_eq!(p.close_pipe().expect("close_pipe"), 0);

    assert_eq!(fs::read(&out).expect("read sink"), b"hello pipe");
}

// -----------------------------------------------------------------
// 3. Exit-status reporting
// -----------------------------------------------------------------

#[test]
fn close_pipe_returns_the_child_exit_status() {
    let p = Stream::spawn("exit 7", PipeDirection::ParentReads).expect("spawn");
    assert_eq!(p.close_pipe().expect("close_pipe"), 7);
}

#[test]
fn missing_command_reports_shell_not_found_status() {
    let mut p = Stream::spawn(
        "definitely_not_a_real_command_4711",
        PipeDirection::ParentReads,
    )
    .expect("spawn");
    // The shell prints its complaint to stderr; our pipe sees only EOF.
    assert!(matches!(p.read_byte(), Err(StreamError::EndOfStream)));
    assert_eq!(p.close_pipe().expect("close_pipe"), 127);
}

// -----------------------------------------------------------------
// 4. No cross-reaping between simultaneously-open pipe streams
// -----------------------------------------------------------------

#[test]
fn concurrent_pipe_streams_reap_their_own_child() {
    let first = Stream::spawn("exit 3", PipeDirection::ParentReads).expect("spawn first");
    let second = Stream::spawn("exit 5", PipeDirection::ParentReads).expect("spawn second");

    // Closing in reverse creation order still pairs each stream with
    // exactly its own child.
    assert_eq!(second.close_pipe().expect("close second"), 5);
    assert_eq!(first.close_pipe().expect("close first"), 3);
}

// -----------------------------------------------------------------
// 5. Drop reaps an abandoned pipe stream
// -----------------------------------------------------------------

#[test]
fn dropping_a_pipe_stream_does_not_leak_the_child() {
    // No assertion beyond termination: drop closes the write end and
    // waits on the child, so the test would hang on a regression.
    let mut p = Stream::spawn("cat > /dev/null", PipeDirection::ParentWrites).expect("spawn");
    assert_eq!(p.write_records(b"data", 1, 4), 4);
    drop(p);
}

// -----------------------------------------------------------------
// 6. close_pipe on a plain file stream is refused
// -----------------------------------------------------------------

#[test]
fn close_pipe_requires_an_attached_child() {
    let dir = TempDir::new().expect("tempdir");
    let f = Stream::open(dir.path().join("plain"), "w").expect("open");
    assert!(matches!(f.close_pipe(), Err(StreamError::Wait(_))));
}
