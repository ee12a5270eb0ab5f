//! Buffered stream engine.
//!
//! The cursor/flag state machine behind a buffered stream, with no I/O of
//! its own. The caller owns the file descriptor: it asks this engine for
//! pending write data to flush, hands it refill space to read into, and
//! reports syscall outcomes back through the flag setters.
//!
//! Design: a single fixed-capacity buffer is used by at most one direction
//! at a time. The direction is a tagged [`Lane`] rather than a
//! last-operation flag, so a simultaneously-dirty read and write region
//! cannot be represented. Switching Write→Read requires the caller to
//! flush first; switching Read→Write discards buffered read bytes.

/// Default stream buffer capacity in bytes.
pub const STREAM_BUF_LEN: usize = 4096;

/// Direction state of the buffer.
///
/// Invariants:
/// - `Read`: `pos <= filled <= capacity`
/// - `Write`: `pending <= capacity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// No buffered data in either direction.
    Idle,
    /// The buffer holds `filled` bytes read ahead from the handle, of
    /// which `pos` have been consumed.
    Read { pos: usize, filled: usize },
    /// The buffer holds `pending` bytes not yet written to the handle.
    Write { pending: usize },
}

/// Outcome of buffering one write byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The byte was stored in the buffer.
    Stored,
    /// The buffer is at capacity; the caller must flush and retry.
    Full,
}

/// Sticky stream state flags.
#[derive(Debug, Clone, Copy, Default)]
struct StreamFlags {
    eof: bool,
    error: bool,
}

/// The stream record, minus the native handle.
///
/// Owns the byte buffer, the [`Lane`] state, the sticky eof/error flags,
/// and the logical position cursor. One instance per stream; flags are
/// never shared between streams.
#[derive(Debug)]
pub struct StreamCore {
    buf: Vec<u8>,
    lane: Lane,
    flags: StreamFlags,
    position: u64,
}

impl StreamCore {
    /// Create an engine with the given buffer capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(1)],
            lane: Lane::Idle,
            flags: StreamFlags::default(),
            position: 0,
        }
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Current direction state.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    // -----------------------------------------------------------------------
    // Sticky flags
    // -----------------------------------------------------------------------

    /// Check if the end-of-file flag is set.
    pub fn is_eof(&self) -> bool {
        self.flags.eof
    }

    /// Check if the error flag is set.
    pub fn is_error(&self) -> bool {
        self.flags.error
    }

    /// Set the end-of-file flag.
    pub fn set_eof(&mut self) {
        self.flags.eof = true;
    }

    /// Set the error flag.
    pub fn set_error(&mut self) {
        self.flags.error = true;
    }

    /// Clear the end-of-file flag (done by a successful reposition).
    pub fn clear_eof(&mut self) {
        self.flags.eof = false;
    }

    // -----------------------------------------------------------------------
    // Logical position
    // -----------------------------------------------------------------------

    /// Absolute offset as seen by the caller.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reset the position after a successful reposition call.
    pub fn set_position(&mut self, offset: u64) {
        self.position = offset;
    }

    /// Advance the position cursor by `n` consumed or stored bytes.
    pub fn advance(&mut self, n: u64) {
        self.position = self.position.saturating_add(n);
    }

    // -----------------------------------------------------------------------
    // Write lane
    // -----------------------------------------------------------------------

    /// Number of buffered bytes awaiting flush (0 outside the write lane).
    pub fn write_pending(&self) -> usize {
        match self.lane {
            Lane::Write { pending } => pending,
            _ => 0,
        }
    }

    /// Buffer one byte for writing.
    ///
    /// Entering from the read lane discards buffered read bytes. Returns
    /// [`PushOutcome::Full`] without storing when `pending == capacity`;
    /// the caller flushes and retries.
    pub fn push_byte(&mut self, byte: u8) -> PushOutcome {
        let pending = match self.lane {
            Lane::Write { pending } => pending,
            Lane::Read { .. } => {
                self.zero_buffer();
                0
            }
            Lane::Idle => 0,
        };
        if pending == self.buf.len() {
            self.lane = Lane::Write { pending };
            return PushOutcome::Full;
        }
        self.buf[pending] = byte;
        self.lane = Lane::Write {
            pending: pending + 1,
        };
        PushOutcome::Stored
    }

    /// The buffered bytes that must be written to the handle.
    pub fn pending_write_data(&self) -> &[u8] {
        match self.lane {
            Lane::Write { pending } => &self.buf[..pending],
            _ => &[],
        }
    }

    /// Mark the write buffer as fully transferred: zero it and reset the
    /// pending count. No-op outside the write lane.
    pub fn mark_flushed(&mut self) {
        if let Lane::Write { .. } = self.lane {
            self.zero_buffer();
            self.lane = Lane::Write { pending: 0 };
        }
    }

    // -----------------------------------------------------------------------
    // Read lane
    // -----------------------------------------------------------------------

    /// Take the next buffered read byte, if the read lane has one.
    pub fn buffered_byte(&mut self) -> Option<u8> {
        match self.lane {
            Lane::Read { pos, filled } if pos < filled => {
                let byte = self.buf[pos];
                self.lane = Lane::Read {
                    pos: pos + 1,
                    filled,
                };
                Some(byte)
            }
            _ => None,
        }
    }

    /// Expose the whole buffer for one refill from the handle.
    ///
    /// The write lane must be clean (flushed) before refilling; callers
    /// follow up with [`Self::complete_refill`].
    pub fn refill_space(&mut self) -> &mut [u8] {
        debug_assert_eq!(self.write_pending(), 0);
        &mut self.buf
    }

    /// Record a refill of `n` bytes (`n <= capacity`, `n > 0`): the read
    /// cursor resets to 0 and `n` becomes the valid-byte count.
    pub fn complete_refill(&mut self, n: usize) {
        debug_assert!(n <= self.buf.len());
        self.lane = Lane::Read {
            pos: 0,
            filled: n.min(self.buf.len()),
        };
    }

    /// Throw away buffered-but-unconsumed read bytes: zero the buffer and
    /// return to the idle lane. No-op outside the read lane.
    pub fn discard_read_buffer(&mut self) {
        if let Lane::Read { .. } = self.lane {
            self.zero_buffer();
            self.lane = Lane::Idle;
        }
    }

    /// Drop any lane state. Used when a reposition resynchronizes the
    /// stream with the handle.
    pub fn reset_lane(&mut self) {
        self.lane = Lane::Idle;
    }

    fn zero_buffer(&mut self) {
        self.buf.fill(0);
    }
}

impl Default for StreamCore {
    fn default() -> Self {
        Self::new(STREAM_BUF_LEN)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_idle_and_clean() {
        let core = StreamCore::new(16);
        assert_eq!(core.lane(), Lane::Idle);
        assert!(!core.is_eof());
        assert!(!core.is_error());
        assert_eq!(core.position(), 0);
        assert_eq!(core.capacity(), 16);
    }

    #[test]
    fn test_push_byte_enters_write_lane() {
        let mut core = StreamCore::new(16);
        assert_eq!(core.push_byte(b'x'), PushOutcome::Stored);
        assert_eq!(core.lane(), Lane::Write { pending: 1 });
        assert_eq!(core.pending_write_data(), b"x");
    }

    #[test]
    fn test_push_byte_reports_full_at_capacity() {
        let mut core = StreamCore::new(4);
        for b in *b"abcd" {
            assert_eq!(core.push_byte(b), PushOutcome::Stored);
        }
        assert_eq!(core.push_byte(b'e'), PushOutcome::Full);
        // Nothing stored, nothing lost.
        assert_eq!(core.pending_write_data(), b"abcd");
    }

    #[test]
    fn test_mark_flushed_resets_pending() {
        let mut core = StreamCore::new(4);
        core.push_byte(b'a');
        core.push_byte(b'b');
        core.mark_flushed();
        assert_eq!(core.write_pending(), 0);
        assert_eq!(core.pending_write_data(), b"");
        // Capacity is available again.
        assert_eq!(core.push_byte(b'c'), PushOutcome::Stored);
    }

    #[test]
    fn test_refill_then_take_bytes() {
        let mut core = StreamCore::new(8);
        core.refill_space()[..3].copy_from_slice(b"xyz");
        core.complete_refill(3);
        assert_eq!(core.buffered_byte(), Some(b'x'));
        assert_eq!(core.buffered_byte(), Some(b'y'));
        assert_eq!(core.buffered_byte(), Some(b'z'));
        assert_eq!(core.buffered_byte(), None);
    }

    #[test]
    fn test_write_after_read_discards_buffered_bytes() {
        let mut core = StreamCore::new(8);
        core.refill_space()[..4].copy_from_slice(b"data");
        core.complete_refill(4);
        let _ = core.buffered_byte();
        // Switching direction throws the remaining three bytes away.
        core.push_byte(b'w');
        assert_eq!(core.lane(), Lane::Write { pending: 1 });
        assert_eq!(core.pending_write_data(), b"w");
    }

    #[test]
    fn test_discard_read_buffer_returns_to_idle() {
        let mut core = StreamCore::new(8);
        core.refill_space()[..2].copy_from_slice(b"ab");
        core.complete_refill(2);
        core.discard_read_buffer();
        assert_eq!(core.lane(), Lane::Idle);
        assert_eq!(core.buffered_byte(), None);
    }

    #[test]
    fn test_discard_read_buffer_noop_in_write_lane() {
        let mut core = StreamCore::new(8);
        core.push_byte(b'a');
        core.discard_read_buffer();
        assert_eq!(core.pending_write_data(), b"a");
    }

    #[test]
    fn test_flags_are_sticky() {
        let mut core = StreamCore::new(8);
        core.set_eof();
        core.set_error();
        assert!(core.is_eof());
        assert!(core.is_error());
        core.clear_eof();
        assert!(!core.is_eof());
        // The error flag has no clearing operation.
        assert!(core.is_error());
    }

    #[test]
    fn test_position_tracking() {
        let mut core = StreamCore::new(8);
        core.advance(3);
        assert_eq!(core.position(), 3);
        core.set_position(100);
        assert_eq!(core.position(), 100);
    }

    #[test]
    fn test_capacity_minimum_is_one() {
        let core = StreamCore::new(0);
        assert_eq!(core.capacity(), 1);
    }
}
