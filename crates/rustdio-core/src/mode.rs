//! Open-mode parsing.
//!
//! Maps the six supported fopen-style mode strings onto open flags and
//! POSIX `O_*` bits.
//!
//! Reference: POSIX.1-2024 fopen, ISO C11 7.21.5

/// File open mode flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
}

/// Parse a mode string. Exactly six modes are supported:
/// `r`, `r+`, `w`, `w+`, `a`, `a+`.
///
/// Returns `None` for anything else, including the C modifiers `b` and `x`.
pub fn parse_mode(mode: &str) -> Option<OpenFlags> {
    let flags = match mode {
        "r" => OpenFlags {
            readable: true,
            ..OpenFlags::default()
        },
        "r+" => OpenFlags {
            readable: true,
            writable: true,
            ..OpenFlags::default()
        },
        "w" => OpenFlags {
            writable: true,
            create: true,
            truncate: true,
            ..OpenFlags::default()
        },
        "w+" => OpenFlags {
            readable: true,
            writable: true,
            create: true,
            truncate: true,
            ..OpenFlags::default()
        },
        "a" => OpenFlags {
            writable: true,
            create: true,
            append: true,
            ..OpenFlags::default()
        },
        "a+" => OpenFlags {
            readable: true,
            writable: true,
            create: true,
            append: true,
            ..OpenFlags::default()
        },
        _ => return None,
    };
    Some(flags)
}

/// Convert open flags to POSIX O_* flag bits.
pub fn flags_to_oflags(flags: &OpenFlags) -> i32 {
    let mut oflags = 0i32;

    if flags.readable && flags.writable {
        oflags |= 2; // O_RDWR
    } else if flags.writable {
        oflags |= 1; // O_WRONLY
    }
    // O_RDONLY is 0, so readable-only needs no flag.

    if flags.create {
        oflags |= 0o100; // O_CREAT
    }
    if flags.truncate {
        oflags |= 0o1000; // O_TRUNC
    }
    if flags.append {
        oflags |= 0o2000; // O_APPEND
    }

    oflags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
