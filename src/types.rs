// src/types.rs

use std::fmt;
use std::process::ExitStatus;

/// Which output stream of a child a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// A piece of child output.
///
/// An empty `data` buffer is the end-of-stream sentinel: every stream of every
/// process yields exactly one, after all of its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub stream: StreamKind,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(stream: StreamKind, data: Vec<u8>) -> Self {
        Self { stream, data }
    }

    /// The end-of-stream sentinel for `stream`.
    pub fn end(stream: StreamKind) -> Self {
        Self {
            stream,
            data: Vec::new(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.data.is_empty()
    }
}

/// Collapse an OS exit status into a single integer.
///
/// Processes killed by a signal report `128 + signo`, the same value a POSIX
/// shell would put in `$?`.
pub fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunk_is_the_sentinel() {
        assert!(Chunk::end(StreamKind::Stderr).is_end());
        assert!(!Chunk::new(StreamKind::Stdout, b"x".to_vec()).is_end());
    }

    #[cfg(unix)]
    #[test]
    fn signalled_status_maps_to_shell_convention() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait status: low 7 bits carry the terminating signal.
        assert_eq!(status_code(ExitStatus::from_raw(9)), 137);
        assert_eq!(status_code(ExitStatus::from_raw(3 << 8)), 3);
    }
}
