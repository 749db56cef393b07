use thiserror::Error;

/// Failure modes of the resource editor.
///
/// Every fallible operation in this crate returns one of these variants;
/// there is no local recovery once one is raised (see the state machine in
/// [`crate::session::run_edit_session`]).
#[derive(Error, Debug)]
pub enum Error {
    /// An on-wire invariant was violated: a bad signature/magic, a bad
    /// count, a misaligned size, or a directory whose shape doesn't match
    /// what the format requires at that level.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The input is well-formed but describes a layout this editor
    /// deliberately does not handle: no resource section, a resize beyond
    /// the existing extent, or an attempt to leave the resource section
    /// empty.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A short read, short write, or an I/O failure surfaced by the
    /// `Readable`/`Writable` collaborator.
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    /// A CLI argument was malformed or contradictory.
    #[error("usage error: {0}")]
    UsageError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_format(message: impl Into<String>) -> Error {
        Error::InvalidFormat(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Error {
        Error::Unsupported(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Error {
        Error::UsageError(message.into())
    }
}
