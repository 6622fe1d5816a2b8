use thiserror::Error;

/// The taxonomy every public entry point reports through. Errors are
/// values: nothing in this crate panics on malformed input it can name.
#[derive(Error, Debug)]
pub enum NoteCountError {
    /// A caller-supplied parameter was invalid: an empty music id, or a
    /// chart index outside `[0, IIDX_1_MAX_CHART_COUNT)`.
    #[error("invalid parameter")]
    InvalidParam,
    /// A required file could not be opened, or was shorter than a fixed
    /// structure demanded.
    #[error("file operation failed: {0}")]
    FileFailed(#[from] std::io::Error),
    /// A buffer size computed from untrusted input would overflow or
    /// underflow before any allocation is attempted.
    #[error("buffer size computation failed")]
    MemFailed,
    /// Header signature, XOR check, or size constraints failed validation.
    #[error("invalid file: {0}")]
    InvalidFile(&'static str),
    /// The kbinxml decoder returned no tree.
    #[error("failed to parse manifest")]
    ManifestParseError,
}

pub type Result<T> = std::result::Result<T, NoteCountError>;
