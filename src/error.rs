use std::path::PathBuf;

/// Custom Result type for seqtrans operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the seqtrans library, encompassing all possible error cases
/// that can occur while partitioning, translating, and reassembling a FASTA file.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors detected while validating the run configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    /// Errors related to planning the worker partitions
    #[error("Error planning partitions: {0}")]
    PlanError(#[from] PlanError),

    /// Errors that occur while reading a worker segment
    #[error("Error reading segment: {0}")]
    ReadError(#[from] ReadError),

    /// Errors that occur while aligning a segment on line terminators
    #[error("Error reconciling segment boundaries: {0}")]
    BoundaryError(#[from] BoundaryError),

    /// Errors raised by the collective offset exchange
    #[error("Error exchanging offsets: {0}")]
    ExchangeError(#[from] ExchangeError),

    /// Errors that occur while writing the output
    #[error("Error writing output: {0}")]
    WriteError(#[from] WriteError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// A worker thread panicked before returning its result
    #[error("Worker {0} panicked")]
    WorkerPanic(usize),
}
impl Error {
    /// Checks if the error is a missing terminator within the read-ahead window
    ///
    /// This usually means the configured maximum line length is smaller than the
    /// longest line in the input, and the run should be retried with a larger value.
    #[must_use]
    pub fn is_pad_too_small(&self) -> bool {
        matches!(
            self,
            Self::BoundaryError(BoundaryError::TerminatorNotFound { .. })
        )
    }

    /// Checks if the error was caused by a peer worker aborting a collective round
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::ExchangeError(ExchangeError::Aborted))
    }
}

/// Errors detected before any worker is started
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The input file cannot be opened for reading
    #[error(
        "{} cannot be opened. Check that the path is valid and that you have read permissions ({source})",
        path.display()
    )]
    UnreadableInput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input path exists but is not a regular file
    #[error("{} is not a regular file", .0.display())]
    IncompatibleInput(PathBuf),

    /// The output file cannot be created
    #[error(
        "{} cannot be created. Check that the path is valid and that you have write permissions ({source})",
        path.display()
    )]
    UnwritableOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input and output resolve to the same file
    #[error("Input and output refer to the same file: {}", .0.display())]
    SameInputOutput(PathBuf),

    /// The maximum line length must leave room to find a terminator
    #[error("Maximum line length must be greater than zero")]
    ZeroMaxLineLength,
}

/// Errors related to computing a worker's nominal byte range
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("Cannot partition a file across zero workers")]
    ZeroWorkers,

    #[error("Worker id ({id}) is out of range for {total} workers")]
    WorkerOutOfRange { id: usize, total: usize },
}

/// Errors that can occur while reading a worker's raw segment
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The requested segment extends past the bytes available in the shared input
    ///
    /// # Arguments
    /// * `offset` - The requested start offset
    /// * `len` - The requested number of bytes
    /// * `available` - The size of the shared input
    #[error(
        "Cannot read {len} bytes at offset {offset}: input holds only {available} bytes - possibly truncated"
    )]
    Truncated {
        offset: usize,
        len: usize,
        available: usize,
    },
}

/// Errors that can occur while aligning a segment on line terminators
#[derive(thiserror::Error, Debug)]
pub enum BoundaryError {
    /// No line terminator was found within the read-ahead window of a cut point
    ///
    /// # Arguments
    /// * `cut` - The nominal cut point (absolute byte offset)
    /// * `window` - The number of bytes searched after the cut point
    #[error(
        "No line terminator within {window} bytes of offset {cut}: increase the maximum line length"
    )]
    TerminatorNotFound { cut: usize, window: usize },
}

/// Errors raised by the collective offset exchange
#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    /// A peer worker failed and aborted the exchange
    #[error("Exchange aborted by a failing worker")]
    Aborted,

    /// A worker contributed more than once to the same round
    #[error("Worker {0} contributed twice to the same exchange round")]
    DuplicateContribution(usize),

    /// A worker rank outside of the collective was used
    #[error("Worker rank ({rank}) is out of range for a collective of {size}")]
    RankOutOfRange { rank: usize, size: usize },

    /// A round was released while a contribution was still missing
    #[error("Missing contribution from worker {0}")]
    MissingContribution(usize),
}

/// Errors that can occur while writing the assembled output
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The positional write accepted zero bytes before the buffer was exhausted
    #[error("Short write at offset {offset}: {remaining} bytes were not written")]
    ShortWrite { offset: u64, remaining: usize },

    /// The combined output length does not fit in a file offset
    #[error("Combined output length overflows a file offset")]
    OffsetOverflow,
}
