//! # seqtrans
//!
//! Translates nucleotide FASTA files into amino acid FASTA files by splitting
//! the input across independent workers.
//!
//! Each worker reads a nominal byte range of the shared input plus a read-ahead
//! pad, trims it to line boundaries so that every line belongs to exactly one
//! worker, extracts and translates its records, and writes its output at an
//! absolute offset resolved through two collective rounds. Records whose
//! sequence crosses a worker boundary are carried as headerless fragments and
//! reassemble byte-exactly in the output.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seqtrans::{PartitionedTranslator, ReadingFrame, RunConfig, Strand};
//!
//! let config = RunConfig::builder("input.fa", "output.fa")
//!     .frame(ReadingFrame::First)
//!     .strand(Strand::Direct)
//!     .workers(8)
//!     .build();
//! PartitionedTranslator::new(config).run()?;
//! # Ok::<(), seqtrans::Error>(())
//! ```

/// Run configuration
pub mod config;

mod core;

/// Error definitions
pub mod error;

pub mod exchange;
pub mod extract;
pub mod parallel;
pub mod read;
pub mod reconcile;
pub mod translate;
pub mod utils;
pub mod write;

pub use config::{RunConfig, RunConfigBuilder, DEFAULT_MAX_LINE_LENGTH};
pub use crate::core::{merge_fragments, ByteSegment, Record, WorkerPlan};
pub use error::{Error, Result};
pub use exchange::{
    Collective, LengthPhase, Marker, MarkerPhase, Successor, ThreadCollective, WriteOffsetTable,
};
pub use extract::{extract_records, HEADER_MARKER};
pub use parallel::{PartitionedTranslator, PhaseTimings, RunReport, Worker, WorkerReport};
pub use read::{LineScanner, SharedInput, TERMINATOR};
pub use reconcile::{cut_point, reconcile};
pub use translate::{
    ReadingFrame, StandardTranslator, Strand, TranslationConfig, Translator, UNKNOWN_AMINO_ACID,
};
pub use utils::{FastaReader, FastaWriter, SequentialTranslator};
pub use write::{assemble, SharedOutput};
