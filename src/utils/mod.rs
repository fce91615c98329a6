//! Utility modules for working with FASTA files outside of the partitioned driver

pub mod fasta;

pub use fasta::{FastaReader, FastaWriter, SequentialTranslator};
