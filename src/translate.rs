//! Nucleotide to amino acid translation
//!
//! Translation is applied to each record independently and in place, which is
//! what allows any subset of records to be translated by any worker without
//! context from neighbouring records.

use std::{fmt, str::FromStr};

use crate::core::Record;

/// Amino acids of the standard genetic code, indexed by `16 * b1 + 4 * b2 + b3`
/// with `A = 0, C = 1, G = 2, T = 3`
const STD_GENETIC_CODE: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

/// Encoding used for codons holding anything other than `ACGTU`
pub const UNKNOWN_AMINO_ACID: u8 = b'X';

/// IUPAC aware complement table, preserving case
const COMPLEMENT: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    let pairs: [(u8, u8); 11] = [
        (b'A', b'T'),
        (b'C', b'G'),
        (b'G', b'C'),
        (b'T', b'A'),
        (b'U', b'A'),
        (b'R', b'Y'),
        (b'Y', b'R'),
        (b'K', b'M'),
        (b'M', b'K'),
        (b'B', b'V'),
        (b'V', b'B'),
    ];
    let mut j = 0;
    while j < pairs.len() {
        let (from, to) = pairs[j];
        table[from as usize] = to;
        table[from.to_ascii_lowercase() as usize] = to.to_ascii_lowercase();
        j += 1;
    }
    table[b'D' as usize] = b'H';
    table[b'H' as usize] = b'D';
    table[b'd' as usize] = b'h';
    table[b'h' as usize] = b'd';
    table
};

#[inline]
fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// Translates a single codon with the standard genetic code
#[inline]
#[must_use]
pub fn translate_codon(codon: [u8; 3]) -> u8 {
    match (
        base_index(codon[0]),
        base_index(codon[1]),
        base_index(codon[2]),
    ) {
        (Some(b1), Some(b2), Some(b3)) => STD_GENETIC_CODE[16 * b1 + 4 * b2 + b3],
        _ => UNKNOWN_AMINO_ACID,
    }
}

/// Performs the reverse complement of the byte slice in place
#[inline]
pub fn make_reverse_complement(bases: &mut [u8]) {
    bases.reverse();
    for base in bases {
        *base = COMPLEMENT[*base as usize];
    }
}

/// The nucleotide offset codons start from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingFrame {
    /// Codons start at the first base (default)
    #[default]
    First,
    /// Codons start at the second base
    Second,
    /// Codons start at the third base
    Third,
}
impl ReadingFrame {
    /// Zero-based offset of the first codon
    #[must_use]
    pub fn offset(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }
}
impl TryFrom<u8> for ReadingFrame {
    type Error = String;
    fn try_from(frame: u8) -> std::result::Result<Self, Self::Error> {
        match frame {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            _ => Err(format!("Invalid reading frame: {frame} (expected 1, 2 or 3)")),
        }
    }
}

/// Which strand of the input sequence is translated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    /// Translate the sequence as given (default)
    #[default]
    Direct,
    /// Translate the reverse complement of the sequence
    Reverse,
}
impl FromStr for Strand {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "reverse" => Ok(Self::Reverse),
            _ => Err(format!("Unknown strand: {s} (expected direct or reverse)")),
        }
    }
}
impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// Reading frame and strand applied to every record of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslationConfig {
    pub frame: ReadingFrame,
    pub strand: Strand,
}
impl TranslationConfig {
    #[must_use]
    pub fn new(frame: ReadingFrame, strand: Strand) -> Self {
        Self { frame, strand }
    }
}

/// A pure per-record transform from nucleotides to amino acids
///
/// Implementations must not depend on record order or on any other record:
/// workers translate arbitrary subsets of the input independently.
pub trait Translator: Send + Sync {
    /// Translates one sequence in place
    fn translate_sequence(&self, sequence: &mut Vec<u8>);

    /// Translates every record of a list in place
    fn translate(&self, records: &mut [Record]) {
        for record in records {
            self.translate_sequence(record.sequence_mut());
        }
    }
}

/// Translation with the standard genetic code
///
/// Codons are read from the configured frame offset (after reverse
/// complementing for [`Strand::Reverse`]). Trailing bases that do not fill a
/// codon are dropped, codons holding unknown bases translate to
/// [`UNKNOWN_AMINO_ACID`], and stop codons translate to `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTranslator {
    config: TranslationConfig,
}
impl StandardTranslator {
    #[must_use]
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> TranslationConfig {
        self.config
    }
}
impl Translator for StandardTranslator {
    fn translate_sequence(&self, sequence: &mut Vec<u8>) {
        if self.config.strand == Strand::Reverse {
            make_reverse_complement(sequence);
        }
        let offset = self.config.frame.offset().min(sequence.len());
        let num_codons = (sequence.len() - offset) / 3;

        // the write index never overtakes the codon being read
        for idx in 0..num_codons {
            let start = offset + 3 * idx;
            let codon = [sequence[start], sequence[start + 1], sequence[start + 2]];
            sequence[idx] = translate_codon(codon);
        }
        sequence.truncate(num_codons);
    }
}
