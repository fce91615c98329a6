/// A FASTA record as seen by a single worker
///
/// A worker only sees the bytes of its own corrected segment, so the first
/// record it extracts may be the tail of a sequence whose header was captured
/// by a lower-id worker. That case is tagged explicitly as a [`Record::Fragment`]
/// rather than encoded in the header text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// A record whose header line was captured by this worker
    ///
    /// The header is stored without its leading `>` marker.
    Complete { header: Vec<u8>, sequence: Vec<u8> },

    /// A sequence continuation whose header belongs to a lower-id worker
    Fragment { sequence: Vec<u8> },
}
impl Record {
    pub fn complete(header: &[u8], sequence: &[u8]) -> Self {
        Self::Complete {
            header: header.to_vec(),
            sequence: sequence.to_vec(),
        }
    }

    pub fn fragment(sequence: &[u8]) -> Self {
        Self::Fragment {
            sequence: sequence.to_vec(),
        }
    }

    /// Returns the header (without `>`) or `None` for a fragment
    #[must_use]
    pub fn header(&self) -> Option<&[u8]> {
        match self {
            Self::Complete { header, .. } => Some(header),
            Self::Fragment { .. } => None,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        match self {
            Self::Complete { sequence, .. } | Self::Fragment { sequence } => sequence,
        }
    }

    pub fn sequence_mut(&mut self) -> &mut Vec<u8> {
        match self {
            Self::Complete { sequence, .. } | Self::Fragment { sequence } => sequence,
        }
    }

    #[must_use]
    pub fn is_fragment(&self) -> bool {
        matches!(self, Self::Fragment { .. })
    }

    /// Returns the number of bytes this record occupies once serialized,
    /// excluding any separator that follows the sequence
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        match self {
            // '>' + header + '\n' + sequence
            Self::Complete { header, sequence } => header.len() + sequence.len() + 2,
            Self::Fragment { sequence } => sequence.len(),
        }
    }
}

/// Merges fragment continuations into the record that precedes them
///
/// Applied to the concatenation of every worker's records (in worker-id order),
/// this recovers the record list a single worker would have extracted. A
/// leading fragment with no preceding record is kept as is.
#[must_use]
pub fn merge_fragments<I: IntoIterator<Item = Record>>(records: I) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::new();
    for record in records {
        match (record, merged.last_mut()) {
            (Record::Fragment { sequence }, Some(previous)) => {
                previous.sequence_mut().extend_from_slice(&sequence);
            }
            (record, _) => merged.push(record),
        }
    }
    merged
}
