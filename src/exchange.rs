//! Two-phase offset resolution
//!
//! Workers never exchange record data. They take part in exactly two
//! collective rounds:
//!
//! 1. **Marker exchange** - every worker publishes a [`Marker`] describing its
//!    first record. Each worker derives its [`Successor`] from the markers of
//!    the workers that follow it, which decides the separator after its last
//!    record.
//! 2. **Length exchange** - every worker publishes the length of its assembled
//!    buffer. Each worker builds the [`WriteOffsetTable`] (an exclusive prefix
//!    sum) and takes its own write offset from it.
//!
//! The protocol is expressed against the [`Collective`] trait so that it does
//! not depend on the transport. [`ThreadCollective`] implements it for workers
//! running as threads of one process.

use parking_lot::{Condvar, Mutex};

use crate::{
    core::{utils::calculate_offsets, Record},
    error::{Error, ExchangeError, Result, WriteError},
};

/// What a worker's first local record is, as published in the marker exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The worker owns no records
    Empty,
    /// The first record continues a record of a lower-id worker
    Fragment,
    /// The first record starts with its own header
    Complete,
}
impl Marker {
    /// Derives the marker of a worker's local record list
    #[must_use]
    pub fn of(records: &[Record]) -> Self {
        match records.first() {
            None => Self::Empty,
            Some(record) if record.is_fragment() => Self::Fragment,
            Some(_) => Self::Complete,
        }
    }
}

/// What follows a worker's last record in the global output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successor {
    /// The next non-empty worker continues the last record's sequence
    Fragment,
    /// The next non-empty worker starts a new record
    Complete,
    /// No non-empty worker follows
    End,
}
impl Successor {
    /// Resolves the successor of worker `rank` from the gathered markers
    ///
    /// Workers that own no records are skipped, so their empty contribution
    /// never changes the separator between their neighbours.
    #[must_use]
    pub fn resolve(markers: &[Marker], rank: usize) -> Self {
        markers
            .iter()
            .skip(rank + 1)
            .find_map(|marker| match marker {
                Marker::Empty => None,
                Marker::Fragment => Some(Self::Fragment),
                Marker::Complete => Some(Self::Complete),
            })
            .unwrap_or(Self::End)
    }
}

/// Serialized length and absolute write offset of every worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOffsetTable {
    lengths: Vec<u64>,
    offsets: Vec<u64>,
    total: u64,
}
impl WriteOffsetTable {
    /// Builds the table from the lengths of every worker, ordered by id
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::OffsetOverflow`] if the combined length overflows.
    pub fn new(lengths: Vec<u64>) -> Result<Self> {
        let mut offsets = Vec::with_capacity(lengths.len());
        let total = calculate_offsets(&lengths, &mut offsets).ok_or(WriteError::OffsetOverflow)?;
        Ok(Self {
            lengths,
            offsets,
            total,
        })
    }

    /// Absolute write offset of worker `rank`
    #[must_use]
    pub fn offset(&self, rank: usize) -> u64 {
        self.offsets[rank]
    }

    /// Serialized length of worker `rank`
    #[must_use]
    pub fn len(&self, rank: usize) -> u64 {
        self.lengths[rank]
    }

    /// Total length of the assembled output
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.total
    }

    /// Whether worker `rank` writes the final bytes of the output
    ///
    /// This is the highest-id worker with a non-empty buffer, or worker 0
    /// when the output is empty.
    #[must_use]
    pub fn owns_tail(&self, rank: usize) -> bool {
        let tail = self.lengths.iter().rposition(|&len| len > 0).unwrap_or(0);
        rank == tail
    }
}

/// A transport able to run the two all-gather rounds of the protocol
///
/// Every participant must call each round exactly once, in the same order.
/// A call blocks until every participant has contributed (or the collective
/// is aborted) and returns the contributions ordered by rank.
pub trait Collective: Send + Sync {
    /// Number of participants
    fn size(&self) -> usize;

    /// Phase one: gathers every worker's first-record marker
    fn all_gather_markers(&self, rank: usize, marker: Marker) -> Result<Vec<Marker>>;

    /// Phase two: gathers every worker's serialized length
    fn all_gather_lengths(&self, rank: usize, len: u64) -> Result<Vec<u64>>;

    /// Releases every participant blocked in (or arriving at) a round with an error
    fn abort(&self);
}

/// Entry point of the two-phase protocol for one worker
///
/// The phases are consumed in order: [`MarkerPhase::exchange`] yields the
/// [`LengthPhase`], which in turn yields the [`WriteOffsetTable`].
pub struct MarkerPhase<'a, C: Collective + ?Sized> {
    collective: &'a C,
    rank: usize,
}
impl<'a, C: Collective + ?Sized> MarkerPhase<'a, C> {
    pub fn new(collective: &'a C, rank: usize) -> Self {
        Self { collective, rank }
    }

    /// Publishes this worker's marker and resolves its successor
    pub fn exchange(self, marker: Marker) -> Result<(Successor, LengthPhase<'a, C>)> {
        let markers = self.collective.all_gather_markers(self.rank, marker)?;
        let successor = Successor::resolve(&markers, self.rank);
        Ok((
            successor,
            LengthPhase {
                collective: self.collective,
                rank: self.rank,
            },
        ))
    }
}

/// Second phase of the protocol, see [`MarkerPhase`]
pub struct LengthPhase<'a, C: Collective + ?Sized> {
    collective: &'a C,
    rank: usize,
}
impl<C: Collective + ?Sized> LengthPhase<'_, C> {
    /// Publishes this worker's serialized length and resolves every write offset
    pub fn exchange(self, len: u64) -> Result<WriteOffsetTable> {
        let lengths = self.collective.all_gather_lengths(self.rank, len)?;
        WriteOffsetTable::new(lengths)
    }
}

struct RoundState<T> {
    slots: Vec<Option<T>>,
    arrived: usize,
    aborted: bool,
}

/// A single all-gather round shared by in-process workers
struct Round<T> {
    state: Mutex<RoundState<T>>,
    ready: Condvar,
}
impl<T: Copy> Round<T> {
    fn new(size: usize) -> Self {
        Self {
            state: Mutex::new(RoundState {
                slots: vec![None; size],
                arrived: 0,
                aborted: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn contribute(&self, rank: usize, value: T) -> Result<Vec<T>> {
        let mut state = self.state.lock();
        let size = state.slots.len();
        if rank >= size {
            return Err(ExchangeError::RankOutOfRange { rank, size }.into());
        }
        if state.aborted {
            return Err(ExchangeError::Aborted.into());
        }
        if state.slots[rank].replace(value).is_some() {
            return Err(ExchangeError::DuplicateContribution(rank).into());
        }

        state.arrived += 1;
        if state.arrived == size {
            self.ready.notify_all();
        } else {
            while state.arrived < size && !state.aborted {
                self.ready.wait(&mut state);
            }
        }
        if state.arrived < size {
            return Err(ExchangeError::Aborted.into());
        }

        state
            .slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| slot.ok_or_else(|| Error::from(ExchangeError::MissingContribution(idx))))
            .collect()
    }

    fn abort(&self) {
        self.state.lock().aborted = true;
        self.ready.notify_all();
    }
}

/// [`Collective`] for workers running as threads of one process
///
/// Each round is a mutex-guarded slot vector released by a condition variable
/// once the last worker has contributed. One instance serves a single run.
pub struct ThreadCollective {
    size: usize,
    markers: Round<Marker>,
    lengths: Round<u64>,
}
impl ThreadCollective {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            markers: Round::new(size),
            lengths: Round::new(size),
        }
    }
}
impl Collective for ThreadCollective {
    fn size(&self) -> usize {
        self.size
    }

    fn all_gather_markers(&self, rank: usize, marker: Marker) -> Result<Vec<Marker>> {
        self.markers.contribute(rank, marker)
    }

    fn all_gather_lengths(&self, rank: usize, len: u64) -> Result<Vec<u64>> {
        self.lengths.contribute(rank, len)
    }

    fn abort(&self) {
        self.markers.abort();
        self.lengths.abort();
    }
}
