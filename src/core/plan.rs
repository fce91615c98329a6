use std::ops::Range;

use crate::error::{PlanError, Result};

/// A worker's nominal slice of the shared input
///
/// The plan is a pure function of the file size, the worker count, the worker
/// id, and the pad width, so every worker can compute the plan of any other
/// worker (and in particular the cut points it shares with its neighbours)
/// without communicating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPlan {
    /// Worker id (rank) in `0..total_workers`
    pub id: usize,

    /// Total number of workers taking part in the run
    pub total_workers: usize,

    /// Absolute offset of the first byte this worker reads
    pub nominal_offset: usize,

    /// Number of bytes this worker reads starting at `nominal_offset`
    pub buffer_size: usize,

    /// Size of the shared input in bytes
    pub file_size: usize,

    /// Nominal width of a worker's slice (`file_size / total_workers`)
    pub chunk: usize,

    /// Read-ahead margin past the nominal end (the maximum line length)
    pub pad: usize,
}
impl WorkerPlan {
    /// Computes the plan for worker `id` out of `total_workers`
    ///
    /// # Arguments
    ///
    /// * `file_size` - Size of the shared input in bytes
    /// * `total_workers` - Number of workers the input is split across
    /// * `id` - The worker to plan for
    /// * `pad` - Upper bound on a line length, read past the nominal end
    ///
    /// # Errors
    ///
    /// Returns an error if `total_workers` is zero or `id` is not a valid worker id.
    pub fn new(file_size: usize, total_workers: usize, id: usize, pad: usize) -> Result<Self> {
        if total_workers == 0 {
            return Err(PlanError::ZeroWorkers.into());
        }
        if id >= total_workers {
            return Err(PlanError::WorkerOutOfRange {
                id,
                total: total_workers,
            }
            .into());
        }

        let chunk = file_size / total_workers;
        let nominal_offset = chunk * id;
        let remaining = file_size - nominal_offset;
        let buffer_size = if total_workers == 1 || id == total_workers - 1 {
            // the last worker always reads through the end of the file
            remaining
        } else {
            chunk.saturating_add(scan_window(pad)).min(remaining)
        };

        Ok(Self {
            id,
            total_workers,
            nominal_offset,
            buffer_size,
            file_size,
            chunk,
            pad,
        })
    }

    /// Plans every worker of a run, ordered by id
    pub fn all(file_size: usize, total_workers: usize, pad: usize) -> Result<Vec<Self>> {
        (0..total_workers)
            .map(|id| Self::new(file_size, total_workers, id, pad))
            .collect()
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.total_workers == 1
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.id == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.id + 1 == self.total_workers
    }

    /// Absolute range of bytes this worker reads
    #[must_use]
    pub fn read_range(&self) -> Range<usize> {
        self.nominal_offset..self.nominal_offset + self.buffer_size
    }

    /// Number of bytes searched for the terminator closing the line at a cut point
    ///
    /// A line of exactly `pad` bytes starting on the cut has its terminator at
    /// `cut + pad`, so the window is `[cut, cut + pad]`.
    #[must_use]
    pub fn scan_window(&self) -> usize {
        scan_window(self.pad)
    }

    /// Nominal cut point between worker `k - 1` and worker `k`
    ///
    /// Cut points are only meaningful for `0 < k < total_workers`; the ends of
    /// the file are fixed at `0` and `file_size`.
    #[must_use]
    pub fn nominal_cut(&self, k: usize) -> usize {
        self.chunk * k
    }
}

fn scan_window(pad: usize) -> usize {
    pad.saturating_add(1)
}
