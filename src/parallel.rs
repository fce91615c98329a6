//! Partitioned translation driver
//!
//! Every worker runs the same pipeline over its own slice of the shared input:
//!
//! 1. plan its nominal range and read it (plus the read-ahead pad)
//! 2. trim the range to line boundaries
//! 3. extract and translate its records
//! 4. assemble its output, resolve its write offset with the two collective
//!    rounds, and write its buffer at that offset
//!
//! Workers synchronize only inside the two collective rounds.

use std::{
    ops::{Add, AddAssign},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use log::{debug, error, info};

use crate::{
    config::RunConfig,
    core::{ByteSegment, WorkerPlan},
    error::{Error, Result},
    exchange::{Collective, Marker, MarkerPhase, ThreadCollective},
    extract::extract_records,
    read::SharedInput,
    reconcile::reconcile,
    translate::{StandardTranslator, Translator},
    write::{assemble, offset_len, SharedOutput},
};

/// Wall-clock time spent by a worker in each phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Reading, boundary reconciliation and record extraction
    pub read: Duration,
    /// Translation
    pub compute: Duration,
    /// Assembly, offset exchange and the positional write
    pub write: Duration,
}
impl PhaseTimings {
    #[must_use]
    pub fn total(&self) -> Duration {
        self.read + self.compute + self.write
    }

    /// Divides every phase by `n`, used to report the mean over workers
    #[must_use]
    pub fn mean(self, n: usize) -> Self {
        let n = u32::try_from(n.max(1)).unwrap_or(u32::MAX);
        Self {
            read: self.read / n,
            compute: self.compute / n,
            write: self.write / n,
        }
    }
}
impl Add for PhaseTimings {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            read: self.read + rhs.read,
            compute: self.compute + rhs.compute,
            write: self.write + rhs.write,
        }
    }
}
impl AddAssign for PhaseTimings {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The outcome of one worker's pipeline
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub id: usize,
    /// The corrected byte range the worker owned
    pub segment: ByteSegment,
    /// Records whose header this worker captured
    pub num_records: usize,
    /// Whether the first record continued a lower-id worker's record
    pub starts_with_fragment: bool,
    /// Absolute offset the worker wrote at
    pub output_offset: u64,
    /// Number of bytes the worker wrote
    pub output_len: u64,
    pub timings: PhaseTimings,
}

/// The outcome of a full run, reduced over every worker
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-worker reports ordered by id
    pub workers: Vec<WorkerReport>,
    /// Total length of the output file
    pub output_len: u64,
}
impl RunReport {
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Number of records in the output
    #[must_use]
    pub fn num_records(&self) -> usize {
        let complete: usize = self.workers.iter().map(|w| w.num_records).sum();
        // a fragment at the very start of the input has no header anywhere
        let orphan = self
            .workers
            .iter()
            .find(|w| w.num_records > 0 || w.starts_with_fragment)
            .is_some_and(|w| w.starts_with_fragment);
        complete + usize::from(orphan)
    }

    /// Per-phase timings summed over every worker
    #[must_use]
    pub fn summed_timings(&self) -> PhaseTimings {
        self.workers
            .iter()
            .fold(PhaseTimings::default(), |acc, w| acc + w.timings)
    }

    /// Per-phase timings averaged over every worker
    #[must_use]
    pub fn mean_timings(&self) -> PhaseTimings {
        self.summed_timings().mean(self.num_workers())
    }

    /// Logs the mean per-phase timings
    pub fn log_timings(&self) {
        let mean = self.mean_timings();
        info!("Final reading time: {:.6} seconds", mean.read.as_secs_f64());
        info!(
            "Final computation time: {:.6} seconds",
            mean.compute.as_secs_f64()
        );
        info!("Final writing time: {:.6} seconds", mean.write.as_secs_f64());
        info!("Final total time: {:.6} seconds", mean.total().as_secs_f64());
    }
}

/// One participant of a partitioned run
///
/// A worker only needs the shared input, the shared output, a [`Collective`]
/// and a [`Translator`], so it can be driven by threads (see
/// [`PartitionedTranslator`]) or by any other transport implementing
/// [`Collective`].
pub struct Worker<'a, C: Collective + ?Sized, T: Translator + ?Sized> {
    pub id: usize,
    pub input: &'a SharedInput,
    pub output: &'a SharedOutput,
    pub collective: &'a C,
    pub translator: &'a T,
    /// Read-ahead pad (maximum line length)
    pub pad: usize,
}
impl<C: Collective + ?Sized, T: Translator + ?Sized> Worker<'_, C, T> {
    /// Runs the full pipeline for this worker
    pub fn run(&self) -> Result<WorkerReport> {
        let id = self.id;
        let mut timings = PhaseTimings::default();

        // read
        let started = Instant::now();
        let plan = WorkerPlan::new(self.input.len(), self.collective.size(), id, self.pad)?;
        debug!(
            "Worker {id} is reading {} bytes at offset {}",
            plan.buffer_size, plan.nominal_offset
        );
        let mut raw = Vec::with_capacity(plan.buffer_size);
        self.input.read_segment(&plan, &mut raw)?;
        let segment = reconcile(&plan, &raw)?;
        let mut records = extract_records(&raw[segment.local_range(plan.nominal_offset)]);
        drop(raw);
        timings.read = started.elapsed();
        info!(
            "Worker {id} is done reading {} records and took {:.6} seconds",
            records.len(),
            timings.read.as_secs_f64()
        );

        // compute
        let started = Instant::now();
        self.translator.translate(&mut records);
        timings.compute = started.elapsed();
        info!(
            "Worker {id} is done with the computation and took {:.6} seconds",
            timings.compute.as_secs_f64()
        );

        // write
        let started = Instant::now();
        let marker = Marker::of(&records);
        let (successor, lengths) = MarkerPhase::new(self.collective, id).exchange(marker)?;
        let mut buffer = Vec::new();
        assemble(&records, successor, &mut buffer);
        let table = lengths.exchange(offset_len(buffer.len())?)?;
        let offset = table.offset(id);
        debug!(
            "Worker {id} writes {} bytes at offset {offset} of {}",
            buffer.len(),
            table.total_len()
        );
        if !buffer.is_empty() {
            self.output.write_at(offset, &buffer)?;
        }
        if table.owns_tail(id) {
            self.output.set_len(table.total_len())?;
        }
        timings.write = started.elapsed();
        info!(
            "Worker {id} has finished writing to the file and took {:.6} seconds",
            timings.write.as_secs_f64()
        );

        Ok(WorkerReport {
            id,
            segment,
            num_records: records.iter().filter(|r| !r.is_fragment()).count(),
            starts_with_fragment: marker == Marker::Fragment,
            output_offset: offset,
            output_len: table.len(id),
            timings,
        })
    }
}

/// Aborts the collective if the owning worker thread unwinds
struct AbortOnPanic<C: Collective>(Arc<C>);
impl<C: Collective> Drop for AbortOnPanic<C> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Translates one input file into one output file with a fixed set of worker threads
///
/// # Example
///
/// ```rust,no_run
/// use seqtrans::{PartitionedTranslator, RunConfig};
///
/// let config = RunConfig::builder("input.fa", "output.fa").workers(8).build();
/// let report = PartitionedTranslator::new(config).run()?;
/// println!("Translated {} records", report.num_records());
/// # Ok::<(), seqtrans::Error>(())
/// ```
pub struct PartitionedTranslator<T: Translator = StandardTranslator> {
    config: RunConfig,
    translator: Arc<T>,
}
impl PartitionedTranslator<StandardTranslator> {
    /// Creates a driver translating with the standard genetic code
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let translator = StandardTranslator::new(config.translation());
        Self::with_translator(config, translator)
    }
}
impl<T: Translator + 'static> PartitionedTranslator<T> {
    /// Creates a driver using a custom translator
    pub fn with_translator(config: RunConfig, translator: T) -> Self {
        Self {
            config,
            translator: Arc::new(translator),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every worker to completion
    ///
    /// The configuration is validated first, before any worker is spawned. Any
    /// worker failure aborts the run; the output may be left partially written.
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;

        let input = SharedInput::open(self.config.input())?;
        let output = SharedOutput::open(self.config.output())?;
        let num_workers = self.config.num_workers();
        let pad = self.config.max_line_length();
        let collective = Arc::new(ThreadCollective::new(num_workers));
        info!(
            "Translating {} bytes of {} with {num_workers} workers",
            input.len(),
            self.config.input().display()
        );

        // Build thread handles
        let mut handles = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let input = input.clone();
            let output = output.clone();
            let collective = collective.clone();
            let translator = self.translator.clone();

            let handle = thread::spawn(move || -> Result<WorkerReport> {
                let _guard = AbortOnPanic(collective.clone());
                let worker = Worker {
                    id,
                    input: &input,
                    output: &output,
                    collective: collective.as_ref(),
                    translator: translator.as_ref(),
                    pad,
                };
                worker.run().inspect_err(|e| {
                    if !e.is_aborted() {
                        error!("Worker {id} failed: {e}");
                    }
                    collective.abort();
                })
            });
            handles.push(handle);
        }

        let results: Vec<Result<WorkerReport>> = handles
            .into_iter()
            .enumerate()
            .map(|(id, handle)| handle.join().unwrap_or_else(|_| Err(Error::WorkerPanic(id))))
            .collect();
        let workers = collect_reports(results)?;

        output.sync()?;
        let report = RunReport {
            output_len: workers.iter().map(|w| w.output_len).sum(),
            workers,
        };
        info!(
            "Wrote {} records ({} bytes) to {}",
            report.num_records(),
            report.output_len,
            self.config.output().display()
        );
        report.log_timings();
        Ok(report)
    }
}

/// Gathers worker results, reporting the root cause of a failed run
///
/// Workers released from an aborted round only report the abort, so a
/// different error is preferred when one exists.
fn collect_reports(results: Vec<Result<WorkerReport>>) -> Result<Vec<WorkerReport>> {
    let mut reports = Vec::with_capacity(results.len());
    let mut failure: Option<Error> = None;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                let keep_previous = matches!(
                    &failure,
                    Some(previous) if !previous.is_aborted() || e.is_aborted()
                );
                if !keep_previous {
                    failure = Some(e);
                }
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{error::ExchangeError, translate::Strand};

    /// Leaves every sequence untouched
    struct Identity;
    impl Translator for Identity {
        fn translate_sequence(&self, _sequence: &mut Vec<u8>) {}
    }

    fn run_with<T: Translator + 'static>(
        input: &[u8],
        workers: usize,
        pad: usize,
        translator: T,
    ) -> (Result<RunReport>, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let ipath = dir.path().join("in.fa");
        let opath = dir.path().join("out.fa");
        fs::write(&ipath, input).unwrap();
        let config = RunConfig::builder(&ipath, &opath)
            .workers(workers)
            .max_line_length(pad)
            .build();
        let result = PartitionedTranslator::with_translator(config, translator).run();
        let output = fs::read(&opath).unwrap_or_default();
        (result, output)
    }

    const INPUT: &[u8] = b">one\nACGTACGTAC\n>two\nTTGACCATGA\n>three\nGGGCCCAAAT\n";

    #[test]
    fn test_identity_layout() {
        for workers in 1..=12 {
            let (result, output) = run_with(INPUT, workers, 16, Identity);
            let report = result.unwrap();
            assert_eq!(
                output,
                b">one\nACGTACGTAC\n\n>two\nTTGACCATGA\n\n>three\nGGGCCCAAAT\n",
                "workers: {workers}"
            );
            assert_eq!(report.num_workers(), workers);
            assert_eq!(report.num_records(), 3);
            assert_eq!(report.output_len, output.len() as u64);
        }
    }

    #[test]
    fn test_standard_translation() {
        let (result, output) = run_with(
            b">a\nATGAAATGG\n>b\nTTTTAA\n",
            2,
            16,
            StandardTranslator::default(),
        );
        result.unwrap();
        assert_eq!(output, b">a\nMKW\n\n>b\nF*\n");
    }

    #[test]
    fn test_reverse_strand_translation() {
        let translator = StandardTranslator::new(crate::TranslationConfig::new(
            crate::ReadingFrame::First,
            Strand::Reverse,
        ));
        let (result, output) = run_with(b">a\nCCATTTCAT\n", 3, 16, translator);
        result.unwrap();
        assert_eq!(output, b">a\nMKW\n");
    }

    #[test]
    fn test_offsets_follow_worker_order() {
        let (result, _) = run_with(INPUT, 4, 16, Identity);
        let report = result.unwrap();
        let mut expected = 0;
        for worker in &report.workers {
            assert_eq!(worker.output_offset, expected);
            expected += worker.output_len;
        }
        assert_eq!(expected, report.output_len);
    }

    #[test]
    fn test_empty_input() {
        let (result, output) = run_with(b"", 3, 16, Identity);
        let report = result.unwrap();
        assert!(output.is_empty());
        assert_eq!(report.num_records(), 0);
    }

    #[test]
    fn test_pad_too_small_aborts_run() {
        let input = b">a\nACGTACGTACGTACGTACGTACGTACGTACGT\n>b\nAC\n";
        let (result, _) = run_with(input, 4, 2, Identity);
        assert!(result.unwrap_err().is_pad_too_small());
    }

    #[test]
    fn test_panicking_translator_aborts_run() {
        struct Panics;
        impl Translator for Panics {
            fn translate_sequence(&self, sequence: &mut Vec<u8>) {
                assert!(!sequence.starts_with(b"TTGA"), "refusing to translate");
            }
        }
        let (result, _) = run_with(INPUT, 3, 16, Panics);
        assert!(matches!(result.unwrap_err(), Error::WorkerPanic(_)));
    }

    #[test]
    fn test_collect_reports_prefers_root_cause() {
        let results = vec![
            Err(ExchangeError::Aborted.into()),
            Err(crate::error::PlanError::ZeroWorkers.into()),
            Err(ExchangeError::Aborted.into()),
        ];
        let err = collect_reports(results).unwrap_err();
        assert!(matches!(err, Error::PlanError(_)));
    }

    #[test]
    fn test_timings() {
        let timings = PhaseTimings {
            read: Duration::from_millis(30),
            compute: Duration::from_millis(60),
            write: Duration::from_millis(90),
        };
        let summed = timings + timings + timings;
        assert_eq!(summed.mean(3), timings);
        assert_eq!(timings.total(), Duration::from_millis(180));
        assert_eq!(PhaseTimings::default().mean(0), PhaseTimings::default());
    }

    #[test]
    fn test_num_records_counts_leading_fragment() {
        let (result, output) = run_with(b"ACGT\n>a\nTT\n", 2, 16, Identity);
        let report = result.unwrap();
        assert_eq!(output, b"ACGT\n\n>a\nTT\n");
        assert_eq!(report.num_records(), 2);
    }
}
