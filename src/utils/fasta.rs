//! Single-process FASTA translation
//!
//! This module streams a FASTA file record by record through a buffered reader,
//! translates each record and writes it with the same canonical layout as the
//! partitioned driver. It needs no read-ahead pad and no coordination, which
//! makes it the reference the partitioned output is checked against.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    time::Instant,
};

use log::info;

use crate::{
    config::RunConfig,
    core::{utils::trim_cr, ByteSegment, Record},
    error::Result,
    extract::HEADER_MARKER,
    parallel::{PhaseTimings, RunReport, WorkerReport},
    read::TERMINATOR,
    translate::{StandardTranslator, Translator},
    write::offset_len,
};

/// Streaming FASTA record reader
///
/// Sequence lines are collapsed into one sequence per record, with their
/// terminators (and any trailing `\r`) stripped. Empty lines are skipped.
/// Sequence lines found before the first header are returned as a single
/// [`Record::Fragment`].
pub struct FastaReader<R: BufRead> {
    inner: R,
    line: Vec<u8>,
    /// Header read while finishing the previous record
    pending: Option<Vec<u8>>,
    bytes_read: usize,
}
impl<R: BufRead> FastaReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
            pending: None,
            bytes_read: 0,
        }
    }

    /// Number of input bytes consumed so far
    #[must_use]
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Reads the next record, or `None` at the end of the input
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut current = self
            .pending
            .take()
            .map(|header| Record::Complete {
                header,
                sequence: Vec::new(),
            });

        loop {
            self.line.clear();
            let n = self.inner.read_until(TERMINATOR, &mut self.line)?;
            if n == 0 {
                return Ok(current);
            }
            self.bytes_read += n;

            let line = self.line.strip_suffix(&[TERMINATOR]).unwrap_or(&self.line);
            let line = trim_cr(line);
            if let Some(header) = line.strip_prefix(&[HEADER_MARKER]) {
                if current.is_some() {
                    self.pending = Some(header.to_vec());
                    return Ok(current);
                }
                current = Some(Record::complete(header, b""));
            } else if line.is_empty() {
                continue;
            } else if let Some(record) = current.as_mut() {
                record.sequence_mut().extend_from_slice(line);
            } else {
                current = Some(Record::fragment(line));
            }
        }
    }
}
impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<Record>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Streaming writer for the canonical output layout
///
/// Records are separated by exactly one blank line and the last record ends
/// with a single newline once [`FastaWriter::finish`] is called.
pub struct FastaWriter<W: Write> {
    inner: W,
    bytes_written: usize,
    num_records: usize,
}
impl<W: Write> FastaWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
            num_records: 0,
        }
    }

    pub fn push(&mut self, record: &Record) -> Result<()> {
        if self.num_records > 0 {
            self.write(b"\n\n")?;
        }
        if let Some(header) = record.header() {
            self.write(&[HEADER_MARKER])?;
            self.write(header)?;
            self.write(b"\n")?;
        }
        self.write(record.sequence())?;
        self.num_records += 1;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.bytes_written += buf.len();
        Ok(())
    }

    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Terminates the last record and flushes the inner writer
    pub fn finish(&mut self) -> Result<()> {
        if self.num_records > 0 {
            self.write(b"\n")?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Translates a whole file in the calling thread
///
/// # Example
///
/// ```rust,no_run
/// use seqtrans::{RunConfig, SequentialTranslator};
///
/// let config = RunConfig::builder("input.fa", "output.fa").build();
/// let report = SequentialTranslator::new(config).run()?;
/// println!("Translated {} records", report.num_records());
/// # Ok::<(), seqtrans::Error>(())
/// ```
pub struct SequentialTranslator<T: Translator = StandardTranslator> {
    config: RunConfig,
    translator: T,
}
impl SequentialTranslator<StandardTranslator> {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let translator = StandardTranslator::new(config.translation());
        Self { config, translator }
    }
}
impl<T: Translator> SequentialTranslator<T> {
    pub fn with_translator(config: RunConfig, translator: T) -> Self {
        Self { config, translator }
    }

    /// Reads, translates and writes every record of the input
    ///
    /// The report holds a single worker covering the whole input.
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate()?;

        let mut reader = FastaReader::new(BufReader::new(File::open(self.config.input())?));
        let mut writer = FastaWriter::new(BufWriter::new(File::create(self.config.output())?));
        info!("Translating {} sequentially", self.config.input().display());

        let mut timings = PhaseTimings::default();
        let mut num_complete = 0;
        let mut starts_with_fragment = false;
        loop {
            let started = Instant::now();
            let Some(mut record) = reader.next_record()? else {
                timings.read += started.elapsed();
                break;
            };
            timings.read += started.elapsed();
            if record.is_fragment() {
                starts_with_fragment = true;
            } else {
                num_complete += 1;
            }

            let started = Instant::now();
            self.translator.translate_sequence(record.sequence_mut());
            timings.compute += started.elapsed();

            let started = Instant::now();
            writer.push(&record)?;
            timings.write += started.elapsed();
        }

        let started = Instant::now();
        writer.finish()?;
        let writer_len = writer.bytes_written();
        writer.into_inner().get_ref().sync_data()?;
        timings.write += started.elapsed();
        let output_len = offset_len(writer_len)?;

        let input_len = reader.bytes_read();
        let report = RunReport {
            workers: vec![WorkerReport {
                id: 0,
                segment: ByteSegment::new(0, input_len, input_len),
                num_records: num_complete,
                starts_with_fragment,
                output_offset: 0,
                output_len,
                timings,
            }],
            output_len,
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
