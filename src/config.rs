use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::{
    error::{ConfigError, Result},
    translate::{ReadingFrame, Strand, TranslationConfig},
};

/// Default upper bound on the length of one input line, in bytes
///
/// This is the read-ahead pad each worker reads past its nominal end so that
/// the line crossing its cut point can be completed.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Configuration of a single translation run
#[derive(Debug, Clone)]
pub struct RunConfig {
    input: PathBuf,
    output: PathBuf,
    translation: TranslationConfig,
    workers: usize,
    max_line_length: usize,
}
impl RunConfig {
    /// Starts building a configuration for `input` and `output`
    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> RunConfigBuilder {
        RunConfigBuilder::new(input, output)
    }

    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    #[must_use]
    pub fn translation(&self) -> TranslationConfig {
        self.translation
    }

    #[must_use]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Number of workers to split the input across
    ///
    /// A configured value of 0 resolves to the number of available CPUs.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Checks the configuration once, before any worker is started
    ///
    /// The input must be a readable regular file and the output must be
    /// creatable. The output is created (and truncated) by this check. Input and
    /// output must not be the same file.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroMaxLineLength.into());
        }

        let input = File::open(&self.input).map_err(|source| ConfigError::UnreadableInput {
            path: self.input.clone(),
            source,
        })?;
        if !input.metadata()?.is_file() {
            return Err(ConfigError::IncompatibleInput(self.input.clone()).into());
        }

        // must run before the output is created, which would truncate the input
        if let (Ok(input), Ok(output)) = (
            fs::canonicalize(&self.input),
            fs::canonicalize(&self.output),
        ) {
            if input == output {
                return Err(ConfigError::SameInputOutput(input).into());
            }
        }

        File::create(&self.output).map_err(|source| ConfigError::UnwritableOutput {
            path: self.output.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Builder for creating [`RunConfig`] instances
///
/// # Example
///
/// ```rust
/// use seqtrans::{ReadingFrame, RunConfig, Strand};
///
/// let config = RunConfig::builder("input.fa", "output.fa")
///     .frame(ReadingFrame::Second)
///     .strand(Strand::Reverse)
///     .workers(4)
///     .build();
/// assert_eq!(config.num_workers(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    input: PathBuf,
    output: PathBuf,
    frame: ReadingFrame,
    strand: Strand,
    workers: usize,
    max_line_length: usize,
}
impl RunConfigBuilder {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            frame: ReadingFrame::default(),
            strand: Strand::default(),
            workers: 0, // 0 means use all available cores
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set the reading frame (default: first base)
    #[must_use]
    pub fn frame(mut self, frame: ReadingFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Set the strand to translate (default: direct)
    #[must_use]
    pub fn strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    /// Set the number of workers
    ///
    /// If not set or set to 0, uses all available CPU cores.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the maximum length of one input line, used as the read-ahead pad
    #[must_use]
    pub fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    #[must_use]
    pub fn build(self) -> RunConfig {
        RunConfig {
            input: self.input,
            output: self.output,
            translation: TranslationConfig::new(self.frame, self.strand),
            workers: self.workers,
            max_line_length: self.max_line_length,
        }
    }
}
