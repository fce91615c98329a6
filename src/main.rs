use std::path::PathBuf;

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use env_logger::Env;
use log::info;
use seqtrans::{
    PartitionedTranslator, ReadingFrame, RunConfig, RunReport, SequentialTranslator, Strand,
    DEFAULT_MAX_LINE_LENGTH,
};

/// Translate a nucleotide FASTA file into an amino acid FASTA file
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input nucleotide FASTA path
    input: PathBuf,

    /// Output amino acid FASTA path (overwritten)
    output: PathBuf,

    /// Reading frame, the base codons start from [1, 2 or 3]
    #[clap(value_parser = clap::value_parser!(u8).range(1..=3))]
    frame: Option<u8>,

    /// Strand to translate [direct or reverse]
    strand: Option<Strand>,

    /// Workers to use [0: auto]
    #[clap(short = 'T', long, default_value_t = 0)]
    threads: usize,

    /// Maximum length of one input line, in bytes
    #[clap(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Translate in a single thread with a streaming reader
    #[clap(long)]
    sequential: bool,
}
impl Args {
    fn config(&self) -> Result<RunConfig> {
        let frame = match self.frame {
            Some(frame) => ReadingFrame::try_from(frame).map_err(anyhow::Error::msg)?,
            None => ReadingFrame::default(),
        };
        Ok(RunConfig::builder(&self.input, &self.output)
            .frame(frame)
            .strand(self.strand.unwrap_or_default())
            .workers(self.threads)
            .max_line_length(self.max_line_length)
            .build())
    }
}

/// Parses the command line, printing the usage on any argument error
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!("{}", e.render());
            // a usage error is not a failed run
            let _ = Args::command().print_help();
            std::process::exit(0);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = parse_args();
    let config = args.config()?;
    info!(
        "Reading frame {:?}, {} strand",
        config.translation().frame,
        config.translation().strand
    );

    let report: RunReport = if args.sequential {
        SequentialTranslator::new(config).run()?
    } else {
        PartitionedTranslator::new(config).run()?
    };
    info!(
        "Translated {} records with {} worker(s)",
        report.num_records(),
        report.num_workers()
    );
    Ok(())
}
