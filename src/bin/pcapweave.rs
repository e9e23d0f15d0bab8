//! CLI entry point. Three subcommands — `pcap2yaml`, `yaml2pcap`,
//! `process` — each taking optional input/output positional arguments
//! (`-` or omission means the standard stream; an omitted output is
//! derived from the input's extension).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use pcapweave::pipeline::Processor;
use pcapweave::processors::{CleanMac, FixChecksums, FixLengths, FixTcpStreams, MoveTimeline};
use pcapweave::{doc_to_pcap, pcap_to_doc};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pcapweave", about = "A round-trip codec and edit pipeline for pcapng captures")]
struct Cli {
    /// Raise the log level from `warn` to `info`.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Binary pcapng in, textual document out.
    Pcap2yaml {
        input_file: Option<PathBuf>,
        output_file: Option<PathBuf>,
    },
    /// Textual document in, binary pcapng out.
    Yaml2pcap {
        input_file: Option<PathBuf>,
        output_file: Option<PathBuf>,
    },
    /// Textual document in, textual document out, with processors applied
    /// in a fixed order regardless of flag order.
    Process {
        input_file: Option<PathBuf>,
        output_file: Option<PathBuf>,
        #[arg(long = "clean-mac")]
        clean_mac: bool,
        #[arg(long = "move-timeline", value_name = "ISO-8601 date")]
        move_timeline: Option<String>,
        #[arg(long = "fix-lengths")]
        fix_lengths: bool,
        #[arg(long = "fix-tcp-streams")]
        fix_tcp_streams: bool,
        #[arg(long = "fix-checksums")]
        fix_checksums: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { log::LevelFilter::Info } else { log::LevelFilter::Warn };
    env_logger::Builder::new().filter(None, log_level).init();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pcapweave: {err}");
            ExitCode::FAILURE
        }
    }
}

type CliError = Box<dyn std::error::Error>;

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Pcap2yaml { input_file, output_file } => {
            let output_file = output_file.or_else(|| {
                input_file.as_deref().map(|p| pcapweave::worker::derive_output_path(p, "yaml"))
            });
            let mut input = pcapweave::worker::open_input(input_file.as_deref())?;
            let mut output = pcapweave::worker::open_output(output_file.as_deref(), input_file.as_deref())?;
            pcap_to_doc(&mut input, &mut output)?;
        }
        Command::Yaml2pcap { input_file, output_file } => {
            let output_file = output_file.or_else(|| {
                input_file.as_deref().map(|p| pcapweave::worker::derive_output_path(p, "pcapng"))
            });
            let input = pcapweave::worker::open_input(input_file.as_deref())?;
            let mut output = pcapweave::worker::open_output(output_file.as_deref(), input_file.as_deref())?;
            doc_to_pcap(input, &mut output)?;
        }
        Command::Process {
            input_file,
            output_file,
            clean_mac,
            move_timeline,
            fix_lengths,
            fix_tcp_streams,
            fix_checksums,
        } => {
            let output_file = output_file.or_else(|| {
                input_file.as_deref().map(|p| pcapweave::worker::derive_output_path(p, "yaml"))
            });
            let mut processors: Vec<Box<dyn Processor>> = Vec::new();
            if clean_mac {
                processors.push(Box::new(CleanMac));
            }
            if let Some(date) = move_timeline {
                let target = parse_iso8601_date(&date)?;
                processors.push(Box::new(MoveTimeline::new(target)));
            }
            if fix_lengths {
                processors.push(Box::new(FixLengths));
            }
            if fix_tcp_streams {
                processors.push(Box::new(FixTcpStreams::default()));
            }
            if fix_checksums {
                processors.push(Box::new(FixChecksums));
            }

            let input = pcapweave::worker::open_input(input_file.as_deref())?;
            let output = pcapweave::worker::open_output(output_file.as_deref(), input_file.as_deref())?;
            run_pipeline(input, output, &mut processors)?;
        }
    }
    Ok(())
}

fn run_pipeline<R: BufRead, W: std::io::Write>(
    input: R,
    output: W,
    processors: &mut [Box<dyn Processor>],
) -> pcapweave::Result<()> {
    pcapweave::pipeline::run(input, output, processors)?;
    Ok(())
}

/// Parses the `--move-timeline` argument. Accepts a bare date
/// (`2018-01-01`) or a full RFC 3339 instant; a bare date is interpreted
/// as midnight UTC.
fn parse_iso8601_date(s: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("couldn't parse {s:?} as an ISO-8601 date"))?;
    Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
}
