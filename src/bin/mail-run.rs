//! CLI tool to run a mail pipeline against a file of records.
//!
//! Usage:
//!   mail-run [input] --from <sender> --copy-to <recipient>
//!   mail-run [input] -p <pipeline.pipe> [-o output]
//!
//! Input defaults to stdin, output to stdout.

use clap::Parser;
use mailpipe::{Pipeline, PipelineBuilder, Record, RunSummary, compile, parse_commands};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run sender/recipient/body records through a filter/copy/send chain.
///
/// The chain is either described by a pipeline file or assembled from
/// --from and --copy-to: keep mail from the given senders, then copy it
/// to each recipient in turn.
#[derive(Parser)]
#[command(name = "mail-run")]
struct Cli {
    /// Input file of three-line records (`-` for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Pipeline definition file (.pipe)
    #[arg(short, long, conflicts_with_all = ["from", "copy_to"])]
    pipeline: Option<String>,

    /// Keep only records from this sender (repeatable)
    #[arg(long, value_name = "SENDER")]
    from: Vec<String>,

    /// Also deliver every record to this recipient (repeatable)
    #[arg(long, value_name = "RECIPIENT")]
    copy_to: Vec<String>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Log stages and record flow on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            info!(
                records = summary.records_read,
                trailing_lines_dropped = summary.trailing_lines_dropped,
                "run complete"
            );
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<RunSummary, String> {
    let input = open_input(&cli.input)?;
    let output = open_output(cli.output.as_deref())?;

    info!(input = %cli.input, output = cli.output.as_deref().unwrap_or("(stdout)"));

    let mut pipeline = match &cli.pipeline {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Error reading pipeline file '{path}': {e}"))?;
            let commands = parse_commands(&text).map_err(|e| format!("Pipeline error: {e}"))?;
            compile(&commands, input, output).map_err(|e| format!("Pipeline error: {e}"))?
        }
        None => from_flags(cli, input, output),
    };

    info!(stages = ?pipeline.stage_names(), "pipeline ready");

    pipeline.run().map_err(|e| format!("Pipeline error: {e}"))
}

/// READ -> FILTER (if --from) -> COPY per --copy-to -> SEND.
fn from_flags(
    cli: &Cli,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
) -> Pipeline<'static, Box<dyn BufRead>> {
    let mut builder = PipelineBuilder::new(input);
    if !cli.from.is_empty() {
        let senders = cli.from.clone();
        builder.filter_by(move |r: &Record| senders.iter().any(|s| s == r.sender()));
    }
    for recipient in &cli.copy_to {
        builder.copy_to(recipient.as_str());
    }
    builder.send(output);
    builder.build()
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, String> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|e| format!("Error reading input file '{path}': {e}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&str>) -> Result<Box<dyn Write>, String> {
    let Some(out_path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    if let Some(parent) = Path::new(out_path).parent()
        && !parent.as_os_str().is_empty()
        && fs::create_dir_all(parent).is_err()
    {
        return Err(format!("Error creating output directory for '{out_path}'"));
    }
    let file =
        File::create(out_path).map_err(|e| format!("Error writing output file '{out_path}': {e}"))?;
    Ok(Box::new(BufWriter::new(file)))
}
