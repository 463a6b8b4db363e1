use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chunkfreq::config::CounterConfig;
use chunkfreq::serialization::{read_csv, to_json, write_csv};
use chunkfreq::{count_sequential, Counter, RankedEntry};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel chunked word-frequency counter", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count word frequencies in a file or stdin
    Count(CountArgs),
    /// Summarise a previously written record file
    Inspect(InspectArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Chunked pipeline with parallel workers
    Parallel,
    /// Single pass on the calling thread
    Sequential,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `word,frequency` records
    Csv,
    /// JSON array of entries
    Json,
}

#[derive(Args, Debug)]
struct CountArgs {
    /// Input file; stdin when omitted or `-`
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Chunk size in bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Number of worker threads
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Maximum number of chunk buffers in flight
    #[arg(long, value_name = "N")]
    pool_size: Option<usize>,

    /// Counting strategy
    #[arg(long, value_enum, default_value_t = Strategy::Parallel)]
    strategy: Strategy,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Only emit the N most frequent words
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Output path (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Record file to read
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Number of top entries to list
    #[arg(long, value_name = "N", default_value_t = 10)]
    top: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Count(args) => run_count(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = match i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=-2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis().filter_level(level);
    let _ = builder.try_init();
}

fn run_count(args: CountArgs) -> Result<()> {
    let mut builder = CounterConfig::builder();
    if let Some(chunk_size) = args.chunk_size {
        builder = builder.chunk_size(chunk_size);
    }
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    if let Some(pool_size) = args.pool_size {
        builder = builder.pool_size(pool_size);
    }
    let cfg = builder
        .log_chunks(log::log_enabled!(log::Level::Debug))
        .build()?;
    let tuned = args.chunk_size.is_some() || args.workers.is_some() || args.pool_size.is_some();
    if args.strategy == Strategy::Sequential && tuned {
        warn!("--chunk-size, --workers and --pool-size are ignored by the sequential strategy");
    }

    let input = open_input(args.input.as_deref())?;
    let label = input_label(args.input.as_deref());

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} counting words... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let start = Instant::now();
    let entries = match args.strategy {
        Strategy::Parallel => {
            let report = Counter::new(cfg)
                .count_reader(input)
                .with_context(|| format!("failed to count words in {label}"))?;
            debug!("run summary:\n{report}");
            report.entries
        }
        Strategy::Sequential => count_sequential(input)
            .with_context(|| format!("failed to count words in {label}"))?,
    };
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let distinct = entries.len();
    let total: u64 = entries.iter().map(|entry| entry.frequency).sum();
    let shown = match args.top {
        Some(top) => &entries[..top.min(entries.len())],
        None => &entries[..],
    };
    write_entries(shown, args.format, args.output.as_deref())?;

    info!(
        "{label}: {total} words, {distinct} distinct, strategy={:?}, duration={:.2?}",
        args.strategy,
        start.elapsed()
    );
    if let Some(path) = &args.output {
        info!("wrote {} entries to {}", shown.len(), path.display());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let entries =
        read_csv(file).with_context(|| format!("failed to parse {}", args.file.display()))?;

    let total: u64 = entries.iter().map(|entry| entry.frequency).sum();
    println!("File         : {}", args.file.display());
    println!("Distinct     : {}", entries.len());
    println!("Occurrences  : {total}");
    if entries.is_empty() {
        println!("Top words    : (none)");
        return Ok(());
    }
    println!("Top words    :");
    let mut ranked = entries;
    chunkfreq::rank::sort_ranked(&mut ranked);
    for entry in ranked.iter().take(args.top) {
        println!("  {:>10}  {}", entry.frequency, entry.word);
    }
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read + Send>> {
    match path {
        None => Ok(Box::new(io::stdin())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin())),
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
    }
}

fn input_label(path: Option<&Path>) -> String {
    match path {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "stdin".to_string(),
    }
}

fn write_entries(
    entries: &[RankedEntry],
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            write_csv(&mut buffer, entries)?;
            buffer
        }
        OutputFormat::Json => {
            let mut json = to_json(entries, true)?;
            json.push('\n');
            json.into_bytes()
        }
    };

    match output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            out.write_all(&rendered)
                .and_then(|()| out.flush())
                .map_err(|err| anyhow!("failed to write to stdout: {err}"))
        }
    }
}
