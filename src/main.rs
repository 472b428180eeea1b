use anyhow::Context;
use clap::Parser;
use is_terminal::IsTerminal;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use sertap::{serial, FieldExtractor, MonitorConfig, StreamMonitor};

#[derive(Parser)]
#[command(name = "sertap")]
#[command(about = "Tap a serial byte stream, extracting <field=value> tokens into a TSV log")]
#[command(version)]
struct Args {
    /// UART device
    #[arg(short = 'd', long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// UART baudrate
    #[arg(short = 'b', long, default_value_t = serial::DEFAULT_BAUD_RATE)]
    baudrate: u32,

    /// Show hex dump instead of plain output
    #[arg(long)]
    hex: bool,

    /// File for fieldname tracking
    #[arg(short = 'f', long, default_value = "__fields.txt")]
    fields: PathBuf,

    /// File for statistics on fields
    #[arg(short = 's', long, default_value = "__stats.csv")]
    statfile: PathBuf,

    /// Read from a capture file instead of a serial device ("-" for stdin)
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Serial read timeout in seconds
    #[arg(long, default_value_t = serial::DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Maximum token length between < and >
    #[arg(long, default_value = "65536")]
    max_token_length: usize,

    /// Debug mode - show run statistics
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if self.fields == self.statfile {
            return Err("Fields file and statfile must differ".to_string());
        }
        if self.timeout == 0 {
            return Err("Timeout must be at least 1 second".to_string());
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let extractor = FieldExtractor::new(&args.fields, &args.statfile).with_context(|| {
        format!("Failed to load fields file '{}'", args.fields.display())
    })?;

    let config = MonitorConfig {
        hex: args.hex,
        flush_every_byte: io::stdout().is_terminal(),
        max_token_length: args.max_token_length,
    };
    let mut monitor = StreamMonitor::new(extractor, config);

    // Set up input: capture file, stdin, or the serial device
    let input: Box<dyn Read> = match &args.input_file {
        Some(path) if path.as_os_str() == "-" => Box::new(io::stdin()),
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => {
            eprintln!("sertap: connecting to '{}'", args.device);
            let port = serial::open(
                &args.device,
                args.baudrate,
                Duration::from_secs(args.timeout),
            )
            .with_context(|| format!("Failed to open serial device '{}'", args.device))?;
            Box::new(port)
        }
    };

    let mut output = io::stdout().lock();
    let stats = monitor.run(input, &mut output)?;
    output.flush()?;

    if args.debug {
        eprintln!("Final statistics:");
        eprintln!("  Bytes read: {}", stats.bytes_read);
        eprintln!("  Tokens seen: {}", stats.tokens_seen);
        eprintln!("  Tokens dropped: {}", stats.tokens_dropped);
        eprintln!("  Fields discovered: {}", stats.fields_discovered);
        eprintln!("  Rows written: {}", stats.rows_written);
    }

    Ok(())
}
