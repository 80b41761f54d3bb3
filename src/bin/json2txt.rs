//! json2txt: Extract one attribute of a JSON sidecar into a text file
//!
//! Usage:
//!   # Slice timing, one value per line with 8 decimals
//!   json2txt -i sub-01_task-rest_bold.json -o slicetiming.txt -key SliceTiming -f "%.8f"
//!
//!   # Scalar attribute
//!   json2txt -i sub-01_task-rest_bold.json -o tr.txt --key RepetitionTime --format "%.2f"
//!
//!   # Matrix attribute, tab-separated columns
//!   json2txt -i dwi.json -o grad.txt --key Grad -f "%.6f" -d "\t"

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser};
use json2txt::{convert, ConvertConfig};
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "json2txt")]
#[command(about = "Extract a JSON attribute into a formatted text file", long_about = None)]
struct Args {
    /// Path of the JSON file
    #[arg(short = 'i', long = "in_json", value_name = "PATH", allow_hyphen_values = true)]
    in_json: String,

    /// Path of the text file to write
    #[arg(short = 'o', long = "out", value_name = "PATH", allow_hyphen_values = true)]
    out: String,

    /// Top-level attribute to extract, e.g. SliceTiming (also accepted as -key)
    #[arg(long, value_name = "NAME", allow_hyphen_values = true)]
    key: String,

    /// printf-style format for each value, e.g. %.8f
    #[arg(short = 'f', long, value_name = "SPEC", allow_hyphen_values = true)]
    format: String,

    /// Separator between the columns of a matrix attribute
    #[arg(short = 'd', long, default_value = " ", value_name = "STR", allow_hyphen_values = true)]
    delimiter: String,

    /// Log progress to stderr (repeat for more detail)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() == 1 {
        // Help goes to stdout; a bare invocation is still a failure
        let _ = Args::command().print_help();
        return ExitCode::from(1);
    }

    let args = Args::parse_from(normalize_flags(argv));
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<()> {
    println!("+>> Extract {} Info", args.key);
    println!("{}", args.in_json);

    let config = ConvertConfig::new(args.in_json, args.out, args.key, args.format)
        .with_delimiter(unescape(&args.delimiter));
    let lines = convert(&config)?;
    tracing::info!(lines, output = %config.output.display(), "done");

    Ok(())
}

/// Options whose next argument is their value
const VALUE_OPTIONS: &[&str] = &[
    "-i", "--in_json", "-o", "--out", "--key", "-f", "--format", "-d", "--delimiter",
];

/// Accept the single-dash long form `-key` alongside `--key`.
/// Only tokens in option position are rewritten: values of other options
/// and everything after `--` pass through untouched.
fn normalize_flags(argv: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut is_value = false;
    let mut passthrough = false;

    for (index, arg) in argv.into_iter().enumerate() {
        if index == 0 || passthrough || is_value {
            is_value = false;
            out.push(arg);
            continue;
        }

        if arg == "--" {
            passthrough = true;
            out.push(arg);
        } else if arg == "-key" {
            is_value = true;
            out.push("--key".to_string());
        } else if let Some(value) = arg.strip_prefix("-key=") {
            out.push(format!("--key={}", value));
        } else {
            is_value = VALUE_OPTIONS.contains(&arg.as_str());
            out.push(arg);
        }
    }
    out
}

/// Shell users type `\t` for a tab delimiter
fn unescape(delimiter: &str) -> String {
    delimiter.replace("\\t", "\t").replace("\\n", "\n")
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
