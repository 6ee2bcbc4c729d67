//! orx-sort - sort lines through the ORX array engine
//!
//! Reads lines into a managed Array, sorts them with the array's quicksort
//! or merge sort and prints the result with the array's `toString`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use orx_collections::{ObjRef, Object, ObjectSpace, Runtime, SpaceConfig};
use std::cmp::Ordering;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Sort lines of text using the ORX array engine
#[derive(Parser, Debug)]
#[command(name = "orx-sort")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file (standard input when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Keep lines that compare equal in their input order
    #[arg(short, long)]
    stable: bool,

    /// Compare lines as numbers
    #[arg(short, long, conflicts_with = "caseless")]
    numeric: bool,

    /// Reverse the order
    #[arg(short, long)]
    reverse: bool,

    /// Ignore case when comparing
    #[arg(short = 'i', long)]
    caseless: bool,

    /// Separator placed between output lines
    #[arg(long, value_name = "TEXT")]
    separator: Option<String>,

    /// Join output with no default separator
    #[arg(short, long)]
    char: bool,

    /// Runtime configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// How two lines compare.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Order {
    Natural,
    Numeric,
    Caseless,
}

impl Order {
    fn compare(self, a: &str, b: &str) -> Option<Ordering> {
        match self {
            Order::Natural => Some(a.cmp(b)),
            Order::Caseless => Some(a.to_lowercase().cmp(&b.to_lowercase())),
            Order::Numeric => parse_number(a)?.partial_cmp(&parse_number(b)?),
        }
    }
}

/// A finite number, or `None`.
fn parse_number(line: &str) -> Option<f64> {
    line.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => SpaceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SpaceConfig::default(),
    };
    let input = read_input(cli.file.as_ref())?;

    let order = if cli.numeric {
        Order::Numeric
    } else if cli.caseless {
        Order::Caseless
    } else {
        Order::Natural
    };
    if order == Order::Numeric {
        for (n, line) in input.lines().enumerate() {
            if parse_number(line).is_none() {
                bail!("line {} is not a number: {:?}", n + 1, line);
            }
        }
    }

    let runtime = Runtime::new(config);
    let output = runtime.with_space(|space| sort_lines(space, &input, order, &cli))?;
    if !output.is_empty() {
        println!("{output}");
    }

    let stats = runtime.lock().stats();
    debug!(
        minor = stats.minor_collections,
        major = stats.major_collections,
        "collector statistics"
    );
    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read standard input")?;
            Ok(input)
        }
    }
}

fn sort_lines(space: &mut ObjectSpace, input: &str, order: Order, cli: &Cli) -> Result<String> {
    let array = space.new_array(0)?;
    space.root(array);
    for line in input.lines() {
        let value = space.new_string(line)?;
        space.array_append(array, value)?;
        if space.should_collect() {
            space.collect_minor();
        }
    }
    info!(lines = space.array_items(array)?, "input loaded");

    if order == Order::Natural && !cli.reverse {
        if cli.stable {
            space.array_stable_sort(array)?;
        } else {
            space.array_sort(array)?;
        }
    } else {
        let reverse = cli.reverse;
        let mut comparator = move |space: &ObjectSpace, a: ObjRef, b: ObjRef| -> Option<Object> {
            let a = space.string_value(a).ok()?;
            let b = space.string_value(b).ok()?;
            let ordering = order.compare(&a, &b)?;
            let ordering = if reverse { ordering.reverse() } else { ordering };
            let result = match ordering {
                Ordering::Less => "-1",
                Ordering::Equal => "0",
                Ordering::Greater => "1",
            };
            Some(Object::String(result.to_string()))
        };
        if cli.stable {
            space.array_stable_sort_with(array, &mut comparator)?;
        } else {
            space.array_sort_with(array, &mut comparator)?;
        }
    }

    let policy = if cli.char { "C" } else { "L" };
    let text = space.array_to_string(array, Some(policy), cli.separator.as_deref())?;
    space.unroot(array);
    Ok(text)
}
