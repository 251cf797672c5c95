//! hiconf command-line tool for merging and querying layered configuration.
//!
//! Usage: hiconf [-v...] <COMMAND>
//!
//! Commands:
//!   merge <FILES>...          Merge sources in order and print the result
//!   get <KEY> <FILES>...      Print one value from the merged configuration
//!   diff <BASE> <OTHER>       Print what OTHER changes relative to BASE
//!   flatten <FILES>...        Print every leaf of the merge as path=value
//!   check <FILES>...          Parse each source and report errors
//!
//! Sources are read by extension: .conf/.properties, .yml/.yaml, .json,
//! .cfg/.xml. Missing sources are skipped unless --strict is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use libhiconf::{
    diff, merge_sources, parse_file, remove_empty, HierarchicKey, MergeOptions, Node,
};
use tracing::info;

mod transcode;

use transcode::OutputFormat;

#[derive(Parser)]
#[command(name = "hiconf", version, about = "Merge and query layered configuration files")]
struct Cli {
    /// Log more (-v for debug, -vv for trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge sources in order and print the effective configuration
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        merge: MergeArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Strip null, empty strings and empty containers from the result
        #[arg(long)]
        prune: bool,
    },
    /// Print the value at KEY in the merged configuration
    Get {
        /// Path such as `global.ratio` or `snes.game["x"].ratio`
        key: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Printed when KEY is absent instead of failing
        #[arg(long)]
        default: Option<String>,
        #[command(flatten)]
        merge: MergeArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the keys of OTHER that differ from BASE
    Diff {
        base: PathBuf,
        other: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print every leaf of the merged configuration as path=value
    Flatten {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        merge: MergeArgs,
    },
    /// Parse each source and report the ones that fail
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Fail when a source file does not exist
    #[arg(long)]
    strict: bool,
    /// Keep empty maps in updates instead of treating them as deletions
    #[arg(long)]
    keep_empty: bool,
}

impl MergeArgs {
    fn options(&self) -> MergeOptions {
        MergeOptions {
            keep_empty: self.keep_empty,
            strict_missing: self.strict,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output format
    #[arg(short = 't', long = "to", value_enum, default_value_t = OutputFormat::Json)]
    to: OutputFormat,
    /// Write output to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Merge {
            files,
            merge,
            output,
            prune,
        } => {
            let mut merged = load(&files, &merge)?;
            if prune {
                merged = remove_empty(&merged).unwrap_or_else(Node::map);
            }
            output_node(&merged, &output)
        }
        Command::Get {
            key,
            files,
            default,
            merge,
            output,
        } => {
            let merged = load(&files, &merge)?;
            let key = HierarchicKey::parse(&key);
            match (merged.get(&key), default) {
                (Ok(Node::Scalar(scalar)), _) => {
                    write_text_output(&scalar.value.to_string(), output.output.as_deref())
                }
                (Ok(node), _) => output_node(node, &output),
                (Err(_), Some(default)) => {
                    write_text_output(&default, output.output.as_deref())
                }
                (Err(e), None) => Err(e.into()),
            }
        }
        Command::Diff {
            base,
            other,
            output,
        } => {
            let base = parse_file(&base).with_context(|| format!("loading {}", base.display()))?;
            let other =
                parse_file(&other).with_context(|| format!("loading {}", other.display()))?;
            let changes = diff(&base, &other).unwrap_or_else(Node::map);
            output_node(&changes, &output)
        }
        Command::Flatten { files, merge } => {
            let merged = load(&files, &merge)?;
            write_text_output(&transcode::conf::encode(&merged), None)
        }
        Command::Check { files } => check(&files),
    }
}

fn load(files: &[PathBuf], merge: &MergeArgs) -> Result<Node> {
    let merged = merge_sources(files, &merge.options())?;
    info!(sources = files.len(), "merged configuration");
    Ok(merged)
}

fn check(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for file in files {
        match parse_file(file) {
            Ok(node) => {
                let leaves = node.leaf_paths().count();
                println!("ok    {} ({} leaves)", file.display(), leaves);
            }
            Err(e) => {
                failed += 1;
                println!("error {}: {}", file.display(), e);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} sources failed to parse", failed, files.len());
    }
    Ok(())
}

fn output_node(node: &Node, output: &OutputArgs) -> Result<()> {
    let text = transcode::encode(node, output.to).map_err(|e| anyhow!(e))?;
    write_text_output(&text, output.output.as_deref())
}

fn write_text_output(output: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        fs::write(path, output).with_context(|| format!("writing {}", path.display()))?;
    } else {
        print!("{}", output);
        // Ensure output ends with newline
        if !output.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
