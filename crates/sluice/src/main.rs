//! Sluice
//!
//! Decodes DNS traffic from pcap captures and joins queries with their
//! responses.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use sluice::pipeline;
use sluice_config::Config;
use sluice_metrics::tracing_setup::{init_tracing, LogConfig};
use sluice_pcap::{Packet, PacketReader};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncWrite, BufWriter};

/// Sluice - DNS capture decoder and query/response joiner
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE", env = "SLUICE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode captures and write joined records as JSON lines
    Decode {
        /// Capture files (.pcap, .pcap.gz, .pcap.xz)
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Captures decoded at once (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write records here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file to check
        path: PathBuf,
    },

    /// Show a capture's header and decode counters without joining
    Inspect {
        /// Capture file
        file: PathBuf,
    },
}

/// Find the configuration file in standard locations
fn find_config_file(explicit_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path);
    }

    let search_paths = [
        PathBuf::from("./sluice.yaml"),
        PathBuf::from("./sluice.yml"),
        PathBuf::from("/etc/sluice/sluice.yaml"),
        dirs::config_dir()
            .map(|p| p.join("sluice/sluice.yaml"))
            .unwrap_or_default(),
    ];

    search_paths.into_iter().find(|path| path.exists())
}

fn load_config(explicit_path: Option<PathBuf>) -> Result<Config> {
    let config = match find_config_file(explicit_path) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Initialize logging/tracing subsystem
fn init_logging(config: &Config, cli_level: Option<&str>, cli_format: Option<&str>) -> Result<()> {
    let level = cli_level.unwrap_or(&config.logging.level);
    let format = cli_format.unwrap_or(&config.logging.format);
    let log_config = LogConfig::parse(level, format).map_err(anyhow::Error::msg)?;
    init_tracing(&log_config);
    Ok(())
}

async fn decode(config: Config, files: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let writer: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => {
            let file = tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(tokio::io::stdout())),
    };

    let summary = pipeline::run(files, Arc::new(config), writer).await?;

    let totals = sluice_metrics::metrics().snapshot();
    eprintln!(
        "{} {} files, {} records, {} frames, {} decode errors in {:.2}s",
        style("done:").green().bold(),
        summary.files.len(),
        summary.records,
        totals.decode.frames,
        totals.decode.errors(),
        summary.elapsed.as_secs_f64(),
    );
    for file in summary.files.iter().filter(|f| f.error.is_some()) {
        eprintln!(
            "  {} {}: {}",
            style("failed").red(),
            file.path.display(),
            file.error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn check_config(path: PathBuf) -> Result<()> {
    let config = Config::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    match config.validate() {
        Ok(()) => {
            println!("{} {}", style("valid:").green().bold(), path.display());
            println!();
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Err(e) => {
            println!("{} {}: {}", style("invalid:").red().bold(), path.display(), e);
            Err(e.into())
        }
    }
}

fn inspect(config: Config, file: PathBuf) -> Result<()> {
    let mut reader = PacketReader::open(&file, Arc::new(config.reader))
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let header = *reader.header();
    println!("{} {}", style("Capture:").cyan().bold(), file.display());
    println!("  {} {:?}", style("Byte order:").green(), header.byte_order);
    println!("  {} {:?}", style("Precision:").green(), header.precision);
    println!("  {} {}.{}", style("Version:").green(), header.version.0, header.version.1);
    match header.link() {
        Ok(link) => println!("  {} {}", style("Link type:").green(), link),
        Err(_) => println!(
            "  {} {} {}",
            style("Link type:").green(),
            header.link_type,
            style("(unsupported)").yellow()
        ),
    }
    println!("  {} {}", style("Snaplen:").green(), header.snaplen);

    let (mut dns, mut icmp, mut messages) = (0u64, 0u64, 0u64);
    for packet in reader.by_ref() {
        match packet? {
            Packet::Dns(p) => {
                dns += 1;
                messages += p.messages.len() as u64;
            }
            Packet::Icmp(_) => icmp += 1,
        }
    }

    println!();
    println!(
        "  {} {} DNS packets ({} messages), {} ICMP",
        style("Packets:").green(),
        dns,
        messages,
        icmp
    );
    let last = reader.last_timestamp();
    if last.secs > 0 {
        if let Some(at) = chrono::DateTime::from_timestamp(last.secs as i64, last.micros * 1000) {
            println!("  {} {}", style("Last frame:").green(), at.to_rfc3339());
        }
    }
    println!("  {}", style("Counters:").green());
    println!("{}", serde_json::to_string_pretty(reader.stats())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { path } => check_config(path),
        Commands::Decode {
            files,
            workers,
            output,
        } => {
            let mut config = load_config(cli.config)?;
            init_logging(&config, cli.log_level.as_deref(), cli.log_format.as_deref())?;
            if let Some(workers) = workers {
                config.pipeline.workers = workers;
            }
            decode(config, files, output).await
        }
        Commands::Inspect { file } => {
            let config = load_config(cli.config)?;
            init_logging(&config, cli.log_level.as_deref(), cli.log_format.as_deref())?;
            inspect(config, file)
        }
    }
}
