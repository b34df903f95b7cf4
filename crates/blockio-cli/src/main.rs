//! blockio operator CLI.
//!
//! Inspect installed devices and move files through the active one.
//!
//! # Quick Start
//!
//! ```bash
//! # What can be loaded?
//! blockio plugins
//!
//! # Write 64 MiB through the posix device and read it back, validated
//! blockio write ./scratch.bin --size 64M --async --validate
//! blockio read ./scratch.bin --validate
//! ```

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use blockio::ElementType;
use clap::{Parser, Subcommand, ValueEnum};

/// blockio - backend-agnostic block I/O with runtime-loadable devices.
#[derive(Parser)]
#[command(name = "blockio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding blockio.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Device type to load instead of the configured default.
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// List builtin and installed device types.
    Plugins,

    /// Load a device and show its configuration.
    Info,

    /// Write a patterned buffer to a file.
    Write {
        /// Destination file.
        file: PathBuf,

        /// Size in bytes; accepts K, M and G suffixes.
        #[arg(short, long, value_parser = commands::io::parse_size)]
        size: u64,

        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Read a whole file into a buffer.
    Read {
        /// Source file.
        file: PathBuf,

        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct TransferArgs {
    /// Element type of the buffer.
    #[arg(short, long, default_value = "u8")]
    element_type: ElementType,

    /// Check file contents against the buffer after the transfer.
    #[arg(long)]
    validate: bool,

    /// Submit asynchronously, then wait.
    #[arg(long = "async")]
    asynchronous: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration.
    Show {
        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Toml,
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.no_color);
    let target = commands::Target {
        project: cli.project,
        device: cli.device,
    };

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Plugins => commands::plugins::run(&target),
        Commands::Info => commands::info::run(&target),
        Commands::Write {
            file,
            size,
            transfer,
        } => commands::io::write(&target, &file, size, &transfer.into()),
        Commands::Read { file, transfer } => commands::io::read(&target, &file, &transfer.into()),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&target, format.into()),
        },
    }
}

impl From<TransferArgs> for commands::io::TransferOptions {
    fn from(args: TransferArgs) -> Self {
        Self {
            element_type: args.element_type,
            validate: args.validate,
            asynchronous: args.asynchronous,
        }
    }
}

impl From<OutputFormat> for commands::config::Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
            OutputFormat::Toml => Self::Toml,
        }
    }
}
