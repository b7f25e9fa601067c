use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ParityConfig;
use crate::modbus::UnitAddress;

#[derive(Debug, Parser)]
#[command(
    name = "rtu-addr",
    version,
    about = "Find Modbus RTU slaves on a serial bus and change their addresses"
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Console, global = true)]
    pub format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Without a subcommand: scan the whole bus, then prompt for an address change
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ConnectionArgs {
    /// Serial port, e.g. /dev/ttyUSB0 or COM10
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    #[arg(long, value_enum, global = true)]
    pub parity: Option<ParityConfig>,

    /// Reply timeout per request
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Probe each address once and list the ones that answer
    Scan {
        #[arg(long)]
        first: Option<UnitAddress>,
        #[arg(long)]
        last: Option<UnitAddress>,
    },
    /// Write a new slave address into a device
    Change {
        #[arg(long)]
        current: UnitAddress,
        #[arg(long)]
        new: UnitAddress,
    },
    /// List serial ports
    Ports,
    /// Write a default configuration file
    InitConfig { path: PathBuf },
}
