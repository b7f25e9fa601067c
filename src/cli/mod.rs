pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConnectionArgs, OutputFormat};
pub use commands::{load_config, run};
