pub mod settings;

pub use settings::{Config, ParityConfig, RewriteConfig, ScanConfig, SerialConfig};
