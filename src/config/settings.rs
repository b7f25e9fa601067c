use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::args::ConnectionArgs;
use crate::modbus::{AddressRange, EchoPolicy, UnitAddress};
use crate::services::DEFAULT_ADDRESS_REGISTER;
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub scan: ScanConfig,
    pub rewrite: RewriteConfig,
    pub echo: EchoPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub parity: ParityConfig,
    pub stop_bits: u8,
    pub data_bits: u8,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub first_address: UnitAddress,
    pub last_address: UnitAddress,
    pub probe_register: u16,
    pub probe_count: u16,
    pub inter_probe_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub address_register: u16,
}

fn default_port() -> &'static str {
    if cfg!(target_os = "windows") {
        "COM1"
    } else if cfg!(target_os = "macos") {
        "/dev/tty.usbserial-0001"
    } else {
        "/dev/ttyUSB0"
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            parity: ParityConfig::None,
            stop_bits: 1,
            data_bits: 8,
            timeout_ms: 1000,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        let full = AddressRange::full();
        Self {
            first_address: full.first(),
            last_address: full.last(),
            probe_register: 0,
            probe_count: 1,
            inter_probe_delay_ms: 0,
        }
    }
}

impl ScanConfig {
    pub fn range(&self) -> Result<AddressRange, ModbusError> {
        AddressRange::new(self.first_address, self.last_address)
            .map_err(|e| ModbusError::ConfigError(format!("scan range: {}", e)))
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            address_register: DEFAULT_ADDRESS_REGISTER,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        let path = path.as_ref();
        debug!("📄 Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ModbusError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string(self)
            .map_err(|e| ModbusError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&path, content)?;
        info!("💾 Configuration written to {}", path.as_ref().display());
        Ok(())
    }

    /// Command-line values win over the file.
    pub fn apply_overrides(&mut self, args: &ConnectionArgs) {
        if let Some(port) = &args.port {
            self.serial.port = port.clone();
        }
        if let Some(baud) = args.baud {
            self.serial.baud_rate = baud;
        }
        if let Some(parity) = args.parity {
            self.serial.parity = parity;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.serial.timeout_ms = timeout_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ModbusError::ConfigError(format!(
                "data_bits must be 5-8, got {}",
                self.serial.data_bits
            )));
        }
        if !matches!(self.serial.stop_bits, 1 | 2) {
            return Err(ModbusError::ConfigError(format!(
                "stop_bits must be 1 or 2, got {}",
                self.serial.stop_bits
            )));
        }
        if self.serial.baud_rate == 0 {
            return Err(ModbusError::ConfigError("baud_rate must be positive".to_string()));
        }
        // 125 registers is the 0x03 limit
        if !(1..=125).contains(&self.scan.probe_count) {
            return Err(ModbusError::ConfigError(format!(
                "probe_count must be 1-125, got {}",
                self.scan.probe_count
            )));
        }
        self.scan.range()?;
        Ok(())
    }
}
