//! Modbus RTU bus discovery and slave address rewriting.
//!
//! The scanner probes every candidate unit address with a one-register
//! holding read and keeps the ones that answer. The rewriter moves a device
//! to a new address through a vendor holding register. Both go through a
//! [`MasterSession`], which keeps the latest command so replies that are just
//! the adapter echoing our own frame can be told apart.

pub mod cli;
pub mod config;
pub mod modbus;
pub mod output;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use modbus::{AddressRange, Command, ModbusTransport, Response, RtuTransport, UnitAddress};
pub use output::{ConsoleFormatter, JsonFormatter, ReportFormatter};
pub use services::{AddressRewriter, BusScanner, MasterSession, ScanResult};
pub use utils::error::{ChangeFailure, InputValidationError, ModbusError};
