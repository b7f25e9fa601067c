use thiserror::Error;

use crate::modbus::protocol::FaultDetail;

#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::CommunicationError(format!("IO error: {}", err))
    }
}

impl From<serialport::Error> for ModbusError {
    fn from(err: serialport::Error) -> Self {
        ModbusError::ConnectionError(err.to_string())
    }
}

/// Why an address change was not confirmed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeFailure {
    #[error("no genuine confirmation received (reply looked like an echo of the request)")]
    Inconclusive,

    #[error("device did not accept the new address: {0}")]
    ProtocolOrTransport(FaultDetail),
}

/// Malformed user-entered address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputValidationError {
    #[error("address {0} is outside the valid range 1-247")]
    OutOfRange(i64),

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("address range {first}..={last} is empty")]
    EmptyRange { first: u8, last: u8 },
}
