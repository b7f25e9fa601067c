use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::error::InputValidationError;

/// Slave address on an RTU bus, always within `1..=247`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct UnitAddress(u8);

impl UnitAddress {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 247;

    pub fn new(value: u8) -> Result<Self, InputValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InputValidationError::OutOfRange(value as i64))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for UnitAddress {
    type Error = InputValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitAddress> for u8 {
    fn from(address: UnitAddress) -> Self {
        address.0
    }
}

impl FromStr for UnitAddress {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| InputValidationError::NotANumber(trimmed.to_string()))?;
        match u8::try_from(value) {
            Ok(v) => Self::new(v),
            Err(_) => Err(InputValidationError::OutOfRange(value)),
        }
    }
}

impl fmt::Display for UnitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive, ascending range of unit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    first: UnitAddress,
    last: UnitAddress,
}

impl AddressRange {
    pub fn new(first: UnitAddress, last: UnitAddress) -> Result<Self, InputValidationError> {
        if first > last {
            return Err(InputValidationError::EmptyRange {
                first: first.get(),
                last: last.get(),
            });
        }
        Ok(Self { first, last })
    }

    pub fn full() -> Self {
        Self {
            first: UnitAddress(UnitAddress::MIN),
            last: UnitAddress(UnitAddress::MAX),
        }
    }

    pub fn first(&self) -> UnitAddress {
        self.first
    }

    pub fn last(&self) -> UnitAddress {
        self.last
    }

    pub fn len(&self) -> usize {
        (self.last.0 - self.first.0) as usize + 1
    }

    /// A constructed range always holds at least one address.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = UnitAddress> {
        (self.first.0..=self.last.0).map(UnitAddress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    ReadHoldingRegisters,
    WriteSingleRegister,
}

impl FunctionKind {
    pub fn code(self) -> u8 {
        match self {
            FunctionKind::ReadHoldingRegisters => 0x03,
            FunctionKind::WriteSingleRegister => 0x06,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ReadHoldingRegisters { register: u16, count: u16 },
    WriteSingleRegister { register: u16, value: u16 },
}

/// One request addressed to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub unit: UnitAddress,
    pub request: Request,
}

impl Command {
    pub fn read_holding_registers(unit: UnitAddress, register: u16, count: u16) -> Self {
        Self {
            unit,
            request: Request::ReadHoldingRegisters { register, count },
        }
    }

    pub fn write_single_register(unit: UnitAddress, register: u16, value: u16) -> Self {
        Self {
            unit,
            request: Request::WriteSingleRegister { register, value },
        }
    }

    pub fn function(&self) -> FunctionKind {
        match self.request {
            Request::ReadHoldingRegisters { .. } => FunctionKind::ReadHoldingRegisters,
            Request::WriteSingleRegister { .. } => FunctionKind::WriteSingleRegister,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.request {
            Request::ReadHoldingRegisters { register, count } => write!(
                f,
                "ReadHoldingRegisters(addr=0x{:04X}, count={}, unit={})",
                register, count, self.unit
            ),
            Request::WriteSingleRegister { register, value } => write!(
                f,
                "WriteSingleRegister(addr=0x{:04X}, value={}, unit={})",
                register, value, self.unit
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Registers(Vec<u16>),
    Written { register: u16, value: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Other(u8),
}

impl ExceptionCode {
    pub fn code(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerDeviceBusy => 0x06,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetFailedToRespond => 0x0B,
            ExceptionCode::Other(code) => code,
        }
    }
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Other(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "gateway target failed to respond",
            ExceptionCode::Other(_) => "unknown exception",
        };
        write!(f, "{} (0x{:02X})", name, self.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFault {
    #[error("response timeout")]
    Timeout,

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("CRC mismatch: calculated 0x{expected:04X}, received 0x{received:04X}")]
    Crc { expected: u16, received: u16 },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("serial port is not open")]
    NotConnected,
}

/// Reply to one command, with the payload shape fixed at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok(Payload),
    ProtocolFault(ExceptionCode),
    TransportFault(TransportFault),
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    pub fn fault(&self) -> Option<FaultDetail> {
        match self {
            Response::Ok(_) => None,
            Response::ProtocolFault(code) => Some(FaultDetail::Protocol(*code)),
            Response::TransportFault(fault) => Some(FaultDetail::Transport(fault.clone())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaultDetail {
    #[error("exception response: {0}")]
    Protocol(ExceptionCode),

    #[error("transport fault: {0}")]
    Transport(TransportFault),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_address_bounds() {
        assert!(UnitAddress::new(0).is_err());
        assert!(UnitAddress::new(1).is_ok());
        assert!(UnitAddress::new(247).is_ok());
        assert_eq!(
            UnitAddress::new(248),
            Err(InputValidationError::OutOfRange(248))
        );
    }

    #[test]
    fn test_unit_address_from_str() {
        assert_eq!(" 17\n".parse::<UnitAddress>().unwrap().get(), 17);
        assert_eq!(
            "abc".parse::<UnitAddress>(),
            Err(InputValidationError::NotANumber("abc".to_string()))
        );
        assert_eq!(
            "300".parse::<UnitAddress>(),
            Err(InputValidationError::OutOfRange(300))
        );
        assert_eq!(
            "-4".parse::<UnitAddress>(),
            Err(InputValidationError::OutOfRange(-4))
        );
    }

    #[test]
    fn test_address_range_iterates_ascending() {
        let range =
            AddressRange::new(UnitAddress::new(3).unwrap(), UnitAddress::new(6).unwrap()).unwrap();
        let units: Vec<u8> = range.iter().map(UnitAddress::get).collect();
        assert_eq!(units, vec![3, 4, 5, 6]);
        assert_eq!(range.len(), 4);
        assert_eq!(AddressRange::full().len(), 247);
    }

    #[test]
    fn test_single_address_range_is_not_empty() {
        let unit = UnitAddress::new(7).unwrap();
        let range = AddressRange::new(unit, unit).unwrap();
        assert_eq!(range.len(), 1);
        assert!(!range.is_empty());
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![unit]);
    }

    #[test]
    fn test_address_range_rejects_inverted_bounds() {
        let result = AddressRange::new(UnitAddress::new(9).unwrap(), UnitAddress::new(2).unwrap());
        assert_eq!(result, Err(InputValidationError::EmptyRange { first: 9, last: 2 }));
    }

    #[test]
    fn test_exception_code_round_trip_for_unknown() {
        assert_eq!(ExceptionCode::from(0x02), ExceptionCode::IllegalDataAddress);
        assert_eq!(ExceptionCode::from(0x42).code(), 0x42);
    }

    #[test]
    fn test_command_display() {
        let cmd = Command::read_holding_registers(UnitAddress::new(5).unwrap(), 0, 1);
        assert_eq!(cmd.to_string(), "ReadHoldingRegisters(addr=0x0000, count=1, unit=5)");
        assert_eq!(cmd.function().code(), 0x03);
    }
}
