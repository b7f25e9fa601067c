pub mod client;
pub mod codec;
pub mod crc;
pub mod echo;
pub mod protocol;
pub mod tracker;

#[cfg(test)]
pub mod testing;

pub use client::{list_ports, ModbusTransport, RtuTransport};
pub use crc::crc16_modbus;
pub use echo::{EchoClassifier, EchoPolicy};
pub use protocol::{
    AddressRange, Command, ExceptionCode, FaultDetail, FunctionKind, Payload, Request, Response,
    TransportFault, UnitAddress,
};
pub use tracker::CommandTracker;
