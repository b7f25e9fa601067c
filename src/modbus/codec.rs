//! RTU framing for the two function codes this tool speaks.
//!
//! Request ADU: `[unit, fc, hi, lo, hi, lo, crc_lo, crc_hi]`.
//! Replies are decoded against the command that produced them, so the payload
//! shape is fixed here and never guessed later.

use bytes::{BufMut, BytesMut};

use super::crc::{crc16_modbus, frame_crc};
use super::protocol::{Command, ExceptionCode, Payload, Request, Response, TransportFault};

pub const EXCEPTION_FLAG: u8 = 0x80;
pub const EXCEPTION_FRAME_LEN: usize = 5;
pub const WRITE_REPLY_LEN: usize = 8;
/// Largest RTU ADU on the wire.
pub const MAX_FRAME_LEN: usize = 256;

pub fn encode(command: &Command) -> Vec<u8> {
    let (first, second) = match command.request {
        Request::ReadHoldingRegisters { register, count } => (register, count),
        Request::WriteSingleRegister { register, value } => (register, value),
    };

    let mut frame = BytesMut::with_capacity(8);
    frame.put_u8(command.unit.get());
    frame.put_u8(command.function().code());
    frame.put_u16(first);
    frame.put_u16(second);
    let crc = crc16_modbus(&frame);
    frame.put_u16_le(crc);
    frame.to_vec()
}

/// Length of the full reply frame once enough of its header has arrived.
pub fn expected_len(command: &Command, header: &[u8]) -> Option<usize> {
    let function = *header.get(1)?;
    if function & EXCEPTION_FLAG != 0 {
        return Some(EXCEPTION_FRAME_LEN);
    }
    match command.request {
        Request::ReadHoldingRegisters { .. } => header.get(2).map(|&count| 5 + count as usize),
        Request::WriteSingleRegister { .. } => Some(WRITE_REPLY_LEN),
    }
}

pub fn decode(command: &Command, frame: &[u8]) -> Response {
    if frame.len() < EXCEPTION_FRAME_LEN {
        return malformed(format!("frame too short: {} bytes", frame.len()));
    }

    if let Some((expected, received)) = frame_crc(frame) {
        if expected != received {
            return Response::TransportFault(TransportFault::Crc { expected, received });
        }
    }

    let body = &frame[..frame.len() - 2];
    if body[0] != command.unit.get() {
        return malformed(format!(
            "reply from unit {} while waiting for unit {}",
            body[0], command.unit
        ));
    }

    let function = command.function().code();
    if body[1] == function | EXCEPTION_FLAG {
        return Response::ProtocolFault(ExceptionCode::from(body[2]));
    }
    if body[1] != function {
        return malformed(format!(
            "unexpected function code 0x{:02X}, expected 0x{:02X}",
            body[1], function
        ));
    }

    match command.request {
        Request::ReadHoldingRegisters { count, .. } => {
            let byte_count = body[2] as usize;
            let data = &body[3..];
            if data.len() != byte_count || byte_count != count as usize * 2 {
                return malformed(format!(
                    "byte count {} does not match {} requested registers",
                    byte_count, count
                ));
            }
            let registers = data
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Response::Ok(Payload::Registers(registers))
        }
        Request::WriteSingleRegister { .. } => {
            if body.len() != WRITE_REPLY_LEN - 2 {
                return malformed(format!("write reply of {} bytes", frame.len()));
            }
            Response::Ok(Payload::Written {
                register: u16::from_be_bytes([body[2], body[3]]),
                value: u16::from_be_bytes([body[4], body[5]]),
            })
        }
    }
}

fn malformed(reason: String) -> Response {
    Response::TransportFault(TransportFault::Malformed(reason))
}
