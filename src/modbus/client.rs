use async_trait::async_trait;
use log::{debug, error, info, warn};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::codec;
use super::protocol::{Command, Response, TransportFault};
use crate::config::settings::{ParityConfig, SerialConfig};
use crate::utils::error::ModbusError;

/// Per-read blocking timeout; the overall reply deadline comes from the config.
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(20);
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

/// A half-duplex channel carrying one request/response exchange at a time.
#[async_trait]
pub trait ModbusTransport: Send {
    /// Sends `command` and waits for its reply. Timeouts and bad frames come
    /// back as `Response::TransportFault`; `Err` is reserved for I/O failures.
    async fn exchange(&mut self, command: &Command) -> Result<Response, ModbusError>;

    /// Releases the underlying handle. Safe to call more than once.
    fn close(&mut self);
}

pub struct RtuTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    timeout: Duration,
}

impl RtuTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, ModbusError> {
        info!("🔌 Connecting to Modbus RTU port: {}", config.port);
        info!(
            "⚙️  Configuration: {} baud, {} data bits, {:?} parity, {} stop bit(s), {} ms timeout",
            config.baud_rate,
            config.data_bits,
            config.parity,
            config.stop_bits,
            config.timeout_ms
        );

        let serial_parity = match config.parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        };

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(READ_POLL_TIMEOUT)
            .data_bits(data_bits(config.data_bits)?)
            .stop_bits(stop_bits(config.stop_bits)?)
            .parity(serial_parity)
            .open()
            .map_err(|e| {
                error!("❌ Failed to open serial port {}: {}", config.port, e);
                ModbusError::ConnectionError(format!("Failed to open port {}: {}", config.port, e))
            })?;

        info!("✅ Modbus RTU connection established successfully");
        Ok(Self {
            port: Some(port),
            port_name: config.port.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

#[async_trait]
impl ModbusTransport for RtuTransport {
    async fn exchange(&mut self, command: &Command) -> Result<Response, ModbusError> {
        let Some(port) = self.port.as_mut() else {
            return Ok(Response::TransportFault(TransportFault::NotConnected));
        };

        // drop stale bytes left over from a previous timed-out exchange
        port.clear(ClearBuffer::Input)
            .map_err(|e| ModbusError::CommunicationError(format!("Clear failed: {}", e)))?;

        transact(&mut **port, command, self.timeout).await
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            drop(port);
            info!("✅ RS485 connection on {} closed", self.port_name);
        }
    }
}

impl Drop for RtuTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writes the request ADU and decodes whatever reply arrives before `timeout`.
async fn transact<P>(
    port: &mut P,
    command: &Command,
    timeout: Duration,
) -> Result<Response, ModbusError>
where
    P: Read + Write + ?Sized,
{
    let request = codec::encode(command);
    debug!("📤 {} -> [{}]", command, hex::encode(&request));

    port.write_all(&request)
        .map_err(|e| ModbusError::CommunicationError(format!("Write failed: {}", e)))?;
    port.flush()
        .map_err(|e| ModbusError::CommunicationError(format!("Flush failed: {}", e)))?;

    let frame = read_frame(port, command, timeout).await?;
    if frame.is_empty() {
        debug!("⏰ No reply from unit {} within {:?}", command.unit, timeout);
        return Ok(Response::TransportFault(TransportFault::Timeout));
    }

    debug!("📥 unit {} <- [{}]", command.unit, hex::encode(&frame));
    Ok(codec::decode(command, &frame))
}

/// Reads until the codec says the frame is complete or `timeout` elapses.
/// A partial frame is returned as-is so the decoder can report it.
async fn read_frame<R>(
    port: &mut R,
    command: &Command,
    timeout: Duration,
) -> Result<Vec<u8>, ModbusError>
where
    R: Read + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut frame = Vec::with_capacity(codec::MAX_FRAME_LEN);
    let mut buffer = [0u8; codec::MAX_FRAME_LEN];

    loop {
        if let Some(len) = codec::expected_len(command, &frame) {
            if frame.len() >= len {
                if frame.len() > len {
                    let extra = frame.len() - len;
                    warn!(
                        "⚠️  Discarding {} trailing byte(s) from unit {}",
                        extra, command.unit
                    );
                    frame.truncate(len);
                }
                return Ok(frame);
            }
        }
        if Instant::now() >= deadline {
            return Ok(frame);
        }

        match port.read(&mut buffer) {
            Ok(n) if n > 0 => frame.extend_from_slice(&buffer[..n]),
            Ok(_) => sleep(IDLE_BACKOFF).await,
            Err(ref e) if e.kind() == ErrorKind::TimedOut => sleep(IDLE_BACKOFF).await,
            Err(e) => {
                return Err(ModbusError::CommunicationError(format!("Read failed: {}", e)));
            }
        }
    }
}

fn data_bits(bits: u8) -> Result<serialport::DataBits, ModbusError> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(ModbusError::ConfigError(format!("unsupported data bits: {}", other))),
    }
}

fn stop_bits(bits: u8) -> Result<serialport::StopBits, ModbusError> {
    match bits {
        1 => Ok(serialport::StopBits::One),
        2 => Ok(serialport::StopBits::Two),
        other => Err(ModbusError::ConfigError(format!("unsupported stop bits: {}", other))),
    }
}

/// Serial ports the OS currently reports.
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, ModbusError> {
    Ok(serialport::available_ports()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::crc::append_crc;
    use crate::modbus::{ExceptionCode, Payload, UnitAddress};
    use std::collections::VecDeque;
    use std::io;

    const REPLY_TIMEOUT: Duration = Duration::from_millis(60);

    /// Serial line stand-in: hands out queued chunks, then reports read timeouts.
    #[derive(Default)]
    struct FakeLine {
        chunks: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl FakeLine {
        fn deliver(mut self, chunk: &[u8]) -> Self {
            self.chunks.push_back(Ok(chunk.to_vec()));
            self
        }

        fn break_with(mut self, kind: ErrorKind) -> Self {
            self.chunks.push_back(Err(io::Error::new(kind, "line fault")));
            self
        }
    }

    impl Read for FakeLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "no data")),
            }
        }
    }

    impl Write for FakeLine {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn read_probe() -> Command {
        Command::read_holding_registers(UnitAddress::new(1).unwrap(), 0, 1)
    }

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        append_crc(&mut frame);
        frame
    }

    fn closed_transport() -> RtuTransport {
        RtuTransport {
            port: None,
            port_name: "/dev/ttyTEST".to_string(),
            timeout: REPLY_TIMEOUT,
        }
    }

    #[test]
    fn test_serial_line_parameters() {
        assert!(matches!(data_bits(8), Ok(serialport::DataBits::Eight)));
        assert!(matches!(data_bits(9), Err(ModbusError::ConfigError(_))));
        assert!(matches!(stop_bits(2), Ok(serialport::StopBits::Two)));
        assert!(matches!(stop_bits(0), Err(ModbusError::ConfigError(_))));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig {
            port: "/dev/this-port-does-not-exist".to_string(),
            ..SerialConfig::default()
        };
        assert!(matches!(
            RtuTransport::open(&config),
            Err(ModbusError::ConnectionError(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_line_times_out() {
        let mut line = FakeLine::default();
        let command = read_probe();

        let frame = read_frame(&mut line, &command, REPLY_TIMEOUT).await.unwrap();
        assert!(frame.is_empty());

        let response = transact(&mut line, &command, REPLY_TIMEOUT).await.unwrap();
        assert_eq!(response, Response::TransportFault(TransportFault::Timeout));
        assert_eq!(line.written, codec::encode(&command));
    }

    #[tokio::test]
    async fn test_split_reply_is_reassembled() {
        let reply = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x2A]);
        let mut line = FakeLine::default()
            .deliver(&reply[..1])
            .deliver(&reply[1..3])
            .deliver(&reply[3..]);

        let response = transact(&mut line, &read_probe(), REPLY_TIMEOUT).await.unwrap();
        assert_eq!(response, Response::Ok(Payload::Registers(vec![42])));
    }

    #[tokio::test]
    async fn test_exception_reply_stops_after_five_bytes() {
        let mut chunk = with_crc(&[0x01, 0x83, 0x02]);
        chunk.extend_from_slice(&[0x00, 0x00, 0x00]);
        let mut line = FakeLine::default().deliver(&chunk);
        let command = read_probe();

        let frame = read_frame(&mut line, &command, REPLY_TIMEOUT).await.unwrap();
        assert_eq!(frame.len(), 5);
        assert_eq!(
            codec::decode(&command, &frame),
            Response::ProtocolFault(ExceptionCode::IllegalDataAddress)
        );
    }

    #[tokio::test]
    async fn test_trailing_bytes_are_discarded() {
        let reply = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x07]);
        let mut chunk = reply.clone();
        chunk.extend_from_slice(&[0xFF, 0xFF]);
        let mut line = FakeLine::default().deliver(&chunk);

        let frame = read_frame(&mut line, &read_probe(), REPLY_TIMEOUT).await.unwrap();
        assert_eq!(frame, reply);
    }

    #[tokio::test]
    async fn test_partial_reply_reaches_decoder() {
        let mut line = FakeLine::default().deliver(&[0x01, 0x03, 0x02, 0x00]);

        let response = transact(&mut line, &read_probe(), REPLY_TIMEOUT).await.unwrap();
        assert!(matches!(
            response,
            Response::TransportFault(TransportFault::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_local_echo_of_read_request_fails_crc() {
        let command = Command::read_holding_registers(UnitAddress::new(5).unwrap(), 0, 1);
        let mut line = FakeLine::default().deliver(&codec::encode(&command));

        let response = transact(&mut line, &command, REPLY_TIMEOUT).await.unwrap();
        assert!(matches!(
            response,
            Response::TransportFault(TransportFault::Crc { received: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_error_is_communication_error() {
        let mut line = FakeLine::default()
            .deliver(&[0x01])
            .break_with(ErrorKind::BrokenPipe);

        let result = read_frame(&mut line, &read_probe(), REPLY_TIMEOUT).await;
        assert!(matches!(result, Err(ModbusError::CommunicationError(_))));
    }

    #[tokio::test]
    async fn test_closed_transport_is_not_connected() {
        let mut transport = closed_transport();
        transport.close();
        transport.close();

        let response = transport.exchange(&read_probe()).await.unwrap();
        assert_eq!(response, Response::TransportFault(TransportFault::NotConnected));
        assert!(transport.port.is_none());
    }
}
