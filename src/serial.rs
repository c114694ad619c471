use crate::config::AmpConfig;
use crate::connection::Transport;
use crate::error::TransportError;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Largest reply read from a single exchange
const MAX_REPLY_LEN: usize = 128;

/// RS-232 link to the amplifier
///
/// The port is opened for each exchange and closed again before `exchange`
/// returns, so nothing holds the device between commands.
pub struct SerialTransport {
    port: String,
    baud_rate: u32,
    timeout: Duration,
    inter_byte_gap: Duration,
}

impl SerialTransport {
    pub fn new(config: &AmpConfig) -> Self {
        Self {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
            timeout: config.timeout(),
            inter_byte_gap: config.inter_byte_gap(),
        }
    }

    /// Get the device path
    pub fn port(&self) -> &str {
        &self.port
    }

    fn open(&self) -> Result<Box<dyn SerialPort>, TransportError> {
        serialport::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: self.port.clone(),
                source,
            })
    }

    /// Read until the deadline passes or the line goes quiet after data
    fn read_reply(&self, port: &mut dyn SerialPort) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let mut reply = Vec::new();
        let mut buf = [0u8; 64];

        while reply.len() < MAX_REPLY_LEN {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let wait = if reply.is_empty() {
                remaining
            } else {
                remaining.min(self.inter_byte_gap)
            };
            port.set_timeout(wait).map_err(|e| TransportError::Read(e.into()))?;

            match port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => reply.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Read(e)),
            }
        }

        reply.truncate(MAX_REPLY_LEN);
        Ok(reply)
    }
}

impl Transport for SerialTransport {
    fn exchange(&mut self, frame: &[u8], expect_response: bool) -> Result<Vec<u8>, TransportError> {
        // Dropping `port` closes the device on every return path.
        let mut port = self.open()?;

        // Discard anything left over from an earlier, abandoned exchange
        if let Err(e) = port.clear(serialport::ClearBuffer::All) {
            tracing::debug!("Failed to clear {} buffers: {}", self.port, e);
        }

        port.write_all(frame).map_err(|e| match e.kind() {
            ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Write(e),
        })?;
        port.flush().map_err(TransportError::Write)?;

        if !expect_response {
            return Ok(Vec::new());
        }

        self.read_reply(port.as_mut())
    }
}
