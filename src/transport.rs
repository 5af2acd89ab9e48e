//! # Transport Layer
//!
//! The transaction engine talks to the bus through the [`Transport`] trait: a
//! half-duplex byte channel that can write a frame, read up to a number of bytes
//! within a timeout, and throw away input that is still buffered from an
//! earlier exchange.
//!
//! [`SerialTransport`] implements it on top of the `serialport` crate (feature
//! `serial`). Serial settings, including the platform default device path, are
//! picked by the caller through [`SerialConfig`] before the master is built.
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> cheap_modbus_rtu::ModbusResult<()> {
//! use cheap_modbus_rtu::transport::{default_device_path, SerialConfig, SerialTransport};
//! use cheap_modbus_rtu::ModbusRtuMaster;
//!
//! let config = SerialConfig::new(default_device_path()).with_baud_rate(9600);
//! let transport = SerialTransport::open(&config)?;
//! let mut master = ModbusRtuMaster::new(transport);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

use std::io;
use std::time::Duration;

use tracing::info;

/// Default serial speed of the cheap relay boards
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Byte channel used by the transaction engine
///
/// Only one transaction may use a transport at a time; implementations need
/// no internal locking.
pub trait Transport {
    /// Write the whole frame to the bus
    fn write_all(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Read until `len` bytes arrived or `timeout` elapsed
    ///
    /// Returns fewer than `len` bytes only when the timeout elapsed.
    fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Drop any received bytes that have not been read yet
    fn discard_input(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_all(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_all(frame)
    }

    fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        (**self).read_up_to(len, timeout)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_all(frame)
    }

    fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        (**self).read_up_to(len, timeout)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}

/// Format raw bytes as a space separated hex string
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a frame with its direction
pub(crate) fn log_packet(direction: &str, data: &[u8], slave_id: u8) {
    info!(
        "[MODBUS-RTU] {} slave:{} {}",
        direction,
        slave_id,
        format_hex_packet(data)
    );
}

/// Conventional USB-RS485 adapter path of the current platform
///
/// `/dev/ttyUSB0` on Unix-like systems, `COM1` on Windows.
pub fn default_device_path() -> &'static str {
    if cfg!(windows) {
        "COM1"
    } else {
        "/dev/ttyUSB0"
    }
}

#[cfg(feature = "serial")]
pub use self::serial::{SerialConfig, SerialTransport};

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Read, Write};
    use std::time::{Duration, Instant};

    use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
    use tracing::debug;

    use super::{Transport, DEFAULT_BAUD_RATE};
    use crate::error::{ModbusError, ModbusResult};

    /// Serial line settings
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SerialConfig {
        /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
        pub path: String,
        pub baud_rate: u32,
        pub data_bits: DataBits,
        pub parity: Parity,
        pub stop_bits: StopBits,
    }

    impl SerialConfig {
        /// 9600 baud, 8 data bits, no parity, 1 stop bit
        pub fn new(path: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                baud_rate: DEFAULT_BAUD_RATE,
                data_bits: DataBits::Eight,
                parity: Parity::None,
                stop_bits: StopBits::One,
            }
        }

        pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
            self.baud_rate = baud_rate;
            self
        }

        pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
            self.data_bits = data_bits;
            self
        }

        pub fn with_parity(mut self, parity: Parity) -> Self {
            self.parity = parity;
            self
        }

        pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
            self.stop_bits = stop_bits;
            self
        }

        pub fn validate(&self) -> ModbusResult<()> {
            if self.path.is_empty() {
                return Err(ModbusError::configuration("Serial device path is empty"));
            }
            if self.baud_rate == 0 {
                return Err(ModbusError::configuration("Baud rate must be non-zero"));
            }
            Ok(())
        }
    }

    /// Blocking serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        path: String,
    }

    impl SerialTransport {
        /// Open the serial port described by `config`
        pub fn open(config: &SerialConfig) -> ModbusResult<Self> {
            config.validate()?;

            let port = serialport::new(config.path.as_str(), config.baud_rate)
                .data_bits(config.data_bits)
                .parity(config.parity)
                .stop_bits(config.stop_bits)
                .open()
                .map_err(|e| {
                    ModbusError::io(format!(
                        "Failed to open serial port {}: {}",
                        config.path, e
                    ))
                })?;

            debug!(
                "Opened serial port {} at {} baud",
                config.path, config.baud_rate
            );

            Ok(Self {
                port,
                path: config.path.clone(),
            })
        }

        /// Wrap an already opened port
        pub fn from_port(port: Box<dyn SerialPort>) -> Self {
            let path = port.name().unwrap_or_default();
            Self { port, path }
        }

        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Transport for SerialTransport {
        fn write_all(&mut self, frame: &[u8]) -> io::Result<()> {
            Write::write_all(&mut self.port, frame)?;
            self.port.flush()
        }

        fn read_up_to(&mut self, len: usize, timeout: Duration) -> io::Result<Vec<u8>> {
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            let deadline = Instant::now() + timeout;

            while filled < len {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                self.port.set_timeout(deadline - now)?;
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }

            buf.truncate(filled);
            Ok(buf)
        }

        fn discard_input(&mut self) -> io::Result<()> {
            self.port.clear(ClearBuffer::Input)?;
            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex_packet() {
        assert_eq!(format_hex_packet(&[0x01, 0x03, 0xAB]), "01 03 AB");
        assert_eq!(format_hex_packet(&[]), "");
    }

    #[test]
    fn test_default_device_path() {
        let path = default_device_path();
        if cfg!(windows) {
            assert_eq!(path, "COM1");
        } else {
            assert_eq!(path, "/dev/ttyUSB0");
        }
    }
}
