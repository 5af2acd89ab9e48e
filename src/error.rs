//! Error types for the Modbus RTU master
//!
//! Transport faults and data-integrity faults are separate variants so callers
//! can decide whether to retry without inspecting message text.

use thiserror::Error;

use crate::protocol::RegisterClass;
use crate::transport::format_hex_packet;

/// Result type used across the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors raised by the frame codec, the transaction engine and the device layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// Fewer response bytes than expected arrived before the timeout
    #[error(
        "Not enough Modbus data received ({} of {expected} bytes), sent: \"{}\" received: \"{}\"",
        .received.len(),
        format_hex_packet(.sent),
        format_hex_packet(.received)
    )]
    Timeout {
        expected: usize,
        sent: Vec<u8>,
        received: Vec<u8>,
    },

    /// The trailing CRC of the response did not match its contents
    #[error(
        "CRC mismatch: expected 0x{expected:04X}, got 0x{received_crc:04X}, sent: \"{}\" received: \"{}\"",
        format_hex_packet(.sent),
        format_hex_packet(.received)
    )]
    Crc {
        expected: u16,
        received_crc: u16,
        sent: Vec<u8>,
        received: Vec<u8>,
    },

    /// Transport level failure (write, read, discard or open)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Register number outside the range of its register class
    #[error("Register {register} is outside the {class} range")]
    InvalidAddress { register: u32, class: RegisterClass },

    /// Malformed request, quantity out of range or undecodable data
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device channel number outside 1..=channels
    #[error("Channel {channel} out of range (device has {channels} channels)")]
    ChannelOutOfRange { channel: u16, channels: u16 },

    /// Invalid serial or master configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ModbusError {
    pub fn io(message: impl Into<String>) -> Self {
        ModbusError::Io {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        ModbusError::InvalidData {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ModbusError::Configuration {
            message: message.into(),
        }
    }

    /// True for short reads caused by the response timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModbusError::Timeout { .. })
    }

    /// True when a complete frame arrived but failed CRC verification
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, ModbusError::Crc { .. })
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::io(err.to_string())
    }
}
