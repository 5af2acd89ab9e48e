//! # Cheap Modbus RTU - Blocking Modbus RTU master for cheap relay and IO boards
//!
//! **License:** MIT
//!
//! A small, synchronous Modbus RTU master in pure Rust for the inexpensive
//! RS-485 relay boards, IO modules and PWM controllers found on hobby and
//! light-industrial buses.
//!
//! ## Features
//!
//! - **Exact wire format**: CRC-16/MODBUS, big-endian registers, LSB-first bit packing
//! - **Classic register numbers**: coils from 1, discrete inputs from 10001,
//!   holding registers from 40001, translated to zero-based wire addresses
//! - **Atomic transactions**: a call returns fully validated data or a typed error
//! - **Pluggable transport**: any blocking byte channel via [`Transport`],
//!   serial ports out of the box (feature `serial`)
//! - **Device layer**: relay boards described as data via [`IoModuleModel`]
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Master |
//! |------|----------|--------|
//! | 0x02 | Read Discrete Inputs | ✅ |
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> cheap_modbus_rtu::ModbusResult<()> {
//! use cheap_modbus_rtu::transport::{default_device_path, SerialConfig, SerialTransport};
//! use cheap_modbus_rtu::{ModbusMaster, ModbusRtuMaster, ResponseShape};
//!
//! let transport = SerialTransport::open(&SerialConfig::new(default_device_path()))?;
//! let mut master = ModbusRtuMaster::new(transport);
//!
//! // Read holding register 40001 of slave 1
//! let values = master.read_holding_registers(1, 40001, 1)?;
//! println!("Read registers: {:?}", values);
//!
//! // Write single register
//! master.write_single_register(1, 40002, 1000)?;
//!
//! // Boards that echo the whole FC16 request must be declared up front
//! master.write_multiple_registers(1, 40001, &[2], ResponseShape::Echo)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus RTU protocol constants
pub mod constants;

/// CRC-16/MODBUS checksum
pub mod crc;

/// Slave addressing, function codes and register classes
pub mod protocol;

/// Stack-allocated RTU frame and frame builder
pub mod frame;

/// Request encoding and response decoding
pub mod codec;

/// Byte channel abstraction and serial port transport
pub mod transport;

/// Transaction engine
pub mod client;

/// Relay and IO module drivers
pub mod device;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Core master API ===
pub use client::{MasterConfig, MasterStats, ModbusMaster, ModbusRtuMaster};

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use codec::{ModbusRequest, Operation};
pub use frame::{FrameBuilder, RtuFrame};
pub use protocol::{
    ModbusFunction, RegisterClass, ResponseShape, SlaveId, BROADCAST_SLAVE_ID,
    VENDOR_BROADCAST_SLAVE_ID,
};

// === Transport ===
pub use transport::Transport;

#[cfg(feature = "serial")]
pub use transport::{SerialConfig, SerialTransport};

// === Device layer ===
pub use device::{IoModule, IoModuleModel};

// === Checksum ===
pub use crate::crc::crc16;

pub use client::DEFAULT_TIMEOUT_MS;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
