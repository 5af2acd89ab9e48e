//! Modbus RTU master (transaction engine)
//!
//! One call is one transaction: discard stale input, send the request frame,
//! read exactly the expected number of response bytes within the timeout and
//! verify the CRC. The result is either a fully validated frame or an error;
//! partial data is never returned and nothing is retried.
//!
//! # Primitive operations
//!
//! | Function Code | Method | Register numbers |
//! |---------------|--------|------------------|
//! | 0x02 | `read_discrete_inputs()` | 10001.. |
//! | 0x03 | `read_holding_registers()` | 40001.. |
//! | 0x05 | `write_single_coil()` | 1.. |
//! | 0x06 | `write_single_register()` | 40001.. |
//! | 0x10 | `write_multiple_registers()` | 40001.. |
//!
//! # Concurrency
//!
//! The RS-485 bus is half-duplex, so only one transaction can be in flight.
//! The master has no internal lock; callers sharing it between threads wrap it
//! in a `Mutex`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> cheap_modbus_rtu::ModbusResult<()> {
//! use cheap_modbus_rtu::transport::{SerialConfig, SerialTransport};
//! use cheap_modbus_rtu::{ModbusMaster, ModbusRtuMaster};
//!
//! let transport = SerialTransport::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//! let mut master = ModbusRtuMaster::new(transport);
//!
//! // Two digital inputs of slave 5
//! let inputs = master.read_discrete_inputs(5, 10001, 2)?;
//! println!("Inputs: {:?}", inputs);
//!
//! // Energize relay 1
//! master.write_single_coil(5, 1, true)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::{decode_discrete_inputs, decode_registers, ModbusRequest};
use crate::constants::{CRC_LEN, MAX_RTU_FRAME_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::RtuFrame;
use crate::protocol::{ResponseShape, SlaveId};
use crate::transport::{log_packet, Transport};

/// Default response timeout (1 second)
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Master settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterConfig {
    /// Upper bound for receiving one complete response
    pub timeout: Duration,
    /// Log every sent and received frame as hex
    pub packet_logging: bool,
}

impl MasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            packet_logging: false,
        }
    }
}

/// Transaction counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub timeouts: u64,
    pub crc_errors: u64,
    pub io_errors: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// The five register operations used by device drivers
///
/// Register numbers follow the classic convention; see [`crate::RegisterClass`].
pub trait ModbusMaster {
    /// Read discrete inputs (function code 0x02)
    ///
    /// * `start` - First input, 10001 and up
    /// * `count` - Number of inputs (1-2000)
    fn read_discrete_inputs(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<bool>>;

    /// Read holding registers (function code 0x03)
    ///
    /// * `start` - First register, 40001 and up
    /// * `count` - Number of registers (1-125)
    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<u16>>;

    /// Write single coil (function code 0x05)
    ///
    /// * `register` - Coil number, 1 and up
    /// * `value` - `true` for ON (0xFF00), `false` for OFF (0x0000)
    fn write_single_coil(&mut self, slave_id: SlaveId, register: u32, value: bool)
        -> ModbusResult<()>;

    /// Write single holding register (function code 0x06)
    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        register: u32,
        value: u16,
    ) -> ModbusResult<()>;

    /// Write multiple holding registers (function code 0x10)
    ///
    /// `shape` declares whether the slave answers with the standard 8-byte
    /// acknowledgment or echoes the whole request.
    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        values: &[u16],
        shape: ResponseShape,
    ) -> ModbusResult<()>;
}

impl<M: ModbusMaster + ?Sized> ModbusMaster for &mut M {
    fn read_discrete_inputs(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        (**self).read_discrete_inputs(slave_id, start, count)
    }

    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        (**self).read_holding_registers(slave_id, start, count)
    }

    fn write_single_coil(
        &mut self,
        slave_id: SlaveId,
        register: u32,
        value: bool,
    ) -> ModbusResult<()> {
        (**self).write_single_coil(slave_id, register, value)
    }

    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        register: u32,
        value: u16,
    ) -> ModbusResult<()> {
        (**self).write_single_register(slave_id, register, value)
    }

    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        values: &[u16],
        shape: ResponseShape,
    ) -> ModbusResult<()> {
        (**self).write_multiple_registers(slave_id, start, values, shape)
    }
}

/// Blocking Modbus RTU master over any [`Transport`]
pub struct ModbusRtuMaster<T: Transport> {
    transport: T,
    config: MasterConfig,
    stats: MasterStats,
}

impl<T: Transport> ModbusRtuMaster<T> {
    /// Create a master with the default 1 s timeout
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, MasterConfig::default())
    }

    pub fn with_config(transport: T, config: MasterConfig) -> Self {
        Self {
            transport,
            config,
            stats: MasterStats::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Enable or disable hex logging of every frame
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.config.packet_logging = enabled;
    }

    pub fn stats(&self) -> &MasterStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MasterStats::default();
    }

    /// Run one transaction with a raw request frame
    ///
    /// `request` must already carry its CRC. Returns the complete response
    /// frame once exactly `expected_len` bytes arrived and the CRC verified.
    pub fn execute(&mut self, request: &[u8], expected_len: usize) -> ModbusResult<RtuFrame> {
        if !(2 + CRC_LEN..=MAX_RTU_FRAME_SIZE).contains(&expected_len) {
            return Err(ModbusError::invalid_data(format!(
                "Expected response length {} outside {}..={}",
                expected_len,
                2 + CRC_LEN,
                MAX_RTU_FRAME_SIZE
            )));
        }
        let slave_id = request.first().copied().unwrap_or_default();

        // Leftovers of an earlier failed exchange would shift this response
        self.transport.discard_input().map_err(|e| {
            self.stats.io_errors += 1;
            ModbusError::io(format!("Failed to discard serial input: {}", e))
        })?;

        if self.config.packet_logging {
            log_packet("send", request, slave_id);
        }
        self.transport.write_all(request).map_err(|e| {
            self.stats.io_errors += 1;
            ModbusError::io(format!("Failed to send RTU frame: {}", e))
        })?;
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += request.len() as u64;

        let mut received = self
            .transport
            .read_up_to(expected_len, self.config.timeout)
            .map_err(|e| {
                self.stats.io_errors += 1;
                ModbusError::io(format!("Failed to read RTU response: {}", e))
            })?;
        received.truncate(expected_len);
        self.stats.bytes_received += received.len() as u64;

        if self.config.packet_logging {
            log_packet("receive", &received, slave_id);
        }

        if received.len() < expected_len {
            self.stats.timeouts += 1;
            warn!(
                "Response timeout from slave {}: {} of {} bytes",
                slave_id,
                received.len(),
                expected_len
            );
            return Err(ModbusError::Timeout {
                expected: expected_len,
                sent: request.to_vec(),
                received,
            });
        }

        let frame = RtuFrame::from_slice(&received)?;
        if !frame.is_valid() {
            self.stats.crc_errors += 1;
            warn!(
                "CRC mismatch from slave {}: expected 0x{:04X}, got 0x{:04X}",
                slave_id,
                frame.computed_crc(),
                frame.crc()
            );
            return Err(ModbusError::Crc {
                expected: frame.computed_crc(),
                received_crc: frame.crc(),
                sent: request.to_vec(),
                received,
            });
        }

        self.stats.responses_received += 1;
        Ok(frame)
    }

    /// Encode `request`, run the transaction and return the response frame
    pub fn send(&mut self, request: &ModbusRequest, shape: ResponseShape) -> ModbusResult<RtuFrame> {
        let frame = request.encode()?;
        debug!(
            "{} request to slave {}",
            request.function().description(),
            request.slave_id
        );
        self.execute(frame.as_bytes(), request.expected_response_len(shape))
    }
}

impl<T: Transport> ModbusMaster for ModbusRtuMaster<T> {
    fn read_discrete_inputs(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        let request = ModbusRequest::read_discrete_inputs(slave_id, start, count);
        let response = self.send(&request, ResponseShape::Acknowledge)?;
        // skip the byte count
        decode_discrete_inputs(&response.payload()[1..], count)
    }

    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest::read_holding_registers(slave_id, start, count);
        let response = self.send(&request, ResponseShape::Acknowledge)?;
        decode_registers(&response.payload()[1..], count)
    }

    fn write_single_coil(
        &mut self,
        slave_id: SlaveId,
        register: u32,
        value: bool,
    ) -> ModbusResult<()> {
        let request = ModbusRequest::write_single_coil(slave_id, register, value);
        self.send(&request, ResponseShape::Acknowledge)?;
        Ok(())
    }

    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        register: u32,
        value: u16,
    ) -> ModbusResult<()> {
        let request = ModbusRequest::write_single_register(slave_id, register, value);
        self.send(&request, ResponseShape::Acknowledge)?;
        Ok(())
    }

    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        start: u32,
        values: &[u16],
        shape: ResponseShape,
    ) -> ModbusResult<()> {
        let request = ModbusRequest::write_multiple_registers(slave_id, start, values);
        self.send(&request, shape)?;
        Ok(())
    }
}
