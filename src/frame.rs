//! RTU frame buffer and builder
//!
//! A frame is `[slave][function][data..][crc_lo][crc_hi]`, at most 256 bytes.
//! Frames live in a fixed-size stack array to avoid heap allocation.

use tracing::debug;

use crate::constants::{CRC_LEN, MAX_RTU_FRAME_SIZE};
use crate::crc;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusFunction, SlaveId};

/// Complete RTU frame including the CRC trailer
#[derive(Clone)]
pub struct RtuFrame {
    /// Fixed-size buffer (stack)
    data: [u8; MAX_RTU_FRAME_SIZE],
    /// Actual frame length
    len: usize,
}

impl RtuFrame {
    /// Wrap received bytes. The CRC is not checked here, see [`RtuFrame::is_valid`].
    pub fn from_slice(bytes: &[u8]) -> ModbusResult<Self> {
        if bytes.len() > MAX_RTU_FRAME_SIZE {
            return Err(ModbusError::invalid_data(format!(
                "Frame too large: {} bytes (max {})",
                bytes.len(),
                MAX_RTU_FRAME_SIZE
            )));
        }
        if bytes.len() < 2 + CRC_LEN {
            return Err(ModbusError::invalid_data(format!(
                "Frame too short: {} bytes",
                bytes.len()
            )));
        }

        let mut data = [0; MAX_RTU_FRAME_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            data,
            len: bytes.len(),
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn slave_id(&self) -> SlaveId {
        self.data[0]
    }

    #[inline]
    pub fn function_code(&self) -> u8 {
        self.data[1]
    }

    /// Bytes between the function code and the CRC
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[2..self.len - CRC_LEN]
    }

    /// CRC carried by the frame, as a number
    #[inline]
    pub fn crc(&self) -> u16 {
        u16::from_le_bytes([self.data[self.len - 2], self.data[self.len - 1]])
    }

    /// CRC computed over everything before the trailer
    #[inline]
    pub fn computed_crc(&self) -> u16 {
        crc::checksum(&self.data[..self.len - CRC_LEN])
    }

    /// Whether the trailer matches the frame contents
    #[inline]
    pub fn is_valid(&self) -> bool {
        crc::verify(self.as_bytes())
    }
}

impl std::fmt::Debug for RtuFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RtuFrame").field(&self.as_bytes()).finish()
    }
}

impl PartialEq for RtuFrame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for RtuFrame {}

impl AsRef<[u8]> for RtuFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Frame builder - fluent API
///
/// ```rust
/// use cheap_modbus_rtu::frame::FrameBuilder;
/// use cheap_modbus_rtu::ModbusFunction;
///
/// let frame = FrameBuilder::new(1, ModbusFunction::ReadHoldingRegisters)
///     .u16(0x0000)?
///     .u16(0x0001)?
///     .build();
/// assert_eq!(frame.as_bytes(), &[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
/// # Ok::<(), cheap_modbus_rtu::ModbusError>(())
/// ```
pub struct FrameBuilder {
    data: [u8; MAX_RTU_FRAME_SIZE],
    len: usize,
    function: ModbusFunction,
}

impl FrameBuilder {
    /// Start a frame with the slave address and function code
    pub fn new(slave_id: SlaveId, function: ModbusFunction) -> Self {
        let mut data = [0; MAX_RTU_FRAME_SIZE];
        data[0] = slave_id;
        data[1] = function.to_u8();
        Self {
            data,
            len: 2,
            function,
        }
    }

    /// Add a single byte
    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        // the CRC trailer must still fit
        if self.len + CRC_LEN >= MAX_RTU_FRAME_SIZE {
            return Err(ModbusError::invalid_data("RTU frame buffer full"));
        }
        self.data[self.len] = b;
        self.len += 1;
        Ok(self)
    }

    /// Add a big-endian 16-bit field
    #[inline]
    pub fn u16(self, value: u16) -> ModbusResult<Self> {
        let [hi, lo] = value.to_be_bytes();
        self.byte(hi)?.byte(lo)
    }

    /// Add raw data
    #[inline]
    pub fn data(mut self, data: &[u8]) -> ModbusResult<Self> {
        if self.len + data.len() + CRC_LEN > MAX_RTU_FRAME_SIZE {
            return Err(ModbusError::invalid_data(format!(
                "RTU frame would exceed max size: {} + {} + {} > {}",
                self.len,
                data.len(),
                CRC_LEN,
                MAX_RTU_FRAME_SIZE
            )));
        }
        self.data[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(self)
    }

    /// Append the CRC and finish the frame
    pub fn build(self) -> RtuFrame {
        let mut data = self.data;
        let len = self.len + CRC_LEN;
        let trailer = crc::crc16(&data[..self.len]);
        data[self.len..len].copy_from_slice(&trailer);

        debug!(
            "Frame built: slave={} FC={:02X} ({}), total_len={}",
            data[0],
            self.function.to_u8(),
            self.function.description(),
            len
        );

        RtuFrame { data, len }
    }
}
