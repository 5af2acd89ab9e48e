//! Modbus RTU protocol constants
//!
//! Frame sizes follow the RS-485 ADU limit of 256 bytes. Register bases follow
//! the classic numbering convention used by cheap relay and IO boards:
//! coils from 1, discrete inputs from 10001, holding registers from 40001.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum RTU frame size (slave address + PDU + CRC)
pub const MAX_RTU_FRAME_SIZE: usize = 256;

/// Maximum PDU size: RTU frame (256) - slave address (1) - CRC (2)
pub const MAX_PDU_SIZE: usize = 253;

/// Length of the CRC trailer
pub const CRC_LEN: usize = 2;

/// Bytes of a read response that are not data: address, function code,
/// byte count and the two CRC bytes
pub const READ_RESPONSE_OVERHEAD: usize = 5;

/// Length of a standard write acknowledgment (FC05, FC06, FC16):
/// address, function code, two 16-bit fields and CRC
pub const WRITE_ACK_LEN: usize = 8;

// ============================================================================
// Quantity Limits
// ============================================================================

/// Maximum discrete inputs per FC02 request
///
/// Response PDU: 1 (FC) + 1 (byte count) + ceil(N / 8) ≤ 253, rounded down to 2000
pub const MAX_READ_DISCRETE_INPUTS: u16 = 2000;

/// Maximum holding registers per FC03 request
///
/// Response PDU: 1 (FC) + 1 (byte count) + 2N ≤ 253 → N ≤ 125
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum holding registers per FC16 request
///
/// Request PDU: 1 (FC) + 2 (start) + 2 (quantity) + 1 (byte count) + 2N ≤ 253 → N ≤ 123
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

// ============================================================================
// Register Bases
// ============================================================================

/// First coil register number
pub const COIL_BASE: u32 = 1;

/// First discrete input register number
pub const DISCRETE_INPUT_BASE: u32 = 10001;

/// First holding register number
pub const HOLDING_REGISTER_BASE: u32 = 40001;

// ============================================================================
// Coil Values
// ============================================================================

/// Wire value of an energized coil
pub const COIL_ON: u16 = 0xFF00;

/// Wire value of a released coil
pub const COIL_OFF: u16 = 0x0000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MAX_PDU_SIZE + 1 + CRC_LEN, MAX_RTU_FRAME_SIZE);
        assert_eq!(WRITE_ACK_LEN, 1 + 1 + 2 + 2 + CRC_LEN);
    }

    #[test]
    fn test_register_limits() {
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS as usize * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);

        let write_pdu_size = 1 + 2 + 2 + 1 + (MAX_WRITE_REGISTERS as usize * 2);
        assert!(write_pdu_size <= MAX_PDU_SIZE);
    }

    #[test]
    fn test_discrete_input_limit() {
        let read_bytes = (MAX_READ_DISCRETE_INPUTS as usize).div_ceil(8);
        assert!(1 + 1 + read_bytes <= MAX_PDU_SIZE);
    }
}
