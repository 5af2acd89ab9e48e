//! # Frame Codec
//!
//! Encoding of master requests and decoding of slave responses for the five
//! supported function codes.
//!
//! Requests carry register numbers in the classic numbering convention
//! (coils from 1, discrete inputs from 10001, holding registers from 40001).
//! The base of the register class is subtracted before the address goes on
//! the wire, and added back when a request frame is decoded.
//!
//! | Code | Operation | Request data | Response length |
//! |------|-----------|--------------|-----------------|
//! | 0x02 | Read discrete inputs | start, count | 5 + ceil(count / 8) |
//! | 0x03 | Read holding registers | start, count | 5 + 2 × count |
//! | 0x05 | Write single coil | address, 0xFF00 / 0x0000 | 8 |
//! | 0x06 | Write single register | address, value | 8 |
//! | 0x10 | Write multiple registers | start, count, byte count, values | 8, or the request length for echoing devices |

use tracing::debug;

use crate::constants::{
    COIL_OFF, COIL_ON, CRC_LEN, MAX_READ_DISCRETE_INPUTS, MAX_READ_REGISTERS,
    MAX_WRITE_REGISTERS, READ_RESPONSE_OVERHEAD, WRITE_ACK_LEN,
};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{FrameBuilder, RtuFrame};
use crate::protocol::{ModbusFunction, ResponseShape, SlaveId};

/// Register operation of a request, addressed by register number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// FC02, `start` in 10001..
    ReadDiscreteInputs { start: u32, count: u16 },
    /// FC03, `start` in 40001..
    ReadHoldingRegisters { start: u32, count: u16 },
    /// FC05, `register` in 1..
    WriteSingleCoil { register: u32, value: bool },
    /// FC06, `register` in 40001..
    WriteSingleRegister { register: u32, value: u16 },
    /// FC16, `start` in 40001..
    WriteMultipleRegisters { start: u32, values: Vec<u16> },
}

impl Operation {
    pub fn function(&self) -> ModbusFunction {
        match self {
            Operation::ReadDiscreteInputs { .. } => ModbusFunction::ReadDiscreteInputs,
            Operation::ReadHoldingRegisters { .. } => ModbusFunction::ReadHoldingRegisters,
            Operation::WriteSingleCoil { .. } => ModbusFunction::WriteSingleCoil,
            Operation::WriteSingleRegister { .. } => ModbusFunction::WriteSingleRegister,
            Operation::WriteMultipleRegisters { .. } => ModbusFunction::WriteMultipleRegisters,
        }
    }
}

/// A request addressed to one slave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    pub slave_id: SlaveId,
    pub operation: Operation,
}

impl ModbusRequest {
    pub fn new(slave_id: SlaveId, operation: Operation) -> Self {
        Self {
            slave_id,
            operation,
        }
    }

    pub fn read_discrete_inputs(slave_id: SlaveId, start: u32, count: u16) -> Self {
        Self::new(slave_id, Operation::ReadDiscreteInputs { start, count })
    }

    pub fn read_holding_registers(slave_id: SlaveId, start: u32, count: u16) -> Self {
        Self::new(slave_id, Operation::ReadHoldingRegisters { start, count })
    }

    pub fn write_single_coil(slave_id: SlaveId, register: u32, value: bool) -> Self {
        Self::new(slave_id, Operation::WriteSingleCoil { register, value })
    }

    pub fn write_single_register(slave_id: SlaveId, register: u32, value: u16) -> Self {
        Self::new(slave_id, Operation::WriteSingleRegister { register, value })
    }

    pub fn write_multiple_registers(slave_id: SlaveId, start: u32, values: &[u16]) -> Self {
        Self::new(
            slave_id,
            Operation::WriteMultipleRegisters {
                start,
                values: values.to_vec(),
            },
        )
    }

    pub fn function(&self) -> ModbusFunction {
        self.operation.function()
    }

    /// Validate the request and build its RTU frame
    pub fn encode(&self) -> ModbusResult<RtuFrame> {
        let function = self.function();
        let class = function.register_class();
        let builder = FrameBuilder::new(self.slave_id, function);

        let frame = match &self.operation {
            Operation::ReadDiscreteInputs { start, count } => {
                check_quantity(*count, MAX_READ_DISCRETE_INPUTS, "discrete inputs")?;
                builder
                    .u16(class.to_wire_address(*start)?)?
                    .u16(*count)?
                    .build()
            }
            Operation::ReadHoldingRegisters { start, count } => {
                check_quantity(*count, MAX_READ_REGISTERS, "holding registers")?;
                builder
                    .u16(class.to_wire_address(*start)?)?
                    .u16(*count)?
                    .build()
            }
            Operation::WriteSingleCoil { register, value } => builder
                .u16(class.to_wire_address(*register)?)?
                .u16(encode_coil_value(*value))?
                .build(),
            Operation::WriteSingleRegister { register, value } => builder
                .u16(class.to_wire_address(*register)?)?
                .u16(*value)?
                .build(),
            Operation::WriteMultipleRegisters { start, values } => {
                let count = u16::try_from(values.len()).unwrap_or(u16::MAX);
                check_quantity(count, MAX_WRITE_REGISTERS, "holding registers")?;
                let mut builder = builder
                    .u16(class.to_wire_address(*start)?)?
                    .u16(count)?
                    .byte((count * 2) as u8)?;
                for &value in values {
                    builder = builder.u16(value)?;
                }
                builder.build()
            }
        };

        Ok(frame)
    }

    /// Number of response bytes the slave sends back for this request
    ///
    /// `shape` only matters for Write Multiple Registers.
    pub fn expected_response_len(&self, shape: ResponseShape) -> usize {
        match &self.operation {
            Operation::ReadDiscreteInputs { count, .. } => {
                READ_RESPONSE_OVERHEAD + (*count as usize).div_ceil(8)
            }
            Operation::ReadHoldingRegisters { count, .. } => {
                READ_RESPONSE_OVERHEAD + *count as usize * 2
            }
            Operation::WriteSingleCoil { .. } | Operation::WriteSingleRegister { .. } => {
                WRITE_ACK_LEN
            }
            Operation::WriteMultipleRegisters { values, .. } => match shape {
                ResponseShape::Acknowledge => WRITE_ACK_LEN,
                // address, function, start, count, byte count, values, CRC
                ResponseShape::Echo => 2 + 2 + 2 + 1 + values.len() * 2 + CRC_LEN,
            },
        }
    }

    /// Parse a request frame back into register-number form
    pub fn decode(bytes: &[u8]) -> ModbusResult<Self> {
        let frame = RtuFrame::from_slice(bytes)?;
        if !frame.is_valid() {
            return Err(ModbusError::invalid_data(format!(
                "Request CRC mismatch: expected 0x{:04X}, got 0x{:04X}",
                frame.computed_crc(),
                frame.crc()
            )));
        }

        let function = ModbusFunction::from_u8(frame.function_code())?;
        let class = function.register_class();
        let payload = frame.payload();
        let fixed_len = function != ModbusFunction::WriteMultipleRegisters;
        if payload.len() < 4 || (fixed_len && payload.len() != 4) {
            return Err(ModbusError::invalid_data(format!(
                "{} request payload has wrong length: {} bytes",
                function.description(),
                payload.len()
            )));
        }

        let address = class.to_register_number(u16::from_be_bytes([payload[0], payload[1]]));
        let field = u16::from_be_bytes([payload[2], payload[3]]);

        let operation = match function {
            ModbusFunction::ReadDiscreteInputs => Operation::ReadDiscreteInputs {
                start: address,
                count: field,
            },
            ModbusFunction::ReadHoldingRegisters => Operation::ReadHoldingRegisters {
                start: address,
                count: field,
            },
            ModbusFunction::WriteSingleCoil => Operation::WriteSingleCoil {
                register: address,
                value: decode_coil_value(field).ok_or_else(|| {
                    ModbusError::invalid_data(format!("Invalid coil value 0x{:04X}", field))
                })?,
            },
            ModbusFunction::WriteSingleRegister => Operation::WriteSingleRegister {
                register: address,
                value: field,
            },
            ModbusFunction::WriteMultipleRegisters => {
                let byte_count = *payload.get(4).ok_or_else(|| {
                    ModbusError::invalid_data("Write Multiple Registers request missing byte count")
                })? as usize;
                let data = &payload[5..];
                if byte_count != field as usize * 2 || data.len() != byte_count {
                    return Err(ModbusError::invalid_data(format!(
                        "Byte count mismatch: quantity {} byte count {} data {}",
                        field,
                        byte_count,
                        data.len()
                    )));
                }
                Operation::WriteMultipleRegisters {
                    start: address,
                    values: decode_registers(data, field)?,
                }
            }
        };

        Ok(Self::new(frame.slave_id(), operation))
    }
}

fn check_quantity(count: u16, max: u16, what: &str) -> ModbusResult<()> {
    if count == 0 || count > max {
        return Err(ModbusError::invalid_data(format!(
            "Invalid quantity of {}: {} (must be 1-{})",
            what, count, max
        )));
    }
    Ok(())
}

/// Wire value for a coil state
#[inline]
pub fn encode_coil_value(value: bool) -> u16 {
    if value {
        COIL_ON
    } else {
        COIL_OFF
    }
}

/// Coil state from its wire value, `None` for anything but 0xFF00 / 0x0000
#[inline]
pub fn decode_coil_value(raw: u16) -> Option<bool> {
    match raw {
        COIL_ON => Some(true),
        COIL_OFF => Some(false),
        _ => None,
    }
}

/// Unpack `count` bits from response data, LSB first within each byte
pub fn decode_discrete_inputs(data: &[u8], count: u16) -> ModbusResult<Vec<bool>> {
    let count = count as usize;
    if data.len() * 8 < count {
        return Err(ModbusError::invalid_data(format!(
            "Not enough data for {} bits: {} bytes",
            count,
            data.len()
        )));
    }

    let bits: Vec<bool> = data
        .iter()
        .flat_map(|&byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
        .take(count)
        .collect();

    debug!("Decoded {} discrete inputs from {} bytes", bits.len(), data.len());
    Ok(bits)
}

/// Split response data into `count` big-endian registers
pub fn decode_registers(data: &[u8], count: u16) -> ModbusResult<Vec<u16>> {
    let count = count as usize;
    if data.len() < count * 2 {
        return Err(ModbusError::invalid_data(format!(
            "Not enough data for {} registers: {} bytes",
            count,
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(2)
        .take(count)
        .map(|word| u16::from_be_bytes([word[0], word[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::protocol::RegisterClass;
    use proptest::prelude::*;

    fn with_crc(bytes: &[u8]) -> Vec<u8> {
        let mut frame = bytes.to_vec();
        frame.extend_from_slice(&crc16(bytes));
        frame
    }

    #[test]
    fn test_encode_read_discrete_inputs() {
        let frame = ModbusRequest::read_discrete_inputs(5, 10001, 2)
            .encode()
            .unwrap();
        assert_eq!(
            frame.as_bytes(),
            with_crc(&[0x05, 0x02, 0x00, 0x00, 0x00, 0x02]).as_slice()
        );
    }

    #[test]
    fn test_encode_read_holding_registers() {
        let frame = ModbusRequest::read_holding_registers(1, 40001, 1)
            .encode()
            .unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]
        );
    }

    #[test]
    fn test_encode_write_single_coil() {
        let on = ModbusRequest::write_single_coil(1, 2, true).encode().unwrap();
        assert_eq!(on.payload(), &[0x00, 0x01, 0xFF, 0x00]);

        let off = ModbusRequest::write_single_coil(1, 2, false).encode().unwrap();
        assert_eq!(off.payload(), &[0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_write_single_register() {
        let frame = ModbusRequest::write_single_register(1, 40001, 1000)
            .encode()
            .unwrap();
        assert_eq!(
            frame.as_bytes(),
            with_crc(&[0x01, 0x06, 0x00, 0x00, 0x03, 0xE8]).as_slice()
        );
    }

    #[test]
    fn test_encode_write_multiple_registers() {
        let frame = ModbusRequest::write_multiple_registers(0xFF, 40002, &[0x000A, 0x0102])
            .encode()
            .unwrap();
        assert_eq!(
            frame.as_bytes(),
            with_crc(&[0xFF, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02])
                .as_slice()
        );
    }

    #[test]
    fn test_encode_rejects_bad_register_numbers() {
        let err = ModbusRequest::read_holding_registers(1, 30001, 1)
            .encode()
            .unwrap_err();
        assert_eq!(
            err,
            ModbusError::InvalidAddress {
                register: 30001,
                class: RegisterClass::HoldingRegister
            }
        );
        assert!(ModbusRequest::write_single_coil(1, 0, true).encode().is_err());
        assert!(ModbusRequest::read_discrete_inputs(1, 10000, 1).encode().is_err());
    }

    #[test]
    fn test_encode_rejects_bad_quantities() {
        assert!(ModbusRequest::read_discrete_inputs(1, 10001, 0).encode().is_err());
        assert!(ModbusRequest::read_discrete_inputs(1, 10001, 2001).encode().is_err());
        assert!(ModbusRequest::read_holding_registers(1, 40001, 126).encode().is_err());
        assert!(ModbusRequest::write_multiple_registers(1, 40001, &[]).encode().is_err());
        assert!(ModbusRequest::write_multiple_registers(1, 40001, &[0; 124])
            .encode()
            .is_err());
        assert!(ModbusRequest::write_multiple_registers(1, 40001, &[0; 123])
            .encode()
            .is_ok());
    }

    #[test]
    fn test_expected_response_len() {
        assert_eq!(
            ModbusRequest::read_discrete_inputs(1, 10001, 2).expected_response_len(ResponseShape::Acknowledge),
            6
        );
        assert_eq!(
            ModbusRequest::read_discrete_inputs(1, 10001, 9).expected_response_len(ResponseShape::Acknowledge),
            7
        );
        assert_eq!(
            ModbusRequest::read_holding_registers(1, 40001, 3).expected_response_len(ResponseShape::Acknowledge),
            11
        );
        assert_eq!(
            ModbusRequest::write_single_register(1, 40001, 3).expected_response_len(ResponseShape::Echo),
            8
        );

        let write = ModbusRequest::write_multiple_registers(1, 40001, &[7]);
        assert_eq!(write.expected_response_len(ResponseShape::Acknowledge), 8);
        assert_eq!(
            write.expected_response_len(ResponseShape::Echo),
            write.encode().unwrap().len()
        );
    }

    #[test]
    fn test_decode_discrete_inputs() {
        assert_eq!(decode_discrete_inputs(&[0x03], 2).unwrap(), vec![true, true]);
        assert_eq!(
            decode_discrete_inputs(&[0x05], 8).unwrap(),
            vec![true, false, true, false, false, false, false, false]
        );
        assert_eq!(
            decode_discrete_inputs(&[0x00, 0x01], 9).unwrap(),
            vec![false, false, false, false, false, false, false, false, true]
        );
        assert!(decode_discrete_inputs(&[0xFF], 9).is_err());
    }

    #[test]
    fn test_decode_registers() {
        assert_eq!(decode_registers(&[0x00, 0x2A], 1).unwrap(), vec![42]);
        assert_eq!(
            decode_registers(&[0x12, 0x34, 0xAB, 0xCD], 2).unwrap(),
            vec![0x1234, 0xABCD]
        );
        assert!(decode_registers(&[0x00], 1).is_err());
    }

    #[test]
    fn test_coil_values() {
        assert_eq!(encode_coil_value(true), 0xFF00);
        assert_eq!(encode_coil_value(false), 0x0000);
        assert_eq!(decode_coil_value(0xFF00), Some(true));
        assert_eq!(decode_coil_value(0x0000), Some(false));
        assert_eq!(decode_coil_value(0x0001), None);
    }

    #[test]
    fn test_decode_request_errors() {
        // bad CRC
        assert!(ModbusRequest::decode(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]).is_err());
        // unsupported function
        assert!(ModbusRequest::decode(&with_crc(&[0x01, 0x04, 0x00, 0x00, 0x00, 0x01])).is_err());
        // invalid coil value
        assert!(ModbusRequest::decode(&with_crc(&[0x01, 0x05, 0x00, 0x00, 0x12, 0x34])).is_err());
        // trailing bytes after a fixed-size request
        assert!(ModbusRequest::decode(&with_crc(&[
            0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00
        ]))
        .is_err());
        // byte count disagrees with quantity
        assert!(ModbusRequest::decode(&with_crc(&[
            0x01, 0x10, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00, 0x01
        ]))
        .is_err());
    }

    fn arb_request() -> impl Strategy<Value = ModbusRequest> {
        let op = prop_oneof![
            (10001u32..=10001 + 0xFFFF, 1u16..=MAX_READ_DISCRETE_INPUTS)
                .prop_map(|(start, count)| Operation::ReadDiscreteInputs { start, count }),
            (40001u32..=40001 + 0xFFFF, 1u16..=MAX_READ_REGISTERS)
                .prop_map(|(start, count)| Operation::ReadHoldingRegisters { start, count }),
            (1u32..=1 + 0xFFFF, any::<bool>())
                .prop_map(|(register, value)| Operation::WriteSingleCoil { register, value }),
            (40001u32..=40001 + 0xFFFF, any::<u16>())
                .prop_map(|(register, value)| Operation::WriteSingleRegister { register, value }),
            (
                40001u32..=40001 + 0xFFFF,
                proptest::collection::vec(any::<u16>(), 1..=MAX_WRITE_REGISTERS as usize)
            )
                .prop_map(|(start, values)| Operation::WriteMultipleRegisters { start, values }),
        ];
        (any::<u8>(), op).prop_map(|(slave_id, operation)| ModbusRequest::new(slave_id, operation))
    }

    proptest! {
        #[test]
        fn prop_wire_address_is_register_minus_base(request in arb_request()) {
            let frame = request.encode().unwrap();
            let class = request.function().register_class();
            let register = match &request.operation {
                Operation::ReadDiscreteInputs { start, .. }
                | Operation::ReadHoldingRegisters { start, .. }
                | Operation::WriteMultipleRegisters { start, .. } => *start,
                Operation::WriteSingleCoil { register, .. }
                | Operation::WriteSingleRegister { register, .. } => *register,
            };
            let field = u16::from_be_bytes([frame.payload()[0], frame.payload()[1]]);
            prop_assert_eq!(field as u32, register - class.base_offset());
        }

        #[test]
        fn prop_decode_then_encode_is_identity(request in arb_request()) {
            let frame = request.encode().unwrap();
            let decoded = ModbusRequest::decode(frame.as_bytes()).unwrap();
            prop_assert_eq!(&decoded, &request);
            prop_assert_eq!(decoded.encode().unwrap(), frame);
        }

        #[test]
        fn prop_discrete_input_decode_length(data in proptest::collection::vec(any::<u8>(), 1..32), extra in 0usize..8) {
            let count = (data.len() * 8).saturating_sub(extra) as u16;
            let bits = decode_discrete_inputs(&data, count).unwrap();
            prop_assert_eq!(bits.len(), count as usize);
            for (i, bit) in bits.iter().enumerate() {
                prop_assert_eq!(*bit, data[i / 8] & (1 << (i % 8)) != 0);
            }
        }
    }
}
