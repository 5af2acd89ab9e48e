//! Modbus protocol definitions: slave addressing, function codes and register classes

use std::fmt;

use crate::constants::{
    COIL_BASE, DISCRETE_INPUT_BASE, FC_READ_DISCRETE_INPUTS, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_COIL, FC_WRITE_SINGLE_REGISTER,
    HOLDING_REGISTER_BASE,
};
use crate::error::{ModbusError, ModbusResult};

/// Modbus slave address (0-255)
pub type SlaveId = u8;

/// Standard broadcast address
pub const BROADCAST_SLAVE_ID: SlaveId = 0;

/// Broadcast address used by some vendors instead of 0 (non-standard)
pub const VENDOR_BROADCAST_SLAVE_ID: SlaveId = 0xFF;

/// Returns true for either broadcast convention
pub fn is_broadcast(slave_id: SlaveId) -> bool {
    slave_id == BROADCAST_SLAVE_ID || slave_id == VENDOR_BROADCAST_SLAVE_ID
}

/// Function codes supported by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusFunction {
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleRegisters,
}

impl ModbusFunction {
    pub fn to_u8(self) -> u8 {
        match self {
            ModbusFunction::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            ModbusFunction::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            ModbusFunction::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            ModbusFunction::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            ModbusFunction::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    pub fn from_u8(code: u8) -> ModbusResult<Self> {
        match code {
            FC_READ_DISCRETE_INPUTS => Ok(ModbusFunction::ReadDiscreteInputs),
            FC_READ_HOLDING_REGISTERS => Ok(ModbusFunction::ReadHoldingRegisters),
            FC_WRITE_SINGLE_COIL => Ok(ModbusFunction::WriteSingleCoil),
            FC_WRITE_SINGLE_REGISTER => Ok(ModbusFunction::WriteSingleRegister),
            FC_WRITE_MULTIPLE_REGISTERS => Ok(ModbusFunction::WriteMultipleRegisters),
            _ => Err(ModbusError::invalid_data(format!(
                "Unsupported function code 0x{:02X}",
                code
            ))),
        }
    }

    /// Register class addressed by this function
    pub fn register_class(self) -> RegisterClass {
        match self {
            ModbusFunction::ReadDiscreteInputs => RegisterClass::DiscreteInput,
            ModbusFunction::WriteSingleCoil => RegisterClass::Coil,
            ModbusFunction::ReadHoldingRegisters
            | ModbusFunction::WriteSingleRegister
            | ModbusFunction::WriteMultipleRegisters => RegisterClass::HoldingRegister,
        }
    }

    /// Human-readable name, used in log output
    pub fn description(self) -> &'static str {
        match self {
            ModbusFunction::ReadDiscreteInputs => "Read Discrete Inputs",
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }
}

/// Modbus register classes and their classic numbering bases
///
/// | Class | First register | Wire address |
/// |-------|----------------|--------------|
/// | Coil | 1 | register - 1 |
/// | Discrete input | 10001 | register - 10001 |
/// | Holding register | 40001 | register - 40001 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    DiscreteInput,
    Coil,
    HoldingRegister,
}

impl RegisterClass {
    /// Register number that maps to wire address 0
    pub fn base_offset(self) -> u32 {
        match self {
            RegisterClass::DiscreteInput => DISCRETE_INPUT_BASE,
            RegisterClass::Coil => COIL_BASE,
            RegisterClass::HoldingRegister => HOLDING_REGISTER_BASE,
        }
    }

    /// Highest register number that still fits the 16-bit wire field
    pub fn last_register(self) -> u32 {
        self.base_offset() + u16::MAX as u32
    }

    /// Translate a register number into the zero-based wire address
    pub fn to_wire_address(self, register: u32) -> ModbusResult<u16> {
        register
            .checked_sub(self.base_offset())
            .and_then(|offset| u16::try_from(offset).ok())
            .ok_or(ModbusError::InvalidAddress {
                register,
                class: self,
            })
    }

    /// Translate a wire address back into a register number
    pub fn to_register_number(self, wire_address: u16) -> u32 {
        self.base_offset() + wire_address as u32
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterClass::DiscreteInput => "discrete input",
            RegisterClass::Coil => "coil",
            RegisterClass::HoldingRegister => "holding register",
        };
        f.write_str(name)
    }
}

/// Reply form a slave uses for Write Multiple Registers (FC16)
///
/// The standard reply is an 8-byte acknowledgment carrying the start address
/// and quantity. Some cheap boards instead echo the entire request frame. The
/// two cannot be told apart reliably from the byte count alone, so the caller
/// declares which one to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// Standard 8-byte acknowledgment
    #[default]
    Acknowledge,
    /// Full copy of the request frame
    Echo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_code_round_trip() {
        for fc in [0x02, 0x03, 0x05, 0x06, 0x10] {
            assert_eq!(ModbusFunction::from_u8(fc).unwrap().to_u8(), fc);
        }
        assert!(ModbusFunction::from_u8(0x01).is_err());
        assert!(ModbusFunction::from_u8(0x83).is_err());
    }

    #[test]
    fn test_register_class_of_function() {
        assert_eq!(
            ModbusFunction::ReadDiscreteInputs.register_class(),
            RegisterClass::DiscreteInput
        );
        assert_eq!(
            ModbusFunction::WriteSingleCoil.register_class(),
            RegisterClass::Coil
        );
        assert_eq!(
            ModbusFunction::WriteMultipleRegisters.register_class(),
            RegisterClass::HoldingRegister
        );
    }

    #[test]
    fn test_wire_address_bounds() {
        let hr = RegisterClass::HoldingRegister;
        assert_eq!(hr.to_wire_address(40001).unwrap(), 0);
        assert_eq!(hr.to_wire_address(40001 + 0xFFFF).unwrap(), 0xFFFF);
        assert!(hr.to_wire_address(40000).is_err());
        assert!(hr.to_wire_address(40001 + 0x1_0000).is_err());

        assert_eq!(RegisterClass::Coil.to_wire_address(1).unwrap(), 0);
        assert!(RegisterClass::Coil.to_wire_address(0).is_err());
        assert_eq!(
            RegisterClass::DiscreteInput.to_wire_address(10008).unwrap(),
            7
        );
    }

    #[test]
    fn test_register_number_from_wire() {
        assert_eq!(RegisterClass::HoldingRegister.to_register_number(2), 40003);
        assert_eq!(RegisterClass::Coil.to_register_number(0), 1);
        assert_eq!(RegisterClass::DiscreteInput.last_register(), 10001 + 65535);
    }

    #[test]
    fn test_broadcast() {
        assert!(is_broadcast(0));
        assert!(is_broadcast(255));
        assert!(!is_broadcast(1));
    }
}
