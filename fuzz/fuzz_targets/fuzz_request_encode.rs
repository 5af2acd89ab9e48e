//! Request encoding with arbitrary register numbers and quantities.

#![no_main]

use arbitrary::Arbitrary;
use cheap_modbus_rtu::{ModbusRequest, ResponseShape};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Request {
    ReadInputs { slave: u8, start: u32, count: u16 },
    ReadRegisters { slave: u8, start: u32, count: u16 },
    WriteCoil { slave: u8, register: u32, value: bool },
    WriteRegister { slave: u8, register: u32, value: u16 },
    WriteRegisters { slave: u8, start: u32, values: Vec<u16> },
}

fuzz_target!(|request: Request| {
    let request = match request {
        Request::ReadInputs { slave, start, count } => {
            ModbusRequest::read_discrete_inputs(slave, start, count)
        }
        Request::ReadRegisters { slave, start, count } => {
            ModbusRequest::read_holding_registers(slave, start, count)
        }
        Request::WriteCoil {
            slave,
            register,
            value,
        } => ModbusRequest::write_single_coil(slave, register, value),
        Request::WriteRegister {
            slave,
            register,
            value,
        } => ModbusRequest::write_single_register(slave, register, value),
        Request::WriteRegisters {
            slave,
            start,
            values,
        } => ModbusRequest::write_multiple_registers(slave, start, &values),
    };

    if let Ok(frame) = request.encode() {
        assert!(frame.is_valid());
        assert!(frame.len() <= 256);
        assert!(request.expected_response_len(ResponseShape::Acknowledge) <= 256);
        assert_eq!(ModbusRequest::decode(frame.as_bytes()).ok(), Some(request));
    }
});
