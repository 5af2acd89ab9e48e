//! Arbitrary bytes from the bus must never panic the transaction engine.

#![no_main]

use std::io;
use std::time::Duration;

use arbitrary::Arbitrary;
use cheap_modbus_rtu::{ModbusMaster, ModbusRtuMaster, ResponseShape, Transport};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    op: u8,
    count: u8,
    reply: Vec<u8>,
}

struct Replay(Vec<u8>);

impl Transport for Replay {
    fn write_all(&mut self, _frame: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn read_up_to(&mut self, len: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let n = len.min(self.0.len());
        Ok(self.0.drain(..n).collect())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let mut master = ModbusRtuMaster::new(Replay(input.reply));
    let count = u16::from(input.count.max(1));
    match input.op % 5 {
        0 => {
            if let Ok(bits) = master.read_discrete_inputs(1, 10001, count) {
                assert_eq!(bits.len(), count as usize);
            }
        }
        1 => {
            if let Ok(values) = master.read_holding_registers(1, 40001, count.min(125)) {
                assert_eq!(values.len(), count.min(125) as usize);
            }
        }
        2 => {
            let _ = master.write_single_coil(1, 1, true);
        }
        3 => {
            let _ = master.write_single_register(1, 40001, count);
        }
        _ => {
            let _ = master.write_multiple_registers(1, 40001, &[count], ResponseShape::Echo);
        }
    }
});
