//! End-to-end: relay board driver over the RTU master and a simulated bus.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use cheap_modbus_rtu::{
    crc16, IoModule, IoModuleModel, ModbusError, ModbusMaster, ModbusRequest, ModbusRtuMaster,
    Operation, ResponseShape, Transport,
};

/// Simulated two-channel relay board that echoes FC16 requests
struct SimulatedBoard {
    slave_id: u8,
    coils: [bool; 2],
    inputs: u8,
    pending: VecDeque<u8>,
    /// Drop this many trailing bytes from the next reply
    truncate_next: usize,
}

impl SimulatedBoard {
    fn new(slave_id: u8) -> Self {
        Self {
            slave_id,
            coils: [false; 2],
            inputs: 0b10,
            pending: VecDeque::new(),
            truncate_next: 0,
        }
    }

    fn reply(&mut self, body: &[u8]) {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16(body));
        let keep = frame.len().saturating_sub(self.truncate_next);
        self.truncate_next = 0;
        self.pending.extend(&frame[..keep]);
    }
}

impl Transport for SimulatedBoard {
    fn write_all(&mut self, frame: &[u8]) -> io::Result<()> {
        let request = ModbusRequest::decode(frame)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let addressed = matches!(request.slave_id, 0 | 255) || request.slave_id == self.slave_id;
        if !addressed {
            return Ok(());
        }

        let id = self.slave_id;
        match request.operation {
            Operation::ReadDiscreteInputs { count, .. } => {
                let bytes = (count as usize).div_ceil(8) as u8;
                let mut body = vec![id, 0x02, bytes, self.inputs];
                body.resize(3 + bytes as usize, 0);
                self.reply(&body);
            }
            Operation::ReadHoldingRegisters { .. } => self.reply(&[id, 0x03, 0x02, 0x00, id]),
            Operation::WriteSingleCoil { register, value } => {
                self.coils[(register - 1) as usize] = value;
                self.reply(&frame[..frame.len() - 2]);
            }
            Operation::WriteSingleRegister { .. } => self.reply(&frame[..frame.len() - 2]),
            Operation::WriteMultipleRegisters { values, .. } => {
                self.reply(&frame[..frame.len() - 2]);
                self.slave_id = values[0] as u8;
            }
        }
        Ok(())
    }

    fn read_up_to(&mut self, len: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let n = len.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

#[test]
fn test_discover_switch_and_read() {
    let mut master = ModbusRtuMaster::new(SimulatedBoard::new(9));
    let mut relay = IoModule::new(&mut master, IoModuleModel::RELAY_2CH);

    assert_eq!(relay.get_broadcast_slave_id().unwrap(), 9);
    relay.set_output(2, true).unwrap();
    assert_eq!(relay.get_inputs().unwrap(), vec![false, true]);
    assert!(relay.get_input(2).unwrap());

    assert_eq!(master.transport().coils, [false, true]);
    assert_eq!(master.stats().responses_received, 4);
}

#[test]
fn test_readdress_board_with_echo_reply() {
    let mut master = ModbusRtuMaster::new(SimulatedBoard::new(255));
    {
        let mut relay = IoModule::new(&mut master, IoModuleModel::RELAY_2CH);
        relay.set_slave_id(3).unwrap();
        assert_eq!(relay.slave_id(), 3);
        relay.set_output(1, true).unwrap();
    }
    assert_eq!(master.transport().slave_id, 3);
    assert_eq!(master.transport().coils, [true, false]);
}

#[test]
fn test_undeclared_echo_is_rejected() {
    let mut master = ModbusRtuMaster::new(SimulatedBoard::new(1));
    let relay_like = IoModuleModel::RELAY_2CH.with_slave_id_response(ResponseShape::Acknowledge);
    let mut relay = IoModule::with_slave_id(&mut master, relay_like, 1);

    // the board echoes 11 bytes; the first 8 fail the CRC check
    let err = relay.set_slave_id(2).unwrap_err();
    assert!(err.is_integrity_error(), "unexpected error: {err}");
    assert_eq!(relay.slave_id(), 1);
}

#[test]
fn test_truncated_reply_then_recovery() {
    let mut master = ModbusRtuMaster::new(SimulatedBoard::new(4));
    master.transport_mut().truncate_next = 3;

    let err = master.read_holding_registers(4, 40001, 1).unwrap_err();
    match err {
        ModbusError::Timeout {
            expected, received, ..
        } => {
            assert_eq!(expected, 7);
            assert_eq!(received.len(), 4);
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    // caller retries the whole transaction from scratch
    assert_eq!(master.read_holding_registers(4, 40001, 1).unwrap(), vec![4]);
    assert_eq!(master.stats().timeouts, 1);
    assert_eq!(master.stats().responses_received, 1);
}

#[test]
fn test_silent_slave_times_out() {
    let mut master = ModbusRtuMaster::new(SimulatedBoard::new(4));
    let err = master.write_single_register(8, 40001, 1).unwrap_err();
    assert!(err.is_timeout());
}
