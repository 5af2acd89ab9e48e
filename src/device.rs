//! # Relay and IO Modules
//!
//! Cheap RS-485 relay boards differ mostly in channel count and register map.
//! Instead of one type per board, [`IoModule`] is driven by an
//! [`IoModuleModel`] that carries those numbers as data.
//!
//! | Board | Outputs | Inputs | Inputs register | Slave id register |
//! |-------|---------|--------|-----------------|-------------------|
//! | bestep 2-channel relay | 2 | 2 | 10001 | 40001 (echo reply) |
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> cheap_modbus_rtu::ModbusResult<()> {
//! use cheap_modbus_rtu::transport::{default_device_path, SerialConfig, SerialTransport};
//! use cheap_modbus_rtu::{IoModule, IoModuleModel, ModbusRtuMaster};
//!
//! let transport = SerialTransport::open(&SerialConfig::new(default_device_path()))?;
//! let mut relay = IoModule::new(ModbusRtuMaster::new(transport), IoModuleModel::RELAY_2CH);
//!
//! // only one board may be on the bus for this
//! let slave_id = relay.get_broadcast_slave_id()?;
//! println!("Found relay board at slave id {}", slave_id);
//!
//! relay.set_output(1, true)?;
//! println!("Inputs: {:?}", relay.get_inputs()?);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

use tracing::debug;

use crate::client::ModbusMaster;
use crate::constants::{COIL_BASE, DISCRETE_INPUT_BASE, HOLDING_REGISTER_BASE};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ResponseShape, SlaveId, BROADCAST_SLAVE_ID, VENDOR_BROADCAST_SLAVE_ID};

/// Number of discrete inputs fetched per query.
pub const DEFAULT_INPUT_BLOCK: u16 = 8;

/// Register map and channel counts of one IO module variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoModuleModel {
    /// Board name, used in log output.
    pub name: &'static str,
    /// Number of relay / digital outputs.
    pub output_channels: u16,
    /// Number of digital inputs.
    pub input_channels: u16,
    /// Coil register of output 1.
    pub coil_base: u32,
    /// Discrete input register of input 1.
    pub input_register: u32,
    /// Inputs read per query (some boards only answer full 8-bit blocks).
    pub input_block: u16,
    /// Holding register storing the slave id.
    pub slave_id_register: u32,
    /// Reply form when the slave id register is rewritten.
    pub slave_id_response: ResponseShape,
}

impl IoModuleModel {
    /// bestep two-channel relay board with two isolated digital inputs
    pub const RELAY_2CH: IoModuleModel = IoModuleModel {
        name: "relay-2ch",
        output_channels: 2,
        input_channels: 2,
        coil_base: COIL_BASE,
        input_register: DISCRETE_INPUT_BASE,
        input_block: DEFAULT_INPUT_BLOCK,
        slave_id_register: HOLDING_REGISTER_BASE,
        slave_id_response: ResponseShape::Echo,
    };

    /// Model with the classic register map and the given channel counts.
    pub fn new(name: &'static str, output_channels: u16, input_channels: u16) -> Self {
        Self {
            name,
            output_channels,
            input_channels,
            ..Self::RELAY_2CH
        }
    }

    pub fn with_coil_base(mut self, register: u32) -> Self {
        self.coil_base = register;
        self
    }

    pub fn with_input_register(mut self, register: u32) -> Self {
        self.input_register = register;
        self
    }

    pub fn with_input_block(mut self, count: u16) -> Self {
        self.input_block = count;
        self
    }

    pub fn with_slave_id_register(mut self, register: u32) -> Self {
        self.slave_id_register = register;
        self
    }

    pub fn with_slave_id_response(mut self, shape: ResponseShape) -> Self {
        self.slave_id_response = shape;
        self
    }

    /// Number of inputs requested per read, never fewer than the board has.
    fn input_read_count(&self) -> u16 {
        self.input_block.max(self.input_channels)
    }
}

/// Driver for a relay / IO module on the bus.
pub struct IoModule<M: ModbusMaster> {
    master: M,
    model: IoModuleModel,
    slave_id: SlaveId,
}

impl<M: ModbusMaster> IoModule<M> {
    /// Driver addressing the vendor broadcast id (255) until a slave id is set.
    pub fn new(master: M, model: IoModuleModel) -> Self {
        Self::with_slave_id(master, model, VENDOR_BROADCAST_SLAVE_ID)
    }

    pub fn with_slave_id(master: M, model: IoModuleModel, slave_id: SlaveId) -> Self {
        Self {
            master,
            model,
            slave_id,
        }
    }

    pub fn slave_id(&self) -> SlaveId {
        self.slave_id
    }

    pub fn model(&self) -> &IoModuleModel {
        &self.model
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut M {
        &mut self.master
    }

    pub fn into_master(self) -> M {
        self.master
    }

    /// Switch output `channel` (1-based).
    pub fn set_output(&mut self, channel: u16, active: bool) -> ModbusResult<()> {
        check_channel(channel, self.model.output_channels)?;
        let register = self.model.coil_base + (channel - 1) as u32;
        debug!(
            "{} slave {}: output {} -> {}",
            self.model.name, self.slave_id, channel, active
        );
        self.master.write_single_coil(self.slave_id, register, active)
    }

    /// Release output `channel` (1-based).
    pub fn clear_output(&mut self, channel: u16) -> ModbusResult<()> {
        self.set_output(channel, false)
    }

    /// State of all digital inputs, input 1 first.
    pub fn get_inputs(&mut self) -> ModbusResult<Vec<bool>> {
        let mut inputs = self.master.read_discrete_inputs(
            self.slave_id,
            self.model.input_register,
            self.model.input_read_count(),
        )?;
        inputs.truncate(self.model.input_channels as usize);
        Ok(inputs)
    }

    /// State of digital input `channel` (1-based).
    pub fn get_input(&mut self, channel: u16) -> ModbusResult<bool> {
        check_channel(channel, self.model.input_channels)?;
        let inputs = self.get_inputs()?;
        inputs
            .get((channel - 1) as usize)
            .copied()
            .ok_or_else(|| {
                ModbusError::invalid_data(format!("Input {} missing from response", channel))
            })
    }

    /// Store a new slave id in the device and address it from now on.
    pub fn set_slave_id(&mut self, slave_id: SlaveId) -> ModbusResult<()> {
        self.master.write_multiple_registers(
            self.slave_id,
            self.model.slave_id_register,
            &[slave_id as u16],
            self.model.slave_id_response,
        )?;
        debug!(
            "{}: slave id changed {} -> {}",
            self.model.name, self.slave_id, slave_id
        );
        self.slave_id = slave_id;
        Ok(())
    }

    /// Ask the bus for the slave id of the single attached device.
    ///
    /// The query goes to the broadcast address. Modbus has no collision
    /// detection, so the answer is only meaningful with exactly one device on
    /// the bus.
    pub fn get_broadcast_slave_id(&mut self) -> ModbusResult<SlaveId> {
        let registers = self.master.read_holding_registers(
            BROADCAST_SLAVE_ID,
            self.model.slave_id_register,
            1,
        )?;
        let raw = registers
            .first()
            .copied()
            .ok_or_else(|| ModbusError::invalid_data("Empty slave id response"))?;
        let slave_id = SlaveId::try_from(raw).map_err(|_| {
            ModbusError::invalid_data(format!("Slave id register holds {} (must be 0-255)", raw))
        })?;
        debug!("{}: discovered slave id {}", self.model.name, slave_id);
        self.slave_id = slave_id;
        Ok(slave_id)
    }
}

fn check_channel(channel: u16, channels: u16) -> ModbusResult<()> {
    if channel == 0 || channel > channels {
        return Err(ModbusError::ChannelOutOfRange { channel, channels });
    }
    Ok(())
}
