//! Cheap Modbus RTU Demo
//!
//! Drives a two-channel relay board on a USB-RS485 adapter:
//! - Frame encoding and CRC (no hardware required)
//! - Slave id discovery by broadcast (only one board on the bus!)
//! - Relay switching and digital input readout
//!
//! Usage: cargo run --features demo --bin demo [serial_device] [slave_id]
//! Example: cargo run --features demo --bin demo /dev/ttyUSB0 1
//!
//! Set `RUST_LOG=debug` to see frame-level logging.

use std::thread::sleep;
use std::time::Duration;

use cheap_modbus_rtu::transport::{default_device_path, format_hex_packet};
use cheap_modbus_rtu::{
    IoModule, IoModuleModel, MasterConfig, ModbusRequest, ModbusRtuMaster, ResponseShape,
    SerialConfig, SerialTransport,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    println!("Cheap Modbus RTU v{} Demo", cheap_modbus_rtu::VERSION);
    println!("============================\n");

    // =========================================================================
    // Part 1: Frames (no hardware required)
    // =========================================================================
    println!("Part 1: Request frames");
    println!("----------------------");

    let requests = [
        ModbusRequest::read_discrete_inputs(5, 10001, 2),
        ModbusRequest::read_holding_registers(1, 40001, 1),
        ModbusRequest::write_single_coil(1, 1, true),
        ModbusRequest::write_single_register(1, 40001, 1000),
        ModbusRequest::write_multiple_registers(255, 40001, &[3]),
    ];
    for request in &requests {
        let frame = request.encode()?;
        println!(
            "  {:<26} {:<40} reply {} bytes",
            request.function().description(),
            format_hex_packet(frame.as_bytes()),
            request.expected_response_len(ResponseShape::Echo)
        );
    }

    // =========================================================================
    // Part 2: Relay board on the bus
    // =========================================================================
    println!("\nPart 2: Relay board");
    println!("-------------------");

    let mut args = std::env::args().skip(1);
    let device = args
        .next()
        .unwrap_or_else(|| default_device_path().to_string());
    let slave_id: Option<u8> = args.next().map(|s| s.parse()).transpose()?;

    println!("  Opening {}...", device);
    let transport = match SerialTransport::open(&SerialConfig::new(device)) {
        Ok(transport) => transport,
        Err(e) => {
            println!("  Serial port unavailable: {}", e);
            println!("\nDemo completed! (bus operations skipped)");
            return Ok(());
        }
    };

    let config = MasterConfig::new()
        .with_timeout(Duration::from_millis(500))
        .with_packet_logging(true);
    let master = ModbusRtuMaster::with_config(transport, config);
    let mut relay = IoModule::new(master, IoModuleModel::RELAY_2CH);

    match slave_id {
        Some(id) => {
            relay = IoModule::with_slave_id(relay.into_master(), IoModuleModel::RELAY_2CH, id);
        }
        None => match relay.get_broadcast_slave_id() {
            Ok(id) => println!("  Discovered slave id {}", id),
            Err(e) => println!("  Broadcast discovery failed: {}", e),
        },
    }
    println!("  Using slave id {}", relay.slave_id());

    for channel in 1..=relay.model().output_channels {
        match relay.set_output(channel, true) {
            Ok(()) => println!("  Relay {} ON", channel),
            Err(e) => println!("  Relay {} error: {}", channel, e),
        }
        sleep(Duration::from_millis(500));
        if let Err(e) = relay.clear_output(channel) {
            println!("  Relay {} error: {}", channel, e);
        }
    }

    match relay.get_inputs() {
        Ok(inputs) => println!("  Inputs: {:?}", inputs),
        Err(e) => println!("  Input read error: {}", e),
    }

    let stats = relay.master().stats();
    println!("\n  Statistics:");
    println!(
        "    Requests: {}, Responses: {}, Timeouts: {}, CRC errors: {}",
        stats.requests_sent, stats.responses_received, stats.timeouts, stats.crc_errors
    );
    println!(
        "    Bytes sent: {}, received: {}",
        stats.bytes_sent, stats.bytes_received
    );

    println!("\nDemo completed!");
    Ok(())
}
