//! Request parsing: arbitrary frames either fail cleanly or re-encode identically.

#![no_main]

use cheap_modbus_rtu::ModbusRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = ModbusRequest::decode(data) {
        if let Ok(frame) = request.encode() {
            assert_eq!(frame.as_bytes(), data);
        }
    }
});
