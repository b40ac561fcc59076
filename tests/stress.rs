//! Stress tests for the device layer
//!
//! Run with: cargo test --release stress -- --ignored

use std::time::Instant;
use telemetryhub::{Device, SerialPortSim};
use std::sync::Arc;

#[test]
#[ignore] // Run manually with --ignored
fn stress_test_sampling() {
    let device = Device::new();
    device.start();

    let iterations: u32 = 1_000_000;
    let start = Instant::now();

    for i in 0..iterations {
        let sample = device.read_sample().expect("no faults configured");
        assert_eq!(sample.sequence_id, i);
    }

    let elapsed = start.elapsed();
    let rate = f64::from(iterations) / elapsed.as_secs_f64();

    println!("Read {} samples in {:?}", iterations, elapsed);
    println!("Rate: {:.0} samples/second", rate);

    assert!(
        rate > 100_000.0,
        "Should read at least 100k samples/s, got {:.0}",
        rate
    );
}

#[test]
#[ignore]
fn stress_test_command_round_trips() {
    let device = Device::new();
    let serial = Arc::new(SerialPortSim::new());
    device.bind_bus(serial.clone());

    let iterations: u32 = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        serial.inject("GET_STATUS");
        let reply = device.process_serial_commands().unwrap();
        assert!(reply.starts_with("STATUS:"));
        serial.collect_response().unwrap();
    }

    let elapsed = start.elapsed();
    let rate = f64::from(iterations) / elapsed.as_secs_f64();

    println!("Round-tripped {} commands in {:?}", iterations, elapsed);
    println!("Rate: {:.0} commands/second", rate);

    assert!(
        rate > 10_000.0,
        "Should process at least 10k commands/s, got {:.0}",
        rate
    );
}
