// TelemetryHub - Edge telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bus abstraction module
//!
//! A byte-oriented duplex channel between the device and an external
//! command sender. The core only ever sees the two-operation [`Bus`]
//! trait; bus-specific configuration (baud rate, device address, chip
//! select) stays on the concrete types.

use crate::MAX_BUS_BUFFER_SIZE;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Bus variants supported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    /// Asynchronous byte stream
    Uart,
    /// Addressed two-wire bus
    I2c,
    /// Chip-selected full-duplex bus
    Spi,
}

/// Duplex byte channel used by the device
///
/// Implementations guard their own buffers, so a bus can be shared
/// between the device and the external sender via `Arc<dyn Bus>`.
/// Neither operation blocks.
pub trait Bus: Send + Sync {
    /// Which variant this bus is
    fn kind(&self) -> BusKind;

    /// Append bytes to the outbound buffer
    ///
    /// Returns false when the write would exceed the outbound capacity.
    fn write(&self, data: &[u8]) -> bool;

    /// Move up to `max_len` bytes from the inbound buffer to the caller
    ///
    /// Returns an empty vec when nothing is available.
    fn read(&self, max_len: usize) -> Vec<u8>;
}

#[derive(Debug, Default)]
struct UartBuffers {
    /// Commands from external sender -> device
    inbound: VecDeque<u8>,
    /// Replies from device -> external sender
    outbound: VecDeque<u8>,
}

/// Simulated serial port (UART)
///
/// Two bounded byte FIFOs behind a single mutex. The device side uses
/// the [`Bus`] operations; the simulation side injects commands and
/// collects replies.
#[derive(Debug)]
pub struct SerialPortSim {
    buffers: Mutex<UartBuffers>,
    baud_rate: Mutex<u32>,
}

impl SerialPortSim {
    /// Create a serial port with empty buffers
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(UartBuffers::default()),
            baud_rate: Mutex::new(115_200),
        }
    }

    /// Inject a command as if sent by an external party
    ///
    /// A trailing newline is appended when missing. If the inbound
    /// buffer cannot hold the whole command it is dropped silently.
    pub fn inject(&self, command: &str) {
        if command.is_empty() {
            return;
        }

        let mut buffers = self.buffers.lock();
        let needs_newline = !command.ends_with('\n');
        let total = command.len() + usize::from(needs_newline);
        if buffers.inbound.len() + total > MAX_BUS_BUFFER_SIZE {
            return;
        }

        buffers.inbound.extend(command.bytes());
        if needs_newline {
            buffers.inbound.push_back(b'\n');
        }
    }

    /// Drain the outbound buffer up to the next newline (exclusive)
    ///
    /// Returns the accumulated reply string, or `None` when the buffer
    /// holds nothing.
    pub fn collect_response(&self) -> Option<String> {
        let mut buffers = self.buffers.lock();
        if buffers.outbound.is_empty() {
            return None;
        }

        let mut response = String::new();
        while let Some(byte) = buffers.outbound.pop_front() {
            if byte == b'\n' {
                break;
            }
            response.push(byte as char);
        }

        if response.is_empty() {
            None
        } else {
            Some(response)
        }
    }

    /// Bytes waiting in the inbound buffer
    pub fn available(&self) -> usize {
        self.buffers.lock().inbound.len()
    }

    /// Discard both buffers
    pub fn clear(&self) {
        let mut buffers = self.buffers.lock();
        buffers.inbound.clear();
        buffers.outbound.clear();
    }

    /// Configure the simulated baud rate (UART-specific, not part of [`Bus`])
    pub fn set_baud_rate(&self, rate: u32) {
        *self.baud_rate.lock() = rate;
    }

    /// Current simulated baud rate
    pub fn baud_rate(&self) -> u32 {
        *self.baud_rate.lock()
    }
}

impl Default for SerialPortSim {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SerialPortSim {
    fn kind(&self) -> BusKind {
        BusKind::Uart
    }

    fn write(&self, data: &[u8]) -> bool {
        if data.is_empty() {
            return true;
        }

        let mut buffers = self.buffers.lock();
        if buffers.outbound.len() + data.len() > MAX_BUS_BUFFER_SIZE {
            return false;
        }

        buffers.outbound.extend(data.iter().copied());
        true
    }

    fn read(&self, max_len: usize) -> Vec<u8> {
        let mut buffers = self.buffers.lock();
        let count = max_len.min(buffers.inbound.len());
        buffers.inbound.drain(..count).collect()
    }
}

/// Stub I2C bus
///
/// Holds the addressed-device configuration a real controller would
/// need; reads always come back empty.
#[derive(Debug)]
pub struct I2cBus {
    device_address: Mutex<u8>,
}

impl I2cBus {
    /// Create an I2C bus targeting the given 7-bit device address
    pub fn new(device_address: u8) -> Self {
        Self {
            device_address: Mutex::new(device_address),
        }
    }

    /// Target device address (I2C-specific, not part of [`Bus`])
    pub fn device_address(&self) -> u8 {
        *self.device_address.lock()
    }

    /// Change the target device address
    pub fn set_device_address(&self, address: u8) {
        *self.device_address.lock() = address;
    }
}

impl Default for I2cBus {
    fn default() -> Self {
        Self::new(0x50)
    }
}

impl Bus for I2cBus {
    fn kind(&self) -> BusKind {
        BusKind::I2c
    }

    fn write(&self, _data: &[u8]) -> bool {
        true
    }

    fn read(&self, _max_len: usize) -> Vec<u8> {
        Vec::new()
    }
}

/// Stub SPI bus
#[derive(Debug)]
pub struct SpiBus {
    chip_select_pin: Mutex<u8>,
}

impl SpiBus {
    /// Create an SPI bus using the given chip-select pin
    pub fn new(chip_select_pin: u8) -> Self {
        Self {
            chip_select_pin: Mutex::new(chip_select_pin),
        }
    }

    /// Chip-select pin (SPI-specific, not part of [`Bus`])
    pub fn chip_select_pin(&self) -> u8 {
        *self.chip_select_pin.lock()
    }

    /// Change the chip-select pin
    pub fn set_chip_select_pin(&self, pin: u8) {
        *self.chip_select_pin.lock() = pin;
    }
}

impl Default for SpiBus {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Bus for SpiBus {
    fn kind(&self) -> BusKind {
        BusKind::Spi
    }

    fn write(&self, _data: &[u8]) -> bool {
        true
    }

    fn read(&self, _max_len: usize) -> Vec<u8> {
        Vec::new()
    }
}
