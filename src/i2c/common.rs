// Licensed under the Apache-2.0 license

//! Common types and constants for the I2C driver modules.
//!
//! This module provides shared definitions for transfer events, status
//! codes, capabilities and configuration used across the I2C driver
//! implementation.

use core::ops::{BitOr, BitOrAssign};

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use fugit::MicrosDurationU32;

/// Transfer event bitmask reported by a completed or failed transfer.
///
/// Bit positions are part of the driver ABI; callers may combine them to
/// build interest masks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Event(u32);

impl Event {
    pub const NONE: Event = Event(0);
    /// Generic transfer error.
    pub const ERROR: Event = Event(1 << 1);
    /// Address phase was not acknowledged.
    pub const ERROR_NO_SLAVE: Event = Event(1 << 2);
    pub const TRANSFER_COMPLETE: Event = Event(1 << 3);
    /// A data byte was NACKed before the transfer finished.
    pub const EARLY_NACK: Event = Event(1 << 4);
    pub const ARBITRATION_LOST: Event = Event(1 << 5);
    /// Every event the driver can report.
    pub const ANY: Event = Event(
        Self::ERROR.0
            | Self::ERROR_NO_SLAVE.0
            | Self::TRANSFER_COMPLETE.0
            | Self::EARLY_NACK.0
            | Self::ARBITRATION_LOST.0,
    );

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Event {
        Event(bits & Self::ANY.0)
    }

    #[must_use]
    pub const fn contains(self, other: Event) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Event) -> bool {
        (self.0 & other.0) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Event {
    type Output = Event;

    fn bitor(self, rhs: Event) -> Event {
        Event(self.0 | rhs.0)
    }
}

impl BitOrAssign for Event {
    fn bitor_assign(&mut self, rhs: Event) {
        self.0 |= rhs.0;
    }
}

/// Failure outcomes of master and slave transfers.
///
/// Discriminants match the signed error codes of the wire-level API so the
/// raw value can be surfaced on debug interfaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum I2cStatus {
    /// Address phase not acknowledged by any device.
    NoSlave = -1,
    /// The peripheral or the bus could not accept the request.
    BusBusy = -2,
    /// The transfer did not complete within its budget.
    Timeout = -3,
    /// Lost bus mastership to another controller mid-transfer.
    ArbitrationLost = -4,
}

impl I2cStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl embedded_hal::i2c::Error for I2cStatus {
    fn kind(&self) -> ErrorKind {
        match self {
            I2cStatus::NoSlave => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            I2cStatus::BusBusy => ErrorKind::Bus,
            I2cStatus::Timeout => ErrorKind::Other,
            I2cStatus::ArbitrationLost => ErrorKind::ArbitrationLoss,
        }
    }
}

/// Read-only feature descriptor of one I2C peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub minimum_frequency: u32,
    pub maximum_frequency: u32,
    pub supports_slave_mode: bool,
    pub supports_10bit_addressing: bool,
    pub supports_multi_master: bool,
    pub supports_clock_stretching: bool,
}

/// What the bus master is currently asking of the slave responder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlaveStatus {
    Idle,
    /// Master wants to read from us.
    ReadAddressed,
    /// Master broadcast a general-call write.
    WriteGeneral,
    /// Master wants to write to us.
    WriteAddressed,
}

/// Role the peripheral is initialized for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Master,
    Slave { address: u16 },
}

/// Pick the supported frequency closest to `hz`.
///
/// Ties resolve to the later-scanned candidate, so with an ascending table
/// an equidistant request lands on the higher frequency. An empty table
/// returns `hz` unchanged.
#[must_use]
pub fn closest_supported(supported: &[u32], hz: u32) -> u32 {
    let mut best = hz;
    let mut best_delta = u32::MAX;
    for &candidate in supported {
        let delta = candidate.abs_diff(hz);
        if delta <= best_delta {
            best = candidate;
            best_delta = delta;
        }
    }
    best
}

/// Bus configuration. Build with [`I2cConfigBuilder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    /// Requested bus clock in Hz; the hardware programs the nearest
    /// supported value.
    pub frequency: u32,
    /// Per-transfer budget override. `None` derives the budget from the
    /// transfer length and the bus clock.
    pub timeout: Option<MicrosDurationU32>,
    /// How long the blocking engine sleeps between completion polls.
    pub poll_granularity: MicrosDurationU32,
    pub multi_master: bool,
    pub clock_stretching: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    frequency: u32,
    timeout: Option<MicrosDurationU32>,
    poll_granularity: MicrosDurationU32,
    multi_master: bool,
    clock_stretching: bool,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frequency: 100_000,
            timeout: None,
            poll_granularity: MicrosDurationU32::micros(1),
            multi_master: false,
            clock_stretching: true,
        }
    }

    #[must_use]
    pub fn frequency(mut self, hz: u32) -> Self {
        self.frequency = hz;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<MicrosDurationU32>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn poll_granularity(mut self, granularity: MicrosDurationU32) -> Self {
        self.poll_granularity = granularity;
        self
    }

    #[must_use]
    pub fn multi_master(mut self, enabled: bool) -> Self {
        self.multi_master = enabled;
        self
    }

    #[must_use]
    pub fn clock_stretching(mut self, enabled: bool) -> Self {
        self.clock_stretching = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            frequency: self.frequency,
            timeout: self.timeout,
            poll_granularity: self.poll_granularity,
            multi_master: self.multi_master,
            clock_stretching: self.clock_stretching,
        }
    }
}
