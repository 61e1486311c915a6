// Licensed under the Apache-2.0 license

//! Composable register-interface traits for I2C hardware.
//!
//! The driver state machines never touch registers directly; everything
//! goes through these traits. Implementations map them onto one silicon
//! family, and the test build maps them onto a scriptable double. The
//! hierarchy mirrors the split between controller and responder roles:
//!
//! ```text
//! I2cHardwareCore (init, timing, events, residual)
//!     ├── I2cMasterHardware (arm transfers, drain FIFO, abort)
//!     └── I2cSlaveHardware (own address, slave transfers)
//! ```

use crate::i2c::common::{Capabilities, Event, I2cConfig, Mode};
use crate::i2c::sequencer::FrameTag;

/// Interrupt priority assigned when event reporting is enabled.
///
/// The slave role runs at the more urgent level so a responder can meet
/// the bus master's timing even while the same firmware masters other
/// transfers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IrqPriority {
    Slave = 1,
    Master = 2,
}

/// Why the peripheral raised its interrupt line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cause {
    TxComplete,
    RxComplete,
    SlaveTxComplete,
    SlaveRxComplete,
    AddressMatch(AddressMatch),
    Error(Fault),
}

/// Details of a matched slave address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressMatch {
    /// Direction bit of the address phase: the master is reading from us.
    pub master_reading: bool,
    /// The general-call address was used.
    pub general_call: bool,
}

/// Details of a hardware fault cause.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Fault {
    pub arbitration_lost: bool,
    /// Address or data byte was not acknowledged.
    pub no_ack: bool,
}

/// Foundation trait every I2C peripheral binding must provide.
pub trait I2cHardwareCore {
    /// Hardware-specific fault type for arm-time rejections.
    type Error: core::fmt::Debug;

    /// Feature set of this peripheral instance.
    fn capabilities(&self) -> Capabilities;

    /// Full peripheral (re)initialization for the given role.
    ///
    /// Re-initializing must clear any in-flight transfer state and, in
    /// slave mode, program the carried address.
    fn init(&mut self, config: &I2cConfig, mode: Mode);

    /// Release the peripheral (clocks, pins).
    fn deinit(&mut self);

    /// Program bus timing for `hz`, returning the frequency actually
    /// achieved after clamping to the supported set.
    fn configure_timing(&mut self, hz: u32) -> u32;

    /// Enable or disable clock stretching. Peripherals without the knob
    /// accept the call and ignore it.
    fn set_clock_stretching(&mut self, enabled: bool);

    /// Enable event reporting at the given interrupt priority.
    fn enable_events(&mut self, priority: IrqPriority);

    /// Mask event reporting.
    fn disable_events(&mut self);

    /// Drop any latched events and causes.
    fn clear_events(&mut self);

    /// Latched transfer events since the last [`clear_events`].
    ///
    /// [`clear_events`]: I2cHardwareCore::clear_events
    fn poll_events(&mut self) -> Event;

    /// Pop the next pending interrupt cause, if any.
    fn take_cause(&mut self) -> Option<Cause>;

    /// Bytes of the current (or just-finished) transfer not yet moved.
    fn residual(&self) -> usize;

    /// Drain received bytes into `buffer`, returning how many were moved.
    fn collect_received(&mut self, buffer: &mut [u8]) -> usize;
}

/// Master-role operations: arming transfers and tearing them down.
pub trait I2cMasterHardware: I2cHardwareCore {
    /// Arm a transmit of `data` to `address`.
    ///
    /// The address is left-aligned (the R/W bit position is don't-care).
    /// Data is captured by the peripheral at arm time; completion is
    /// reported through events and causes.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when the peripheral cannot accept a transfer now
    /// (typically because the bus or the peripheral is busy).
    fn start_transmit(&mut self, address: u16, data: &[u8], tag: FrameTag)
        -> nb::Result<(), Self::Error>;

    /// Arm a receive of `length` bytes from `address`.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when the peripheral cannot accept a transfer now.
    fn start_receive(&mut self, address: u16, length: usize, tag: FrameTag)
        -> nb::Result<(), Self::Error>;

    /// Cancel whatever transfer is in flight and idle the peripheral.
    fn abort(&mut self);
}

/// Slave-role operations.
pub trait I2cSlaveHardware: I2cHardwareCore {
    /// Program the address this peripheral answers to.
    fn set_own_address(&mut self, raw: u16);

    fn own_address(&self) -> Option<u16>;

    /// Arm a slave transmit, served when the master next reads from us.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when the peripheral cannot accept a transfer now.
    fn slave_transmit(&mut self, data: &[u8], tag: FrameTag) -> nb::Result<(), Self::Error>;

    /// Arm a slave receive of up to `length` bytes.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when the peripheral cannot accept a transfer now.
    fn slave_receive(&mut self, length: usize, tag: FrameTag) -> nb::Result<(), Self::Error>;
}

/// Deep-sleep inhibitor collaborator.
///
/// An interrupt-driven transfer dies if the core drops to a sleep state
/// that stops the peripheral clock, so the async engine holds a lock for
/// the duration of each transfer.
pub trait PowerManager {
    fn lock_deep_sleep(&mut self);
    fn unlock_deep_sleep(&mut self);
}

/// Power manager for systems without sleep states.
#[derive(Default, Clone, Copy)]
pub struct NoPower;

impl PowerManager for NoPower {
    fn lock_deep_sleep(&mut self) {}
    fn unlock_deep_sleep(&mut self) {}
}
