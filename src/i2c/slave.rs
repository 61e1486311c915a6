// Licensed under the Apache-2.0 license

//! Slave responder: answer when a bus master addresses us.
//!
//! The responder tracks two sticky flags, one per transfer direction,
//! set when the hardware matches our address and cleared when the
//! corresponding transfer completes. [`I2cSlaveDevice::status`] exposes
//! them so firmware can poll for work; `read`/`write` then move the
//! bytes, blocking under the same length-scaled budget as the master
//! engines.

use embedded_hal::delay::DelayNs;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{I2cConfig, I2cStatus, Mode, SlaveStatus};
use crate::i2c::sequencer::FrameTag;
use crate::i2c::timeout;
use crate::i2c::traits::{Cause, I2cSlaveHardware, IrqPriority};

/// Address bit marking the slave role at the hardware seam.
const SLAVE_MARKER: u16 = 1;

pub struct I2cSlaveDevice<H, D, L = NoOpLogger> {
    hw: H,
    delay: D,
    logger: L,
    config: I2cConfig,
    own_address: u16,
    /// Master addressed us wanting to read (we transmit).
    master_reading: bool,
    /// Master addressed us wanting to write (we receive).
    master_writing: bool,
    general_call: bool,
}

impl<H, D> I2cSlaveDevice<H, D>
where
    H: I2cSlaveHardware,
    D: DelayNs,
{
    /// Bring up the peripheral in slave mode. No address is answered
    /// until [`I2cSlaveDevice::set_address`] programs one.
    pub fn new(hw: H, delay: D, config: I2cConfig) -> Self {
        Self::with_logger(hw, delay, NoOpLogger, config)
    }
}

impl<H, D, L> I2cSlaveDevice<H, D, L>
where
    H: I2cSlaveHardware,
    D: DelayNs,
    L: Logger,
{
    pub fn with_logger(hw: H, delay: D, logger: L, mut config: I2cConfig) -> Self {
        let mut device = Self {
            hw,
            delay,
            logger,
            config,
            own_address: 0,
            master_reading: false,
            master_writing: false,
            general_call: false,
        };
        device.hw.init(&device.config, Mode::Slave { address: 0 });
        device.hw.set_clock_stretching(device.config.clock_stretching);
        config.frequency = device.hw.configure_timing(config.frequency);
        device.config = config;
        device.hw.enable_events(IrqPriority::Slave);
        device
    }

    /// Tear down the peripheral and hand back the collaborators.
    pub fn free(mut self) -> (H, D) {
        self.hw.disable_events();
        self.hw.deinit();
        (self.hw, self.delay)
    }

    /// Program the address we answer to. The low bit is forced to the
    /// slave marker regardless of what the caller passed.
    pub fn set_address(&mut self, address: u16) {
        let raw = (address & 0xff) | SLAVE_MARKER;
        self.own_address = raw;
        self.hw.set_own_address(raw);
        self.hw.enable_events(IrqPriority::Slave);
    }

    #[must_use]
    pub fn own_address(&self) -> Option<u16> {
        self.hw.own_address()
    }

    /// What the master currently wants from us. A pending write wins
    /// over a pending read when both directions are flagged.
    #[must_use]
    pub fn status(&self) -> SlaveStatus {
        if self.master_writing {
            if self.general_call {
                SlaveStatus::WriteGeneral
            } else {
                SlaveStatus::WriteAddressed
            }
        } else if self.master_reading {
            SlaveStatus::ReadAddressed
        } else {
            SlaveStatus::Idle
        }
    }

    /// Serve a master read: transmit `data`, blocking until the master
    /// collected it or the budget runs out. Returns the bytes the master
    /// actually clocked out.
    ///
    /// # Errors
    ///
    /// `BusBusy` when the hardware cannot arm the transfer.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, I2cStatus> {
        if data.is_empty() {
            return Ok(0);
        }
        // The master decides when the transaction ends, so every slave
        // transfer expects continuation.
        if self.hw.slave_transmit(data, FrameTag::Next).is_err() {
            self.logger
                .log(format_args!("i2c slave: transmit arm refused"));
            return Err(I2cStatus::BusBusy);
        }
        self.wait_served(data.len(), false);
        Ok(data.len().saturating_sub(self.hw.residual()))
    }

    /// Serve a master write: receive up to `data.len()` bytes. Returns
    /// how many arrived.
    ///
    /// # Errors
    ///
    /// `BusBusy` when the hardware cannot arm the transfer.
    pub fn read(&mut self, data: &mut [u8]) -> Result<usize, I2cStatus> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.hw.slave_receive(data.len(), FrameTag::Next).is_err() {
            self.logger
                .log(format_args!("i2c slave: receive arm refused"));
            return Err(I2cStatus::BusBusy);
        }
        self.wait_served(data.len(), true);
        let count = data.len().saturating_sub(self.hw.residual());
        self.hw.collect_received(data);
        Ok(count)
    }

    /// Service the peripheral interrupt: maintain the direction flags
    /// and recover from faults.
    pub fn handle_interrupt(&mut self) {
        while let Some(cause) = self.hw.take_cause() {
            match cause {
                Cause::AddressMatch(matched) => {
                    if matched.master_reading {
                        self.master_reading = true;
                    } else {
                        self.master_writing = true;
                        self.general_call = matched.general_call;
                    }
                }
                Cause::SlaveTxComplete => self.master_reading = false,
                Cause::SlaveRxComplete => {
                    self.master_writing = false;
                    self.general_call = false;
                }
                Cause::Error(_) => self.reinit(),
                Cause::TxComplete | Cause::RxComplete => {}
            }
        }
    }

    // Poll until the pending flag for the chosen direction clears or the
    // budget is spent. A transfer the master never started returns right
    // away with nothing moved.
    fn wait_served(&mut self, len: usize, write_direction: bool) {
        let budget = timeout::transfer_budget(len, self.config.frequency, self.config.timeout);
        let units = timeout::budget_units(budget, self.config.poll_granularity);
        let step = self.config.poll_granularity.to_micros().max(1);
        let mut waited = 0;
        while waited < units {
            self.handle_interrupt();
            let pending = if write_direction {
                self.master_writing
            } else {
                self.master_reading
            };
            if !pending {
                break;
            }
            self.delay.delay_us(step);
            waited += 1;
        }
    }

    // Fault recovery: full re-init in slave mode with the programmed
    // address restored.
    fn reinit(&mut self) {
        self.logger.log(format_args!("i2c slave: fault, reinit"));
        self.hw.init(
            &self.config,
            Mode::Slave {
                address: self.own_address,
            },
        );
        self.hw.set_clock_stretching(self.config.clock_stretching);
        self.hw.configure_timing(self.config.frequency);
        self.hw.enable_events(IrqPriority::Slave);
        self.master_reading = false;
        self.master_writing = false;
        self.general_call = false;
    }
}
