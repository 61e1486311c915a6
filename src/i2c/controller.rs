// Licensed under the Apache-2.0 license

//! I2C bus controller: blocking and interrupt-driven master engines.
//!
//! [`I2cBus`] owns one peripheral binding and drives it through the
//! register-interface traits. Blocking transfers busy-poll the event
//! latch under a length-scaled budget; interrupt-driven transfers arm the
//! hardware, return, and finish from [`I2cBus::handle_interrupt`].
//! Several handles may share one physical bus through a [`BusArbiter`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::MicrosDurationU32;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::arbiter::{BusArbiter, HandleId};
use crate::i2c::common::{Capabilities, Event, I2cConfig, I2cStatus, Mode};
use crate::i2c::sequencer::FrameTag;
use crate::i2c::timeout;
use crate::i2c::traits::{Cause, Fault, I2cMasterHardware, IrqPriority, NoPower, PowerManager};

/// Outcome of one interrupt-driven transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferEvent {
    pub sent: usize,
    pub received: usize,
    pub error: bool,
    /// Classified failure, when the hardware could tell us which.
    pub status: Option<I2cStatus>,
}

/// Completion handler for interrupt-driven transfers. Runs in interrupt
/// context, invoked at most once per transfer.
pub type TransferHandler = fn(&TransferEvent);

/// One controller handle on a physical I2C bus.
pub struct I2cBus<'a, H, D, P = NoPower, L = NoOpLogger> {
    hw: H,
    delay: D,
    power: P,
    logger: L,
    arbiter: &'a BusArbiter,
    id: HandleId,
    config: I2cConfig,
    tag: FrameTag,
    events: Event,
    // Interrupt-driven transfer state.
    ongoing: bool,
    deep_sleep_locked: bool,
    address: u16,
    tx_len: usize,
    rx_len: usize,
    tx_done: bool,
    stop_after: bool,
    handler: Option<TransferHandler>,
    completion: Option<TransferEvent>,
}

impl<'a, H, D> I2cBus<'a, H, D>
where
    H: I2cMasterHardware,
    D: DelayNs,
{
    /// Bring up the peripheral in master mode and claim the bus at the
    /// configured frequency. Run [`crate::i2c::recovery::recover`] on the
    /// raw pins first if the bus may be hung.
    pub fn new(hw: H, delay: D, arbiter: &'a BusArbiter, id: HandleId, config: I2cConfig) -> Self {
        Self::with_collaborators(hw, delay, NoPower, NoOpLogger, arbiter, id, config)
    }
}

impl<'a, H, D, P, L> I2cBus<'a, H, D, P, L>
where
    H: I2cMasterHardware,
    D: DelayNs,
    P: PowerManager,
    L: Logger,
{
    /// Like [`I2cBus::new`] with an explicit power manager and logger.
    pub fn with_collaborators(
        hw: H,
        delay: D,
        power: P,
        logger: L,
        arbiter: &'a BusArbiter,
        id: HandleId,
        config: I2cConfig,
    ) -> Self {
        let mut bus = Self {
            hw,
            delay,
            power,
            logger,
            arbiter,
            id,
            config,
            tag: FrameTag::FirstAndLast,
            events: Event::NONE,
            ongoing: false,
            deep_sleep_locked: false,
            address: 0,
            tx_len: 0,
            rx_len: 0,
            tx_done: false,
            stop_after: true,
            handler: None,
            completion: None,
        };
        bus.hw.init(&bus.config, Mode::Master);
        bus.hw.set_clock_stretching(bus.config.clock_stretching);
        let actual = bus.arbiter.set_frequency(bus.id, bus.config.frequency, &mut bus.hw);
        bus.config.frequency = actual;
        bus
    }

    /// Tear down the peripheral and hand back the collaborators.
    pub fn free(mut self) -> (H, D) {
        self.hw.disable_events();
        self.hw.deinit();
        self.arbiter.release(self.id);
        (self.hw, self.delay)
    }

    /// Blocking master transmit. `stop = false` keeps the transaction
    /// open for a repeated START. Returns the bytes the slave accepted.
    ///
    /// # Errors
    ///
    /// `BusBusy` when the hardware refuses to arm (no other state
    /// changes), `ArbitrationLost` when another master won the bus,
    /// `Timeout` for any transfer that did not complete (the peripheral
    /// is reinitialized first).
    pub fn write(&mut self, address: u16, data: &[u8], stop: bool) -> Result<usize, I2cStatus> {
        if data.is_empty() {
            return Ok(0);
        }
        self.arbiter.acquire(self.id, self.config.frequency, &mut self.hw);
        let tag = self.tag.advance(stop);
        self.hw.clear_events();
        self.events = Event::NONE;
        self.hw.enable_events(IrqPriority::Master);
        if self.hw.start_transmit(address, data, tag).is_err() {
            self.hw.disable_events();
            return Err(I2cStatus::BusBusy);
        }
        self.tag = tag;
        let observed = self.wait_for_events(data.len());
        self.hw.disable_events();
        self.classify(observed, data.len())
    }

    /// Blocking master receive; counterpart of [`I2cBus::write`].
    ///
    /// # Errors
    ///
    /// Same contract as [`I2cBus::write`].
    pub fn read(&mut self, address: u16, data: &mut [u8], stop: bool) -> Result<usize, I2cStatus> {
        if data.is_empty() {
            return Ok(0);
        }
        self.arbiter.acquire(self.id, self.config.frequency, &mut self.hw);
        let tag = self.tag.advance(stop);
        self.hw.clear_events();
        self.events = Event::NONE;
        self.hw.enable_events(IrqPriority::Master);
        if self.hw.start_receive(address, data.len(), tag).is_err() {
            self.hw.disable_events();
            return Err(I2cStatus::BusBusy);
        }
        self.tag = tag;
        let observed = self.wait_for_events(data.len());
        self.hw.disable_events();
        let count = self.classify(observed, data.len())?;
        // The residual counter is authoritative for the byte count; the
        // drain only moves data out of the FIFO.
        self.hw.collect_received(data);
        Ok(count)
    }

    /// Arm an interrupt-driven transfer: transmit `tx`, then receive
    /// `rx_len` bytes if nonzero (chained behind the transmit with a
    /// repeated START). Returns whether the hardware accepted it.
    ///
    /// One transfer may be in flight per handle; a second request is
    /// refused without touching any state. On acceptance the deep-sleep
    /// inhibitor is engaged until the transfer concludes. The handler, if
    /// any, runs exactly once from interrupt context; the outcome is also
    /// retained for [`I2cBus::poll_complete`]. Received bytes are drained
    /// with [`I2cBus::take_received`] after completion.
    pub fn transfer(
        &mut self,
        address: u16,
        tx: &[u8],
        rx_len: usize,
        stop: bool,
        handler: Option<TransferHandler>,
    ) -> bool {
        if self.ongoing || (tx.is_empty() && rx_len == 0) {
            return false;
        }
        self.lock_deep_sleep();
        self.arbiter.acquire(self.id, self.config.frequency, &mut self.hw);
        self.hw.clear_events();
        self.events = Event::NONE;
        self.hw.enable_events(IrqPriority::Master);

        let accepted = if !tx.is_empty() && rx_len > 0 {
            // Combined transfer: the stored tag stays put until the
            // chained receive commits the closing segment.
            self.hw
                .start_transmit(address, tx, self.tag.first_phase())
                .is_ok()
        } else {
            let tag = self.tag.advance(stop);
            let ok = if tx.is_empty() {
                self.hw.start_receive(address, rx_len, tag).is_ok()
            } else {
                self.hw.start_transmit(address, tx, tag).is_ok()
            };
            if ok {
                self.tag = tag;
            }
            ok
        };
        if !accepted {
            self.hw.disable_events();
            self.unlock_deep_sleep();
            return false;
        }

        self.address = address;
        self.tx_len = tx.len();
        self.rx_len = rx_len;
        self.tx_done = false;
        self.stop_after = stop;
        self.handler = handler;
        self.completion = None;
        self.ongoing = true;
        true
    }

    /// Cancel the in-flight transfer, if any. The handler is dropped
    /// without being invoked and the deep-sleep inhibitor is released.
    pub fn abort(&mut self) {
        self.hw.abort();
        self.hw.disable_events();
        self.handler = None;
        self.ongoing = false;
        self.unlock_deep_sleep();
    }

    /// Service the peripheral interrupt, driving the transfer state
    /// machine. Call from the instance's interrupt entry point (route
    /// through [`crate::i2c::registry::HandleRegistry`] when several
    /// instances share a vector).
    pub fn handle_interrupt(&mut self) {
        while let Some(cause) = self.hw.take_cause() {
            if !self.ongoing {
                // Stale cause from an aborted or finished transfer.
                continue;
            }
            match cause {
                Cause::TxComplete => {
                    self.tx_done = true;
                    if self.rx_len > 0 {
                        let tag = if self.stop_after {
                            FrameTag::Last
                        } else {
                            FrameTag::Next
                        };
                        self.tag = tag;
                        if self
                            .hw
                            .start_receive(self.address, self.rx_len, tag)
                            .is_err()
                        {
                            self.finish(Some(Fault::default()));
                        }
                    } else {
                        self.finish(None);
                    }
                }
                Cause::RxComplete => self.finish(None),
                Cause::Error(fault) => self.finish(Some(fault)),
                Cause::SlaveTxComplete | Cause::SlaveRxComplete | Cause::AddressMatch(_) => {}
            }
        }
    }

    /// Take the outcome of the last interrupt-driven transfer, once.
    pub fn poll_complete(&mut self) -> Option<TransferEvent> {
        self.completion.take()
    }

    /// Drain bytes received by a completed interrupt-driven transfer.
    pub fn take_received(&mut self, buffer: &mut [u8]) -> usize {
        self.hw.collect_received(buffer)
    }

    /// Whether an interrupt-driven transfer is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.ongoing
    }

    /// Events reported by the most recent transfer.
    #[must_use]
    pub fn events(&self) -> Event {
        self.events
    }

    /// Reprogram the bus clock unconditionally, taking ownership of the
    /// bus. Returns the frequency the hardware achieved.
    pub fn set_frequency(&mut self, hz: u32) -> u32 {
        let actual = self.arbiter.set_frequency(self.id, hz, &mut self.hw);
        self.config.frequency = actual;
        actual
    }

    /// Override the per-transfer budget; `None` restores the
    /// length-scaled default.
    pub fn set_timeout(&mut self, budget: Option<MicrosDurationU32>) {
        self.config.timeout = budget;
    }

    pub fn set_clock_stretching(&mut self, enabled: bool) {
        self.config.clock_stretching = enabled;
        self.hw.set_clock_stretching(enabled);
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.hw.capabilities()
    }

    fn wait_for_events(&mut self, len: usize) -> Event {
        let budget = timeout::transfer_budget(len, self.config.frequency, self.config.timeout);
        let units = timeout::budget_units(budget, self.config.poll_granularity);
        let step = self.config.poll_granularity.to_micros().max(1);
        let mut waited = 0;
        loop {
            let observed = self.hw.poll_events();
            if observed.intersects(Event::ANY) {
                return observed;
            }
            if waited >= units {
                return observed;
            }
            self.delay.delay_us(step);
            waited += 1;
        }
    }

    fn classify(&mut self, observed: Event, len: usize) -> Result<usize, I2cStatus> {
        self.events = observed;
        if observed.contains(Event::ARBITRATION_LOST) {
            // Mastership is gone; the peripheral backs off on its own.
            return Err(I2cStatus::ArbitrationLost);
        }
        if !observed.contains(Event::TRANSFER_COMPLETE) {
            self.logger
                .log(format_args!("i2c{}: transfer timed out", self.id.0));
            self.reinit();
            return Err(I2cStatus::Timeout);
        }
        Ok(len.saturating_sub(self.hw.residual()))
    }

    // Full reinitialization after a wedged transfer. Resets the frame
    // sequencer and reclaims the bus clock.
    fn reinit(&mut self) {
        self.hw.init(&self.config, Mode::Master);
        self.hw.set_clock_stretching(self.config.clock_stretching);
        self.tag = FrameTag::FirstAndLast;
        let actual = self.arbiter.set_frequency(self.id, self.config.frequency, &mut self.hw);
        self.config.frequency = actual;
    }

    fn finish(&mut self, fault: Option<Fault>) {
        let residual = self.hw.residual();
        let error = fault.is_some();
        let status = fault.and_then(|f| {
            if f.arbitration_lost {
                Some(I2cStatus::ArbitrationLost)
            } else if f.no_ack {
                Some(I2cStatus::NoSlave)
            } else {
                None
            }
        });
        let (sent, received) = if self.tx_len > 0 && !self.tx_done {
            (self.tx_len.saturating_sub(residual), 0)
        } else {
            (self.tx_len, self.rx_len.saturating_sub(residual))
        };
        self.events = match fault {
            None => Event::TRANSFER_COMPLETE,
            Some(f) if f.arbitration_lost => Event::ERROR | Event::ARBITRATION_LOST,
            Some(f) if f.no_ack => Event::ERROR | Event::ERROR_NO_SLAVE,
            Some(_) => Event::ERROR,
        };
        if error {
            self.logger
                .log(format_args!("i2c{}: async transfer failed", self.id.0));
            self.reinit();
        }
        self.ongoing = false;
        self.hw.disable_events();
        self.unlock_deep_sleep();
        let outcome = TransferEvent {
            sent,
            received,
            error,
            status,
        };
        self.completion = Some(outcome);
        if let Some(handler) = self.handler.take() {
            handler(&outcome);
        }
    }

    fn lock_deep_sleep(&mut self) {
        if !self.deep_sleep_locked {
            self.power.lock_deep_sleep();
            self.deep_sleep_locked = true;
        }
    }

    fn unlock_deep_sleep(&mut self) {
        if self.deep_sleep_locked {
            self.power.unlock_deep_sleep();
            self.deep_sleep_locked = false;
        }
    }
}

impl<'a, H, D, P, L> embedded_hal::i2c::ErrorType for I2cBus<'a, H, D, P, L>
where
    H: I2cMasterHardware,
    D: DelayNs,
    P: PowerManager,
    L: Logger,
{
    type Error = I2cStatus;
}

impl<'a, H, D, P, L> embedded_hal::i2c::I2c<SevenBitAddress> for I2cBus<'a, H, D, P, L>
where
    H: I2cMasterHardware,
    D: DelayNs,
    P: PowerManager,
    L: Logger,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let count = operations.len();
        // The hardware seam carries left-aligned addresses.
        let raw = u16::from(address) << 1;
        for (index, operation) in operations.iter_mut().enumerate() {
            let stop = index + 1 == count;
            match operation {
                Operation::Write(data) => {
                    self.write(raw, data, stop)?;
                }
                Operation::Read(buffer) => {
                    self.read(raw, buffer, stop)?;
                }
            }
        }
        Ok(())
    }
}
