// Licensed under the Apache-2.0 license

//! Scriptable collaborator doubles for the driver tests.
//!
//! [`MockHardware`] keeps its state behind `Rc<RefCell<_>>` so a test can
//! hold a second handle to the same peripheral after moving the first
//! into a controller, which is also how two controller handles on one
//! physical bus are modeled.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::i2c::common::{closest_supported, Capabilities, Event, I2cConfig, Mode};
use crate::i2c::sequencer::FrameTag;
use crate::i2c::traits::{
    Cause, I2cHardwareCore, I2cMasterHardware, I2cSlaveHardware, IrqPriority, PowerManager,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dir {
    Write,
    Read,
    SlaveWrite,
    SlaveRead,
}

/// One transfer the state machines armed on the mock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArmedOp {
    pub dir: Dir,
    pub address: u16,
    pub data: Vec<u8>,
    pub len: usize,
    pub tag: FrameTag,
}

#[derive(Debug)]
pub struct MockError;

pub struct MockState {
    pub supported: Vec<u32>,
    pub timing: u32,
    pub timing_history: Vec<u32>,
    pub caps: Capabilities,
    pub init_calls: Vec<Mode>,
    pub deinit_count: usize,
    pub events_enabled: Option<IrqPriority>,
    pub disable_count: usize,
    pub clear_count: usize,
    /// Latched events returned by `poll_events`.
    pub pending: Event,
    /// Polls after `clear_events` before TRANSFER_COMPLETE latches.
    /// `None` never completes on its own.
    pub complete_schedule: Option<u32>,
    pub complete_residual: usize,
    /// Polls after `clear_events` before `fail_event` latches. Survives
    /// `clear_events`, unlike a bare `pending` script.
    pub fail_schedule: Option<u32>,
    pub fail_event: Event,
    pub polls_since_clear: u32,
    /// Residual to latch when a completion cause is consumed; `None`
    /// leaves the residual untouched.
    pub cause_residual: Option<usize>,
    /// Next N arm attempts answer WouldBlock.
    pub reject_arms: u32,
    pub residual: usize,
    pub armed: Vec<ArmedOp>,
    pub rx_data: VecDeque<u8>,
    pub causes: VecDeque<Cause>,
    pub own_address: Option<u16>,
    pub abort_count: usize,
    pub stretching: Option<bool>,
    pub polls: u32,
}

#[derive(Clone)]
pub struct MockHardware {
    pub state: Rc<RefCell<MockState>>,
}

impl MockHardware {
    /// Fresh peripheral that completes any transfer on the first poll.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                supported: vec![100_000, 400_000, 1_000_000],
                timing: 0,
                timing_history: Vec::new(),
                caps: Capabilities {
                    minimum_frequency: 100_000,
                    maximum_frequency: 1_000_000,
                    supports_slave_mode: true,
                    supports_10bit_addressing: false,
                    supports_multi_master: true,
                    supports_clock_stretching: true,
                },
                init_calls: Vec::new(),
                deinit_count: 0,
                events_enabled: None,
                disable_count: 0,
                clear_count: 0,
                pending: Event::NONE,
                complete_schedule: Some(0),
                complete_residual: 0,
                fail_schedule: None,
                fail_event: Event::NONE,
                polls_since_clear: 0,
                cause_residual: Some(0),
                reject_arms: 0,
                residual: 0,
                armed: Vec::new(),
                rx_data: VecDeque::new(),
                causes: VecDeque::new(),
                own_address: None,
                abort_count: 0,
                stretching: None,
                polls: 0,
            })),
        }
    }

    /// Peripheral that never reports completion by itself.
    pub fn never_completing() -> Self {
        let hw = Self::new();
        hw.state.borrow_mut().complete_schedule = None;
        hw
    }

    /// Peripheral that latches `event` on the first poll instead of
    /// completing.
    pub fn failing_with(event: Event) -> Self {
        let hw = Self::new();
        {
            let mut state = hw.state.borrow_mut();
            state.complete_schedule = None;
            state.fail_schedule = Some(0);
            state.fail_event = event;
        }
        hw
    }

    /// Complete after `polls` poll iterations, leaving `residual` bytes
    /// unmoved.
    pub fn completing_in(polls: u32, residual: usize) -> Self {
        let hw = Self::new();
        {
            let mut state = hw.state.borrow_mut();
            state.complete_schedule = Some(polls);
            state.complete_residual = residual;
        }
        hw
    }

    pub fn push_cause(&self, cause: Cause) {
        self.state.borrow_mut().causes.push_back(cause);
    }

    pub fn set_rx_data(&self, data: &[u8]) {
        self.state.borrow_mut().rx_data = data.iter().copied().collect();
    }

    pub fn set_residual(&self, residual: usize) {
        self.state.borrow_mut().residual = residual;
    }

    pub fn reject_next_arms(&self, count: u32) {
        self.state.borrow_mut().reject_arms = count;
    }

    pub fn timing_history(&self) -> Vec<u32> {
        self.state.borrow().timing_history.clone()
    }

    pub fn armed(&self) -> Vec<ArmedOp> {
        self.state.borrow().armed.clone()
    }

    fn arm(&mut self, op: ArmedOp) -> nb::Result<(), MockError> {
        let mut state = self.state.borrow_mut();
        if state.reject_arms > 0 {
            state.reject_arms -= 1;
            return Err(nb::Error::WouldBlock);
        }
        state.residual = op.len;
        state.armed.push(op);
        Ok(())
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cHardwareCore for MockHardware {
    type Error = MockError;

    fn capabilities(&self) -> Capabilities {
        self.state.borrow().caps
    }

    fn init(&mut self, _config: &I2cConfig, mode: Mode) {
        let mut state = self.state.borrow_mut();
        state.init_calls.push(mode);
        if let Mode::Slave { address } = mode {
            state.own_address = Some(address);
        }
        state.pending = Event::NONE;
        state.causes.clear();
        state.residual = 0;
        state.polls_since_clear = 0;
    }

    fn deinit(&mut self) {
        self.state.borrow_mut().deinit_count += 1;
    }

    fn configure_timing(&mut self, hz: u32) -> u32 {
        let mut state = self.state.borrow_mut();
        let actual = closest_supported(&state.supported, hz);
        state.timing = actual;
        state.timing_history.push(actual);
        actual
    }

    fn set_clock_stretching(&mut self, enabled: bool) {
        self.state.borrow_mut().stretching = Some(enabled);
    }

    fn enable_events(&mut self, priority: IrqPriority) {
        self.state.borrow_mut().events_enabled = Some(priority);
    }

    fn disable_events(&mut self) {
        let mut state = self.state.borrow_mut();
        state.events_enabled = None;
        state.disable_count += 1;
    }

    fn clear_events(&mut self) {
        let mut state = self.state.borrow_mut();
        state.pending = Event::NONE;
        state.causes.clear();
        state.clear_count += 1;
        state.polls_since_clear = 0;
    }

    fn poll_events(&mut self) -> Event {
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        state.polls_since_clear += 1;
        if let Some(quiet_polls) = state.complete_schedule {
            if state.polls_since_clear > quiet_polls {
                state.pending |= Event::TRANSFER_COMPLETE;
                state.residual = state.complete_residual;
            }
        }
        if let Some(quiet_polls) = state.fail_schedule {
            if state.polls_since_clear > quiet_polls {
                let fail_event = state.fail_event;
                state.pending |= fail_event;
            }
        }
        state.pending
    }

    fn take_cause(&mut self) -> Option<Cause> {
        let mut state = self.state.borrow_mut();
        let cause = state.causes.pop_front();
        if let Some(
            Cause::TxComplete
            | Cause::RxComplete
            | Cause::SlaveTxComplete
            | Cause::SlaveRxComplete,
        ) = cause
        {
            if let Some(residual) = state.cause_residual {
                state.residual = residual;
            }
        }
        cause
    }

    fn residual(&self) -> usize {
        self.state.borrow().residual
    }

    fn collect_received(&mut self, buffer: &mut [u8]) -> usize {
        let mut state = self.state.borrow_mut();
        let mut moved = 0;
        for slot in buffer.iter_mut() {
            match state.rx_data.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }
}

impl I2cMasterHardware for MockHardware {
    fn start_transmit(
        &mut self,
        address: u16,
        data: &[u8],
        tag: FrameTag,
    ) -> nb::Result<(), Self::Error> {
        self.arm(ArmedOp {
            dir: Dir::Write,
            address,
            data: data.to_vec(),
            len: data.len(),
            tag,
        })
    }

    fn start_receive(
        &mut self,
        address: u16,
        length: usize,
        tag: FrameTag,
    ) -> nb::Result<(), Self::Error> {
        self.arm(ArmedOp {
            dir: Dir::Read,
            address,
            data: Vec::new(),
            len: length,
            tag,
        })
    }

    fn abort(&mut self) {
        self.state.borrow_mut().abort_count += 1;
    }
}

impl I2cSlaveHardware for MockHardware {
    fn set_own_address(&mut self, raw: u16) {
        self.state.borrow_mut().own_address = Some(raw);
    }

    fn own_address(&self) -> Option<u16> {
        self.state.borrow().own_address
    }

    fn slave_transmit(&mut self, data: &[u8], tag: FrameTag) -> nb::Result<(), Self::Error> {
        self.arm(ArmedOp {
            dir: Dir::SlaveWrite,
            address: 0,
            data: data.to_vec(),
            len: data.len(),
            tag,
        })
    }

    fn slave_receive(&mut self, length: usize, tag: FrameTag) -> nb::Result<(), Self::Error> {
        self.arm(ArmedOp {
            dir: Dir::SlaveRead,
            address: 0,
            data: Vec::new(),
            len: length,
            tag,
        })
    }
}

/// Delay double that only counts elapsed time. Clones share the counter.
#[derive(Clone, Default)]
pub struct MockDelay {
    ns: Rc<Cell<u64>>,
}

impl MockDelay {
    pub fn total_us(&self) -> u64 {
        self.ns.get() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns.set(self.ns.get() + u64::from(ns));
    }
}

/// Open-drain pin double with a scripted read sequence.
pub struct MockPin {
    reads: VecDeque<bool>,
    fallback: bool,
    /// High-to-low transitions driven so far.
    pub low_pulses: u32,
    /// Currently driven/released level.
    pub level: bool,
}

impl MockPin {
    pub fn held_high() -> Self {
        Self::reads_then(&[], true)
    }

    pub fn held_low() -> Self {
        Self::reads_then(&[], false)
    }

    /// Reads pop from `reads` first, then settle on `fallback`.
    pub fn reads_then(reads: &[bool], fallback: bool) -> Self {
        Self {
            reads: reads.iter().copied().collect(),
            fallback,
            low_pulses: 0,
            level: true,
        }
    }

    fn sample(&mut self) -> bool {
        self.reads.pop_front().unwrap_or(self.fallback)
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sample())
    }
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.level {
            self.low_pulses += 1;
        }
        self.level = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level = true;
        Ok(())
    }
}

/// Deep-sleep inhibitor double. Clones share the counters.
#[derive(Clone, Default)]
pub struct MockPower {
    locks: Rc<Cell<u32>>,
    unlocks: Rc<Cell<u32>>,
}

impl MockPower {
    pub fn locks(&self) -> u32 {
        self.locks.get()
    }

    pub fn unlocks(&self) -> u32 {
        self.unlocks.get()
    }

    pub fn held(&self) -> bool {
        self.locks.get() > self.unlocks.get()
    }
}

impl PowerManager for MockPower {
    fn lock_deep_sleep(&mut self) {
        self.locks.set(self.locks.get() + 1);
    }

    fn unlock_deep_sleep(&mut self) {
        self.unlocks.set(self.unlocks.get() + 1);
    }
}
