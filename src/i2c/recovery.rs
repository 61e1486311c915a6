// Licensed under the Apache-2.0 license

//! Bus recovery for a slave stuck mid-transfer.
//!
//! If the master resets while a slave is clocking out data, the slave
//! keeps SDA low and the bus hangs. Clocking SCL lets the slave finish
//! its byte; a manual STOP then returns every device to idle. Run this
//! over the raw open-drain pins before handing them to the peripheral.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Clock pulses issued when SDA is stuck low. Nine bits flush any
/// half-clocked byte; one more covers the acknowledge slot.
const RELEASE_PULSES: u32 = 10;
/// Half-cycle of the recovery clock, well under 100 kHz.
const HALF_CYCLE_US: u32 = 5;

/// Failures of a recovery attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecoveryError<E> {
    /// The bus cannot be claimed: SCL held low, or a line still stuck
    /// after the recovery waveform.
    BusBusy,
    /// A pin operation failed.
    Pin(E),
}

impl<E> From<E> for RecoveryError<E> {
    fn from(err: E) -> Self {
        RecoveryError::Pin(err)
    }
}

/// Check the bus and, if SDA is stuck, clock it free and issue a STOP.
///
/// Both pins must be open-drain: `set_high` releases the line, `set_low`
/// drives it. Returns `Ok(())` once both lines read high.
///
/// # Errors
///
/// [`RecoveryError::BusBusy`] when SCL is held low by another device or
/// when either line is still low after the waveform; pin faults are
/// passed through.
pub fn recover<Scl, Sda, D, E>(
    scl: &mut Scl,
    sda: &mut Sda,
    delay: &mut D,
) -> Result<(), RecoveryError<E>>
where
    Scl: InputPin<Error = E> + OutputPin<Error = E>,
    Sda: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    scl.set_high()?;
    sda.set_high()?;

    // SCL low means another master is mid-transfer; nothing we can do.
    if scl.is_low()? {
        return Err(RecoveryError::BusBusy);
    }
    // Both lines high: the bus is already idle.
    if sda.is_high()? {
        return Ok(());
    }

    for _ in 0..RELEASE_PULSES {
        scl.set_low()?;
        delay.delay_us(HALF_CYCLE_US);
        scl.set_high()?;
        delay.delay_us(HALF_CYCLE_US);
    }

    // STOP condition: SDA rising while SCL is high.
    sda.set_low()?;
    delay.delay_us(HALF_CYCLE_US);
    scl.set_high()?;
    delay.delay_us(HALF_CYCLE_US);
    sda.set_high()?;
    delay.delay_us(HALF_CYCLE_US);

    if scl.is_low()? || sda.is_low()? {
        return Err(RecoveryError::BusBusy);
    }
    Ok(())
}
