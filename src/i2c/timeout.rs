// Licensed under the Apache-2.0 license

//! Transfer timeout budgets.
//!
//! A byte on the wire takes 9 clock cycles plus stretch allowance; the
//! budget for a whole transfer scales with its length so slow buses and
//! stretching slaves are tolerated without hanging forever on a dead one.

use fugit::MicrosDurationU32;

/// Bits clocked per byte including the acknowledge slot, rounded up.
const BITS_PER_BYTE: u32 = 10;
/// Safety factor on top of the nominal byte time.
const STRETCH_MARGIN: u32 = 3;

/// Worst-case time for one byte at the given bus clock.
///
/// 300 us at 100 kHz, 75 us at 400 kHz, 30 us at 1 MHz.
#[must_use]
pub fn byte_timeout(hz: u32) -> MicrosDurationU32 {
    let hz = hz.max(1);
    MicrosDurationU32::micros((1_000_000 * BITS_PER_BYTE).saturating_mul(STRETCH_MARGIN) / hz)
}

/// Budget for a transfer of `len` bytes: one byte slot of slack plus one
/// per byte, unless the caller configured an override.
#[must_use]
pub fn transfer_budget(
    len: usize,
    hz: u32,
    override_budget: Option<MicrosDurationU32>,
) -> MicrosDurationU32 {
    if let Some(budget) = override_budget {
        return budget;
    }
    let slots = (len as u32).saturating_add(1);
    MicrosDurationU32::micros(byte_timeout(hz).to_micros().saturating_mul(slots))
}

/// Number of poll iterations the blocking engine runs for the budget at
/// the given poll granularity. Always at least one.
#[must_use]
pub fn budget_units(budget: MicrosDurationU32, granularity: MicrosDurationU32) -> u32 {
    let step = granularity.to_micros().max(1);
    budget.to_micros().div_ceil(step).max(1)
}
