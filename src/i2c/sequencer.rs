// Licensed under the Apache-2.0 license

//! Frame sequencing for multi-segment transactions.
//!
//! Each bus transfer carries a tag telling the hardware whether to emit a
//! START, a repeated START, a STOP, or to keep the transaction open. The
//! tag for the next segment depends only on the previous tag and the
//! caller's stop flag, so back-to-back `stop = false` calls chain into one
//! transaction with repeated STARTs.

/// Position of one transfer inside a bus transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum FrameTag {
    /// Self-contained transfer: START then STOP.
    #[default]
    FirstAndLast,
    /// Opens a transaction that stays open afterwards.
    First,
    /// Continues an open transaction and leaves it open.
    Next,
    /// Continues an open transaction and closes it with a STOP.
    Last,
}

impl FrameTag {
    /// Whether this tag leaves the transaction closed once the transfer
    /// finishes.
    #[must_use]
    pub const fn closes(self) -> bool {
        matches!(self, FrameTag::FirstAndLast | FrameTag::Last)
    }

    /// Tag for the next transfer given the caller's stop flag.
    #[must_use]
    pub const fn advance(self, stop: bool) -> FrameTag {
        match (self.closes(), stop) {
            // Previous transaction closed: this transfer starts a new one.
            (true, true) => FrameTag::FirstAndLast,
            (true, false) => FrameTag::First,
            // Transaction still open: this transfer continues it.
            (false, true) => FrameTag::Last,
            (false, false) => FrameTag::Next,
        }
    }

    /// Tag for the transmit leg of a combined write-then-read transfer.
    ///
    /// The leg never closes the transaction (the chained receive does),
    /// and it must not disturb the stored tag, which still describes the
    /// state before the combined transfer.
    #[must_use]
    pub const fn first_phase(self) -> FrameTag {
        if self.closes() {
            FrameTag::First
        } else {
            FrameTag::Next
        }
    }
}
