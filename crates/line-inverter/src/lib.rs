//! Differential Line Inversion
//!
//! The board controller expects an RS-485 style pair, but only the A line is
//! driven by the UART. [`LineInverter`] bit-bangs the B line as the inverse of
//! A from the rising and falling edge interrupts of the pin that observes A.
//!
//! The handlers share nothing with the relay loop except hardware. Any state
//! added later that both sides touch must go through atomics, since the
//! interrupt cannot block.

#![no_std]

use core::convert::Infallible;
use embedded_hal::digital::{OutputPin, PinState};

#[inline(always)]
fn settle(result: Result<(), Infallible>) {
    if let Err(never) = result {
        match never {}
    }
}

/// Drives the emulated complementary line
pub struct LineInverter<P> {
    out: P,
}

impl<P> LineInverter<P>
where
    P: OutputPin<Error = Infallible>,
{
    /// Take ownership of the output pin and drive it to the idle level (low)
    pub fn new(mut out: P) -> Self {
        settle(out.set_low());
        Self { out }
    }

    /// Rising edge on the observed line
    #[inline(always)]
    pub fn on_rising_edge(&mut self) {
        settle(self.out.set_low());
    }

    /// Falling edge on the observed line
    #[inline(always)]
    pub fn on_falling_edge(&mut self) {
        settle(self.out.set_high());
    }

    /// Align the output with a sampled input level.
    ///
    /// Edges only report changes, so this covers an input that is already
    /// high before the first interrupt fires.
    pub fn sync_to_input(&mut self, input: PinState) {
        settle(self.out.set_state(!input));
    }

    /// Release the output pin
    pub fn into_inner(self) -> P {
        self.out
    }
}
