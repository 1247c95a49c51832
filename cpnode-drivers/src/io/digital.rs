//! embedded-hal pin adapter
//!
//! Lets HAL pins whose operations cannot fail (the common case for
//! on-chip GPIO) be used where cpnode-hal pin traits are expected.

use core::convert::Infallible;

use cpnode_hal::{InputPin, OutputPin};
use embedded_hal::digital;

/// Wraps an `embedded-hal` 1.0 digital pin
#[derive(Debug)]
pub struct Digital<P> {
    pin: P,
    /// Last level written, for pins that cannot read back
    state: bool,
}

impl<P> Digital<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, state: false }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> InputPin for Digital<P>
where
    P: digital::InputPin<Error = Infallible>,
{
    fn is_high(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high,
            Err(never) => match never {},
        }
    }
}

impl<P> OutputPin for Digital<P>
where
    P: digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.state = true,
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.state = false,
            Err(never) => match never {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.state
    }
}
