//! Pin bank I/O
//!
//! Maps onboard pins to CMRI bytes, one bit per pin, the way a sketch's
//! `pack`/`unpack` pair usually does it by hand. Pin `n` is bit `n % 8` of
//! byte `n / 8`.

use cpnode_core::NodeIo;
use cpnode_hal::{InputPin, OutputPin};

/// Fixed banks of input and output pins
pub struct PinPort<I, O, const NI: usize, const NO: usize> {
    inputs: [I; NI],
    outputs: [O; NO],
}

impl<I, O, const NI: usize, const NO: usize> PinPort<I, O, NI, NO>
where
    I: InputPin,
    O: OutputPin,
{
    /// Create a pin port; all outputs start low
    pub fn new(inputs: [I; NI], outputs: [O; NO]) -> Self {
        let mut port = Self { inputs, outputs };
        for pin in port.outputs.iter_mut() {
            pin.set_low();
        }
        port
    }

    /// Input bytes needed to report every input pin
    pub const fn input_bytes() -> u8 {
        NI.div_ceil(8) as u8
    }

    /// Output bytes needed to drive every output pin
    pub const fn output_bytes() -> u8 {
        NO.div_ceil(8) as u8
    }

    pub fn input_pins(&mut self) -> &mut [I; NI] {
        &mut self.inputs
    }

    pub fn output_pins(&self) -> &[O; NO] {
        &self.outputs
    }

    /// Release the pins
    pub fn release(self) -> ([I; NI], [O; NO]) {
        (self.inputs, self.outputs)
    }
}

impl<I, O, const NI: usize, const NO: usize> NodeIo for PinPort<I, O, NI, NO>
where
    I: InputPin,
    O: OutputPin,
{
    /// Pins past the end of `inputs` are not sampled
    fn pack(&mut self, inputs: &mut [u8]) {
        inputs.fill(0);
        for (n, pin) in self.inputs.iter_mut().enumerate() {
            let Some(byte) = inputs.get_mut(n / 8) else {
                break;
            };
            if pin.is_high() {
                *byte |= 1 << (n % 8);
            }
        }
    }

    /// Pins past the end of `outputs` keep their state
    fn unpack(&mut self, outputs: &[u8]) {
        for (n, pin) in self.outputs.iter_mut().enumerate() {
            let Some(byte) = outputs.get(n / 8) else {
                break;
            };
            pin.set_state(byte & (1 << (n % 8)) != 0);
        }
    }
}
