//! Node I/O trait
//!
//! The node never touches pins itself. Before answering a poll it asks the
//! application to pack the current input states into bytes, and after a
//! transmit it hands the output bytes back for unpacking.

/// Application side of the node's I/O
pub trait NodeIo {
    /// Fill `inputs` with the current input states
    ///
    /// `inputs` is exactly as long as the configured input byte count.
    fn pack(&mut self, inputs: &mut [u8]);

    /// Drive outputs from `outputs`
    ///
    /// `outputs` is exactly as long as the configured output byte count.
    fn unpack(&mut self, outputs: &[u8]);

    /// Handle the option bytes of a cpNode Initialize message
    ///
    /// Ignored by default.
    fn apply_options(&mut self, _options: &[u8]) {}
}

impl<T: NodeIo + ?Sized> NodeIo for &mut T {
    fn pack(&mut self, inputs: &mut [u8]) {
        T::pack(self, inputs)
    }

    fn unpack(&mut self, outputs: &[u8]) {
        T::unpack(self, outputs)
    }

    fn apply_options(&mut self, options: &[u8]) {
        T::apply_options(self, options)
    }
}

/// [`NodeIo`] built from a pair of closures
pub struct IoFn<F, G> {
    pack: F,
    unpack: G,
}

/// Build a [`NodeIo`] from pack and unpack closures
///
/// ```
/// use cpnode_core::traits::{io_fn, NodeIo};
///
/// let mut latched = [0u8; 2];
/// let mut io = io_fn(|inputs: &mut [u8]| inputs.fill(0xA5), |outputs: &[u8]| {
///     latched[..outputs.len()].copy_from_slice(outputs)
/// });
///
/// let mut inputs = [0u8; 1];
/// io.pack(&mut inputs);
/// assert_eq!(inputs, [0xA5]);
/// ```
pub fn io_fn<F, G>(pack: F, unpack: G) -> IoFn<F, G>
where
    F: FnMut(&mut [u8]),
    G: FnMut(&[u8]),
{
    IoFn { pack, unpack }
}

impl<F, G> NodeIo for IoFn<F, G>
where
    F: FnMut(&mut [u8]),
    G: FnMut(&[u8]),
{
    fn pack(&mut self, inputs: &mut [u8]) {
        (self.pack)(inputs)
    }

    fn unpack(&mut self, outputs: &[u8]) {
        (self.unpack)(outputs)
    }
}
