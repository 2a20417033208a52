//! Register sink: where channel voices send their hardware writes.
//!
//! Voices never read registers back. Writes are fire-and-forget and must reach the chip in the
//! order they were issued, so every sink here is a plain ordered consumer.

use log::trace;

/// A single byte written to a memory-mapped sound register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterWrite {
    pub address: u16,
    pub value: u8,
}

impl RegisterWrite {
    pub fn new(address: u16, value: u8) -> Self {
        Self { address, value }
    }
}

/// Trait for anything that consumes register writes: an emulated chip, a recorder, a tracer.
pub trait RegisterSink {
    fn write_register(&mut self, address: u16, value: u8);
}

/// Recording sink. Keeps every write in issue order.
impl RegisterSink for Vec<RegisterWrite> {
    fn write_register(&mut self, address: u16, value: u8) {
        self.push(RegisterWrite::new(address, value));
    }
}

impl<S: RegisterSink + ?Sized> RegisterSink for &mut S {
    fn write_register(&mut self, address: u16, value: u8) {
        (**self).write_register(address, value);
    }
}

/// Forwards writes to `inner` while keeping a copy of everything written since the last
/// [`TraceSink::take_tick`]. Used by the register trace output.
pub struct TraceSink<S: RegisterSink> {
    inner: S,
    pending: Vec<RegisterWrite>,
}

impl<S: RegisterSink> TraceSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Writes issued since the previous call, in order.
    pub fn take_tick(&mut self) -> Vec<RegisterWrite> {
        std::mem::take(&mut self.pending)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RegisterSink> RegisterSink for TraceSink<S> {
    fn write_register(&mut self, address: u16, value: u8) {
        trace!("${address:04X} <- {value:02X}");
        self.pending.push(RegisterWrite::new(address, value));
        self.inner.write_register(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_sink_forwards_in_order() {
        let mut sink = TraceSink::new(Vec::new());
        sink.write_register(0x5015, 0x03);
        sink.write_register(0x5000, 0x30);

        let tick = sink.take_tick();
        assert_eq!(tick, sink.inner().clone());
        assert_eq!(tick[0], RegisterWrite::new(0x5015, 0x03));
        assert!(sink.take_tick().is_empty());
        assert_eq!(sink.into_inner().len(), 2);
    }
}
