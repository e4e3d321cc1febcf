use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A control or meter value shared between the host adapter and the engine.
///
/// Stores an `f32` as its bit pattern so reads and writes never lock.
/// Cloning yields another handle to the same value.
#[derive(Debug, Clone)]
pub struct ControlPort(Arc<AtomicU32>);

impl ControlPort {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for ControlPort {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// The engine's ports, named by meaning rather than host port index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Input: record enable, > 0.5 means on.
    Record,
    /// Input: container selector, see `SoundFormat::from_selector`.
    Format,
    /// Output: 1.0 while any channel clips.
    Clip,
    /// Output: channel 0 peak in dB.
    LeftMeter,
    /// Output: channel 1 peak in dB.
    RightMeter,
}

/// The full set of ports an engine reads and writes.
#[derive(Debug, Clone, Default)]
pub struct ControlPorts {
    pub record: ControlPort,
    pub format: ControlPort,
    pub clip: ControlPort,
    pub left_meter: ControlPort,
    pub right_meter: ControlPort,
}

impl ControlPorts {
    pub fn connect(&mut self, control: Control, port: ControlPort) {
        match control {
            Control::Record => self.record = port,
            Control::Format => self.format = port,
            Control::Clip => self.clip = port,
            Control::LeftMeter => self.left_meter = port,
            Control::RightMeter => self.right_meter = port,
        }
    }

    pub fn port(&self, control: Control) -> &ControlPort {
        match control {
            Control::Record => &self.record,
            Control::Format => &self.format,
            Control::Clip => &self.clip,
            Control::LeftMeter => &self.left_meter,
            Control::RightMeter => &self.right_meter,
        }
    }
}
