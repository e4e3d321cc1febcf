use crate::models::ports::{Control, ControlPort};

/// The surface a host adapter drives.
///
/// Adapters translate their own port indices into [`Control`] values and
/// forward lifecycle calls here; nothing host-specific reaches the engine.
pub trait CapturePlugin: Send {
    /// Attach a host-owned port to one of the engine's controls.
    fn connect_control(&mut self, control: Control, port: ControlPort);

    /// Sample rate for streams opened from now on.
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Allocate buffers and reset meters. Not real-time safe.
    fn activate(&mut self);

    /// Flush any partial recording and free buffers. Not real-time safe.
    fn deactivate(&mut self);

    /// Process one block. Real-time safe.
    ///
    /// `inputs` and `outputs` hold one slice per channel; `frames` samples
    /// of each are processed. Input is copied to output unchanged.
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize);
}
