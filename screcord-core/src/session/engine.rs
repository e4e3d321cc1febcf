use std::sync::Arc;

use crate::models::audio_models::{MeterLevels, SoundFormat, StreamSpec, MAX_SAMPLE_RATE};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::ports::{Control, ControlPort, ControlPorts};
use crate::models::state::{RecordState, WriterState};
use crate::processing::double_buffer::{DoubleBuffer, Handoff};
use crate::processing::peak_detector::PeakDetector;
use crate::session::writer::{AsyncWriter, WriterConfig};
use crate::storage::sound_file_writer::FileSinkFactory;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::plugin::CapturePlugin;
use crate::traits::sink::SinkFactory;

/// Record control values above this mean "record".
const RECORD_THRESHOLD: f32 = 0.5;

/// Real-time capture engine.
///
/// Sits in the host's audio path: input is copied to output untouched,
/// every sample feeds the peak meters, and while the record control is on
/// samples are interleaved into the double buffer. Full buffers go to the
/// background writer; stopping hands over whatever partial buffer is left
/// and tells the writer to close the file.
///
/// ```text
/// process() ─┬─▶ PeakDetector[ch] ─▶ meter / clip ports
///            ├─▶ DoubleBuffer ──swap──▶ AsyncWriter ─▶ file
///            └─▶ outputs (unchanged)
/// ```
///
/// `process` never allocates, locks across I/O, or logs. Writer failures
/// come back as a flag: the next block switches the record control off.
pub struct CaptureEngine {
    config: CaptureConfiguration,
    channels: usize,
    sample_rate: u32,
    ports: ControlPorts,
    meters: [PeakDetector; 2],
    levels: MeterLevels,
    buffers: DoubleBuffer,
    writer: AsyncWriter,
    state: RecordState,
    active: bool,
    dropped_samples: u64,
}

impl CaptureEngine {
    /// Create an engine writing files to `config.records_directory`.
    ///
    /// Starts the writer thread. Buffers are allocated on `activate`.
    pub fn new(config: CaptureConfiguration) -> Result<Self, CaptureError> {
        Self::with_backend(config, Arc::new(FileSinkFactory), None)
    }

    /// Create an engine with a custom codec and an optional delegate.
    pub fn with_backend(
        config: CaptureConfiguration,
        factory: Arc<dyn SinkFactory>,
        delegate: Option<Arc<dyn CaptureDelegate>>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let writer_config = WriterConfig {
            factory,
            delegate,
            ..WriterConfig::from_configuration(&config)
        };
        let mut writer = AsyncWriter::new(writer_config);
        writer.start()?;

        log::info!(
            "Capture engine ready: {} channel(s), {} sample buffers, writing to {}",
            config.channels,
            config.buffer_capacity,
            config.records_directory.display()
        );

        Ok(Self {
            channels: config.channels as usize,
            sample_rate: config.sample_rate.clamp(1, MAX_SAMPLE_RATE),
            buffers: DoubleBuffer::new(config.buffer_capacity, config.channels as usize),
            config,
            ports: ControlPorts::default(),
            meters: [PeakDetector::new(); 2],
            levels: MeterLevels::default(),
            writer,
            state: RecordState::Stopped,
            active: false,
            dropped_samples: 0,
        })
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A handle to one of the engine's ports.
    pub fn port(&self, control: Control) -> ControlPort {
        self.ports.port(control).clone()
    }

    /// Meter readings from the last processed block.
    pub fn levels(&self) -> MeterLevels {
        self.levels
    }

    /// Recording state; draining ends once the writer has caught up.
    pub fn record_state(&self) -> RecordState {
        match self.state {
            RecordState::Draining if self.writer.pending() == 0 => RecordState::Stopped,
            state => state,
        }
    }

    /// Hand-offs the writer has not finished yet.
    pub fn pending_handoffs(&self) -> usize {
        self.writer.pending()
    }

    /// Samples discarded because both buffers were still with the writer.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    pub fn writer_state(&self) -> WriterState {
        self.writer.state()
    }

    /// Stream parameters for hand-offs made in the current block.
    fn stream_spec(&self) -> StreamSpec {
        StreamSpec::new(
            SoundFormat::from_selector(self.ports.format.get()),
            self.sample_rate,
            self.channels as u16,
        )
    }

    fn reclaim_buffers(&mut self) {
        while let Some(handoff) = self.writer.reclaim() {
            if let Some(buffer) = handoff.buffer {
                if self.active {
                    self.buffers.restore(handoff.slot, buffer);
                } else {
                    self.buffers.discard(handoff.slot);
                }
            }
        }
    }

    fn submit(&mut self, handoff: Handoff) {
        if let Err(handoff) = self.writer.submit(handoff) {
            self.dropped_samples += handoff.len() as u64;
            if let Some(buffer) = handoff.buffer {
                self.buffers.restore(handoff.slot, buffer);
            }
        }
    }

    /// Swap the active buffer out to the writer.
    fn hand_off(&mut self, keep_stream: bool, spec: StreamSpec) {
        if let Some(handoff) = self.buffers.swap(keep_stream, spec) {
            self.submit(handoff);
        }
        self.reclaim_buffers();
    }

    fn record_frame(&mut self, inputs: &[&[f32]], frame: usize, spec: StreamSpec) {
        if !self.buffers.has_active() {
            self.reclaim_buffers();
        }

        let mut swap_required = false;
        for input in &inputs[..self.channels] {
            let status = self.buffers.write(input[frame]);
            if !status.appended {
                self.dropped_samples += 1;
            }
            swap_required |= status.swap_required;
        }

        if swap_required {
            self.hand_off(true, spec);
        }
    }

    /// Recording → draining: flush the partial buffer and close the stream.
    fn finish_recording(&mut self, spec: StreamSpec) {
        self.state = RecordState::Draining;
        if self.buffers.cursor() > 0 {
            self.hand_off(false, spec);
        } else {
            self.submit(Handoff::close_only(spec));
        }
    }

    fn publish_meters(&mut self) {
        let mut clipping = false;
        for (ch, meter) in self.meters[..self.channels].iter().enumerate() {
            self.levels.peak_db[ch] = meter.meter_db();
            clipping |= meter.is_clipping();
        }
        self.levels.clipping = clipping;

        self.ports.left_meter.set(self.levels.peak_db[0]);
        if self.channels > 1 {
            self.ports.right_meter.set(self.levels.peak_db[1]);
        }
        self.ports.clip.set(if clipping { 1.0 } else { 0.0 });
    }
}

impl CapturePlugin for CaptureEngine {
    fn connect_control(&mut self, control: Control, port: ControlPort) {
        self.ports.connect(control, port);
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.clamp(1, MAX_SAMPLE_RATE);
    }

    fn activate(&mut self) {
        self.active = true;
        self.reclaim_buffers();
        self.buffers.allocate();
        for meter in &mut self.meters {
            meter.reset();
        }
        self.levels = MeterLevels::default();
        log::debug!("Capture engine activated");
    }

    fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        if self.state.is_recording() {
            let spec = self.stream_spec();
            self.finish_recording(spec);
        }
        self.active = false;
        self.reclaim_buffers();
        self.buffers.release();
        log::debug!("Capture engine deactivated");
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        let channels = self.channels;
        if inputs.len() < channels || outputs.len() < channels {
            return;
        }
        let frames = inputs[..channels]
            .iter()
            .map(|input| input.len())
            .chain(outputs[..channels].iter().map(|output| output.len()))
            .fold(frames, usize::min);

        // A failed open or write from the last flush switches recording off.
        if self.writer.take_error() {
            self.ports.record.set(0.0);
        }

        self.reclaim_buffers();
        if self.state.is_draining() && self.writer.pending() == 0 {
            self.state = RecordState::Stopped;
        }

        let recording = self.active && self.ports.record.get() > RECORD_THRESHOLD;
        let spec = self.stream_spec();
        if recording {
            self.state = RecordState::Recording;
        } else if self.state.is_recording() {
            self.finish_recording(spec);
        }

        for frame in 0..frames {
            for (meter, input) in self.meters.iter_mut().zip(&inputs[..channels]) {
                meter.push(input[frame]);
            }
            if recording {
                self.record_frame(inputs, frame, spec);
            }
        }

        for (output, input) in outputs[..channels].iter_mut().zip(&inputs[..channels]) {
            output[..frames].copy_from_slice(&input[..frames]);
        }

        self.publish_meters();
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        if self.state.is_recording() {
            let spec = self.stream_spec();
            self.finish_recording(spec);
        }
        // Joins the writer before the buffers are released.
        self.writer.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    use approx::assert_relative_eq;

    use crate::processing::peak_detector::{FLOOR_DB, HOLD_WINDOW};
    use crate::traits::sink::SoundSink;

    struct FailingFactory;

    impl SinkFactory for FailingFactory {
        fn open(&self, _path: &Path, _spec: &StreamSpec) -> Result<Box<dyn SoundSink>, CaptureError> {
            Err(CaptureError::StorageError("permission denied".into()))
        }
    }

    fn config(dir: &Path, channels: u16, capacity: usize) -> CaptureConfiguration {
        CaptureConfiguration {
            channels,
            records_directory: dir.to_path_buf(),
            buffer_capacity: capacity,
            ..Default::default()
        }
    }

    fn wait_idle(engine: &CaptureEngine) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.pending_handoffs() > 0 {
            assert!(Instant::now() < deadline, "writer did not drain");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn run_mono(engine: &mut CaptureEngine, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        engine.process(&[input], &mut [output.as_mut_slice()], input.len());
        output
    }

    #[test]
    fn rejects_invalid_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let result = CaptureEngine::new(config(dir.path(), 3, 64));
        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn construction_starts_writer() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        assert_eq!(engine.writer_state(), WriterState::Idle);
        assert!(!engine.is_active());
    }

    #[test]
    fn passes_audio_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 2, 64)).unwrap();
        engine.activate();

        let left: Vec<f32> = (0..32).map(|i| i as f32 / 32.0).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let mut out_left = vec![9.0; 32];
        let mut out_right = vec![9.0; 32];
        engine.process(
            &[left.as_slice(), right.as_slice()],
            &mut [out_left.as_mut_slice(), out_right.as_mut_slice()],
            32,
        );

        assert_eq!(out_left, left);
        assert_eq!(out_right, right);
    }

    #[test]
    fn record_toggle_walks_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        engine.activate();
        let record = engine.port(Control::Record);
        assert_eq!(engine.record_state(), RecordState::Stopped);

        record.set(1.0);
        run_mono(&mut engine, &[0.1; 10]);
        assert_eq!(engine.record_state(), RecordState::Recording);

        record.set(0.0);
        run_mono(&mut engine, &[0.1; 10]);
        wait_idle(&engine);
        assert_eq!(engine.record_state(), RecordState::Stopped);

        run_mono(&mut engine, &[0.1; 10]);
        assert_eq!(engine.record_state(), RecordState::Stopped);
        assert_eq!(engine.dropped_samples(), 0);
    }

    #[test]
    fn inactive_engine_does_not_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        engine.port(Control::Record).set(1.0);

        let output = run_mono(&mut engine, &[0.3; 16]);
        assert_eq!(output, vec![0.3; 16]);
        assert_eq!(engine.record_state(), RecordState::Stopped);
        assert_eq!(engine.pending_handoffs(), 0);
    }

    #[test]
    fn open_failure_forces_record_off_next_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine =
            CaptureEngine::with_backend(config(dir.path(), 1, 8), Arc::new(FailingFactory), None).unwrap();
        engine.activate();
        let record = engine.port(Control::Record);
        record.set(1.0);

        // Fills one buffer: the writer tries to open a file and fails.
        run_mono(&mut engine, &[0.5; 8]);
        wait_idle(&engine);
        assert_eq!(record.get(), 1.0);

        run_mono(&mut engine, &[0.5; 4]);
        assert_eq!(record.get(), 0.0);
        wait_idle(&engine);
        assert_eq!(engine.record_state(), RecordState::Stopped);
    }

    #[test]
    fn stereo_meters_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 2, 64)).unwrap();
        let left_meter = ControlPort::default();
        let right_meter = ControlPort::default();
        let clip = ControlPort::default();
        engine.connect_control(Control::LeftMeter, left_meter.clone());
        engine.connect_control(Control::RightMeter, right_meter.clone());
        engine.connect_control(Control::Clip, clip.clone());
        engine.activate();

        let silent = vec![0.0f32; 512];
        let full = vec![1.0f32; 512];
        let mut out_left = vec![0.0f32; 512];
        let mut out_right = vec![0.0f32; 512];
        let blocks = HOLD_WINDOW as usize / 512 + 1;
        for _ in 0..blocks {
            engine.process(
                &[silent.as_slice(), full.as_slice()],
                &mut [out_left.as_mut_slice(), out_right.as_mut_slice()],
                512,
            );
        }

        assert_relative_eq!(left_meter.get(), FLOOR_DB, epsilon = 1e-3);
        assert_relative_eq!(right_meter.get(), 0.0, epsilon = 1e-4);
        assert_eq!(clip.get(), 1.0);
        assert!(engine.levels().clipping);
    }

    #[test]
    fn activate_resets_meters() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        engine.activate();
        run_mono(&mut engine, &vec![0.5; HOLD_WINDOW as usize + 1]);
        assert!(engine.levels().peak_db[0] > -7.0);

        engine.deactivate();
        engine.activate();
        assert_relative_eq!(engine.levels().peak_db[0], FLOOR_DB, epsilon = 1e-3);
    }

    #[test]
    fn deactivate_flushes_partial_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        engine.activate();
        engine.port(Control::Record).set(1.0);
        run_mono(&mut engine, &[0.25; 20]);

        engine.deactivate();
        wait_idle(&engine);
        assert!(!engine.is_active());
        assert_eq!(engine.record_state(), RecordState::Stopped);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn sample_rate_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = CaptureEngine::new(config(dir.path(), 1, 64)).unwrap();
        engine.set_sample_rate(0);
        assert_eq!(engine.sample_rate(), 1);
        engine.set_sample_rate(96_000);
        assert_eq!(engine.sample_rate(), 96_000);
    }
}
