#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use screcord_core::{
    CaptureConfiguration, CaptureDelegate, CaptureEngine, CaptureError, CapturePlugin, ClosedFile,
    FileSinkFactory, SinkFactory, SoundSink, StreamSpec,
};

/// Delegate that records every callback and tracks concurrently open files.
#[derive(Default)]
pub struct EventLog {
    pub opened: Mutex<Vec<PathBuf>>,
    pub closed: Mutex<Vec<ClosedFile>>,
    pub errors: Mutex<Vec<CaptureError>>,
    open_now: AtomicUsize,
    pub max_open: AtomicUsize,
}

impl EventLog {
    pub fn closed_files(&self) -> Vec<ClosedFile> {
        self.closed.lock().clone()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }
}

impl CaptureDelegate for EventLog {
    fn on_file_opened(&self, path: &Path) {
        self.opened.lock().push(path.to_path_buf());
        let open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open, Ordering::SeqCst);
    }

    fn on_file_closed(&self, file: &ClosedFile) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
        self.closed.lock().push(file.clone());
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }
}

/// File sink factory whose sinks sleep on every write.
pub struct SlowFactory(pub Duration);

struct SlowSink {
    inner: Box<dyn SoundSink>,
    delay: Duration,
}

impl SoundSink for SlowSink {
    fn write(&mut self, samples: &[f32]) -> Result<u64, CaptureError> {
        thread::sleep(self.delay);
        self.inner.write(samples)
    }

    fn sync(&mut self) -> Result<(), CaptureError> {
        self.inner.sync()
    }

    fn close(self: Box<Self>) -> Result<ClosedFile, CaptureError> {
        self.inner.close()
    }
}

impl SinkFactory for SlowFactory {
    fn open(&self, path: &Path, spec: &StreamSpec) -> Result<Box<dyn SoundSink>, CaptureError> {
        let inner = FileSinkFactory.open(path, spec)?;
        Ok(Box::new(SlowSink { inner, delay: self.0 }))
    }
}

/// Fails the first `failures` opens, then behaves like the file factory.
pub struct FlakyFactory {
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyFactory {
    pub fn new(failures: usize) -> Self {
        Self { failures, attempts: AtomicUsize::new(0) }
    }
}

impl SinkFactory for FlakyFactory {
    fn open(&self, path: &Path, spec: &StreamSpec) -> Result<Box<dyn SoundSink>, CaptureError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(CaptureError::StorageError("disk unavailable".into()));
        }
        FileSinkFactory.open(path, spec)
    }
}

pub fn config(dir: &Path, channels: u16, capacity: usize) -> CaptureConfiguration {
    CaptureConfiguration {
        channels,
        records_directory: dir.to_path_buf(),
        buffer_capacity: capacity,
        ..Default::default()
    }
}

pub fn engine_with_log(
    config: CaptureConfiguration,
    factory: Arc<dyn SinkFactory>,
) -> (CaptureEngine, Arc<EventLog>) {
    let log = Arc::new(EventLog::default());
    let delegate: Arc<dyn CaptureDelegate> = log.clone();
    let engine = CaptureEngine::with_backend(config, factory, Some(delegate)).unwrap();
    (engine, log)
}

pub fn wait_idle(engine: &CaptureEngine) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.pending_handoffs() > 0 {
        assert!(Instant::now() < deadline, "writer did not drain");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Run `samples` (one Vec per channel) through the engine in fixed blocks,
/// letting the writer catch up between blocks.
pub fn feed(engine: &mut CaptureEngine, channels: &[Vec<f32>], block: usize) {
    let frames = channels[0].len();
    let mut outputs: Vec<Vec<f32>> = vec![vec![0.0; block]; channels.len()];
    let mut start = 0;
    while start < frames {
        let end = (start + block).min(frames);
        let inputs: Vec<&[f32]> = channels.iter().map(|c| &c[start..end]).collect();
        let mut outs: Vec<&mut [f32]> = outputs.iter_mut().map(|o| &mut o[..end - start]).collect();
        engine.process(&inputs, &mut outs, end - start);
        wait_idle(engine);
        start = end;
    }
}

/// Process an empty-signal block, e.g. to let a control change take effect.
pub fn tick(engine: &mut CaptureEngine) {
    let channels = engine.channels();
    let silence = vec![0.0f32; 1];
    let mut outputs = vec![vec![0.0f32; 1]; channels];
    let inputs: Vec<&[f32]> = (0..channels).map(|_| silence.as_slice()).collect();
    let mut outs: Vec<&mut [f32]> = outputs.iter_mut().map(|o| o.as_mut_slice()).collect();
    engine.process(&inputs, &mut outs, 0);
    wait_idle(engine);
}

pub fn ramp(len: usize, offset: usize) -> Vec<f32> {
    (0..len).map(|i| ((i + offset) % 2000) as f32 / 2000.0 - 0.5).collect()
}

pub fn read_wav(path: &Path) -> Vec<f32> {
    let mut reader = hound::WavReader::open(path).unwrap();
    reader.samples::<f32>().map(Result::unwrap).collect()
}

pub fn read_all(files: &[ClosedFile]) -> Vec<f32> {
    files.iter().flat_map(|file| read_wav(&file.path)).collect()
}
