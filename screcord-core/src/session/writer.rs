//! Background writer: persists hand-offs off the real-time thread.
//!
//! ```text
//! [CaptureEngine] ──Handoff──▶ [handoff ring] ──▶ [writer thread] ──▶ SoundSink
//!        ▲                                              │
//!        └──────────── [return ring] ◀── empty buffer ──┘
//! ```
//!
//! Both rings are wait-free SPSC queues. The only lock is the wake flag,
//! held just long enough to set it or to start waiting, never across I/O.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use rtrb::{Consumer, PushError, Producer, RingBuffer};

use crate::models::audio_models::{SoundFormat, StreamSpec};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::WriterState;
use crate::processing::double_buffer::Handoff;
use crate::storage::naming;
use crate::storage::sound_file_writer::FileSinkFactory;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::sink::{SinkFactory, SoundSink};

/// Slots in each ring: two buffers plus room for close-only requests.
const RING_CAPACITY: usize = 4;

/// Where and how the writer opens its streams.
#[derive(Clone)]
pub struct WriterConfig {
    pub records_directory: PathBuf,
    pub file_prefix: String,
    /// Data size at which a size-bounded file is closed and a new one started.
    pub rollover_threshold: u64,
    pub factory: Arc<dyn SinkFactory>,
    pub delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl WriterConfig {
    pub fn from_configuration(config: &CaptureConfiguration) -> Self {
        Self {
            records_directory: config.records_directory.clone(),
            file_prefix: config.file_prefix.clone(),
            rollover_threshold: config.rollover_threshold(),
            factory: Arc::new(FileSinkFactory),
            delegate: None,
        }
    }
}

/// State shared between the engine side and the writer thread.
struct Shared {
    running: AtomicBool,
    wake: Mutex<bool>,
    cv: Condvar,
    failed: AtomicBool,
    in_flight: AtomicUsize,
    state: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            wake: Mutex::new(false),
            cv: Condvar::new(),
            failed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            state: AtomicU8::new(WriterState::Stopped as u8),
        }
    }

    /// Wake the writer. Signals coalesce: one wake drains everything queued.
    fn signal(&self) {
        let mut wake = self.wake.lock();
        *wake = true;
        self.cv.notify_one();
    }

    fn wait(&self) {
        let mut wake = self.wake.lock();
        while !*wake {
            self.cv.wait(&mut wake);
        }
        *wake = false;
    }

    fn set_state(&self, state: WriterState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Thread-side ring ends. Moved into the writer thread and handed back on join.
struct WorkerEnds {
    handoffs: Consumer<Handoff>,
    returns: Producer<Handoff>,
}

/// Owner of the writer thread and the engine-side ring ends.
pub struct AsyncWriter {
    config: WriterConfig,
    shared: Arc<Shared>,
    handoffs: Producer<Handoff>,
    returns: Consumer<Handoff>,
    idle_ends: Option<WorkerEnds>,
    handle: Option<thread::JoinHandle<WorkerEnds>>,
}

impl AsyncWriter {
    /// Create a writer. The thread is not running until `start`.
    pub fn new(config: WriterConfig) -> Self {
        let (handoffs, handoff_rx) = RingBuffer::new(RING_CAPACITY);
        let (return_tx, returns) = RingBuffer::new(RING_CAPACITY);
        Self {
            config,
            shared: Arc::new(Shared::new()),
            handoffs,
            returns,
            idle_ends: Some(WorkerEnds {
                handoffs: handoff_rx,
                returns: return_tx,
            }),
            handle: None,
        }
    }

    /// Spawn the writer thread, stopping a running one first.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.handle.is_some() {
            self.stop();
        }

        let ends = match self.idle_ends.take() {
            Some(ends) => ends,
            None => self.rebuild_rings(),
        };

        self.shared.running.store(true, Ordering::Release);
        self.shared.set_state(WriterState::Idle);

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name("screcord-writer".into())
            .spawn(move || run_worker(shared, config, ends));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                log::debug!("Writer thread started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.set_state(WriterState::Stopped);
                Err(CaptureError::WorkerFailed(format!("failed to spawn writer thread: {}", e)))
            }
        }
    }

    /// Stop the writer thread and wait for it to exit.
    ///
    /// The thread finishes any hand-offs already queued and closes its
    /// stream before exiting.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            self.shared.signal();
            match handle.join() {
                Ok(ends) => self.idle_ends = Some(ends),
                Err(_) => log::error!("Writer thread panicked"),
            }
            log::debug!("Writer thread stopped");
        }
        self.shared.set_state(WriterState::Stopped);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire) && self.handle.is_some()
    }

    /// Queue a hand-off and wake the writer. Real-time safe.
    ///
    /// Gives the hand-off back if the ring is full.
    pub fn submit(&mut self, handoff: Handoff) -> Result<(), Handoff> {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        match self.handoffs.push(handoff) {
            Ok(()) => {
                self.shared.signal();
                Ok(())
            }
            Err(PushError::Full(handoff)) => {
                self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                Err(handoff)
            }
        }
    }

    /// Take back a hand-off whose buffer has been persisted. Real-time safe.
    pub fn reclaim(&mut self) -> Option<Handoff> {
        self.returns.pop().ok()
    }

    /// Consume the failure flag. Real-time safe.
    pub fn take_error(&self) -> bool {
        self.shared.failed.swap(false, Ordering::AcqRel)
    }

    pub fn has_error(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    /// Hand-offs submitted but not yet fully processed.
    pub fn pending(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WriterState {
        WriterState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Replace both rings after the thread took its ends down with it.
    /// Anything that was queued is lost.
    fn rebuild_rings(&mut self) -> WorkerEnds {
        log::warn!("Rebuilding writer rings; queued hand-offs are lost");
        let (handoffs, handoff_rx) = RingBuffer::new(RING_CAPACITY);
        let (return_tx, returns) = RingBuffer::new(RING_CAPACITY);
        self.handoffs = handoffs;
        self.returns = returns;
        self.shared.in_flight.store(0, Ordering::Release);
        WorkerEnds {
            handoffs: handoff_rx,
            returns: return_tx,
        }
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: Arc<Shared>, config: WriterConfig, mut ends: WorkerEnds) -> WorkerEnds {
    let mut stream = OutputStream::new(config);

    loop {
        if ends.handoffs.is_empty() {
            shared.set_state(WriterState::Idle);
            shared.wait();
        }
        shared.set_state(WriterState::Woken);
        let running = shared.running.load(Ordering::Acquire);

        while let Ok(mut handoff) = ends.handoffs.pop() {
            shared.set_state(WriterState::Flushing);
            stream.flush(&handoff, &shared);

            let lent_buffer = handoff.buffer.is_some();
            if let Some(buffer) = handoff.buffer.as_mut() {
                buffer.clear();
            }
            if lent_buffer && ends.returns.push(handoff).is_err() {
                log::error!("Return ring full; dropping a sample buffer");
            }
            shared.in_flight.fetch_sub(1, Ordering::AcqRel);
        }

        if !running {
            break;
        }
    }

    stream.close(&shared);
    shared.set_state(WriterState::Stopped);
    ends
}

/// The open output file and its size bookkeeping. Writer thread only.
struct OutputStream {
    config: WriterConfig,
    sink: Option<Box<dyn SoundSink>>,
    format: SoundFormat,
    bytes: u64,
}

impl OutputStream {
    fn new(config: WriterConfig) -> Self {
        Self {
            config,
            sink: None,
            format: SoundFormat::Wav,
            bytes: 0,
        }
    }

    fn flush(&mut self, handoff: &Handoff, shared: &Shared) {
        let samples = handoff.samples();
        if !samples.is_empty() {
            if self.sink.is_none() {
                self.open(&handoff.spec, shared);
            }

            let written = self.sink.as_mut().map(|sink| {
                let bytes = sink.write(samples)?;
                sink.sync()?;
                Ok::<u64, CaptureError>(bytes)
            });
            match written {
                Some(Ok(bytes)) => self.bytes += bytes,
                Some(Err(e)) => self.fail(e, shared),
                // Open failed and was already reported.
                None => {}
            }
        }

        if !handoff.keep_stream {
            self.close(shared);
        } else if self.format.is_size_bounded() && self.bytes >= self.config.rollover_threshold {
            log::info!("Rolling over after {} bytes", self.bytes);
            self.close(shared);
        }
    }

    fn open(&mut self, spec: &StreamSpec, shared: &Shared) {
        let opened = naming::next_output_path(
            &self.config.records_directory,
            &self.config.file_prefix,
            spec.format,
        )
        .and_then(|path| {
            let sink = self.config.factory.open(&path, spec)?;
            Ok((path, sink))
        });

        match opened {
            Ok((path, sink)) => {
                log::info!("Recording to {}", path.display());
                if let Some(delegate) = &self.config.delegate {
                    delegate.on_file_opened(&path);
                }
                self.sink = Some(sink);
                self.format = spec.format;
                self.bytes = 0;
            }
            Err(e) => self.fail(e, shared),
        }
    }

    fn close(&mut self, shared: &Shared) {
        if let Some(sink) = self.sink.take() {
            match sink.close() {
                Ok(closed) => {
                    log::info!(
                        "Closed {} ({} bytes, sha256 {})",
                        closed.path.display(),
                        closed.data_bytes,
                        closed.checksum
                    );
                    if let Some(delegate) = &self.config.delegate {
                        delegate.on_file_closed(&closed);
                    }
                }
                Err(e) => self.fail(e, shared),
            }
        }
        self.bytes = 0;
    }

    fn fail(&self, error: CaptureError, shared: &Shared) {
        log::error!("Writer error: {}", error);
        shared.failed.store(true, Ordering::Release);
        if let Some(delegate) = &self.config.delegate {
            delegate.on_error(&error);
        }
    }
}
