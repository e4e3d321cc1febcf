//! # screcord-core
//!
//! Real-time-safe audio capture core.
//!
//! A [`CaptureEngine`] sits in a host's audio path, passes audio through,
//! meters it, and while recording hands filled sample buffers to a
//! background [`AsyncWriter`] that streams them into WAV or RF64 files.
//! Nothing on the audio thread allocates, blocks on I/O, or logs.
//!
//! ## Architecture
//!
//! ```text
//! screcord-core (this crate)
//! ├── traits/       ← CapturePlugin, SoundSink, SinkFactory, CaptureDelegate
//! ├── models/       ← CaptureError, RecordState, CaptureConfiguration, ControlPort, etc.
//! ├── processing/   ← PeakDetector, DoubleBuffer, WAV/RF64 header generation
//! ├── session/      ← CaptureEngine (audio thread), AsyncWriter (writer thread)
//! └── storage/      ← SoundFileWriter, output file naming
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{MeterLevels, SoundFormat, StreamSpec};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::ports::{Control, ControlPort, ControlPorts};
pub use models::state::{RecordState, WriterState};
pub use processing::double_buffer::{DoubleBuffer, Handoff, SampleBuffer};
pub use processing::peak_detector::PeakDetector;
pub use session::engine::CaptureEngine;
pub use session::writer::{AsyncWriter, WriterConfig};
pub use storage::sound_file_writer::{FileSinkFactory, SoundFileWriter};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::plugin::CapturePlugin;
pub use traits::sink::{ClosedFile, SinkFactory, SoundSink};
