use std::path::{Path, PathBuf};

use crate::models::audio_models::{SoundFormat, StreamSpec};
use crate::models::error::CaptureError;

/// Summary of a finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedFile {
    pub path: PathBuf,
    pub format: SoundFormat,
    /// Bytes of sample data, excluding the header.
    pub data_bytes: u64,
    /// Interleaved samples written.
    pub samples: u64,
    /// SHA-256 of the sample data, hex encoded.
    pub checksum: String,
}

/// Narrow write interface to an open output stream.
///
/// Only the writer thread ever holds one of these.
pub trait SoundSink: Send {
    /// Append interleaved samples. Returns the number of bytes written.
    fn write(&mut self, samples: &[f32]) -> Result<u64, CaptureError>;

    /// Push buffered data through to the storage medium.
    fn sync(&mut self) -> Result<(), CaptureError>;

    /// Finalize the container and release the file.
    fn close(self: Box<Self>) -> Result<ClosedFile, CaptureError>;
}

/// Opens output streams for the writer thread.
///
/// The default implementation is `FileSinkFactory`; tests substitute their
/// own to observe or fail writes.
pub trait SinkFactory: Send + Sync {
    fn open(&self, path: &Path, spec: &StreamSpec) -> Result<Box<dyn SoundSink>, CaptureError>;
}
