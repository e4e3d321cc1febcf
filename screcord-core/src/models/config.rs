use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default capacity of each half of the double buffer, in samples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 102_400;

/// Directory the plugin has always written its takes to.
pub const DEFAULT_RECORDS_DIRECTORY: &str = "/var/pipedal/Records";

/// Bytes per stored sample (32-bit float).
pub const BYTES_PER_SAMPLE: u64 = 4;

/// Configuration for a capture engine.
///
/// Everything here is fixed for the lifetime of the engine except the
/// sample rate, which the host may renegotiate before activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Number of interleaved channels: 1 (mono) or 2 (stereo).
    pub channels: u16,

    /// Directory where recordings are written. Created on first use.
    pub records_directory: PathBuf,

    /// File name prefix (default: "record").
    pub file_prefix: String,

    /// Capacity of each of the two sample buffers, in samples.
    pub buffer_capacity: usize,

    /// Hard cap for a single size-bounded file, in data bytes.
    pub max_file_bytes: u64,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        let channels = self.channels as usize;
        if self.buffer_capacity < channels || self.buffer_capacity % channels != 0 {
            return Err(format!(
                "buffer capacity {} must be a non-zero multiple of {} channel(s)",
                self.buffer_capacity, channels
            ));
        }
        if self.max_file_bytes <= self.buffer_bytes() {
            return Err(format!(
                "max file size {} must exceed one buffer ({} bytes)",
                self.max_file_bytes,
                self.buffer_bytes()
            ));
        }
        if self.file_prefix.is_empty() {
            return Err("file prefix must not be empty".into());
        }
        Ok(())
    }

    /// Size of one full buffer once written to disk.
    pub fn buffer_bytes(&self) -> u64 {
        self.buffer_capacity as u64 * BYTES_PER_SAMPLE
    }

    /// Data size at which a size-bounded file is closed.
    ///
    /// One buffer of headroom below `max_file_bytes`, so the flush that
    /// crosses the threshold still lands under the cap.
    pub fn rollover_threshold(&self) -> u64 {
        self.max_file_bytes.saturating_sub(self.buffer_bytes())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            records_directory: PathBuf::from(DEFAULT_RECORDS_DIRECTORY),
            file_prefix: "record".into(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_file_bytes: i32::MAX as u64,
        }
    }
}
