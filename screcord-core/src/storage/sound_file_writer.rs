use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::{SoundFormat, StreamSpec};
use crate::models::error::CaptureError;
use crate::processing::wav_format;
use crate::traits::sink::{ClosedFile, SinkFactory, SoundSink};

/// Streaming float WAV / RF64 file writer.
///
/// ## File Format
///
/// **WAV:**
/// ```text
/// [44-byte RIFF header, sizes patched on close]
/// [interleaved f32 LE samples...]
/// ```
///
/// **RF64:**
/// ```text
/// [80-byte RF64 header, ds64 sizes patched on close]
/// [interleaved f32 LE samples...]
/// ```
///
/// A writer dropped without `finish` still patches its header, so a file
/// interrupted by shutdown stays readable.
pub struct SoundFileWriter {
    file_path: PathBuf,
    spec: StreamSpec,
    file: Option<File>,
    data_bytes: u64,
    samples: u64,
    hasher: Sha256,
    scratch: Vec<u8>,
}

impl SoundFileWriter {
    /// Create the file and write a header with zero sizes.
    ///
    /// Never overwrites: fails if `file_path` already exists.
    pub fn create(file_path: PathBuf, spec: StreamSpec) -> Result<Self, CaptureError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .map_err(|e| {
                CaptureError::StorageError(format!("failed to create {}: {}", file_path.display(), e))
            })?;

        let written = match spec.format {
            SoundFormat::Wav => {
                file.write_all(&wav_format::generate_wav_header(spec.sample_rate, spec.channels, 0))
            }
            SoundFormat::Rf64 => {
                file.write_all(&wav_format::generate_rf64_header(spec.sample_rate, spec.channels, 0, 0))
            }
        };
        written.map_err(|e| CaptureError::StorageError(format!("failed to write header: {}", e)))?;

        Ok(Self {
            file_path,
            spec,
            file: Some(file),
            data_bytes: 0,
            samples: 0,
            hasher: Sha256::new(),
            scratch: Vec::new(),
        })
    }

    /// Append interleaved samples. Returns the bytes written.
    pub fn write(&mut self, samples: &[f32]) -> Result<u64, CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;

        self.scratch.clear();
        wav_format::encode_f32_le(samples, &mut self.scratch);
        file.write_all(&self.scratch)
            .map_err(|e| CaptureError::EncodingFailed(format!("write failed: {}", e)))?;

        self.hasher.update(&self.scratch);
        let bytes = self.scratch.len() as u64;
        self.data_bytes += bytes;
        self.samples += samples.len() as u64;
        Ok(bytes)
    }

    /// Flush and sync file data to disk.
    pub fn sync(&mut self) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.sync_data()
            .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))
    }

    /// Finalize the file: patch header sizes, sync, and close.
    pub fn finish(&mut self) -> Result<ClosedFile, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        let frames = self.samples / self.spec.channels.max(1) as u64;
        match self.spec.format {
            SoundFormat::Wav => {
                let data_size = u32::try_from(self.data_bytes).unwrap_or(u32::MAX);
                file.seek(SeekFrom::Start(wav_format::WAV_RIFF_SIZE_OFFSET))
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;
                file.write_all(&wav_format::wav_riff_size(data_size).to_le_bytes())
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;

                file.seek(SeekFrom::Start(wav_format::WAV_DATA_SIZE_OFFSET))
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;
                file.write_all(&data_size.to_le_bytes())
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;
            }
            SoundFormat::Rf64 => {
                file.seek(SeekFrom::Start(wav_format::RF64_DS64_SIZES_OFFSET))
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;
                file.write_all(&wav_format::ds64_sizes(self.data_bytes, frames))
                    .map_err(|e| CaptureError::StorageError(e.to_string()))?;
            }
        }

        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))?;

        let digest = std::mem::take(&mut self.hasher).finalize();
        Ok(ClosedFile {
            path: self.file_path.clone(),
            format: self.spec.format,
            data_bytes: self.data_bytes,
            samples: self.samples,
            checksum: hex_encode(&digest),
        })
    }

    /// Bytes of sample data written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for SoundFileWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.finish() {
                log::warn!("Failed to finalize {}: {}", self.file_path.display(), e);
            }
        }
    }
}

impl SoundSink for SoundFileWriter {
    fn write(&mut self, samples: &[f32]) -> Result<u64, CaptureError> {
        SoundFileWriter::write(self, samples)
    }

    fn sync(&mut self) -> Result<(), CaptureError> {
        SoundFileWriter::sync(self)
    }

    fn close(mut self: Box<Self>) -> Result<ClosedFile, CaptureError> {
        self.finish()
    }
}

/// Opens [`SoundFileWriter`]s on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
    fn open(&self, path: &Path, spec: &StreamSpec) -> Result<Box<dyn SoundSink>, CaptureError> {
        Ok(Box::new(SoundFileWriter::create(path.to_path_buf(), *spec)?))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
