use serde::{Deserialize, Serialize};

/// Highest sample rate a stream is opened with.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Container format of an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundFormat {
    /// RIFF/WAVE, 32-bit float. Sizes are 32-bit, so files roll over.
    #[default]
    Wav,
    /// EBU RF64, 32-bit float. 64-bit sizes, no rollover.
    Rf64,
}

impl SoundFormat {
    /// Map the host's format selector onto a container.
    ///
    /// The selector is an enumerated control: 0 is WAV, anything else RF64.
    pub fn from_selector(value: f32) -> Self {
        if value.round() as i32 == 0 {
            Self::Wav
        } else {
            Self::Rf64
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Rf64 => "rf64",
        }
    }

    /// Whether files in this format are closed at the rollover threshold.
    pub fn is_size_bounded(&self) -> bool {
        matches!(self, Self::Wav)
    }
}

/// Everything the worker needs to open a stream for a hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub format: SoundFormat,
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamSpec {
    pub fn new(format: SoundFormat, sample_rate: u32, channels: u16) -> Self {
        Self {
            format,
            sample_rate: sample_rate.clamp(1, MAX_SAMPLE_RATE),
            channels,
        }
    }
}

/// Meter readings published once per processing block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterLevels {
    /// Held peak per channel in dB (index 1 unused for mono).
    pub peak_db: [f32; 2],
    /// True when any channel's held peak reached full scale.
    pub clipping: bool,
}

impl Default for MeterLevels {
    fn default() -> Self {
        Self {
            peak_db: [crate::processing::peak_detector::FLOOR_DB; 2],
            clipping: false,
        }
    }
}
