//! Container header generation for the two output formats.
//!
//! Both formats store interleaved 32-bit IEEE float samples. Headers are
//! written with zero sizes when a stream opens and patched when it closes.

/// Size of the RIFF/WAVE header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Size of the RF64 header (RIFF + ds64 + fmt + data chunk headers).
pub const RF64_HEADER_SIZE: usize = 80;

/// WAVE_FORMAT_IEEE_FLOAT.
pub const FORMAT_IEEE_FLOAT: u16 = 3;

pub const BITS_PER_SAMPLE: u16 = 32;

/// Offset of the RIFF chunk size in a WAV header.
pub const WAV_RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size in a WAV header.
pub const WAV_DATA_SIZE_OFFSET: u64 = 40;

/// Offset of the 64-bit RIFF size inside the ds64 chunk. The data size
/// and frame count follow it directly.
pub const RF64_DS64_SIZES_OFFSET: u64 = 20;

/// Generate a 44-byte float WAV header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-21]  3 (IEEE float)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 4
/// [32-33]  block_align = channels * 4
/// [34-35]  32
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&wav_riff_size(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    write_fmt_chunk(&mut header[12..36], sample_rate, channels);

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Generate an 80-byte RF64 header.
///
/// The 32-bit RIFF and data sizes are pinned to `0xFFFFFFFF`; the real
/// sizes live in the ds64 chunk:
/// ```text
/// [0-3]    "RF64"
/// [4-7]    0xFFFFFFFF
/// [8-11]   "WAVE"
/// [12-15]  "ds64"
/// [16-19]  28
/// [20-27]  riff_size = 72 + data_size
/// [28-35]  data_size
/// [36-43]  frame count
/// [44-47]  0 (table length)
/// [48-71]  fmt chunk, as in WAV
/// [72-75]  "data"
/// [76-79]  0xFFFFFFFF
/// ```
pub fn generate_rf64_header(
    sample_rate: u32,
    channels: u16,
    data_size: u64,
    frames: u64,
) -> [u8; RF64_HEADER_SIZE] {
    let mut header = [0u8; RF64_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RF64");
    header[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"ds64");
    header[16..20].copy_from_slice(&28u32.to_le_bytes());
    header[20..44].copy_from_slice(&ds64_sizes(data_size, frames));
    header[44..48].copy_from_slice(&0u32.to_le_bytes());

    write_fmt_chunk(&mut header[48..72], sample_rate, channels);

    header[72..76].copy_from_slice(b"data");
    header[76..80].copy_from_slice(&u32::MAX.to_le_bytes());

    header
}

/// The three 64-bit ds64 fields: RIFF size, data size, frame count.
pub fn ds64_sizes(data_size: u64, frames: u64) -> [u8; 24] {
    let riff_size = (RF64_HEADER_SIZE as u64 - 8) + data_size;
    let mut sizes = [0u8; 24];
    sizes[0..8].copy_from_slice(&riff_size.to_le_bytes());
    sizes[8..16].copy_from_slice(&data_size.to_le_bytes());
    sizes[16..24].copy_from_slice(&frames.to_le_bytes());
    sizes
}

/// RIFF chunk size for a WAV file with `data_size` bytes of samples.
pub fn wav_riff_size(data_size: u32) -> u32 {
    36u32.saturating_add(data_size)
}

/// Append samples as little-endian f32 bytes.
pub fn encode_f32_le(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 4);
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

fn write_fmt_chunk(chunk: &mut [u8], sample_rate: u32, channels: u16) {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;

    chunk[0..4].copy_from_slice(b"fmt ");
    chunk[4..8].copy_from_slice(&16u32.to_le_bytes());
    chunk[8..10].copy_from_slice(&FORMAT_IEEE_FLOAT.to_le_bytes());
    chunk[10..12].copy_from_slice(&channels.to_le_bytes());
    chunk[12..16].copy_from_slice(&sample_rate.to_le_bytes());
    chunk[16..20].copy_from_slice(&byte_rate.to_le_bytes());
    chunk[20..22].copy_from_slice(&block_align.to_le_bytes());
    chunk[22..24].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
}
