pub mod double_buffer;
pub mod peak_detector;
pub mod wav_format;
