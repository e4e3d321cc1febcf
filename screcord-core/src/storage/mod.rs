pub mod naming;
pub mod sound_file_writer;
