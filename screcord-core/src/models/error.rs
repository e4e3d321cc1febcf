use thiserror::Error;

/// Errors that can occur while configuring the engine or persisting audio.
///
/// None of these cross the real-time thread: the worker reports failures
/// through a flag that `process()` polls on the next block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("worker failed: {0}")]
    WorkerFailed(String),
}
