use std::path::Path;

use crate::models::error::CaptureError;
use crate::traits::sink::ClosedFile;

/// Event delegate for output file lifecycle notifications.
///
/// All methods are called from the writer thread, never from the
/// real-time thread. Implementations must not block for long: the next
/// hand-off waits behind them.
pub trait CaptureDelegate: Send + Sync {
    /// Called after a new output file has been opened.
    fn on_file_opened(&self, path: &Path);

    /// Called after a file has been finalized, on stop or rollover.
    fn on_file_closed(&self, file: &ClosedFile);

    /// Called when opening or writing a stream fails.
    fn on_error(&self, error: &CaptureError);
}
