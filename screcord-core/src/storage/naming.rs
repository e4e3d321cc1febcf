//! Output file placement: the records directory and timestamped names.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::models::audio_models::SoundFormat;
use crate::models::error::CaptureError;

/// rwxrwxr-x, before umask.
pub const DIRECTORY_MODE: u32 = 0o775;

/// Attempts at a free name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Create the records directory (and parents) if it does not exist.
pub fn ensure_records_directory(dir: &Path) -> Result<(), CaptureError> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }
    builder.create(dir).map_err(|e| {
        CaptureError::StorageError(format!("failed to create {}: {}", dir.display(), e))
    })
}

/// `<prefix>_<DDMMYYYY>_<HH>_<MM>_<SS>[_<n>].<ext>`
pub fn file_name<Tz>(prefix: &str, format: SoundFormat, at: &DateTime<Tz>, attempt: u32) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = at.format("%d%m%Y_%H_%M_%S");
    if attempt == 0 {
        format!("{}_{}.{}", prefix, stamp, format.extension())
    } else {
        format!("{}_{}_{}.{}", prefix, stamp, attempt, format.extension())
    }
}

/// First unused path in `dir` for a file started at `at`.
///
/// Files opened within the same second get a numeric suffix instead of
/// replacing each other.
pub fn output_path_at<Tz>(
    dir: &Path,
    prefix: &str,
    format: SoundFormat,
    at: &DateTime<Tz>,
) -> Result<PathBuf, CaptureError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ensure_records_directory(dir)?;
    (0..MAX_NAME_ATTEMPTS)
        .map(|attempt| dir.join(file_name(prefix, format, at, attempt)))
        .find(|path| !path.exists())
        .ok_or_else(|| {
            CaptureError::StorageError(format!("no free file name in {}", dir.display()))
        })
}

/// Path for a file started now, in local time.
pub fn next_output_path(dir: &Path, prefix: &str, format: SoundFormat) -> Result<PathBuf, CaptureError> {
    output_path_at(dir, prefix, format, &Local::now())
}
