//! Small string and file system helpers.
//!
//! - Character-safe truncation for summaries and log previews
//! - Output directory validation before a snapshot is written

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Marker appended to text cut by [`truncate_chars`].
pub const ELLIPSIS: char = '…';

/// Keep the first `max` characters of `s`, appending [`ELLIPSIS`] when
/// anything was cut. Counts Unicode scalar values, not bytes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("abcdef", 3), "abc…");
/// assert_eq!(truncate_chars("abc", 3), "abc");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len_utf8());
            out.push_str(&s[..cut]);
            out.push(ELLIPSIS);
            out
        }
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings keep their first `max` characters followed by
/// `"…(+N bytes)"`, where N is the number of bytes dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the directory that will hold `file` exists and is writable.
///
/// Creates the directory if needed, then creates and removes a scratch file.
#[instrument(level = "info", skip_all, fields(path = %file.as_ref().display()))]
pub async fn ensure_writable_dir(file: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let dir = match file.as_ref().parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;

    let scratch_path = dir.join("..__write_check__");
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}
