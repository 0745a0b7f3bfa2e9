//! Filesystem helpers for relocating a transcript: working-directory
//! rewrites and auxiliary directory moves.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use crate::journal::Journal;
use crate::session_index::carry_permissions;

/// Point every record of the transcript at `new_cwd`.
///
/// Each line is parsed, its top-level `cwd` replaced when present, and the
/// record re-serialized. Blank lines, lines that don't parse, and records
/// without a `cwd` are copied through byte for byte. The result is written to
/// a temporary file beside `path` and renamed over it, so a failure leaves
/// the original untouched. Returns the number of records changed.
pub fn rewrite_cwd(path: &Path, new_cwd: &str) -> io::Result<usize> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut reader = BufReader::new(File::open(path)?);
    let tmp = NamedTempFile::new_in(dir)?;
    let mut writer = BufWriter::new(tmp);

    let mut changed = 0;
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let (body, newline) = match line.strip_suffix(b"\n") {
            Some(body) => (body, true),
            None => (line.as_slice(), false),
        };

        match patch_cwd(body, new_cwd) {
            Some(patched) => {
                writer.write_all(&patched)?;
                if newline {
                    writer.write_all(b"\n")?;
                }
                changed += 1;
            }
            None => writer.write_all(&line)?,
        }
    }

    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    carry_permissions(tmp.as_file(), path)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Rewrote cwd on {} record(s) in {}", changed, path.display());
    Ok(changed)
}

/// Re-serialized record with its top-level `cwd` set, or `None` when the
/// line is left as is.
fn patch_cwd(body: &[u8], new_cwd: &str) -> Option<Vec<u8>> {
    if body.trim_ascii().is_empty() {
        return None;
    }
    let mut value: Value = serde_json::from_slice(body).ok()?;
    let record = value.as_object_mut()?;
    let cwd = record.get_mut("cwd")?;
    *cwd = Value::String(new_cwd.to_string());
    serde_json::to_vec(&value).ok()
}

/// Copy `path` to a temporary file in the same directory. The copy is
/// removed when the returned handle is dropped.
pub fn save_contents(path: &Path) -> io::Result<TempPath> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let saved = NamedTempFile::new_in(dir)?.into_temp_path();
    std::fs::copy(path, &saved)?;
    Ok(saved)
}

/// Move the `<session_id>/` directory that sits beside a transcript, if any.
///
/// Failures are logged and ignored. A successful move is recorded in
/// `journal` so it is undone with the rest of the operation.
pub fn move_aux_dir(
    source_dir: &Path,
    dest_dir: &Path,
    session_id: &str,
    journal: &mut Journal,
) {
    let from = source_dir.join(session_id);
    if !from.is_dir() {
        return;
    }
    let to = dest_dir.join(session_id);
    if to.exists() {
        warn!("Not moving {}: {} already exists", from.display(), to.display());
        return;
    }
    match std::fs::rename(&from, &to) {
        Ok(()) => journal.renamed(&from, &to),
        Err(e) => warn!("Failed to move {} to {}: {}", from.display(), to.display(), e),
    }
}

/// Recursively remove the `<session_id>/` directory beside a transcript.
/// Failures are logged and ignored.
pub fn remove_aux_dir(project_dir: &Path, session_id: &str) {
    let dir = project_dir.join(session_id);
    match std::fs::remove_dir_all(&dir) {
        Ok(()) => debug!("Removed {}", dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
    }
}
