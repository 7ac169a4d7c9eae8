//! Rotating newline-delimited-JSON writer for `notifications.log`.
//!
//! Mirrors Python's `logging.handlers.RotatingFileHandler`: the active
//! file is checked before each append; once writing the next line would
//! push it past `max_bytes`, the existing backups shift down
//! (`log.2` → `log.3`, `log.1` → `log.2`, active → `log.1`) and a fresh
//! active file is started. Anything past `backup_count` is dropped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn backup_path(base: &Path, n: u32) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(format!(".{n}"));
    PathBuf::from(s)
}

/// Rotate `base` if appending `incoming_len` more bytes would exceed `max_bytes`.
fn maybe_rotate(base: &Path, incoming_len: u64, max_bytes: u64, backup_count: u32) -> std::io::Result<()> {
    let current_len = fs::metadata(base).map(|m| m.len()).unwrap_or(0);
    if current_len == 0 || current_len + incoming_len <= max_bytes {
        return Ok(());
    }

    // Drop the oldest backup if it would overflow backup_count.
    let oldest = backup_path(base, backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    // Shift every remaining backup down by one slot, oldest first.
    let mut n = backup_count.saturating_sub(1);
    while n >= 1 {
        let from = backup_path(base, n);
        let to = backup_path(base, n + 1);
        if from.exists() {
            fs::rename(&from, &to)?;
        }
        if n == 1 {
            break;
        }
        n -= 1;
    }

    // The active file becomes log.1.
    if backup_count >= 1 {
        fs::rename(base, backup_path(base, 1))?;
    } else {
        fs::remove_file(base)?;
    }

    Ok(())
}

/// Append one line to the rotating log, rotating first if necessary.
pub fn append(base: &Path, line: &str, max_bytes: u64, backup_count: u32) -> std::io::Result<()> {
    maybe_rotate(base, line.len() as u64 + 1, max_bytes, backup_count)?;

    let mut file = OpenOptions::new().create(true).append(true).open(base)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// All log file paths, newest first: `[base, base.1, base.2, ...]`, filtered to those that exist.
pub fn files_newest_first(base: &Path, backup_count: u32) -> Vec<PathBuf> {
    let mut paths = vec![base.to_path_buf()];
    for n in 1..=backup_count {
        paths.push(backup_path(base, n));
    }
    paths.into_iter().filter(|p| p.exists()).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Read;

    fn read_to_string(p: &Path) -> String {
        let mut s = String::new();
        fs::File::open(p).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn rotates_when_over_budget() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("notifications.log");

        // Each line is 10 bytes + newline; budget of 25 bytes fits two lines.
        for i in 0..5 {
            append(&base, &format!("line{i:05}"), 25, 2).unwrap();
        }

        assert!(base.exists());
        assert!(backup_path(&base, 1).exists());
        // Only backup_count=2 backups are kept; a 3rd would have been dropped.
        assert!(!backup_path(&base, 3).exists());
    }

    #[test]
    fn newest_first_lists_existing_only() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("notifications.log");
        append(&base, "a", 1024, 3).unwrap();

        let files = files_newest_first(&base, 3);
        assert_eq!(files, vec![base.clone()]);
    }

    #[test]
    fn appended_lines_are_newline_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("notifications.log");
        append(&base, "{\"a\":1}", 1024, 3).unwrap();
        append(&base, "{\"a\":2}", 1024, 3).unwrap();

        let content = read_to_string(&base);
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["{\"a\":1}", "{\"a\":2}"]);
    }
}
