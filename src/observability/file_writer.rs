//! Per-run log files with size-based rotation and retention.
//!
//! Each run writes to its own `chatbridge_YYYY-MM-DD_HH-MM-SS.log`. A file
//! that grows past the size limit is renamed to `<name>.log.<unix time>` and a
//! fresh one is started. [`prune_run_logs`] keeps the log directory bounded
//! across runs.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Maximum file size before rotation (10 MB).
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated backups kept per run.
const MAX_BACKUP_FILES: usize = 3;

const RUN_PREFIX: &str = "chatbridge_";

/// Thread-safe rotating log file.
///
/// The file is opened lazily on the first write. `&FileWriter` implements
/// [`io::Write`], so an `Arc<FileWriter>` can be handed to
/// `tracing_subscriber::fmt::layer().with_writer(..)`.
pub struct FileWriter {
    file_path: PathBuf,
    max_bytes: u64,
    writer: Mutex<Option<fs::File>>,
}

impl FileWriter {
    pub const fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            max_bytes: MAX_FILE_SIZE_BYTES,
            writer: Mutex::new(None),
        }
    }

    /// Writer for a run that started at `started`.
    #[must_use]
    pub fn for_run(log_dir: &Path, started: DateTime<Local>) -> Self {
        let name = format!("{RUN_PREFIX}{}.log", started.format("%Y-%m-%d_%H-%M-%S"));
        Self::new(log_dir.join(name))
    }

    /// Overrides the rotation threshold.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Mutex poisoned: {e}")))?;

        self.check_and_rotate(&mut writer)?;

        if writer.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
            *writer = Some(file);
        }

        let file = writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No file available"))?;
        file.write_all(buf)?;
        file.flush()
    }

    fn check_and_rotate(&self, writer: &mut Option<fs::File>) -> io::Result<()> {
        if let Ok(metadata) = fs::metadata(&self.file_path) {
            if metadata.len() > self.max_bytes {
                *writer = None;
                self.rotate_files()?;
            }
        }
        Ok(())
    }

    fn rotate_files(&self) -> io::Result<()> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let backup_path = self.file_path.with_extension(format!("log.{timestamp}"));

        if self.file_path.exists() {
            fs::rename(&self.file_path, &backup_path)?;
        }
        self.cleanup_old_backups()
    }

    /// Keeps the newest `MAX_BACKUP_FILES` backups of this run.
    fn cleanup_old_backups(&self) -> io::Result<()> {
        let parent_dir = self
            .file_path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No parent directory"))?;
        let Some(file_name) = self.file_path.file_name().and_then(|s| s.to_str()) else {
            return Ok(());
        };
        let backup_prefix = format!("{file_name}.");

        let mut backups: Vec<PathBuf> = fs::read_dir(parent_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&backup_prefix))
            })
            .collect();
        // Names end in a timestamp, so lexical order is age order for equal
        // digit counts; newest first.
        backups.sort_by(|a, b| b.cmp(a));

        for old_backup in backups.iter().skip(MAX_BACKUP_FILES) {
            let _ = fs::remove_file(old_backup);
        }
        Ok(())
    }
}

impl Write for &FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

/// Deletes the oldest run logs (and their backups) so that at most `keep`
/// runs remain. Returns how many files were removed.
///
/// # Errors
///
/// Fails only if `log_dir` cannot be listed.
pub fn prune_run_logs(log_dir: &Path, keep: usize) -> io::Result<usize> {
    let mut runs: Vec<String> = fs::read_dir(log_dir)?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(RUN_PREFIX) && name.ends_with(".log"))
        .collect();
    // The timestamp in the name sorts chronologically.
    runs.sort();

    let excess = runs.len().saturating_sub(keep);
    let mut removed = 0;
    for run in &runs[..excess] {
        let backup_prefix = format!("{run}.");
        for entry in fs::read_dir(log_dir)?.filter_map(Result::ok) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if (*name == **run || name.starts_with(&backup_prefix)) && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn read_dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_for_run_names_file_after_start_time() {
        let started = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let writer = FileWriter::for_run(Path::new("/logs"), started);
        assert_eq!(writer.path(), Path::new("/logs/chatbridge_2024-05-06_07-08-09.log"));
    }

    #[test]
    fn test_writes_append_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("run.log"));
        (&writer).write_all(b"one\n").unwrap();
        (&writer).write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_rotates_past_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileWriter::new(dir.path().join("run.log")).with_max_bytes(8);
        (&writer).write_all(b"0123456789\n").unwrap();
        (&writer).write_all(b"fresh\n").unwrap();

        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "fresh\n");
        let names = read_dir_names(dir.path());
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.starts_with("run.log.")));
    }

    #[test]
    fn test_prune_keeps_newest_runs() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "chatbridge_2024-01-01_00-00-00.log",
            "chatbridge_2024-01-01_00-00-00.log.17",
            "chatbridge_2024-01-02_00-00-00.log",
            "chatbridge_2024-01-03_00-00-00.log",
            "unrelated.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let removed = prune_run_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            read_dir_names(dir.path()),
            vec![
                "chatbridge_2024-01-02_00-00-00.log".to_string(),
                "chatbridge_2024-01-03_00-00-00.log".to_string(),
                "unrelated.txt".to_string(),
            ]
        );
    }
}
