pub mod csv;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::system::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
#[error("failed to persist session to {}: {source}", .path.display())]
pub struct SessionError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// What a flush did.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushReport {
    /// Nothing was buffered; no file was touched.
    Empty,
    Written {
        rows: usize,
        path: PathBuf,
        /// Nominal span covered: rows × sampling interval.
        duration: Duration,
    },
}

impl FlushReport {
    pub fn rows(&self) -> usize {
        match self {
            FlushReport::Empty => 0,
            FlushReport::Written { rows, .. } => *rows,
        }
    }
}

/// In-memory buffer of one run's snapshots, persisted once at shutdown.
#[derive(Debug)]
pub struct Session {
    snapshots: Vec<Snapshot>,
    interval: Duration,
}

impl Session {
    pub fn new(interval: Duration) -> Self {
        Session {
            snapshots: Vec::new(),
            interval,
        }
    }

    pub fn append(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Writes every buffered snapshot to `destination` and empties the
    /// buffer.
    ///
    /// Rows go to a sibling `.partial` file that is renamed over the
    /// destination, so readers never observe a half-written file. On failure
    /// the buffer is left intact.
    pub fn flush(&mut self, destination: &Path) -> Result<FlushReport, SessionError> {
        let _flush_span = tracing::info_span!("session.flush").entered();

        if self.snapshots.is_empty() {
            tracing::info!("session is empty, nothing to persist");
            return Ok(FlushReport::Empty);
        }

        let persist_err = |source: io::Error| SessionError {
            path: destination.to_path_buf(),
            source,
        };
        ensure_parent_dir(destination).map_err(persist_err)?;

        let partial = partial_path(destination);
        if let Err(source) = write_file(&partial, &self.snapshots)
            .and_then(|()| fs::rename(&partial, destination))
        {
            let _ = fs::remove_file(&partial);
            return Err(persist_err(source));
        }

        let rows = self.snapshots.len();
        let duration = self.interval.mul_f64(rows as f64);
        self.snapshots.clear();
        tracing::info!(rows, path = %destination.display(), "session persisted");

        Ok(FlushReport::Written {
            rows,
            path: destination.to_path_buf(),
            duration,
        })
    }
}

fn write_file(path: &Path, snapshots: &[Snapshot]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    csv::write_rows(&mut out, snapshots)?;
    out.flush()?;
    out.get_ref().sync_all()
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(second: u32) -> Snapshot {
        Snapshot {
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 2)
                .unwrap()
                .and_hms_micro_opt(3, 4, second, 0)
                .unwrap(),
            system_cpu_percent: 10.0,
            system_memory_percent: 50.0,
            network_bytes_sent: 100,
            network_bytes_recv: 200,
            app_a_cpu_percent: 1.0,
            app_a_memory_percent: 2.0,
            app_b_cpu_percent: 3.0,
            app_b_memory_percent: 4.0,
        }
    }

    #[test]
    fn empty_flush_writes_nothing_twice() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        let mut session = Session::new(Duration::from_secs(2));
        assert_eq!(session.flush(&dest).unwrap(), FlushReport::Empty);
        assert_eq!(session.flush(&dest).unwrap(), FlushReport::Empty);
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn flush_writes_rows_and_drains_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("run.csv");
        let mut session = Session::new(Duration::from_millis(1_500));
        for s in 0..4 {
            session.append(snapshot(s));
        }

        let report = session.flush(&dest).unwrap();
        assert_eq!(
            report,
            FlushReport::Written {
                rows: 4,
                path: dest.clone(),
                duration: Duration::from_secs(6),
            }
        );
        assert!(session.is_empty());
        assert!(!partial_path(&dest).exists());

        let contents = fs::read_to_string(&dest).unwrap();
        assert_eq!(contents.lines().count(), 5);

        // Buffer was drained, so a second flush is a no-op.
        assert_eq!(session.flush(&dest).unwrap(), FlushReport::Empty);
        assert_eq!(fs::read_to_string(&dest).unwrap(), contents);
    }

    #[test]
    fn failed_flush_keeps_buffer() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by a file rename.
        let dest = dir.path().join("taken");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep"), "x").unwrap();

        let mut session = Session::new(Duration::from_secs(2));
        session.append(snapshot(0));
        let err = session.flush(&dest).unwrap_err();
        assert_eq!(err.path, dest);
        assert_eq!(session.len(), 1);
        assert!(!partial_path(&dest).exists());
    }

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("data/baseline_log.csv")),
            PathBuf::from("data/baseline_log.csv.partial")
        );
    }
}
