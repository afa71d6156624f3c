use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::{Report, ReportBackend, ReportBackendConfig, ReportStoreError};

/// Append-only store of [`Report`]s, queried by work id.
pub struct ReportStore {
    backend: Box<dyn ReportBackend>,
    seq: AtomicU64,
}

impl ReportStore {
    pub fn new(backend: Box<dyn ReportBackend>) -> Self {
        Self {
            backend,
            seq: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &ReportBackendConfig) -> Result<Self, ReportStoreError> {
        Ok(Self::new(cfg.build()?))
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(crate::InMemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Key unique to this call: identity fields, the write time in
    /// nanoseconds and a process-local sequence number.
    fn next_key(&self, report: &Report) -> String {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "report_{}_{}_{nanos}_{seq}",
            sanitize(&report.sender),
            sanitize(&report.work_id)
        )
    }

    /// Appends `report`, returning the key it was stored under.
    pub fn save(&self, report: &Report) -> Result<String, ReportStoreError> {
        let key = self.next_key(report);
        let encoded = serde_json::to_vec_pretty(report)?;
        self.backend.put(&key, &encoded)?;
        self.backend.flush()?;
        debug!(key = %key, work_id = %report.work_id, "report saved");
        Ok(key)
    }

    /// Every report for `work_id`, in no particular order.
    ///
    /// Records that fail to decode are skipped with a warning. An error means
    /// the backend itself could not be read.
    pub fn list_by_work(&self, work_id: &str) -> Result<Vec<Report>, ReportStoreError> {
        let mut reports = Vec::new();
        self.backend.scan(&mut |key, bytes| {
            match serde_json::from_slice::<Report>(bytes) {
                Ok(report) if report.work_id == work_id => reports.push(report),
                Ok(_) => {}
                Err(err) => warn!(key, error = %err, "skipping malformed report"),
            }
            Ok(())
        })?;
        Ok(reports)
    }
}

/// Keeps keys usable as file names.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DirectoryBackend, Verdict};
    use tempfile::TempDir;

    fn completed(sender: &str, work: &str, plagiarized: bool) -> Report {
        Report::completed(
            format!("{sender}.txt"),
            sender,
            work,
            Verdict {
                plagiarized,
                similarity: if plagiarized { 0.9 } else { 0.0 },
            },
        )
    }

    #[test]
    fn save_then_list_returns_equal_report() {
        let store = ReportStore::in_memory();
        let report = completed("A", "W1", false);
        store.save(&report).unwrap();

        let listed = store.list_by_work("W1").unwrap();
        assert_eq!(listed, vec![report]);
    }

    #[test]
    fn list_filters_by_work() {
        let store = ReportStore::in_memory();
        store.save(&completed("A", "W1", false)).unwrap();
        store.save(&completed("B", "W2", true)).unwrap();

        let listed = store.list_by_work("W2").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sender, "B");
    }

    #[test]
    fn unknown_work_is_empty_not_error() {
        let store = ReportStore::in_memory();
        assert!(store.list_by_work("nothing").unwrap().is_empty());
    }

    #[test]
    fn repeated_pair_gets_distinct_keys() {
        let store = ReportStore::in_memory();
        let report = completed("A", "W1", false);
        let keys: Vec<_> = (0..50).map(|_| store.save(&report).unwrap()).collect();

        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 50);
        assert_eq!(store.list_by_work("W1").unwrap().len(), 50);
    }

    #[test]
    fn keys_are_file_name_safe() {
        let store = ReportStore::in_memory();
        let key = store.save(&completed("../evil/A", "W 1", false)).unwrap();
        assert!(key.starts_with("report_.._evil_A_W_1_"));
        assert!(!key.contains('/'));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new(Box::new(DirectoryBackend::open(dir.path()).unwrap()));
        let good = completed("A", "W1", true);
        store.save(&good).unwrap();
        std::fs::write(dir.path().join("report_broken.json"), b"{not json").unwrap();

        assert_eq!(store.list_by_work("W1").unwrap(), vec![good]);
    }

    #[test]
    fn directory_store_round_trips_failed_reports() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::from_config(&ReportBackendConfig::directory(dir.path())).unwrap();
        let failed = Report::failed("f.txt", "A", "W1", "index-search: timeout");
        store.save(&failed).unwrap();

        let listed = store.list_by_work("W1").unwrap();
        assert_eq!(listed, vec![failed]);
        assert_eq!(store.backend_name(), "directory");
    }
}
