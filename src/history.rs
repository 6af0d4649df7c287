//! Bounded, durable log of past search sessions.

use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub const HISTORY_KEY: &str = "dna_analyzer_history";
pub const MAX_HISTORY_ITEMS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Search,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Error,
}

impl HistoryStatus {
    pub fn badge(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, rename = "searchTime", skip_serializing_if = "Option::is_none")]
    pub search_time_ms: Option<f64>,
}

impl HistoryEntry {
    pub fn title(&self) -> String {
        match (&self.pattern, &self.file_name) {
            (Some(pattern), _) => format!("Pattern: {}", pattern.to_uppercase()),
            (None, Some(file_name)) => file_name.clone(),
            (None, None) => "Unnamed".to_string(),
        }
    }

    pub fn outcome(&self) -> String {
        match (self.matches, &self.message) {
            (Some(matches), _) => format!("{matches} matches"),
            (None, Some(message)) => message.clone(),
            (None, None) => "Completed".to_string(),
        }
    }
}

/// Everything a workflow knows about an outcome; id and timestamp are
/// assigned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryDraft {
    pub kind: HistoryKind,
    pub pattern: Option<String>,
    pub file_name: Option<String>,
    pub matches: Option<usize>,
    pub message: Option<String>,
    pub status: HistoryStatus,
    pub algorithm: Option<String>,
    pub search_time_ms: Option<f64>,
}

impl HistoryDraft {
    pub fn search_success(
        pattern: &str,
        file_name: &str,
        matches: usize,
        algorithm: &str,
        search_time_ms: Option<f64>,
    ) -> Self {
        Self {
            kind: HistoryKind::Search,
            pattern: Some(pattern.to_string()),
            file_name: Some(file_name.to_string()),
            matches: Some(matches),
            message: None,
            status: HistoryStatus::Success,
            algorithm: Some(algorithm.to_string()),
            search_time_ms,
        }
    }

    pub fn search_error(pattern: &str, file_name: &str, message: &str) -> Self {
        Self {
            kind: HistoryKind::Search,
            pattern: Some(pattern.to_string()),
            file_name: Some(file_name.to_string()),
            matches: None,
            message: Some(message.to_string()),
            status: HistoryStatus::Error,
            algorithm: None,
            search_time_ms: None,
        }
    }
}

/// Proof that the user confirmed wiping the history. Only
/// [`HistoryStore::request_clear`] hands these out.
#[derive(Debug)]
pub struct ClearRequest {
    _confirmed: (),
}

pub struct HistoryStore {
    store: Box<dyn KeyValueStore>,
    entries: Vec<HistoryEntry>,
    last_id: i64,
}

impl HistoryStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let mut ret = Self {
            store,
            entries: vec![],
            last_id: 0,
        };
        ret.list();
        ret
    }

    /// In-memory view as of the last read or write.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Re-reads durable storage. Unreadable or corrupt data yields an empty list.
    pub fn list(&mut self) -> Vec<HistoryEntry> {
        self.entries = self.read_durable().unwrap_or_default();
        if let Some(newest) = self.entries.iter().map(|e| e.id).max() {
            self.last_id = self.last_id.max(newest);
        }
        self.entries.clone()
    }

    pub fn add(&mut self, draft: HistoryDraft) -> HistoryEntry {
        self.add_at(draft, Utc::now())
    }

    pub fn add_at(&mut self, draft: HistoryDraft, now: DateTime<Utc>) -> HistoryEntry {
        let mut history = self
            .read_durable()
            .unwrap_or_else(|| self.entries.clone());
        let newest_stored = history.iter().map(|e| e.id).max().unwrap_or(0);
        let id = now
            .timestamp_millis()
            .max(self.last_id + 1)
            .max(newest_stored + 1);
        self.last_id = id;

        let entry = HistoryEntry {
            id,
            timestamp: now,
            kind: draft.kind,
            pattern: draft.pattern,
            file_name: draft.file_name,
            matches: draft.matches,
            message: draft.message,
            status: draft.status,
            algorithm: draft.algorithm,
            search_time_ms: draft.search_time_ms,
        };
        history.insert(0, entry.clone());
        history.truncate(MAX_HISTORY_ITEMS);
        self.write_durable(&history);
        self.entries = history;
        entry
    }

    pub fn request_clear(&self) -> ClearRequest {
        ClearRequest { _confirmed: () }
    }

    pub fn clear(&mut self, _confirmed: ClearRequest) {
        if let Err(e) = self.store.delete(HISTORY_KEY) {
            error!("Could not clear history: {e}");
        }
        self.entries.clear();
    }

    /// `None` when storage can't be read or the record doesn't parse.
    fn read_durable(&self) -> Option<Vec<HistoryEntry>> {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(history) => Some(history),
                Err(e) => {
                    warn!("Ignoring unreadable history record: {e}");
                    None
                }
            },
            Ok(None) => Some(vec![]),
            Err(e) => {
                warn!("Could not read history: {e}");
                None
            }
        }
    }

    fn write_durable(&mut self, history: &[HistoryEntry]) {
        let json = match serde_json::to_string(history) {
            Ok(json) => json,
            Err(e) => {
                error!("Could not serialize history: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(HISTORY_KEY, &json) {
            error!("Could not save history: {e}");
        }
    }
}

pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if mins < 1 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{mins} min ago")
    } else if hours < 24 {
        format!("{hours} hour{} ago", if hours > 1 { "s" } else { "" })
    } else if days < 7 {
        format!("{days} day{} ago", if days > 1 { "s" } else { "" })
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalyzerError, Result};
    use crate::storage::{FileStore, MemoryStore};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(AnalyzerError::Storage("quota exceeded".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(AnalyzerError::Storage("quota exceeded".to_string()))
        }

        fn delete(&mut self, _key: &str) -> Result<()> {
            Err(AnalyzerError::Storage("quota exceeded".to_string()))
        }
    }

    fn draft(n: usize) -> HistoryDraft {
        HistoryDraft::search_success(&format!("P{n}"), "chr1.fa", n, "kmp", Some(1.5))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn sixty_inserts_keep_the_fifty_newest_newest_first() {
        let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
        for n in 0..60 {
            history.add(draft(n));
            assert!(history.entries().len() <= MAX_HISTORY_ITEMS);
        }
        let listed = history.list();
        assert_eq!(listed.len(), 50);
        let patterns: Vec<_> = listed
            .iter()
            .map(|e| e.pattern.clone().unwrap())
            .collect();
        let expected: Vec<_> = (10..60).rev().map(|n| format!("P{n}")).collect();
        assert_eq!(patterns, expected);
    }

    #[test]
    fn ids_are_strictly_increasing_even_within_one_millisecond() {
        let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
        let a = history.add_at(draft(1), t0());
        let b = history.add_at(draft(2), t0());
        let c = history.add_at(draft(3), t0());
        assert!(a.id < b.id && b.id < c.id);
        assert_eq!(a.id, t0().timestamp_millis());
    }

    #[test]
    fn entries_survive_a_new_store_instance() {
        let json = {
            let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
            history.add(draft(1));
            serde_json::to_string(history.entries()).unwrap()
        };
        let mut reopened =
            HistoryStore::new(Box::new(MemoryStore::new().with_value(HISTORY_KEY, &json)));
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.entries()[0].matches, Some(1));
    }

    #[test]
    fn stored_record_uses_the_documented_field_names() {
        let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
        let entry = history.add_at(draft(4), t0());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "search");
        assert_eq!(value["status"], "success");
        assert_eq!(value["fileName"], "chr1.fa");
        assert_eq!(value["searchTime"], 1.5);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn corrupt_storage_degrades_to_empty_list() {
        let store = MemoryStore::new().with_value(HISTORY_KEY, "{\"oops\":");
        let mut history = HistoryStore::new(Box::new(store));
        assert!(history.list().is_empty());
        history.add(draft(1));
        assert_eq!(history.list().len(), 1);
    }

    #[test]
    fn corrupt_storage_file_heals_on_the_next_write() {
        let td = tempdir().unwrap();
        let path = td.path().join("storage.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let mut history = HistoryStore::new(Box::new(FileStore::new(&path)));
        assert!(history.entries().is_empty());
        for n in 1..=3 {
            history.add(draft(n));
        }
        assert_eq!(history.entries().len(), 3);

        let mut reopened = HistoryStore::new(Box::new(FileStore::new(&path)));
        let patterns: Vec<_> = reopened
            .list()
            .into_iter()
            .map(|e| e.pattern.unwrap())
            .collect();
        assert_eq!(patterns, ["P3", "P2", "P1"]);
    }

    #[test]
    fn clear_repairs_a_corrupt_storage_file() {
        let td = tempdir().unwrap();
        let path = td.path().join("storage.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let mut history = HistoryStore::new(Box::new(FileStore::new(&path)));
        let confirm = history.request_clear();
        history.clear(confirm);
        assert!(FileStore::new(&path).get(HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn unreadable_storage_keeps_the_in_memory_log() {
        let mut history = HistoryStore::new(Box::new(FailingStore));
        history.add(draft(1));
        history.add(draft(2));
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].pattern.as_deref(), Some("P2"));
    }

    #[test]
    fn failing_storage_never_raises() {
        let mut history = HistoryStore::new(Box::new(FailingStore));
        assert!(history.list().is_empty());
        let entry = history.add(HistoryDraft::search_error("ACGT", "x.fa", "boom"));
        assert_eq!(entry.status, HistoryStatus::Error);
        let confirm = history.request_clear();
        history.clear(confirm);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn clear_empties_durable_and_memory_log() {
        let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
        history.add(draft(1));
        history.add(draft(2));
        let confirm = history.request_clear();
        history.clear(confirm);
        assert!(history.entries().is_empty());
        assert!(history.list().is_empty());
    }

    #[test]
    fn entry_title_and_outcome() {
        let mut history = HistoryStore::new(Box::new(MemoryStore::new()));
        let ok = history.add(draft(7));
        assert_eq!(ok.title(), "Pattern: P7");
        assert_eq!(ok.outcome(), "7 matches");
        let err = history.add(HistoryDraft::search_error("gatc", "x.fa", "Timeout"));
        assert_eq!(err.title(), "Pattern: GATC");
        assert_eq!(err.outcome(), "Timeout");
        assert_eq!(err.status.badge(), "ERR");
    }

    #[test]
    fn relative_age_buckets() {
        let now = t0();
        assert_eq!(format_time_ago(now - Duration::seconds(30), now), "just now");
        assert_eq!(format_time_ago(now - Duration::minutes(5), now), "5 min ago");
        assert_eq!(format_time_ago(now - Duration::minutes(59), now), "59 min ago");
        assert_eq!(format_time_ago(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(format_time_ago(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(format_time_ago(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_time_ago(now - Duration::days(6), now), "6 days ago");
        assert_eq!(format_time_ago(now - Duration::days(8), now), "2026-03-06");
    }
}
