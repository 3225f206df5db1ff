use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::csv_io::CsvParseError;

pub const NOTICE_CODE_CSV_PARSE_ERROR: &str = "csv_parsing_failed";
pub const NOTICE_CODE_MISSING_FILE: &str = "missing_required_file";
pub const NOTICE_CODE_MISSING_RECOMMENDED_FILE: &str = "missing_recommended_file";
pub const NOTICE_CODE_EMPTY_TABLE: &str = "empty_file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationNotice {
    pub code: String,
    pub severity: NoticeSeverity,
    pub message: String,
    pub file: Option<String>,
    pub row: Option<u64>,
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_order: Vec<String>,
}

impl ValidationNotice {
    pub fn new(
        code: impl Into<String>,
        severity: NoticeSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            file: None,
            row: None,
            field: None,
            context: BTreeMap::new(),
            field_order: Vec::new(),
        }
    }

    pub(crate) fn from_csv_error_internal(error: &CsvParseError) -> Self {
        let mut notice = ValidationNotice::new(
            NOTICE_CODE_CSV_PARSE_ERROR,
            NoticeSeverity::Error,
            error.message.clone(),
        );
        notice.file = Some(error.file.clone());
        notice.insert_context_field("charIndex", error.char_index.unwrap_or_default());
        notice.insert_context_field("columnIndex", error.column_index.unwrap_or_default());
        notice.insert_context_field("filename", error.file.clone());
        notice.insert_context_field("lineIndex", error.line_index.unwrap_or_default());
        notice.insert_context_field("message", error.message.clone());
        notice.insert_context_field(
            "parsedContent",
            error.parsed_content.clone().unwrap_or_default(),
        );
        notice.field_order = vec![
            "charIndex".to_string(),
            "columnIndex".to_string(),
            "filename".to_string(),
            "lineIndex".to_string(),
            "message".to_string(),
            "parsedContent".to_string(),
        ];
        notice
    }

    pub fn missing_file(file: impl Into<String>) -> Self {
        let file = file.into();
        let mut notice = ValidationNotice::new(
            NOTICE_CODE_MISSING_FILE,
            NoticeSeverity::Error,
            "missing required GTFS file",
        );
        notice.file = Some(file.clone());
        notice.insert_context_field("filename", file);
        notice
    }

    pub fn empty_table(file: impl Into<String>) -> Self {
        let file = file.into();
        let mut notice = ValidationNotice::new(
            NOTICE_CODE_EMPTY_TABLE,
            NoticeSeverity::Error,
            "GTFS table has no rows",
        );
        notice.file = Some(file.clone());
        notice.insert_context_field("filename", file);
        notice
    }

    pub fn missing_recommended_file(file: impl Into<String>) -> Self {
        let file = file.into();
        let mut notice = ValidationNotice::new(
            NOTICE_CODE_MISSING_RECOMMENDED_FILE,
            NoticeSeverity::Warning,
            "missing recommended GTFS file",
        );
        notice.file = Some(file.clone());
        notice.insert_context_field("filename", file);
        notice
    }

    pub fn insert_context_field<V: Serialize>(&mut self, name: impl Into<String>, value: V) {
        let key = name.into();
        let serialized = serde_json::to_value(value).unwrap_or(Value::Null);
        if !self.field_order.iter().any(|item| item == &key) {
            self.field_order.push(key.clone());
        }
        self.context.insert(key, serialized);
    }

    pub fn with_context_field<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert_context_field(name, value);
        self
    }

    pub fn set_location(&mut self, file: impl Into<String>, field: impl Into<String>, row: u64) {
        self.file = Some(file.into());
        self.field = Some(field.into());
        self.row = Some(row);
    }

    pub fn with_location(
        mut self,
        file: impl Into<String>,
        field: impl Into<String>,
        row: u64,
    ) -> Self {
        self.set_location(file, field, row);
        self
    }
}

/// Per-code aggregate: a running total (even past the sample cap, so the
/// report can say "12,004 occurrences, showing 100") plus a capped sample of
/// the actual notices, guarded by a plain mutex since appends are rare
/// relative to the atomic total-count increment on the hot path.
struct NoticeGroupState {
    severity: NoticeSeverity,
    total: AtomicU64,
    sample: Mutex<Vec<ValidationNotice>>,
}

/// A grouped, capped view of one notice code, as returned by
/// [`NoticeContainer::snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct NoticeGroup {
    pub code: String,
    pub severity: NoticeSeverity,
    pub total_count: u64,
    pub notices: Vec<ValidationNotice>,
}

/// A `notice_stream_callback` subscriber, as described in spec.md §4.3/§6.
/// `Arc` rather than a plain boxed closure so the same subscription can be
/// shared between the engine's load-time container and the scheduler's
/// validator-run container without cloning the callback's captured state.
pub type NoticeStreamCallback = Arc<dyn Fn(&NoticeGroup) + Send + Sync>;

/// Thread-safe notice sink shared across validators running in parallel.
/// Notices are grouped by code as they arrive; each group keeps a capped
/// sample so a pathological feed that fails one rule a million times can't
/// blow up memory or the JSON report, while `total_count` still reports the
/// true occurrence count.
pub struct NoticeContainer {
    groups: DashMap<String, NoticeGroupState>,
    max_per_type: usize,
    subscribers: Mutex<Vec<NoticeStreamCallback>>,
}

impl Default for NoticeContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeContainer {
    pub fn new() -> Self {
        Self::with_cap(crate::config::default_max_notices_per_type())
    }

    pub fn with_cap(max_per_type: usize) -> Self {
        Self {
            groups: DashMap::new(),
            max_per_type,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a `notice_stream_callback` (spec.md §4.3). Invoked inline on
    /// the pushing/completing thread, so callbacks must be fast and
    /// non-blocking — the engine does not catch a panicking subscriber the
    /// way it catches a panicking validator, matching spec.md's "documents
    /// them as untrusted" framing only as far as failure isolation for
    /// validators themselves, not for the callback the embedder supplied.
    pub fn stream_subscribe(&self, callback: NoticeStreamCallback) {
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(callback);
    }

    fn notify_subscribers(&self, group: &NoticeGroup) {
        let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        for callback in subscribers.iter() {
            callback(group);
        }
    }

    /// At-least-once-per-group delivery guarantee for spec.md §4.3: called
    /// once at end-of-run so every group with a subscriber is observed at
    /// least once even if it never crossed a checkpoint (e.g. a single
    /// notice in a group whose first-sample checkpoint fired before the
    /// subscriber was registered, or a group capped below the first
    /// power-of-two checkpoint).
    pub fn finish(&self) {
        if self.subscribers.lock().expect("subscriber lock poisoned").is_empty() {
            return;
        }
        for entry in self.groups.iter() {
            let group = NoticeGroup {
                code: entry.key().clone(),
                severity: entry.value().severity,
                total_count: entry.value().total.load(Ordering::Relaxed),
                notices: entry.value().sample.lock().expect("lock poisoned").clone(),
            };
            self.notify_subscribers(&group);
        }
    }

    pub fn push(&self, notice: ValidationNotice) {
        let code = notice.code.clone();
        let entry = self
            .groups
            .entry(code.clone())
            .or_insert_with(|| NoticeGroupState {
                severity: notice.severity,
                total: AtomicU64::new(0),
                sample: Mutex::new(Vec::new()),
            });
        let severity = entry.severity;
        let total_after = entry.total.fetch_add(1, Ordering::Relaxed) + 1;
        let mut sample = entry.sample.lock().expect("notice sample lock poisoned");
        let accepted = sample.len() < self.max_per_type;
        if accepted {
            sample.push(notice);
        }
        let is_checkpoint = total_after == 1 || (accepted && is_power_of_two(total_after));
        if is_checkpoint {
            if self
                .subscribers
                .lock()
                .expect("subscriber lock poisoned")
                .is_empty()
            {
                return;
            }
            let group = NoticeGroup {
                code,
                severity,
                total_count: total_after,
                notices: sample.clone(),
            };
            drop(sample);
            self.notify_subscribers(&group);
        }
    }

    pub fn push_csv_error(&self, error: &CsvParseError) {
        self.push(ValidationNotice::from_csv_error_internal(error));
    }

    pub fn push_missing_file(&self, file: impl Into<String>) {
        self.push(ValidationNotice::missing_file(file));
    }

    pub fn push_empty_table(&self, file: impl Into<String>) {
        self.push(ValidationNotice::empty_table(file));
    }

    pub fn push_missing_recommended_file(&self, file: impl Into<String>) {
        self.push(ValidationNotice::missing_recommended_file(file));
    }

    pub fn len(&self) -> u64 {
        self.groups
            .iter()
            .map(|entry| entry.value().total.load(Ordering::Relaxed))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn has_errors(&self) -> bool {
        self.groups
            .iter()
            .any(|entry| entry.value().severity == NoticeSeverity::Error)
    }

    /// All individually-sampled notices, flattened. Intended for tests and
    /// small feeds; large feeds should use [`NoticeContainer::snapshot`] to
    /// stay within the per-type cap.
    pub fn iter(&self) -> impl Iterator<Item = ValidationNotice> {
        let mut all = Vec::new();
        for entry in self.groups.iter() {
            all.extend(entry.value().sample.lock().expect("lock poisoned").clone());
        }
        all.into_iter()
    }

    pub fn merge(&self, other: NoticeContainer) {
        for (code, state) in other.groups.into_iter() {
            let entry = self.groups.entry(code).or_insert_with(|| NoticeGroupState {
                severity: state.severity,
                total: AtomicU64::new(0),
                sample: Mutex::new(Vec::new()),
            });
            entry
                .total
                .fetch_add(state.total.load(Ordering::Relaxed), Ordering::Relaxed);
            let incoming = state.sample.into_inner().expect("lock poisoned");
            let mut sample = entry.sample.lock().expect("lock poisoned");
            for notice in incoming {
                if sample.len() >= self.max_per_type {
                    break;
                }
                sample.push(notice);
            }
        }
    }

    /// Produces the report-ready view: one [`NoticeGroup`] per code, ordered
    /// by severity (errors first), then by descending total count, then by
    /// code ascending, for a stable, reproducible report across runs.
    pub fn snapshot(&self) -> Vec<NoticeGroup> {
        let mut groups: Vec<NoticeGroup> = self
            .groups
            .iter()
            .map(|entry| NoticeGroup {
                code: entry.key().clone(),
                severity: entry.value().severity,
                total_count: entry.value().total.load(Ordering::Relaxed),
                notices: entry.value().sample.lock().expect("lock poisoned").clone(),
            })
            .collect();
        groups.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| b.total_count.cmp(&a.total_count))
                .then_with(|| a.code.cmp(&b.code))
        });
        groups
    }
}

fn is_power_of_two(n: u64) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_notices_by_code_and_tracks_total_past_cap() {
        let container = NoticeContainer::with_cap(2);
        for _ in 0..5 {
            container.push(ValidationNotice::new("dup", NoticeSeverity::Error, "dup"));
        }
        let snapshot = container.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].total_count, 5);
        assert_eq!(snapshot[0].notices.len(), 2);
    }

    #[test]
    fn merge_combines_totals_and_respects_cap() {
        let a = NoticeContainer::with_cap(3);
        let b = NoticeContainer::with_cap(3);
        for _ in 0..2 {
            a.push(ValidationNotice::new("x", NoticeSeverity::Warning, "x"));
        }
        for _ in 0..2 {
            b.push(ValidationNotice::new("x", NoticeSeverity::Warning, "x"));
        }
        a.merge(b);
        let snapshot = a.snapshot();
        assert_eq!(snapshot[0].total_count, 4);
        assert_eq!(snapshot[0].notices.len(), 3);
    }

    #[test]
    fn snapshot_orders_errors_before_warnings_before_info() {
        let container = NoticeContainer::new();
        container.push(ValidationNotice::new("b_info", NoticeSeverity::Info, "x"));
        container.push(ValidationNotice::new(
            "a_error",
            NoticeSeverity::Error,
            "x",
        ));
        container.push(ValidationNotice::new(
            "c_warning",
            NoticeSeverity::Warning,
            "x",
        ));
        let snapshot = container.snapshot();
        let codes: Vec<&str> = snapshot.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["a_error", "c_warning", "b_info"]);
    }

    #[test]
    fn snapshot_breaks_severity_ties_by_descending_total_then_code() {
        let container = NoticeContainer::new();
        container.push(ValidationNotice::new("b_rare", NoticeSeverity::Error, "x"));
        for _ in 0..3 {
            container.push(ValidationNotice::new("a_common", NoticeSeverity::Error, "x"));
        }
        let snapshot = container.snapshot();
        let codes: Vec<&str> = snapshot.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["a_common", "b_rare"]);
    }

    #[test]
    fn has_errors_reflects_severity() {
        let container = NoticeContainer::new();
        container.push(ValidationNotice::new("w", NoticeSeverity::Warning, "x"));
        assert!(!container.has_errors());
        container.push(ValidationNotice::new("e", NoticeSeverity::Error, "x"));
        assert!(container.has_errors());
    }

    #[test]
    fn stream_subscribe_sees_first_sample_and_checkpoints() {
        let container = NoticeContainer::with_cap(100);
        let seen_totals = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen_totals.clone();
        container.stream_subscribe(Arc::new(move |group: &NoticeGroup| {
            recorder.lock().unwrap().push(group.total_count);
        }));
        for _ in 0..5 {
            container.push(ValidationNotice::new("dup", NoticeSeverity::Error, "dup"));
        }
        let totals = seen_totals.lock().unwrap().clone();
        assert_eq!(totals, vec![1, 2, 4]);
    }

    #[test]
    fn finish_guarantees_at_least_one_delivery_per_group() {
        let container = NoticeContainer::with_cap(100);
        container.push(ValidationNotice::new("never_checkpointed", NoticeSeverity::Info, "x"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        container.stream_subscribe(Arc::new(move |group: &NoticeGroup| {
            recorder.lock().unwrap().push(group.code.clone());
        }));
        container.finish();
        assert_eq!(*seen.lock().unwrap(), vec!["never_checkpointed".to_string()]);
    }

    #[test]
    fn no_subscribers_means_push_does_not_allocate_a_group_snapshot() {
        let container = NoticeContainer::with_cap(100);
        for _ in 0..10 {
            container.push(ValidationNotice::new("x", NoticeSeverity::Info, "x"));
        }
        assert_eq!(container.snapshot()[0].total_count, 10);
    }
}
