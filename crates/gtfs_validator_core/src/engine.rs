use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::config::ValidationContext;
use crate::feed::GtfsFeed;
use crate::feed_source::{open_feed_source, FeedAccessError, FeedSource, ZipFeedSource};
use crate::indices::FeedIndices;
use crate::notice::{NoticeContainer, NoticeSeverity, NoticeStreamCallback, ValidationNotice};
use crate::progress::{NoOpProgressHandler, ProgressHandler};
use crate::scheduler::{panic_payload_message, Scheduler};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    FeedAccess(#[from] FeedAccessError),
}

/// Everything `gtfs_validator_report::build_report` needs to assemble a
/// `ValidationReport`, plus whatever a caller that only wants raw notices
/// needs. `feed_label` and `elapsed_seconds` exist purely to round-trip into
/// the report's `feed_info`/`validator_info`; this crate itself never reads
/// them.
pub struct ValidationOutcome {
    pub feed: Option<GtfsFeed>,
    pub notices: NoticeContainer,
    pub feed_label: String,
    pub elapsed_seconds: f64,
}

impl ValidationOutcome {
    pub fn has_errors(&self) -> bool {
        self.notices.has_errors()
    }
}

/// Top-level entrypoint: opens a feed source, loads the feed, builds the
/// shared indices, and runs the validator scheduler. This is what the CLI
/// calls; everything else in this crate is a collaborator it wires together.
pub fn validate_path(
    path: impl AsRef<Path>,
    scheduler: &Scheduler,
    ctx: &ValidationContext,
) -> Result<ValidationOutcome, EngineError> {
    let source = open_feed_source(path)?;
    Ok(validate_source(source.as_ref(), scheduler, ctx))
}

pub fn validate_zip_bytes(
    bytes: Vec<u8>,
    label: impl Into<String>,
    scheduler: &Scheduler,
    ctx: &ValidationContext,
) -> Result<ValidationOutcome, EngineError> {
    let source = ZipFeedSource::open_bytes(bytes, label)?;
    Ok(validate_source(&source, scheduler, ctx))
}

pub fn validate_source(
    source: &dyn FeedSource,
    scheduler: &Scheduler,
    ctx: &ValidationContext,
) -> ValidationOutcome {
    validate_source_with_progress(source, scheduler, ctx, &NoOpProgressHandler, None, None)
}

/// The full entrypoint: progress callback, cooperative cancellation, and a
/// `notice_stream_callback` (spec.md §6) all flow through here. The
/// `notice_stream` subscriber is attached to this function's own container
/// (for load-time notices such as `missing_required_file`) as well as the
/// scheduler's per-run container (for notices validators add directly),
/// since those are two distinct `NoticeContainer`s merged only after the
/// scheduler returns.
pub fn validate_source_with_progress(
    source: &dyn FeedSource,
    scheduler: &Scheduler,
    ctx: &ValidationContext,
    progress: &dyn ProgressHandler,
    cancel: Option<&AtomicBool>,
    notice_stream: Option<NoticeStreamCallback>,
) -> ValidationOutcome {
    let started_at = Instant::now();
    let notices = NoticeContainer::with_cap(ctx.max_notices_per_type);
    if let Some(callback) = &notice_stream {
        notices.stream_subscribe(callback.clone());
    }
    let feed_label = source.display_path();

    progress.on_start_file_load(source.display_path().as_str());
    let load_result = catch_unwind(AssertUnwindSafe(|| GtfsFeed::load(source, &notices)));
    progress.on_finish_file_load(source.display_path().as_str());

    let feed = match load_result {
        Ok(Ok(feed)) => feed,
        Ok(Err(err)) => {
            notices.push(feed_access_error_notice(&err));
            notices.finish();
            return ValidationOutcome {
                feed: None,
                notices,
                feed_label,
                elapsed_seconds: started_at.elapsed().as_secs_f64(),
            };
        }
        Err(panic) => {
            notices.push(runtime_exception_in_loader_error_notice(
                feed_label.clone(),
                panic_payload_message(&*panic),
            ));
            notices.finish();
            return ValidationOutcome {
                feed: None,
                notices,
                feed_label,
                elapsed_seconds: started_at.elapsed().as_secs_f64(),
            };
        }
    };

    let indices = FeedIndices::build(&feed);
    let validator_notices =
        scheduler.run_with_progress(&feed, &indices, ctx, progress, cancel, notice_stream);
    notices.merge(validator_notices);
    notices.finish();

    ValidationOutcome {
        feed: Some(feed),
        notices,
        feed_label,
        elapsed_seconds: started_at.elapsed().as_secs_f64(),
    }
}

fn feed_access_error_notice(error: &FeedAccessError) -> ValidationNotice {
    let mut notice = ValidationNotice::new("i_o_error", NoticeSeverity::Error, error.to_string());
    notice.insert_context_field("exception", "FeedAccessError");
    notice.insert_context_field("message", error.to_string());
    notice
}

/// A panic while loading the feed (a malformed zip the `zip` crate's own
/// code trips over, say) is caught the same way the scheduler catches a
/// panicking validator: the run ends with a notice instead of a crash.
fn runtime_exception_in_loader_error_notice(feed_label: String, message: String) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        "runtime_exception_in_loader_error",
        NoticeSeverity::Error,
        "runtime exception while loading gtfs feed",
    );
    notice.insert_context_field("exception", "panic");
    notice.insert_context_field("filename", feed_label);
    notice.insert_context_field("message", message);
    notice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationMode;
    use std::fs;

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}", prefix, std::process::id(), nanos))
    }

    #[test]
    fn returns_notice_on_missing_required_file() {
        let dir = temp_dir("gtfs_engine_missing_file");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("agency.txt"),
            "agency_name,agency_url,agency_timezone\nTest,https://example.com,UTC\n",
        )
        .unwrap();

        let scheduler = Scheduler::new();
        let ctx = ValidationContext::new(ValidationMode::Default);
        let outcome = validate_path(&dir, &scheduler, &ctx).unwrap();

        assert!(outcome.feed.is_some());
        assert!(outcome
            .notices
            .iter()
            .any(|n| n.code == "missing_required_file"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_path_surfaces_as_engine_error() {
        let scheduler = Scheduler::new();
        let ctx = ValidationContext::default();
        let result = validate_path("/nonexistent/path/for/gtfs", &scheduler, &ctx);
        assert!(result.is_err());
    }

    struct PanicSource;

    impl FeedSource for PanicSource {
        fn read_file(&self, _file_name: &str) -> Result<Option<Vec<u8>>, FeedAccessError> {
            panic!("boom");
        }

        fn list_files(&self) -> Result<Vec<String>, FeedAccessError> {
            panic!("boom");
        }

        fn display_path(&self) -> String {
            "panic-source".to_string()
        }
    }

    #[test]
    fn panic_while_loading_yields_a_notice_not_a_crash() {
        let scheduler = Scheduler::new();
        let ctx = ValidationContext::default();
        let outcome = validate_source(&PanicSource, &scheduler, &ctx);

        assert!(outcome.feed.is_none());
        assert!(outcome
            .notices
            .iter()
            .any(|n| n.code == "runtime_exception_in_loader_error"));
    }
}
