//! Core validation engine for GTFS feeds: feed loading, CSV parsing, the
//! notice container, the validator registry/scheduler, and the relational
//! rule catalog. Report schema/rendering, CLI flags, and HTTP fetching live
//! in sibling crates that depend on this one.

pub mod config;
pub mod csv_io;
pub mod engine;
pub mod feed;
pub mod feed_source;
pub mod indices;
pub mod notice;
pub mod progress;
pub mod rules;
pub mod scheduler;
pub mod validator;

pub use config::{ValidationContext, ValidationMode};
pub use csv_io::{parse_csv_table, CsvParseError, CsvTable};
pub use engine::{
    validate_path, validate_source, validate_source_with_progress, validate_zip_bytes,
    EngineError, ValidationOutcome,
};
pub use feed::GtfsFeed;
pub use feed_source::{
    open_feed_source, DirectoryFeedSource, FeedAccessError, FeedSource, ZipFeedSource,
};
pub use indices::FeedIndices;
pub use notice::{
    NoticeContainer, NoticeGroup, NoticeSeverity, NoticeStreamCallback, ValidationNotice,
};
pub use progress::{NoOpProgressHandler, ProgressHandler};
pub use rules::register_all;
pub use scheduler::{Scheduler, SchedulerBuildError};
pub use validator::{CostClass, Validator, ValidatorCategory};

/// Builds a [`Scheduler`] with every catalog validator registered, the way
/// [`engine::validate_path`] expects to be called from a CLI or embedder.
pub fn default_scheduler() -> Scheduler {
    let mut scheduler = Scheduler::new();
    register_all(&mut scheduler);
    scheduler
}
