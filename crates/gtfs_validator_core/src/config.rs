use std::num::NonZeroUsize;

use chrono::{NaiveDate, Utc};

/// Validation mode controls which cost classes of validators run.
///
/// `Performance` skips expensive relational/geometric checks so a feed can be
/// triaged quickly; `Comprehensive` runs everything, including checks whose
/// cost scales worse than linearly with feed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    Performance,
    #[default]
    Default,
    Comprehensive,
}

/// Replaces the thread-local validation context the engine used to carry
/// implicitly. Every validator receives this explicitly instead of reaching
/// into ambient state, so a `Scheduler` can hand the same snapshot to any
/// worker thread without guard juggling.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub current_date: NaiveDate,
    pub country_code: Option<String>,
    pub mode: ValidationMode,
    pub max_notices_per_type: usize,
    pub parallel_workers: usize,
}

impl ValidationContext {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            current_date: Utc::now().date_naive(),
            country_code: None,
            mode,
            max_notices_per_type: default_max_notices_per_type(),
            parallel_workers: default_parallel_workers(),
        }
    }

    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = date;
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }

    pub fn with_max_notices_per_type(mut self, max: usize) -> Self {
        self.max_notices_per_type = max;
        self
    }

    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(ValidationMode::default())
    }
}

pub const fn default_max_notices_per_type() -> usize {
    100
}

/// `min(hw_concurrency, 8)`, the same cap the teacher's worker pool uses so a
/// single validation run never oversubscribes a big machine.
pub fn default_parallel_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(8)
}
