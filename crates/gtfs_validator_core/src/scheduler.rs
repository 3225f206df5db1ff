use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::ValidationContext;
use crate::feed::GtfsFeed;
use crate::indices::FeedIndices;
use crate::notice::{NoticeContainer, NoticeSeverity, NoticeStreamCallback, ValidationNotice};
use crate::progress::{NoOpProgressHandler, ProgressHandler};
use crate::validator::Validator;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerBuildError {
    #[error("validator {0:?} depends on unknown validator {1:?}")]
    UnknownDependency(&'static str, &'static str),
    #[error("validator dependency graph has a cycle involving {0:?}")]
    Cycle(&'static str),
}

/// Runs a validator set in dependency order, dispatching every validator
/// within a topological "layer" to the rayon thread pool in parallel. A
/// validator panicking is converted into a `runtime_exception_in_validator`
/// notice rather than aborting the whole run, mirroring how a single
/// malformed row shouldn't take down validation of the rest of the feed.
pub struct Scheduler {
    validators: Vec<Arc<dyn Validator>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn register<V>(&mut self, validator: V)
    where
        V: Validator + 'static,
    {
        self.validators.push(Arc::new(validator));
    }

    pub fn register_arc(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    fn build_layers(&self) -> Result<Vec<Vec<Arc<dyn Validator>>>, SchedulerBuildError> {
        let by_name: HashMap<&'static str, Arc<dyn Validator>> = self
            .validators
            .iter()
            .map(|v| (v.name(), v.clone()))
            .collect();

        for validator in &self.validators {
            for dep in validator.dependencies() {
                if !by_name.contains_key(dep) {
                    return Err(SchedulerBuildError::UnknownDependency(
                        validator.name(),
                        dep,
                    ));
                }
            }
        }

        let mut in_degree: HashMap<&'static str, usize> = self
            .validators
            .iter()
            .map(|v| (v.name(), v.dependencies().len()))
            .collect();
        let mut dependents: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for validator in &self.validators {
            for dep in validator.dependencies() {
                dependents.entry(dep).or_default().push(validator.name());
            }
        }

        let mut layers = Vec::new();
        let mut remaining = self.validators.len();
        let mut ready: Vec<&'static str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();

        while !ready.is_empty() {
            ready.sort_by_key(|name| (by_name[name].cost_class(), *name));
            let mut layer: Vec<Arc<dyn Validator>> = Vec::new();
            let mut next_ready = Vec::new();

            for name in ready.drain(..) {
                remaining -= 1;
                layer.push(by_name[name].clone());
                if let Some(children) = dependents.get(name) {
                    for &child in children {
                        let degree = in_degree.get_mut(child).expect("known validator");
                        *degree -= 1;
                        if *degree == 0 {
                            next_ready.push(child);
                        }
                    }
                }
            }

            layers.push(layer);
            ready = next_ready;
        }

        if remaining != 0 {
            let stuck = in_degree
                .into_iter()
                .find(|(_, degree)| *degree != 0)
                .map(|(name, _)| name)
                .unwrap_or("<unknown>");
            return Err(SchedulerBuildError::Cycle(stuck));
        }

        Ok(layers)
    }

    pub fn run(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        ctx: &ValidationContext,
    ) -> NoticeContainer {
        self.run_with_progress(feed, indices, ctx, &NoOpProgressHandler, None, None)
    }

    pub fn run_with_progress(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        ctx: &ValidationContext,
        progress: &dyn ProgressHandler,
        cancel: Option<&AtomicBool>,
        notice_stream: Option<NoticeStreamCallback>,
    ) -> NoticeContainer {
        let notices = NoticeContainer::with_cap(ctx.max_notices_per_type);
        if let Some(callback) = &notice_stream {
            notices.stream_subscribe(callback.clone());
        }
        let layers = match self.build_layers() {
            Ok(layers) => layers,
            Err(err) => {
                notices.push(scheduler_error_notice(&err));
                notices.finish();
                return notices;
            }
        };

        let active: Vec<&Arc<dyn Validator>> = layers
            .iter()
            .flatten()
            .filter(|v| v.is_active(ctx))
            .collect();
        progress.set_total_validators(active.len());

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ctx.parallel_workers.max(1))
            .build()
            .ok();

        for layer in &layers {
            if cancel.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false) {
                notices.push(cancelled_notice());
                break;
            }

            let run_one = |validator: &Arc<dyn Validator>| {
                if cancel.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false) {
                    return;
                }
                progress.on_start_validation(validator.name());
                let result = catch_unwind(AssertUnwindSafe(|| {
                    validator.validate(feed, indices, ctx, &notices)
                }));
                if let Err(panic) = result {
                    notices.push(runtime_exception_notice(
                        validator.name(),
                        panic_payload_message(&*panic),
                    ));
                }
                progress.on_finish_validation(validator.name());
                progress.increment_validator_progress();
            };

            #[cfg(feature = "parallel")]
            {
                let active_in_layer = || layer.par_iter().filter(|v| v.is_active(ctx)).for_each(run_one);
                match &pool {
                    Some(pool) => pool.install(active_in_layer),
                    None => active_in_layer(),
                }
            }
            #[cfg(not(feature = "parallel"))]
            {
                layer.iter().filter(|v| v.is_active(ctx)).for_each(run_one);
            }
        }

        // spec.md §4.3: at-least-once-per-group delivery before the run
        // returns, including on the cancellation path above.
        notices.finish();
        notices
    }
}

fn scheduler_error_notice(error: &SchedulerBuildError) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        "validator_scheduling_error",
        NoticeSeverity::Error,
        error.to_string(),
    );
    notice.insert_context_field("message", error.to_string());
    notice
}

fn cancelled_notice() -> ValidationNotice {
    ValidationNotice::new(
        "validation_cancelled",
        NoticeSeverity::Info,
        "validation run was cancelled before completion",
    )
}

fn runtime_exception_notice(validator: &str, message: String) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        "runtime_exception_in_validator_error",
        NoticeSeverity::Error,
        "runtime exception while validating gtfs",
    );
    notice.insert_context_field("exception", "panic");
    notice.insert_context_field("message", message);
    notice.insert_context_field("validator", validator);
    notice
}

pub(crate) fn panic_payload_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
