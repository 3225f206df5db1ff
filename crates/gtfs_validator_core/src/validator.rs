use crate::config::{ValidationContext, ValidationMode};
use crate::feed::GtfsFeed;
use crate::indices::FeedIndices;
use crate::notice::NoticeContainer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorCategory {
    FilePresence,
    Structural,
    Semantic,
    Relational,
    Business,
}

/// Coarse cost estimate used by the scheduler to decide what to skip in
/// `ValidationMode::Performance`. Not a precise cost model, just enough to
/// separate "always run this" from "this walks every stop_time pair".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CostClass {
    Cheap,
    Moderate,
    Expensive,
}

/// One validation rule. Validators never mutate the feed or each other's
/// state; they read the shared feed and indices and append notices. The
/// `dependencies` list names other validators (by `name()`) whose notices or
/// preconditions this validator's semantics implicitly assume — for example a
/// referential-integrity check that only makes sense once required-file
/// presence has been established. The scheduler uses this to build a
/// dependency-ordered execution plan.
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> ValidatorCategory;

    fn cost_class(&self) -> CostClass {
        CostClass::Cheap
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether this validator should run at all for the given context, per
    /// the mode-mapping table: `Performance` activates only file-presence,
    /// structural, and cheap-semantic checks; `Default` runs everything short
    /// of `Expensive`; `Comprehensive` runs the full catalog.
    fn is_active(&self, ctx: &ValidationContext) -> bool {
        match ctx.mode {
            ValidationMode::Performance => match self.category() {
                ValidatorCategory::FilePresence | ValidatorCategory::Structural => true,
                ValidatorCategory::Semantic => self.cost_class() == CostClass::Cheap,
                ValidatorCategory::Relational | ValidatorCategory::Business => false,
            },
            ValidationMode::Default => self.cost_class() != CostClass::Expensive,
            ValidationMode::Comprehensive => true,
        }
    }

    fn validate(
        &self,
        feed: &GtfsFeed,
        indices: &FeedIndices,
        ctx: &ValidationContext,
        notices: &NoticeContainer,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysExpensive;

    impl Validator for AlwaysExpensive {
        fn name(&self) -> &'static str {
            "always_expensive"
        }
        fn category(&self) -> ValidatorCategory {
            ValidatorCategory::Business
        }
        fn cost_class(&self) -> CostClass {
            CostClass::Expensive
        }
        fn validate(
            &self,
            _feed: &GtfsFeed,
            _indices: &FeedIndices,
            _ctx: &ValidationContext,
            _notices: &NoticeContainer,
        ) {
        }
    }

    #[test]
    fn expensive_validators_are_inactive_in_performance_mode() {
        let validator = AlwaysExpensive;
        let perf_ctx = ValidationContext::new(ValidationMode::Performance);
        let default_ctx = ValidationContext::new(ValidationMode::Default);
        assert!(!validator.is_active(&perf_ctx));
        assert!(validator.is_active(&default_ctx));
    }
}
