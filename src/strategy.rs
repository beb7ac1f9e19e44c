//! Pruning strategies deciding which image versions qualify for deletion.
//!
//! Strategies only classify; deleting is left to the caller.
use crate::registry::ImageVersion;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors raised while turning a CLI selection into a strategy.
#[derive(Error, Debug, PartialEq)]
pub enum StrategyError {
    #[error("Only one pruning strategy may be selected, got: {}", .0.join(", "))]
    Conflict(Vec<&'static str>),

    #[error(
        "A pruning strategy is required: --prune-untagged-age, --prune-all-untagged or --keep-latest"
    )]
    Missing,

    #[error("Invalid age: {0} (expected a non-negative number of days)")]
    InvalidAge(f64),
}

/// A decision policy over image versions.
pub trait PruningStrategy {
    /// Decide whether `version` should be deleted, given every version listed
    /// from the same registry.
    fn should_delete(&self, version: &ImageVersion, all_versions: &[ImageVersion]) -> bool;

    /// Human-readable description used in reports.
    fn description(&self) -> String;
}

/// Deletes untagged versions created strictly before a fixed cutoff.
#[derive(Debug, Clone)]
pub struct PruneUntaggedByAge {
    days: f64,
    cutoff: DateTime<Utc>,
}

impl PruneUntaggedByAge {
    /// Cutoff is `now - days`, fixed at construction.
    pub fn new(days: f64) -> Result<Self, StrategyError> {
        Self::with_reference_time(days, Utc::now())
    }

    /// Cutoff is `reference - days`.
    pub fn with_reference_time(days: f64, reference: DateTime<Utc>) -> Result<Self, StrategyError> {
        if !days.is_finite() || days < 0.0 {
            return Err(StrategyError::InvalidAge(days));
        }

        // Ages reaching past the representable range select nothing.
        let cutoff = Duration::try_milliseconds((days * 86_400_000.0).round() as i64)
            .and_then(|age| reference.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Ok(Self { days, cutoff })
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }
}

impl PruningStrategy for PruneUntaggedByAge {
    fn should_delete(&self, version: &ImageVersion, _all_versions: &[ImageVersion]) -> bool {
        !version.is_tagged() && version.created_at() < self.cutoff
    }

    fn description(&self) -> String {
        format!(
            "Pruning untagged images older than {} days (before {})",
            self.days, self.cutoff
        )
    }
}

/// Deletes every untagged version regardless of age.
#[derive(Debug, Clone, Default)]
pub struct PruneAllUntagged;

impl PruningStrategy for PruneAllUntagged {
    fn should_delete(&self, version: &ImageVersion, _all_versions: &[ImageVersion]) -> bool {
        !version.is_tagged()
    }

    fn description(&self) -> String {
        "Pruning all untagged images".to_string()
    }
}

/// Keeps the `count` most recent versions and deletes the rest, tagged or not.
///
/// Versions are ranked newest first with a stable sort, so versions sharing a
/// timestamp keep the order in which the registry listed them.
#[derive(Debug, Clone)]
pub struct KeepLatestCount {
    count: usize,
}

impl KeepLatestCount {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl PruningStrategy for KeepLatestCount {
    fn should_delete(&self, version: &ImageVersion, all_versions: &[ImageVersion]) -> bool {
        let mut newest_first: Vec<&ImageVersion> = all_versions.iter().collect();
        newest_first.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        // An unknown id is never deleted.
        newest_first
            .iter()
            .position(|v| v.id() == version.id())
            .is_some_and(|rank| rank >= self.count)
    }

    fn description(&self) -> String {
        format!(
            "Keeping only the latest {} images (deleting all others)",
            self.count
        )
    }
}

/// The strategy options as selected on the command line.
#[derive(Debug, Clone, Default)]
pub struct StrategySelection {
    pub prune_untagged_age: Option<f64>,
    pub prune_all_untagged: bool,
    pub keep_latest: Option<usize>,
}

impl StrategySelection {
    /// Build the single selected strategy.
    ///
    /// Fails when none or more than one strategy is selected.
    pub fn into_strategy(self) -> Result<Box<dyn PruningStrategy>, StrategyError> {
        let mut selected = Vec::new();
        if self.prune_untagged_age.is_some() {
            selected.push("--prune-untagged-age");
        }
        if self.prune_all_untagged {
            selected.push("--prune-all-untagged");
        }
        if self.keep_latest.is_some() {
            selected.push("--keep-latest");
        }

        if selected.len() > 1 {
            return Err(StrategyError::Conflict(selected));
        }

        match (self.prune_untagged_age, self.prune_all_untagged, self.keep_latest) {
            (Some(days), _, _) => Ok(Box::new(PruneUntaggedByAge::new(days)?)),
            (_, true, _) => Ok(Box::new(PruneAllUntagged)),
            (_, _, Some(count)) => Ok(Box::new(KeepLatestCount::new(count))),
            _ => Err(StrategyError::Missing),
        }
    }
}
