//! Applies one pruning strategy across one or more registries.
use crate::registry::ContainerRegistry;
use crate::strategy::PruningStrategy;
use log::{debug, error};
use std::io::{self, Write};

/// What happened while pruning a single registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOutcome {
    pub registry: String,
    /// Versions the strategy selected.
    pub qualified: usize,
    /// Versions the registry confirmed as deleted.
    pub deleted: usize,
    /// Versions whose deletion was attempted and refused.
    pub failed: usize,
    /// Listing error, if the registry could not be listed.
    pub error: Option<String>,
}

impl RegistryOutcome {
    fn new(registry: &str) -> Self {
        Self {
            registry: registry.to_string(),
            qualified: 0,
            deleted: 0,
            failed: 0,
            error: None,
        }
    }
}

/// Totals across every registry of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub dry_run: bool,
    pub outcomes: Vec<RegistryOutcome>,
}

impl PruneSummary {
    pub fn total_qualified(&self) -> usize {
        self.outcomes.iter().map(|o| o.qualified).sum()
    }

    pub fn total_deleted(&self) -> usize {
        self.outcomes.iter().map(|o| o.deleted).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed).sum()
    }

    /// Registries whose listing failed.
    pub fn failed_registries(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.registry.as_str())
            .collect()
    }
}

fn images(count: usize) -> String {
    format!("{} image{}", count, if count == 1 { "" } else { "s" })
}

/// Drives a strategy over registries, one registry and one version at a time.
///
/// Progress is written to `out` as it happens.
pub struct Pruner<'a, W: Write> {
    strategy: &'a dyn PruningStrategy,
    dry_run: bool,
    out: W,
}

impl<'a, W: Write> Pruner<'a, W> {
    pub fn new(strategy: &'a dyn PruningStrategy, dry_run: bool, out: W) -> Self {
        Self {
            strategy,
            dry_run,
            out,
        }
    }

    /// Prune a single registry.
    ///
    /// A listing failure is reported and recorded in the outcome; it is not
    /// returned as an error. Only failures to write the report are.
    pub fn prune_registry(
        &mut self,
        registry: &mut dyn ContainerRegistry,
    ) -> io::Result<RegistryOutcome> {
        let name = registry.registry_name().to_string();
        let mut outcome = RegistryOutcome::new(&name);

        writeln!(self.out, "\n=== {} ===", name)?;
        writeln!(self.out, "{}", self.strategy.description())?;

        let versions = match registry.list_versions() {
            Ok(versions) => versions,
            Err(e) => {
                error!("Error listing versions from {}: {}", name, e);
                writeln!(self.out, "Error listing versions from {}: {}", name, e)?;
                outcome.error = Some(e.to_string());
                return Ok(outcome);
            }
        };

        if versions.is_empty() {
            writeln!(self.out, "No images found")?;
            return Ok(outcome);
        }

        debug!("Evaluating {} versions from {}", versions.len(), name);

        for version in &versions {
            if !self.strategy.should_delete(version, &versions) {
                continue;
            }
            outcome.qualified += 1;

            let tag_info = version.tag_info();
            if self.dry_run {
                writeln!(self.out, "Would delete image: {}{}", version.id(), tag_info)?;
            } else if registry.delete_version(version.id()) {
                writeln!(self.out, "Deleted image: {}{}", version.id(), tag_info)?;
                outcome.deleted += 1;
            } else {
                writeln!(
                    self.out,
                    "Failed to delete image: {}{}",
                    version.id(),
                    tag_info
                )?;
                outcome.failed += 1;
            }
        }

        Ok(outcome)
    }

    /// Prune every registry in turn and print the summary.
    pub fn run(
        &mut self,
        registries: &mut [Box<dyn ContainerRegistry>],
    ) -> io::Result<PruneSummary> {
        let mut summary = PruneSummary {
            dry_run: self.dry_run,
            outcomes: Vec::with_capacity(registries.len()),
        };

        for registry in registries.iter_mut() {
            let outcome = self.prune_registry(registry.as_mut())?;
            summary.outcomes.push(outcome);
        }

        self.write_summary(&summary)?;
        self.out.flush()?;
        Ok(summary)
    }

    fn write_summary(&mut self, summary: &PruneSummary) -> io::Result<()> {
        writeln!(self.out, "\n=== Summary ===")?;

        if summary.total_qualified() == 0 {
            writeln!(self.out, "No images qualified for deletion")?;
        } else if summary.dry_run {
            writeln!(
                self.out,
                "{} would have been deleted",
                images(summary.total_qualified())
            )?;
        } else {
            let deleted = summary.total_deleted();
            let verb = if deleted == 1 { "was" } else { "were" };
            writeln!(self.out, "{} {} deleted", images(deleted), verb)?;

            let failed = summary.total_failed();
            if failed > 0 {
                writeln!(self.out, "{} failed to delete", images(failed))?;
            }
        }

        for registry in summary.failed_registries() {
            writeln!(self.out, "{} could not be listed", registry)?;
        }

        Ok(())
    }
}
