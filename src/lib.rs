//! Prune old or excess container image versions from GitHub Container Registry
//! and Docker Hub.
//!
//! A run lists every version of a container from each selected registry,
//! classifies them with a [`strategy::PruningStrategy`] and deletes (or, in
//! dry-run mode, reports) the ones that qualify. See [`pruner::Pruner`].

pub mod config;
pub mod pruner;
pub mod registry;
pub mod strategy;
