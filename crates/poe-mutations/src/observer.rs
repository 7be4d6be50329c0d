//! Progress hooks for mutation runs

use std::path::PathBuf;

use crate::engine::MutationOutcome;
use crate::error::MutationError;
use crate::mutation::MutationKind;

/// What an observer is told about the mutation being run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationDetails {
    /// Position in the batch
    pub index: usize,
    pub kind: MutationKind,
    pub label: String,
    /// Resolved target; `None` when the target failed to resolve
    pub path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Callbacks invoked in mutation order
///
/// Every hook defaults to a no-op. Hooks run synchronously between
/// mutations, so they should return quickly.
pub trait MutationObserver: Send + Sync {
    fn on_start(&self, _details: &MutationDetails) {}

    fn on_complete(&self, _details: &MutationDetails, _outcome: &MutationOutcome) {}

    fn on_error(&self, _details: &MutationDetails, _error: &MutationError) {}
}

/// Reports mutation progress through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MutationObserver for TracingObserver {
    fn on_start(&self, details: &MutationDetails) {
        tracing::debug!(
            index = details.index,
            kind = %details.kind,
            label = %details.label,
            path = ?details.path,
            dry_run = details.dry_run,
            "Running mutation"
        );
    }

    fn on_complete(&self, details: &MutationDetails, outcome: &MutationOutcome) {
        if outcome.changed {
            tracing::info!(
                index = details.index,
                kind = %details.kind,
                label = %details.label,
                path = %outcome.path.display(),
                action = %outcome.action,
                dry_run = details.dry_run,
                "Mutation applied"
            );
        } else {
            tracing::debug!(
                index = details.index,
                label = %details.label,
                "Mutation left file unchanged"
            );
        }
    }

    fn on_error(&self, details: &MutationDetails, error: &MutationError) {
        tracing::warn!(
            index = details.index,
            kind = %details.kind,
            label = %details.label,
            path = ?details.path,
            dry_run = details.dry_run,
            code = error.code(),
            error = %error,
            "Mutation failed"
        );
    }
}
