//! Diff of a feed pull against the persisted baseline.

use std::collections::BTreeMap;

use feedwatch_models::{Baseline, ReleaseId};

/// Why a release needs a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Not present in the baseline.
    New,
    /// Present, but the feed now carries a later timestamp.
    Updated,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Identifiers that are new or whose timestamp increased, with the new timestamp.
    pub updates: BTreeMap<ReleaseId, i64>,
    /// Baseline to persist for the next run.
    pub next_baseline: Baseline,
}

impl ReconciliationResult {
    /// Classifies an update against the baseline it was computed from.
    pub fn kind(&self, baseline: &Baseline, id: &ReleaseId) -> Option<UpdateKind> {
        if !self.updates.contains_key(id) {
            return None;
        }
        Some(if baseline.contains_key(id) {
            UpdateKind::Updated
        } else {
            UpdateKind::New
        })
    }
}

/// Computes what to notify and what to remember.
///
/// For every ingested identifier: absent from the baseline or carrying a
/// larger timestamp makes it an update, and the new timestamp is kept.
/// Otherwise the baseline value is carried forward unchanged. Baseline
/// identifiers missing from the pull have left the feed window and are
/// dropped.
///
/// A timestamp lower than the baseline (upstream clock skew or a re-posted
/// item) is not an update, and the baseline value is kept so the stored
/// timestamp never decreases.
pub fn reconcile(baseline: &Baseline, ingested: &BTreeMap<ReleaseId, i64>) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();

    for (id, &ts) in ingested {
        match baseline.get(id) {
            Some(&known) if ts <= known => {
                result.next_baseline.insert(id.clone(), known);
            }
            _ => {
                result.updates.insert(id.clone(), ts);
                result.next_baseline.insert(id.clone(), ts);
            }
        }
    }

    result
}
