//! Persisted "already notified" state.

use std::collections::BTreeMap;

use crate::ids::ReleaseId;

/// Identifier to last-notified timestamp (epoch milliseconds).
///
/// Stored on disk as a JSON object whose keys are identifiers and whose
/// values are integers. A `BTreeMap` keeps both the file and every
/// iteration over it deterministic.
pub type Baseline = BTreeMap<ReleaseId, i64>;
