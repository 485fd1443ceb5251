use pipemon_common::PipelineSnapshot;
use serde::{Deserialize, Serialize};

/// How discovered pipelines are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending by parsed elapsed time. Unparseable values go last.
    #[default]
    Elapsed,
    /// Ascending by the raw elapsed-time string. This is the legacy ordering: it puts `"10:00"`
    /// before `"5:00"`, and is only kept for consumers that depend on it.
    Lexicographic,
}

/// Stable sort, so replies with equal keys stay in arrival order.
pub fn sort_snapshots(snapshots: &mut [PipelineSnapshot], order: SortOrder) {
    match order {
        SortOrder::Elapsed => snapshots.sort_by_cached_key(|snapshot| {
            let secs = snapshot.elapsed_secs();
            (secs.is_none(), secs, snapshot.elapsed_time.clone())
        }),
        SortOrder::Lexicographic => {
            snapshots.sort_by(|a, b| a.elapsed_time.cmp(&b.elapsed_time))
        }
    }
}
